pub mod clock;
pub mod regression;

use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub use clock::{Tick, TickClock, Timer};

/// One recorded state and the counter reading it was produced at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame<State> {
    pub tick: Tick,
    pub state: State,
}

/// Tick-by-tick history of a session. Recording after a rewind truncates the
/// abandoned branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeMachine<State> {
    frames: Vec<Frame<State>>,
    frame: usize,
}

impl<State> TimeMachine<State> {
    pub fn new(tick: Tick, initial_state: State) -> Self {
        Self {
            frames: vec![Frame {
                tick,
                state: initial_state,
            }],
            frame: 0,
        }
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn state(&self) -> &State {
        &self.frames[self.frame].state
    }

    pub fn tick(&self) -> Tick {
        self.frames[self.frame].tick
    }

    pub fn state_at(&self, frame: usize) -> Option<&State> {
        self.frames.get(frame).map(|f| &f.state)
    }

    pub fn history(&self) -> &[Frame<State>] {
        &self.frames
    }

    pub fn rewind(&mut self, frames: usize) -> usize {
        self.frame = self.frame.saturating_sub(frames);
        self.frame
    }

    pub fn forward(&mut self, frames: usize) -> usize {
        let max_frame = self.frames.len().saturating_sub(1);
        self.frame = (self.frame + frames).min(max_frame);
        self.frame
    }

    pub fn seek(&mut self, frame: usize) -> usize {
        self.frame = frame.min(self.frames.len().saturating_sub(1));
        self.frame
    }

    pub fn record(&mut self, tick: Tick, state: State) -> usize {
        self.frames.truncate(self.frame + 1);
        self.frames.push(Frame { tick, state });
        self.frame += 1;
        self.frame
    }
}

impl<State: Serialize> TimeMachine<State> {
    pub fn save_json_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = fs::File::create(path)?;
        let mut writer = io::BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writer.flush()
    }
}

impl<State: DeserializeOwned> TimeMachine<State> {
    pub fn load_json_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path)?;
        let tm: Self = serde_json::from_reader(io::BufReader::new(file)).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed parsing timemachine json {}: {e}", path.display()),
            )
        })?;
        if tm.frames.is_empty() || tm.frame >= tm.frames.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("timemachine json {} has no frame {}", path.display(), tm.frame),
            ));
        }
        Ok(tm)
    }
}

/// The per-tick contract a game exposes to the scheduler.
pub trait GameLogic {
    type State;
    type Input;

    fn initial_state(&self) -> Self::State;

    /// Runs one tick to completion. `now` is the counter reading for this tick.
    fn step(&self, state: &Self::State, input: Self::Input, now: Tick) -> Self::State;
}

/// Plays the role of the firmware task loop: reads the clock, runs one tick,
/// keeps every resulting state.
#[derive(Debug)]
pub struct HeadlessRunner<G: GameLogic> {
    game: G,
    clock: TickClock,
    timemachine: TimeMachine<G::State>,
}

impl<G: GameLogic> HeadlessRunner<G> {
    pub fn new(game: G, clock: TickClock) -> Self {
        let initial_state = game.initial_state();
        Self {
            timemachine: TimeMachine::new(clock.now(), initial_state),
            game,
            clock,
        }
    }

    /// Resumes from a loaded recording at its current frame.
    pub fn from_timemachine(game: G, timemachine: TimeMachine<G::State>, period_us: u32) -> Self {
        let clock = TickClock::new(timemachine.tick(), period_us);
        Self {
            game,
            clock,
            timemachine,
        }
    }

    pub fn frame(&self) -> usize {
        self.timemachine.frame()
    }

    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    pub fn state(&self) -> &G::State {
        self.timemachine.state()
    }

    pub fn history(&self) -> &[Frame<G::State>] {
        self.timemachine.history()
    }

    pub fn timemachine(&self) -> &TimeMachine<G::State> {
        &self.timemachine
    }

    pub fn step(&mut self, input: G::Input) -> usize {
        let now = self.clock.advance();
        let next_state = self.game.step(self.timemachine.state(), input, now);
        self.timemachine.record(now, next_state)
    }

    pub fn run<I>(&mut self, inputs: I) -> usize
    where
        I: IntoIterator<Item = G::Input>,
    {
        let mut last_frame = self.frame();
        for input in inputs {
            last_frame = self.step(input);
        }
        last_frame
    }

    /// Steps with the default input until `until` holds or `max_ticks` elapse.
    /// Returns the number of ticks taken when the predicate was met.
    pub fn run_until<F>(&mut self, max_ticks: usize, mut until: F) -> Option<usize>
    where
        G::Input: Default,
        F: FnMut(&G::State) -> bool,
    {
        for taken in 1..=max_ticks {
            self.step(G::Input::default());
            if until(self.state()) {
                return Some(taken);
            }
        }
        None
    }

    pub fn rewind(&mut self, frames: usize) -> usize {
        let frame = self.timemachine.rewind(frames);
        self.clock = TickClock::new(self.timemachine.tick(), self.clock.period_us());
        frame
    }

    pub fn forward(&mut self, frames: usize) -> usize {
        let frame = self.timemachine.forward(frames);
        self.clock = TickClock::new(self.timemachine.tick(), self.clock.period_us());
        frame
    }

    pub fn seek(&mut self, frame: usize) -> usize {
        let frame = self.timemachine.seek(frame);
        self.clock = TickClock::new(self.timemachine.tick(), self.clock.period_us());
        frame
    }
}
