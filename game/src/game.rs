use engine::Tick;
use engine::regression::StateDigest;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::input::Intents;
use crate::piece_source::PieceRng;
use crate::play_state::{PlayConfig, PlaySession, PlayState};
use crate::round_timer::RoundTimer;
use crate::settings::{GameSettings, MAX_START_LEVEL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    Ready,
    Playing,
    Paused,
    GameOver,
}

/// What an external scoreboard reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreboardSnapshot {
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    /// Whole seconds of play, saturating.
    pub playing_time: u16,
}

/// Final figures handed to high-score handling when a round ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub playing_time: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    state: GameState,
    config: PlayConfig,
    rng: PieceRng,
    session: PlaySession,
    round_timer: RoundTimer,
    paused_at: Option<Tick>,
}

impl Game {
    pub fn new(settings: &GameSettings) -> Self {
        Self::with_config(settings.play_config(), settings.seed.unwrap_or(0))
    }

    pub fn with_config(config: PlayConfig, seed: u64) -> Self {
        let mut rng = PieceRng::new(seed);
        let session = PlaySession::new(config, &mut rng);
        Self {
            state: GameState::Ready,
            config,
            rng,
            session,
            round_timer: RoundTimer::new(),
            paused_at: None,
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn play_state(&self) -> PlayState {
        self.session.state()
    }

    pub fn session(&self) -> &PlaySession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut PlaySession {
        &mut self.session
    }

    pub fn config(&self) -> &PlayConfig {
        &self.config
    }

    pub fn rng(&self) -> &PieceRng {
        &self.rng
    }

    pub fn round_timer(&self) -> &RoundTimer {
        &self.round_timer
    }

    /// Fresh round with a reseeded piece source. Allowed from any state.
    pub fn prepare(&mut self, seed: u64) {
        self.rng.reseed(seed);
        self.session = PlaySession::new(self.config, &mut self.rng);
        self.round_timer.reset();
        self.paused_at = None;
        self.set_state(GameState::Ready);
    }

    /// Changes the starting level of the prepared round. Ignored once the
    /// round has started.
    pub fn select_start_level(&mut self, level: u32) -> bool {
        if self.state != GameState::Ready {
            return false;
        }
        self.config.start_level = level.min(MAX_START_LEVEL);
        let seed = self.rng.seed();
        self.prepare(seed);
        true
    }

    pub fn start(&mut self, now: Tick) -> bool {
        if self.state != GameState::Ready {
            return false;
        }
        self.round_timer.start(now);
        self.set_state(GameState::Playing);
        true
    }

    pub fn pause(&mut self, now: Tick) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        self.round_timer.stop(now);
        self.paused_at = Some(now);
        self.set_state(GameState::Paused);
        true
    }

    pub fn resume(&mut self, now: Tick) -> bool {
        if self.state != GameState::Paused {
            return false;
        }
        if let Some(paused_at) = self.paused_at.take() {
            self.session.rebase_timers(paused_at, now);
        }
        self.round_timer.start(now);
        self.set_state(GameState::Playing);
        true
    }

    pub fn end(&mut self, now: Tick) -> bool {
        if self.state == GameState::GameOver {
            return false;
        }
        self.round_timer.stop(now);
        self.paused_at = None;
        info!(
            score = self.session.score(),
            level = self.session.level(),
            lines = self.session.lines(),
            seconds = self.round_timer.whole_seconds(),
            "round over"
        );
        self.set_state(GameState::GameOver);
        true
    }

    /// Runs one play tick while playing; other states ignore the tick.
    pub fn tick(&mut self, now: Tick, intents: Intents) -> GameState {
        if self.state != GameState::Playing {
            return self.state;
        }
        self.session.tick(now, intents, &mut self.rng);
        self.round_timer.sync(now);
        if self.session.is_top_out() {
            self.end(now);
        }
        self.state
    }

    pub fn scoreboard(&self) -> ScoreboardSnapshot {
        ScoreboardSnapshot {
            score: self.session.score(),
            level: self.session.level(),
            lines: self.session.lines(),
            playing_time: self.round_timer.whole_seconds(),
        }
    }

    pub fn round_result(&self) -> Option<RoundResult> {
        (self.state == GameState::GameOver).then(|| RoundResult {
            score: self.session.score(),
            level: self.session.level(),
            lines: self.session.lines(),
            playing_time: self.round_timer.whole_seconds(),
        })
    }

    fn set_state(&mut self, next: GameState) {
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "game state");
            self.state = next;
        }
    }
}

impl StateDigest for Game {
    fn digest_bytes(&self) -> Vec<u8> {
        let session = &self.session;
        let matrix = session.matrix();
        let piece = session.piece();

        let mut out = Vec::with_capacity(256);
        out.push(self.state as u8);
        out.push(session.state().index());
        for v in [session.score(), session.level(), session.lines()] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&[
            piece.piece() as u8,
            piece.rotation() as u8,
            piece.x as u8,
            piece.y as u8,
            piece.next_piece as u8,
        ]);
        for board in [matrix.playfield(), matrix.stack(), matrix.palette1(), matrix.palette2()] {
            for word in board.words() {
                out.extend_from_slice(&word.to_le_bytes());
            }
        }
        out.extend_from_slice(&matrix.line_clear_bitmap().to_le_bytes());
        out.extend_from_slice(&self.rng.draws().to_le_bytes());
        out.extend_from_slice(&(self.round_timer.elapsed().as_micros() as u64).to_le_bytes());
        out
    }
}
