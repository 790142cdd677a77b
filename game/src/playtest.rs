use engine::{GameLogic, Tick};

use crate::game::{Game, GameState};
use crate::input::Intents;
use crate::play_state::PlayConfig;
use crate::settings::GameSettings;

/// Adapts [`Game`] to the engine's tick runner so sessions can be recorded,
/// replayed and hashed.
#[derive(Debug, Clone)]
pub struct TetrisLogic {
    config: PlayConfig,
    seed: u64,
    auto_start: bool,
}

impl TetrisLogic {
    pub fn new(config: PlayConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            auto_start: true,
        }
    }

    pub fn from_settings(settings: &GameSettings, seed: u64) -> Self {
        Self::new(settings.play_config(), settings.seed.unwrap_or(seed))
    }

    /// When disabled the round stays in `Ready` until something calls
    /// [`Game::start`] on the state.
    pub fn with_auto_start(mut self, enabled: bool) -> Self {
        self.auto_start = enabled;
        self
    }
}

impl GameLogic for TetrisLogic {
    type State = Game;
    type Input = Intents;

    fn initial_state(&self) -> Self::State {
        Game::with_config(self.config, self.seed)
    }

    fn step(&self, state: &Self::State, input: Self::Input, now: Tick) -> Self::State {
        let mut next = state.clone();
        if self.auto_start && next.state() == GameState::Ready {
            next.start(now);
        }
        next.tick(now, input);
        next
    }
}
