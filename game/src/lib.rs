pub mod game;
pub mod high_scores;
pub mod input;
pub mod matrix;
pub mod piece_source;
pub mod play_state;
pub mod playtest;
pub mod round_timer;
pub mod scoring;
pub mod serde_duration;
pub mod settings;
pub mod tetrimino;

pub use game::{Game, GameState, RoundResult, ScoreboardSnapshot};
pub use input::Intents;
pub use matrix::Matrix;
pub use play_state::{PlayConfig, PlaySession, PlayState};
pub use tetrimino::Tetrimino;
