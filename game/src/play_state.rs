use engine::{Tick, Timer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::input::Intents;
use crate::matrix::{Collision, Direction, Matrix, Movement, Placement};
use crate::piece_source::PieceSource;
use crate::scoring::{drop_speed, lines_to_next_level, score_for_clear, soft_drop_bonus, soft_drop_speed};
use crate::tetrimino::{PIECE_COUNT, RotationDir, Tetrimino};

pub const DEFAULT_LINE_CLEAR_FRAME_DELAY_US: u32 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayState {
    NotStarted,
    Normal,
    HalfSecondB4Lock,
    Locked,
    LineClear,
    TransitionLevel,
    NextTetrimino,
    TopOut,
}

impl PlayState {
    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Per-round knobs, usually taken from [`crate::settings::GameSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayConfig {
    pub start_level: u32,
    pub line_clear_frame_delay_us: u32,
    pub debug_intents: bool,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            start_level: 0,
            line_clear_frame_delay_us: DEFAULT_LINE_CLEAR_FRAME_DELAY_US,
            debug_intents: false,
        }
    }
}

/// One round of play: the matrix, the falling piece and everything the
/// state machine needs between ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaySession {
    state: PlayState,
    matrix: Matrix,
    piece: Tetrimino,
    score: u32,
    level: u32,
    lines: u32,
    next_level_lines: u32,
    drop_delay: u32,
    soft_drop_delay: u32,
    soft_drop_active: bool,
    soft_drop_rows: u32,
    drop_timer: Timer,
    lock_timer: Timer,
    line_clear_frame_delay: u32,
    piece_counts: [u32; PIECE_COUNT],
    debug_intents: bool,
}

impl PlaySession {
    pub fn new(config: PlayConfig, source: &mut dyn PieceSource) -> Self {
        let level = config.start_level;
        Self {
            state: PlayState::NotStarted,
            matrix: Matrix::new(),
            piece: Tetrimino::init(source),
            score: 0,
            level,
            lines: 0,
            next_level_lines: lines_to_next_level(level),
            drop_delay: drop_speed(level),
            soft_drop_delay: soft_drop_speed(level),
            soft_drop_active: false,
            soft_drop_rows: 0,
            drop_timer: Timer::default(),
            lock_timer: Timer::default(),
            line_clear_frame_delay: config.line_clear_frame_delay_us.max(1),
            piece_counts: [0; PIECE_COUNT],
            debug_intents: config.debug_intents,
        }
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_top_out(&self) -> bool {
        self.state == PlayState::TopOut
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Direct access for scenario setup; not used during play.
    pub fn matrix_mut(&mut self) -> &mut Matrix {
        &mut self.matrix
    }

    pub fn piece(&self) -> &Tetrimino {
        &self.piece
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn next_level_lines(&self) -> u32 {
        self.next_level_lines
    }

    pub fn piece_counts(&self) -> &[u32; PIECE_COUNT] {
        &self.piece_counts
    }

    pub fn drop_delay(&self) -> u32 {
        self.drop_delay
    }

    pub fn soft_drop_delay(&self) -> u32 {
        self.soft_drop_delay
    }

    /// The gravity period currently in force, soft drop included.
    pub fn effective_drop_delay(&self) -> u32 {
        if self.soft_drop_active {
            self.soft_drop_delay
        } else {
            self.drop_delay
        }
    }

    pub fn drop_timer(&self) -> &Timer {
        &self.drop_timer
    }

    pub fn lock_timer(&self) -> &Timer {
        &self.lock_timer
    }

    pub fn soft_drop_rows(&self) -> u32 {
        self.soft_drop_rows
    }

    /// Runs the handler for the current state once and returns the state the
    /// session is in afterwards.
    pub fn tick(&mut self, now: Tick, intents: Intents, source: &mut dyn PieceSource) -> PlayState {
        match self.state {
            PlayState::NotStarted => {
                let snapshot = self.matrix;
                self.place_spawned(now, snapshot);
            }
            PlayState::Normal => self.tick_normal(now, intents),
            PlayState::HalfSecondB4Lock => self.tick_lock_delay(now, intents),
            PlayState::Locked => self.lock(now),
            PlayState::LineClear => self.tick_line_clear(now),
            PlayState::TransitionLevel => self.level_up(),
            PlayState::NextTetrimino => {
                self.spawn_next(now, source);
            }
            PlayState::TopOut => {}
        }
        self.state
    }

    /// Promotes the lookahead piece and places it. A spawn that overlaps the
    /// stack or a wall tops out and leaves the matrix as it was.
    pub fn spawn_next(&mut self, now: Tick, source: &mut dyn PieceSource) -> PlayState {
        let snapshot = self.matrix;
        self.piece.next(source);
        self.place_spawned(now, snapshot)
    }

    /// Moves every pending deadline forward by the time spent paused.
    pub fn rebase_timers(&mut self, paused_at: Tick, now: Tick) {
        let paused = now.elapsed_since(paused_at);
        for timer in [&mut self.drop_timer, &mut self.lock_timer] {
            timer.restart(timer.start().wrapping_add(paused));
        }
        self.matrix.delay_animation(paused);
    }

    fn transition(&mut self, next: PlayState) {
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "play state");
            self.state = next;
        }
    }

    fn place_spawned(&mut self, now: Tick, snapshot: Matrix) -> PlayState {
        self.matrix.reset_playfield();
        let placed = self.matrix.add_tetrimino(&self.piece) == Placement::Refresh
            && self.matrix.check_collision() == Collision::Ok;
        if placed {
            self.drop_timer = Timer::new(now, self.effective_drop_delay());
            self.transition(PlayState::Normal);
        } else {
            self.matrix = snapshot;
            info!(
                score = self.score,
                level = self.level,
                lines = self.lines,
                piece = ?self.piece.piece(),
                "top out"
            );
            self.transition(PlayState::TopOut);
        }
        self.state
    }

    fn apply_intents(&mut self, intents: Intents) {
        if intents.soft_drop != self.soft_drop_active {
            // Only an unbroken soft drop into the lock earns points.
            self.soft_drop_rows = 0;
        }
        self.soft_drop_active = intents.soft_drop;

        if intents.rotate_cw {
            self.matrix.rotate_tetrimino(&mut self.piece, RotationDir::Cw);
        }
        if intents.rotate_ccw {
            self.matrix.rotate_tetrimino(&mut self.piece, RotationDir::Ccw);
        }
        if intents.move_left {
            self.matrix.move_tetrimino(&mut self.piece, Direction::Left);
        }
        if intents.move_right {
            self.matrix.move_tetrimino(&mut self.piece, Direction::Right);
        }

        if self.debug_intents {
            for (pressed, forward) in [(intents.debug_next_kind, true), (intents.debug_prev_kind, false)] {
                if pressed {
                    let mut candidate = self.piece;
                    candidate.cycle_kind(forward);
                    self.matrix.try_place(&mut self.piece, candidate);
                }
            }
        }
    }

    fn tick_normal(&mut self, now: Tick, intents: Intents) {
        self.apply_intents(intents);

        let delay = self.effective_drop_delay();
        self.drop_timer.set_delay(delay);
        if !self.drop_timer.expired(now) {
            return;
        }

        match self.matrix.move_tetrimino(&mut self.piece, Direction::Down) {
            Movement::Refresh => {
                self.drop_timer.restart(now);
                if self.soft_drop_active {
                    self.soft_drop_rows = self.soft_drop_rows.saturating_add(1);
                }
            }
            Movement::NoChange => {
                self.lock_timer = Timer::new(now, delay);
                self.transition(PlayState::HalfSecondB4Lock);
            }
        }
    }

    fn tick_lock_delay(&mut self, now: Tick, intents: Intents) {
        self.apply_intents(intents);

        if self.matrix.can_fall(&self.piece) {
            self.drop_timer.restart(now);
            self.transition(PlayState::Normal);
        } else if self.lock_timer.expired(now) {
            self.transition(PlayState::Locked);
        }
    }

    fn lock(&mut self, now: Tick) {
        self.matrix.merge_with_stack(&self.piece);
        let kind = self.piece.piece().index();
        self.piece_counts[kind] = self.piece_counts[kind].saturating_add(1);
        self.matrix.reset_playfield();

        let bitmap = self.matrix.check_line_clear();
        if bitmap != 0 {
            self.matrix.mark_line_clear(bitmap);
            self.matrix.line_clear_start(now, self.line_clear_frame_delay);
            self.transition(PlayState::LineClear);
        } else {
            self.award_soft_drop();
            self.transition(PlayState::NextTetrimino);
        }
    }

    fn tick_line_clear(&mut self, now: Tick) {
        let bitmap = self.matrix.line_clear_bitmap();
        if !self.matrix.line_clear_animate(bitmap, now) {
            return;
        }

        self.award_soft_drop();
        let cleared = bitmap.count_ones();
        self.score = self.score.saturating_add(score_for_clear(cleared, self.level));
        self.matrix.reposition_blocks(bitmap);
        self.lines = self.lines.saturating_add(cleared);
        self.matrix.clear_line_clear_flags();

        if self.lines >= self.next_level_lines {
            self.transition(PlayState::TransitionLevel);
        } else {
            self.transition(PlayState::NextTetrimino);
        }
    }

    fn level_up(&mut self) {
        self.level = self.level.saturating_add(1);
        self.drop_delay = drop_speed(self.level);
        self.soft_drop_delay = soft_drop_speed(self.level);
        self.next_level_lines = lines_to_next_level(self.level);
        info!(level = self.level, lines = self.lines, "level up");
        self.transition(PlayState::NextTetrimino);
    }

    fn award_soft_drop(&mut self) {
        self.score = self.score.saturating_add(soft_drop_bonus(self.soft_drop_rows));
        self.soft_drop_rows = 0;
    }
}
