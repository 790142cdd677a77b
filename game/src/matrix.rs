//! Packed bitboard playfield.
//!
//! Every `u32` word holds two rows: the even row in bits 0-15, the odd row in
//! bits 16-31. Inside a row the ten playable columns sit at bits 3..=12
//! (column 0 is bit 12) and the walls fill bits 0-2 and 13-15. Four hidden
//! rows above the visible field give a spawning 5x5 box somewhere to land.

use engine::{Tick, Timer};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::tetrimino::{PieceKind, RotationDir, SHAPE_HALF, Tetrimino};

pub const MATRIX_WIDTH: u8 = 10;
pub const MATRIX_HEIGHT: u8 = 20;
pub const HIDDEN_ROWS: u8 = 4;
pub const TOTAL_ROWS: usize = (MATRIX_HEIGHT + HIDDEN_ROWS) as usize;
pub const MATRIX_WORDS: usize = TOTAL_ROWS / 2;

pub const BOUNDARY_ROW: u16 = 0xE007;
pub const PLAYABLE_ROW_MASK: u16 = 0x1FF8;
pub const BOUNDARY_WORD: u32 = 0xE007_E007;
pub const PLAYABLE_WORD_MASK: u32 = 0x1FF8_1FF8;

/// Bits kept in a clearing row, indexed by animation frame. Frame 4 removes
/// the two centre columns, frame 0 removes everything.
pub const EROSION_MASKS: [u16; 5] = [0x0000, 0x1008, 0x1818, 0x1C38, 0x1E78];
pub const LINE_CLEAR_FRAMES: u8 = EROSION_MASKS.len() as u8;

/// Bit for column `x` within a row.
pub fn column_bit(x: u8) -> u16 {
    1 << (12 - x.min(MATRIX_WIDTH - 1))
}

fn half_shift(row: usize) -> u32 {
    if row % 2 == 0 { 0 } else { 16 }
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bitboard([u32; MATRIX_WORDS]);

impl Bitboard {
    pub const EMPTY: Bitboard = Bitboard([0; MATRIX_WORDS]);
    pub const BOUNDARY: Bitboard = Bitboard([BOUNDARY_WORD; MATRIX_WORDS]);

    pub fn words(&self) -> &[u32; MATRIX_WORDS] {
        &self.0
    }

    /// The 16-bit row `row`; rows past the top read as empty.
    pub fn row(&self, row: usize) -> u16 {
        if row >= TOTAL_ROWS {
            return 0;
        }
        (self.0[row / 2] >> half_shift(row)) as u16
    }

    pub fn set_row(&mut self, row: usize, bits: u16) {
        if row >= TOTAL_ROWS {
            return;
        }
        let shift = half_shift(row);
        let word = &mut self.0[row / 2];
        *word = (*word & !(0xFFFF << shift)) | (u32::from(bits) << shift);
    }

    pub fn or_row(&mut self, row: usize, bits: u16) {
        if row >= TOTAL_ROWS {
            return;
        }
        self.0[row / 2] |= u32::from(bits) << half_shift(row);
    }

    /// ANDs `mask` into one row; the other row of the word is untouched.
    pub fn and_row(&mut self, row: usize, mask: u16) {
        if row >= TOTAL_ROWS {
            return;
        }
        let shift = half_shift(row);
        self.0[row / 2] &= (u32::from(mask) << shift) | !(0xFFFF << shift);
    }

    pub fn intersects(&self, other: &Bitboard) -> bool {
        self.0.iter().zip(other.0.iter()).any(|(a, b)| a & b != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    /// Occupied playable cells; wall bits are not counted.
    pub fn count_cells(&self) -> u32 {
        self.0
            .iter()
            .map(|w| (w & PLAYABLE_WORD_MASK).count_ones())
            .sum()
    }

    /// Drops row `row` and pulls everything above it down by one. Rows below
    /// keep their place; the top row comes in empty.
    pub fn shift_down_from(&mut self, row: usize) {
        if row >= TOTAL_ROWS {
            return;
        }
        let words = self.0;
        for i in 0..MATRIX_WORDS {
            let above = words.get(i + 1).copied().unwrap_or(0);
            // word i now holds rows 2i+1 (low) and 2i+2 (high)
            let shifted = (words[i] >> 16) | (above << 16);
            let keep = if 2 * i + 2 <= row {
                u32::MAX
            } else if 2 * i + 1 == row {
                0x0000_FFFF
            } else {
                0
            };
            self.0[i] = (words[i] & keep) | (shifted & !keep);
        }
    }
}

impl std::fmt::Debug for Bitboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|w| format!("{w:#010x}")))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    Refresh,
    OutOfBounds,
    ReachedBottom,
    WallCollision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collision {
    Ok,
    StackCollision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Movement {
    Refresh,
    NoChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    Down,
}

/// Which of the three display colours a settled cell uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSlot {
    Base,
    Plane1,
    Plane2,
}

impl ColorSlot {
    /// Kinds cycle through the three slots, so T, O and I share the base colour.
    pub fn for_piece(kind: PieceKind) -> Self {
        match kind.index() % 3 {
            1 => ColorSlot::Plane1,
            2 => ColorSlot::Plane2,
            _ => ColorSlot::Base,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Falling,
    Settled(ColorSlot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineClearAnimation {
    pub frame_nbr: u8,
    pub timer: Timer,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matrix {
    height: u8,
    width: u8,
    playfield: Bitboard,
    stack: Bitboard,
    palette1: Bitboard,
    palette2: Bitboard,
    animation: LineClearAnimation,
    line_clear_bitmap: u32,
    tetris_flag: bool,
    flash_counter: u8,
    flash_flag: bool,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::new()
    }
}

impl Matrix {
    pub fn new() -> Self {
        Self {
            height: MATRIX_HEIGHT,
            width: MATRIX_WIDTH,
            playfield: Bitboard::BOUNDARY,
            stack: Bitboard::EMPTY,
            palette1: Bitboard::EMPTY,
            palette2: Bitboard::EMPTY,
            animation: LineClearAnimation::default(),
            line_clear_bitmap: 0,
            tetris_flag: false,
            flash_counter: 0,
            flash_flag: false,
        }
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn playfield(&self) -> &Bitboard {
        &self.playfield
    }

    pub fn stack(&self) -> &Bitboard {
        &self.stack
    }

    pub fn palette1(&self) -> &Bitboard {
        &self.palette1
    }

    pub fn palette2(&self) -> &Bitboard {
        &self.palette2
    }

    pub fn animation(&self) -> &LineClearAnimation {
        &self.animation
    }

    pub fn line_clear_bitmap(&self) -> u32 {
        self.line_clear_bitmap
    }

    pub fn tetris_flag(&self) -> bool {
        self.tetris_flag
    }

    pub fn flash_counter(&self) -> u8 {
        self.flash_counter
    }

    pub fn flash_flag(&self) -> bool {
        self.flash_flag
    }

    pub fn reset_playfield(&mut self) {
        self.playfield = Bitboard::BOUNDARY;
    }

    /// Renders `piece` into a freshly reset playfield. Nothing is committed
    /// unless the result is [`Placement::Refresh`].
    pub fn add_tetrimino(&mut self, piece: &Tetrimino) -> Placement {
        let height = self.height as i8;
        let width = self.width as i8;

        if piece.y > height - 1 + SHAPE_HALF {
            return Placement::OutOfBounds;
        }
        if !(0..width).contains(&piece.x) {
            return if piece.y >= height {
                Placement::OutOfBounds
            } else {
                Placement::WallCollision
            };
        }

        let rows = piece.shape_rows();
        if rows
            .iter()
            .enumerate()
            .any(|(i, bits)| *bits != 0 && piece.row_for(i) < 0)
        {
            return Placement::ReachedBottom;
        }

        let mut scratch = Bitboard::BOUNDARY;
        let shift = (width - piece.x) as u32;
        for (i, bits) in rows.iter().enumerate() {
            if *bits == 0 {
                continue;
            }
            let row = piece.row_for(i) as usize;
            let placed = u16::from(*bits) << shift;
            if scratch.row(row) & placed != 0 {
                return Placement::WallCollision;
            }
            scratch.or_row(row, placed);
        }

        self.playfield = scratch;
        Placement::Refresh
    }

    pub fn check_collision(&self) -> Collision {
        if self.playfield.intersects(&self.stack) {
            Collision::StackCollision
        } else {
            Collision::Ok
        }
    }

    /// Renders `piece` and tests it against the stack without touching `self`.
    pub fn fits(&self, piece: &Tetrimino) -> bool {
        let mut scratch = *self;
        scratch.add_tetrimino(piece) == Placement::Refresh
            && scratch.check_collision() == Collision::Ok
    }

    pub fn can_fall(&self, piece: &Tetrimino) -> bool {
        let mut lowered = *piece;
        lowered.y = lowered.y.saturating_sub(1);
        self.fits(&lowered)
    }

    /// Shifts `piece` one cell. The horizontal position is clamped to the
    /// field, so pushing against column 0 or 9 is a no-op.
    pub fn move_tetrimino(&mut self, piece: &mut Tetrimino, direction: Direction) -> Movement {
        let mut candidate = *piece;
        match direction {
            Direction::Left => candidate.x = candidate.x.saturating_sub(1),
            Direction::Right => candidate.x = candidate.x.saturating_add(1),
            Direction::Down => candidate.y = candidate.y.saturating_sub(1),
        }
        candidate.x = candidate.x.clamp(0, self.width as i8 - 1);
        if candidate.x == piece.x && candidate.y == piece.y {
            return Movement::NoChange;
        }
        self.try_place(piece, candidate)
    }

    pub fn rotate_tetrimino(&mut self, piece: &mut Tetrimino, dir: RotationDir) -> Movement {
        let mut candidate = *piece;
        candidate.rotate(dir);
        self.try_place(piece, candidate)
    }

    /// Swaps `piece` for `candidate` if the candidate renders cleanly and
    /// misses the stack. Otherwise neither the matrix nor `piece` changes.
    pub fn try_place(&mut self, piece: &mut Tetrimino, candidate: Tetrimino) -> Movement {
        let mut scratch = *self;
        let placement = scratch.add_tetrimino(&candidate);
        if placement != Placement::Refresh {
            trace!(?placement, x = candidate.x, y = candidate.y, "placement rejected");
            return Movement::NoChange;
        }
        if scratch.check_collision() == Collision::StackCollision {
            trace!(x = candidate.x, y = candidate.y, "placement hits stack");
            return Movement::NoChange;
        }
        *self = scratch;
        *piece = candidate;
        Movement::Refresh
    }

    /// Settles the rendered piece into the stack and paints its colour plane.
    pub fn merge_with_stack(&mut self, piece: &Tetrimino) {
        let slot = ColorSlot::for_piece(piece.piece());
        for i in 0..MATRIX_WORDS {
            let bits = self.playfield.0[i] & PLAYABLE_WORD_MASK;
            self.stack.0[i] |= bits;
            match slot {
                ColorSlot::Base => {
                    self.palette1.0[i] &= !bits;
                    self.palette2.0[i] &= !bits;
                }
                ColorSlot::Plane1 => {
                    self.palette1.0[i] |= bits;
                    self.palette2.0[i] &= !bits;
                }
                ColorSlot::Plane2 => {
                    self.palette2.0[i] |= bits;
                    self.palette1.0[i] &= !bits;
                }
            }
        }
    }

    /// One bit per full visible row, bit index = row number.
    pub fn check_line_clear(&self) -> u32 {
        (0..self.height as usize)
            .filter(|&row| self.stack.row(row) & PLAYABLE_ROW_MASK == PLAYABLE_ROW_MASK)
            .fold(0, |bitmap, row| bitmap | (1 << row))
    }

    /// Records the rows being cleared and whether it is a four-row clear.
    pub fn mark_line_clear(&mut self, bitmap: u32) {
        self.line_clear_bitmap = bitmap;
        self.tetris_flag = bitmap.count_ones() == 4;
        self.flash_counter = 0;
        self.flash_flag = false;
    }

    pub fn clear_line_clear_flags(&mut self) {
        self.line_clear_bitmap = 0;
        self.tetris_flag = false;
        self.flash_counter = 0;
        self.flash_flag = false;
    }

    pub fn line_clear_start(&mut self, now: Tick, delay: u32) {
        self.animation = LineClearAnimation {
            frame_nbr: LINE_CLEAR_FRAMES - 1,
            timer: Timer::new(now, delay),
            active: true,
        };
    }

    /// Pushes the pending frame deadline back by `us`, e.g. after a pause.
    pub fn delay_animation(&mut self, us: u32) {
        let timer = &mut self.animation.timer;
        timer.restart(timer.start().wrapping_add(us));
    }

    /// Advances the erosion by at most one frame. Returns true once the
    /// marked rows are empty, and on every call after that.
    pub fn line_clear_animate(&mut self, bitmap: u32, now: Tick) -> bool {
        if bitmap == 0 || !self.animation.active {
            return true;
        }
        if !self.animation.timer.expired(now) {
            return false;
        }

        // A frame past the table (e.g. from a hand-edited recording) erases
        // like the last one.
        let frame = usize::from(self.animation.frame_nbr);
        let last_frame = frame == 0 || frame >= EROSION_MASKS.len();
        let mask = if last_frame { EROSION_MASKS[0] } else { EROSION_MASKS[frame] };
        for row in (0..self.height as usize).filter(|row| bitmap & (1 << row) != 0) {
            self.stack.and_row(row, mask);
            self.palette1.and_row(row, mask);
            self.palette2.and_row(row, mask);
        }
        if self.tetris_flag {
            self.flash_flag = !self.flash_flag;
            self.flash_counter = self.flash_counter.wrapping_add(1);
        }

        if last_frame {
            self.animation.frame_nbr = 0;
            self.animation.active = false;
            return true;
        }
        self.animation.frame_nbr -= 1;
        self.animation.timer.restart(now);
        false
    }

    /// Collapses the cleared rows, highest first so lower indices stay valid.
    pub fn reposition_blocks(&mut self, cleared: u32) -> Movement {
        for row in (0..TOTAL_ROWS.min(32)).rev() {
            if cleared & (1 << row) == 0 {
                continue;
            }
            self.stack.shift_down_from(row);
            self.palette1.shift_down_from(row);
            self.palette2.shift_down_from(row);
        }
        Movement::Refresh
    }

    /// What a renderer should draw at column `x`, row `y` (row 0 at the bottom).
    pub fn cell(&self, x: u8, y: u8) -> Cell {
        if x >= self.width || y as usize >= TOTAL_ROWS {
            return Cell::Empty;
        }
        let bit = column_bit(x);
        let row = y as usize;
        if self.playfield.row(row) & bit != 0 {
            Cell::Falling
        } else if self.stack.row(row) & bit != 0 {
            Cell::Settled(self.slot_at(row, bit))
        } else {
            Cell::Empty
        }
    }

    fn slot_at(&self, row: usize, bit: u16) -> ColorSlot {
        if self.palette1.row(row) & bit != 0 {
            ColorSlot::Plane1
        } else if self.palette2.row(row) & bit != 0 {
            ColorSlot::Plane2
        } else {
            ColorSlot::Base
        }
    }

    pub fn set_stack_cell(&mut self, x: u8, y: u8, slot: ColorSlot) {
        if x >= self.width {
            return;
        }
        self.paint(y as usize, column_bit(x), slot);
    }

    pub fn fill_stack_row(&mut self, y: u8, slot: ColorSlot) {
        self.paint(y as usize, PLAYABLE_ROW_MASK, slot);
    }

    fn paint(&mut self, row: usize, bits: u16, slot: ColorSlot) {
        self.stack.or_row(row, bits);
        self.palette1.and_row(row, !bits);
        self.palette2.and_row(row, !bits);
        match slot {
            ColorSlot::Base => {}
            ColorSlot::Plane1 => self.palette1.or_row(row, bits),
            ColorSlot::Plane2 => self.palette2.or_row(row, bits),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tetrimino::Rotation;

    fn piece_at(kind: PieceKind, x: i8, y: i8) -> Tetrimino {
        let mut t = Tetrimino::spawned(kind, PieceKind::T);
        t.x = x;
        t.y = y;
        t
    }

    #[test]
    fn new_matrix_has_walls_only() {
        let m = Matrix::new();
        assert!(m.stack().is_empty());
        assert_eq!(m.playfield().row(0), BOUNDARY_ROW);
        assert_eq!(m.playfield().row(TOTAL_ROWS - 1), BOUNDARY_ROW);
        assert_eq!(m.playfield().count_cells(), 0);
    }

    #[test]
    fn row_helpers_touch_one_half_only() {
        let mut b = Bitboard::EMPTY;
        b.set_row(3, 0x1234);
        b.set_row(2, 0xABCD);
        assert_eq!(b.words()[1], 0x1234_ABCD);
        b.and_row(3, 0x00F0);
        assert_eq!(b.row(3), 0x0030);
        assert_eq!(b.row(2), 0xABCD);
        b.or_row(2, 0x0002);
        assert_eq!(b.row(2), 0xABCF);
        assert_eq!(b.row(99), 0);
    }

    #[test]
    fn horizontal_i_lands_in_expected_columns() {
        let mut m = Matrix::new();
        let p = piece_at(PieceKind::I, 4, 10);
        assert_eq!(m.add_tetrimino(&p), Placement::Refresh);
        let expected = column_bit(2) | column_bit(3) | column_bit(4) | column_bit(5);
        assert_eq!(m.playfield().row(10), BOUNDARY_ROW | expected);
        assert_eq!(m.playfield().count_cells(), 4);
    }

    #[test]
    fn walls_reject_pieces_hanging_over_the_edge() {
        let mut m = Matrix::new();
        assert_eq!(m.add_tetrimino(&piece_at(PieceKind::I, 1, 10)), Placement::WallCollision);
        assert_eq!(m.add_tetrimino(&piece_at(PieceKind::I, 9, 10)), Placement::WallCollision);
        assert_eq!(m.add_tetrimino(&piece_at(PieceKind::I, 2, 10)), Placement::Refresh);
        assert_eq!(m.add_tetrimino(&piece_at(PieceKind::I, 8, 10)), Placement::Refresh);
        assert_eq!(m.add_tetrimino(&piece_at(PieceKind::T, -1, 10)), Placement::WallCollision);
        assert_eq!(m.add_tetrimino(&piece_at(PieceKind::T, 10, 10)), Placement::WallCollision);
    }

    #[test]
    fn out_of_bounds_above_the_field() {
        let mut m = Matrix::new();
        let before = m;
        assert_eq!(m.add_tetrimino(&piece_at(PieceKind::T, 4, 22)), Placement::OutOfBounds);
        assert_eq!(m.add_tetrimino(&piece_at(PieceKind::T, -1, 20)), Placement::OutOfBounds);
        assert_eq!(m, before);
        assert_eq!(m.add_tetrimino(&piece_at(PieceKind::T, 4, 21)), Placement::Refresh);
    }

    #[test]
    fn reached_bottom_once_a_row_falls_through_the_floor() {
        let mut m = Matrix::new();
        // O occupies shape rows 2 and 3: matrix rows y and y-1.
        assert_eq!(m.add_tetrimino(&piece_at(PieceKind::O, 4, 1)), Placement::Refresh);
        assert_eq!(m.add_tetrimino(&piece_at(PieceKind::O, 4, 0)), Placement::ReachedBottom);
    }

    #[test]
    fn collision_only_against_the_stack() {
        let mut m = Matrix::new();
        let p = piece_at(PieceKind::O, 4, 5);
        m.add_tetrimino(&p);
        assert_eq!(m.check_collision(), Collision::Ok);
        m.set_stack_cell(4, 4, ColorSlot::Base);
        assert_eq!(m.check_collision(), Collision::StackCollision);
    }

    #[test]
    fn moves_clamp_and_reject_without_side_effects() {
        let mut m = Matrix::new();
        let mut p = piece_at(PieceKind::I, 2, 10);
        m.add_tetrimino(&p);
        let (m0, p0) = (m, p);

        assert_eq!(m.move_tetrimino(&mut p, Direction::Left), Movement::NoChange);
        assert_eq!((m, p), (m0, p0));

        assert_eq!(m.move_tetrimino(&mut p, Direction::Right), Movement::Refresh);
        assert_eq!(p.x, 3);

        let mut edge = piece_at(PieceKind::O, 0, 10);
        assert_eq!(m.move_tetrimino(&mut edge, Direction::Left), Movement::NoChange);
    }

    #[test]
    fn moving_down_into_the_stack_is_refused() {
        let mut m = Matrix::new();
        m.fill_stack_row(0, ColorSlot::Base);
        let mut p = piece_at(PieceKind::O, 4, 2);
        assert_eq!(m.add_tetrimino(&p), Placement::Refresh);
        assert!(!m.can_fall(&p));
        assert_eq!(m.move_tetrimino(&mut p, Direction::Down), Movement::NoChange);
        assert_eq!(p.y, 2);
    }

    #[test]
    fn rotation_is_validated_against_walls() {
        let mut m = Matrix::new();
        // Vertical I hugging the left wall cannot swing horizontal.
        let mut p = piece_at(PieceKind::I, 0, 10);
        p.rotate(RotationDir::Cw);
        assert_eq!(p.rotation(), Rotation::Down);
        assert_eq!(m.add_tetrimino(&p), Placement::Refresh);
        assert_eq!(m.rotate_tetrimino(&mut p, RotationDir::Cw), Movement::NoChange);
        assert_eq!(p.rotation(), Rotation::Down);

        p.x = 4;
        assert_eq!(m.rotate_tetrimino(&mut p, RotationDir::Cw), Movement::Refresh);
        assert_eq!(p.rotation(), Rotation::Left);
    }

    #[test]
    fn merge_paints_one_colour_plane() {
        let mut m = Matrix::new();
        let j = piece_at(PieceKind::J, 4, 5);
        m.add_tetrimino(&j);
        m.merge_with_stack(&j);
        assert_eq!(m.stack().count_cells(), 4);
        assert_eq!(m.palette1(), m.stack());
        assert!(m.palette2().is_empty());

        m.reset_playfield();
        let t = piece_at(PieceKind::T, 4, 10);
        m.add_tetrimino(&t);
        m.merge_with_stack(&t);
        assert_eq!(m.stack().count_cells(), 8);
        assert_eq!(m.palette1().count_cells(), 4);
        assert_eq!(m.cell(4, 10), Cell::Falling);
        m.reset_playfield();
        assert_eq!(m.cell(4, 10), Cell::Settled(ColorSlot::Base));
    }

    #[test]
    fn full_rows_zero_and_five_are_flagged() {
        let mut m = Matrix::new();
        m.fill_stack_row(0, ColorSlot::Base);
        m.fill_stack_row(5, ColorSlot::Plane2);
        m.set_stack_cell(3, 7, ColorSlot::Base);
        assert_eq!(m.check_line_clear(), 0b10_0001);
    }

    #[test]
    fn erosion_takes_five_frame_delays() {
        let mut m = Matrix::new();
        m.fill_stack_row(2, ColorSlot::Plane1);
        m.fill_stack_row(3, ColorSlot::Base);
        let bitmap = m.check_line_clear();
        assert_eq!(bitmap, 0b1100);
        m.mark_line_clear(bitmap);
        m.line_clear_start(Tick(0), 100);

        assert!(!m.line_clear_animate(bitmap, Tick(50)));
        assert!(!m.line_clear_animate(bitmap, Tick(100)));
        assert_eq!(m.stack().row(2), 0x1E78);
        assert_eq!(m.stack().row(3), 0x1E78);

        let mut done_at = None;
        for t in (150..=600).step_by(50) {
            if m.line_clear_animate(bitmap, Tick(t)) {
                done_at = Some(t);
                break;
            }
        }
        assert_eq!(done_at, Some(500));
        assert!(m.stack().is_empty());
        assert!(m.palette1().is_empty());
        assert!(m.line_clear_animate(bitmap, Tick(501)));
    }

    #[test]
    fn restored_animation_past_the_last_frame_finishes() {
        let mut m = Matrix::new();
        m.fill_stack_row(0, ColorSlot::Base);
        let bitmap = m.check_line_clear();
        m.mark_line_clear(bitmap);
        m.line_clear_start(Tick(0), 10);

        let mut json = serde_json::to_value(m).expect("serialize matrix");
        json["animation"]["frame_nbr"] = serde_json::json!(9);
        let mut restored: Matrix = serde_json::from_value(json).expect("deserialize matrix");

        assert!(restored.line_clear_animate(bitmap, Tick(10)));
        assert_eq!(restored.stack().row(0), 0);
        assert_eq!(restored.animation().frame_nbr, 0);
        assert!(!restored.animation().active);
    }

    #[test]
    fn tetris_clear_flashes() {
        let mut m = Matrix::new();
        for y in 0..4 {
            m.fill_stack_row(y, ColorSlot::Base);
        }
        let bitmap = m.check_line_clear();
        m.mark_line_clear(bitmap);
        assert!(m.tetris_flag());
        m.line_clear_start(Tick(0), 10);
        m.line_clear_animate(bitmap, Tick(10));
        assert!(m.flash_flag());
        assert_eq!(m.flash_counter(), 1);
        m.clear_line_clear_flags();
        assert!(!m.tetris_flag());
        assert_eq!(m.line_clear_bitmap(), 0);
    }

    #[test]
    fn reposition_pulls_rows_above_down() {
        let mut m = Matrix::new();
        let almost = PLAYABLE_ROW_MASK & !column_bit(9);
        for x in 0..9 {
            m.set_stack_cell(x, 0, ColorSlot::Base);
            m.set_stack_cell(x, 2, ColorSlot::Plane2);
        }
        let before = m.stack().count_cells();

        assert_eq!(m.reposition_blocks(0b10), Movement::Refresh);
        assert_eq!(m.stack().row(0), almost);
        assert_eq!(m.stack().row(1), almost);
        assert_eq!(m.stack().row(2), 0);
        assert_eq!(m.palette2().row(1), almost);
        assert_eq!(m.stack().count_cells(), before);
    }

    #[test]
    fn shift_down_crosses_word_boundaries() {
        let mut b = Bitboard::EMPTY;
        for row in 0..TOTAL_ROWS {
            b.set_row(row, row as u16 + 1);
        }
        b.shift_down_from(3);
        assert_eq!(b.row(2), 3);
        assert_eq!(b.row(3), 5);
        assert_eq!(b.row(4), 6);
        assert_eq!(b.row(TOTAL_ROWS - 2), TOTAL_ROWS as u16);
        assert_eq!(b.row(TOTAL_ROWS - 1), 0);

        let mut even = Bitboard::EMPTY;
        even.set_row(0, 1);
        even.set_row(1, 2);
        even.set_row(2, 3);
        even.shift_down_from(0);
        assert_eq!((even.row(0), even.row(1), even.row(2)), (2, 3, 0));
    }

    #[test]
    fn copy_round_trips() {
        let mut src = Matrix::new();
        src.fill_stack_row(4, ColorSlot::Plane1);
        src.add_tetrimino(&piece_at(PieceKind::S, 5, 12));
        let dst = src;
        let src2 = dst;
        assert_eq!(src2, src);
    }
}
