use serde::{Deserialize, Serialize};

use crate::matrix::{MATRIX_HEIGHT, MATRIX_WIDTH};
use crate::piece_source::PieceSource;

pub const PIECE_COUNT: usize = 7;
pub const ROTATION_COUNT: usize = 4;
/// Rows (and columns) in a shape's bounding box.
pub const SHAPE_ROWS: usize = 5;
/// Rows above and below the centre row of a shape.
pub const SHAPE_HALF: i8 = 2;

pub const SPAWN_X: i8 = (MATRIX_WIDTH as i8 - 1) / 2;
pub const SPAWN_Y: i8 = MATRIX_HEIGHT as i8 - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    T = 0,
    J,
    Z,
    O,
    S,
    L,
    I,
}

impl PieceKind {
    pub const ALL: [PieceKind; PIECE_COUNT] = [
        PieceKind::T,
        PieceKind::J,
        PieceKind::Z,
        PieceKind::O,
        PieceKind::S,
        PieceKind::L,
        PieceKind::I,
    ];

    /// Out-of-range indices wrap, so any source value maps to a piece.
    pub fn from_index(index: u8) -> Self {
        Self::ALL[index as usize % PIECE_COUNT]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn spawn_rotation(self) -> Rotation {
        Rotation::from_index(SPAWN_ROTATION[self.index()])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    Up = 0,
    Right,
    Down,
    Left,
}

impl Rotation {
    pub fn from_index(index: u8) -> Self {
        match index % ROTATION_COUNT as u8 {
            0 => Rotation::Up,
            1 => Rotation::Right,
            2 => Rotation::Down,
            _ => Rotation::Left,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn rotated(self, dir: RotationDir) -> Self {
        let r = self.index() as u8;
        match dir {
            RotationDir::Cw => Self::from_index(r + 1),
            RotationDir::Ccw => Self::from_index(r + ROTATION_COUNT as u8 - 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationDir {
    Cw,
    Ccw,
}

// Each row's low five bits are one row of the 5x5 box, top row first.
// Bit 4 is the leftmost column and bit 2 the centre column.
pub const SHAPES: [u8; 95] = [
    0x00, 0x04, 0x0e, 0x00, 0x00, // T - up
    0x00, 0x04, 0x06, 0x04, 0x00, // T - right
    0x00, 0x00, 0x0e, 0x04, 0x00, // T - down (spawn)
    0x00, 0x04, 0x0c, 0x04, 0x00, // T - left
    0x00, 0x08, 0x0e, 0x00, 0x00, // J - up
    0x00, 0x06, 0x04, 0x04, 0x00, // J - right
    0x00, 0x00, 0x0e, 0x02, 0x00, // J - down (spawn)
    0x00, 0x04, 0x04, 0x0c, 0x00, // J - left
    0x00, 0x00, 0x0c, 0x06, 0x00, // Z - horizontal (spawn)
    0x00, 0x02, 0x06, 0x04, 0x00, // Z - vertical
    0x00, 0x00, 0x0c, 0x0c, 0x00, // O - spawn
    0x00, 0x00, 0x06, 0x0c, 0x00, // S - horizontal (spawn)
    0x00, 0x08, 0x0c, 0x04, 0x00, // S - vertical
    0x00, 0x02, 0x0e, 0x00, 0x00, // L - up
    0x00, 0x04, 0x04, 0x06, 0x00, // L - right
    0x00, 0x00, 0x0e, 0x08, 0x00, // L - down (spawn)
    0x00, 0x0c, 0x04, 0x04, 0x00, // L - left
    0x00, 0x04, 0x04, 0x04, 0x04, // I - vertical
    0x00, 0x00, 0x1e, 0x00, 0x00, // I - horizontal (spawn)
];

/// Byte offset into [`SHAPES`] for every piece and rotation. Pieces with
/// fewer distinct orientations repeat offsets.
pub const SHAPE_OFFSETS: [[u8; ROTATION_COUNT]; PIECE_COUNT] = [
    [0, 5, 10, 15],   // T
    [20, 25, 30, 35], // J
    [40, 45, 40, 45], // Z
    [50, 50, 50, 50], // O
    [55, 60, 55, 60], // S
    [65, 70, 75, 80], // L
    [85, 90, 85, 90], // I
];

pub const SPAWN_ROTATION: [u8; PIECE_COUNT] = [2, 2, 0, 0, 0, 2, 1];

pub fn shape_offset(piece: PieceKind, rotation: Rotation) -> u8 {
    SHAPE_OFFSETS[piece.index()][rotation.index()]
}

pub fn shape_at(offset: u8) -> [u8; SHAPE_ROWS] {
    let start = offset as usize;
    let mut rows = [0u8; SHAPE_ROWS];
    rows.copy_from_slice(&SHAPES[start..start + SHAPE_ROWS]);
    rows
}

/// Spawn-orientation rows of `piece`, for the next-piece preview.
pub fn preview_rows(piece: PieceKind) -> [u8; SHAPE_ROWS] {
    shape_at(shape_offset(piece, piece.spawn_rotation()))
}

/// The falling piece. `x`/`y` locate the centre of its 5x5 box; row 0 is
/// the bottom of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tetrimino {
    piece: PieceKind,
    rotation: Rotation,
    pub x: i8,
    pub y: i8,
    pub next_piece: PieceKind,
    shape_offset: u8,
}

impl Tetrimino {
    pub fn init(source: &mut dyn PieceSource) -> Self {
        let piece = PieceKind::from_index(source.next_piece_index());
        let next_piece = PieceKind::from_index(source.next_piece_index());
        Self::spawned(piece, next_piece)
    }

    /// A piece of kind `piece` at its spawn rotation and position.
    pub fn spawned(piece: PieceKind, next_piece: PieceKind) -> Self {
        let rotation = piece.spawn_rotation();
        Self {
            piece,
            rotation,
            x: SPAWN_X,
            y: SPAWN_Y,
            next_piece,
            shape_offset: shape_offset(piece, rotation),
        }
    }

    /// Promotes the lookahead piece and draws a new one.
    pub fn next(&mut self, source: &mut dyn PieceSource) {
        let upcoming = PieceKind::from_index(source.next_piece_index());
        *self = Self::spawned(self.next_piece, upcoming);
    }

    /// Rotation math only; legality against the board is the caller's call.
    pub fn rotate(&mut self, dir: RotationDir) {
        self.rotation = self.rotation.rotated(dir);
        self.shape_offset = shape_offset(self.piece, self.rotation);
    }

    /// Steps the active kind forward or back, keeping the position.
    pub fn cycle_kind(&mut self, forward: bool) {
        let i = self.piece.index() as u8;
        let step = if forward { 1 } else { PIECE_COUNT as u8 - 1 };
        self.piece = PieceKind::from_index(i + step);
        self.rotation = self.piece.spawn_rotation();
        self.shape_offset = shape_offset(self.piece, self.rotation);
    }

    pub fn piece(&self) -> PieceKind {
        self.piece
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn shape_offset(&self) -> u8 {
        self.shape_offset
    }

    pub fn shape_rows(&self) -> [u8; SHAPE_ROWS] {
        shape_at(self.shape_offset)
    }

    /// Matrix row covered by shape row `i` (0 = top of the box).
    pub fn row_for(&self, i: usize) -> i16 {
        i16::from(self.y) + i16::from(SHAPE_HALF) - i as i16
    }
}
