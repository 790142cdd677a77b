use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::tetrimino::PIECE_COUNT;

/// Where new pieces come from. Implementations return an index in `0..=6`.
pub trait PieceSource {
    fn next_piece_index(&mut self) -> u8;
}

/// Uniform seeded source.
///
/// Each draw seeds a fresh `StdRng` from `(seed, draws)`, so the whole
/// generator state is two integers and serializes with the game it feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceRng {
    seed: u64,
    draws: u64,
}

impl PieceRng {
    pub fn new(seed: u64) -> Self {
        Self { seed, draws: 0 }
    }

    /// Restarts the sequence from an external entropy value, e.g. a timer reading.
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.draws = 0;
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }
}

impl PieceSource for PieceRng {
    fn next_piece_index(&mut self) -> u8 {
        let stream = self.seed ^ self.draws.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        self.draws = self.draws.wrapping_add(1);
        StdRng::seed_from_u64(stream).gen_range(0..PIECE_COUNT as u8)
    }
}

/// Replays a fixed list of indices, cycling when exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceSequence {
    indices: Vec<u8>,
    cursor: usize,
}

impl PieceSequence {
    pub fn new(indices: Vec<u8>) -> Self {
        Self { indices, cursor: 0 }
    }
}

impl PieceSource for PieceSequence {
    fn next_piece_index(&mut self) -> u8 {
        if self.indices.is_empty() {
            return 0;
        }
        let index = self.indices[self.cursor % self.indices.len()];
        self.cursor = self.cursor.wrapping_add(1);
        index % PIECE_COUNT as u8
    }
}
