//! Precomputed movement and attack data.
//!
//! The tables are built once per engine and shared read-only between every
//! search thread:
//! - knight and king target sets per square
//! - pawn capture sets per colour and square
//! - sliding rays in the eight compass directions, cut at the first blocker
//!   when queried with an occupancy set

use crate::bitboard::Bitboard;
use crate::types::{Color, sq};

const KNIGHT_STEPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (-1, 2),
    (-2, 1),
    (1, -2),
    (2, -1),
    (-1, -2),
    (-2, -1),
];

const KING_STEPS: [(i8, i8); 8] = [
    (1, 1),
    (1, 0),
    (1, -1),
    (0, 1),
    (0, -1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Ray directions as (file, rank) steps. Index order matters: the first four
/// walk towards higher square indices, the last four towards lower ones.
const RAY_STEPS: [(i8, i8); 8] = [
    (0, 1),   // N
    (1, 1),   // NE
    (1, 0),   // E
    (-1, 1),  // NW
    (0, -1),  // S
    (-1, -1), // SW
    (-1, 0),  // W
    (1, -1),  // SE
];

const ROOK_DIRS: [usize; 4] = [0, 2, 4, 6];
const BISHOP_DIRS: [usize; 4] = [1, 3, 5, 7];

#[derive(Clone, Debug)]
pub struct MoveTables {
    knight: [Bitboard; 64],
    king: [Bitboard; 64],
    pawn_captures: [[Bitboard; 64]; 2],
    rays: [[Bitboard; 64]; 8],
}

impl MoveTables {
    pub fn generate() -> Self {
        let mut tables = MoveTables {
            knight: [Bitboard::EMPTY; 64],
            king: [Bitboard::EMPTY; 64],
            pawn_captures: [[Bitboard::EMPTY; 64]; 2],
            rays: [[Bitboard::EMPTY; 64]; 8],
        };

        for from in 0..64u8 {
            let f = (from % 8) as i8;
            let r = (from / 8) as i8;
            let idx = from as usize;

            tables.knight[idx] = steps_from(f, r, &KNIGHT_STEPS);
            tables.king[idx] = steps_from(f, r, &KING_STEPS);
            tables.pawn_captures[Color::White.idx()][idx] = steps_from(f, r, &[(-1, 1), (1, 1)]);
            tables.pawn_captures[Color::Black.idx()][idx] =
                steps_from(f, r, &[(-1, -1), (1, -1)]);

            for (dir, &(df, dr)) in RAY_STEPS.iter().enumerate() {
                let mut ray = Bitboard::EMPTY;
                let (mut nf, mut nr) = (f + df, r + dr);
                while let Some(to) = sq(nf, nr) {
                    ray.set(to);
                    nf += df;
                    nr += dr;
                }
                tables.rays[dir][idx] = ray;
            }
        }
        tables
    }

    #[inline]
    pub fn knight_attacks(&self, sq: u8) -> Bitboard {
        self.knight[sq as usize]
    }

    #[inline]
    pub fn king_attacks(&self, sq: u8) -> Bitboard {
        self.king[sq as usize]
    }

    /// Squares a pawn of `color` standing on `sq` captures on.
    #[inline]
    pub fn pawn_attacks(&self, color: Color, sq: u8) -> Bitboard {
        self.pawn_captures[color.idx()][sq as usize]
    }

    #[inline]
    pub fn bishop_attacks(&self, sq: u8, occupied: Bitboard) -> Bitboard {
        self.slide(sq, occupied, &BISHOP_DIRS)
    }

    #[inline]
    pub fn rook_attacks(&self, sq: u8, occupied: Bitboard) -> Bitboard {
        self.slide(sq, occupied, &ROOK_DIRS)
    }

    #[inline]
    pub fn queen_attacks(&self, sq: u8, occupied: Bitboard) -> Bitboard {
        self.bishop_attacks(sq, occupied) | self.rook_attacks(sq, occupied)
    }

    fn slide(&self, sq: u8, occupied: Bitboard, dirs: &[usize]) -> Bitboard {
        let mut attacks = Bitboard::EMPTY;
        for &dir in dirs {
            let ray = self.rays[dir][sq as usize];
            let blockers = ray & occupied;
            // Nearest blocker: lowest index on ascending rays, highest on descending.
            let nearest = if dir < 4 { blockers.lsb() } else { blockers.msb() };
            attacks |= match nearest {
                Some(b) => ray & !self.rays[dir][b as usize],
                None => ray,
            };
        }
        attacks
    }
}

impl Default for MoveTables {
    fn default() -> Self {
        Self::generate()
    }
}

fn steps_from(f: i8, r: i8, steps: &[(i8, i8)]) -> Bitboard {
    let mut bb = Bitboard::EMPTY;
    for &(df, dr) in steps {
        if let Some(to) = sq(f + df, r + dr) {
            bb.set(to);
        }
    }
    bb
}

#[cfg(test)]
#[path = "tables_tests.rs"]
mod tables_tests;
