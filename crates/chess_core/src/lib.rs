//! Chess position model and move tables.
//!
//! Everything the search engine needs to know about the game itself lives
//! here: applying and taking back moves, legal move generation, static
//! evaluation and the precomputed tables that drive them.

pub mod bitboard;
pub mod board;
pub mod eval;
pub mod movegen;
pub mod perft;
pub mod tables;
pub mod types;
pub mod uci;

pub use bitboard::Bitboard;
pub use board::*;
pub use eval::{CHECKMATE, evaluate, material, piece_value};
pub use movegen::*;
pub use perft::perft;
pub use tables::MoveTables;
pub use types::*;
pub use uci::*;
