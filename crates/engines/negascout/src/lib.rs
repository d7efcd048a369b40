//! Parallel negascout engine.
//!
//! An [`Ai`] plays one side of a two-player game. On request it runs an
//! iteratively deepened negascout search: the root's candidate moves are
//! spread round-robin over a [`WorkerPool`], scored once per ply, re-sorted,
//! and finally one of the near-best moves is picked with a seeded tie-break.
//! The chosen subtree is cached so the next search after the opponent's reply
//! starts from work already done.
//!
//! The game itself is abstracted behind [`GameState`]; an implementation for
//! [`chess_core::Position`] is included.

mod ai;
mod arena;
mod chess;
mod config;
mod error;
mod events;
mod node;
mod pool;
mod search;
mod state;

pub use ai::{similar_prefix, Ai, Decision};
pub use arena::SearchArena;
pub use config::EngineConfig;
pub use error::{EngineError, SearchError};
pub use events::{AiEvent, EventBus};
pub use node::{sort_by_score, GameTreeNode};
pub use pool::{default_threads, ArenaLimits, NodeResult, Worker, WorkerPool};
pub use search::{Searcher, EPSILON};
pub use state::{GameState, Side};

/// The engine specialised to chess.
pub type ChessAi = Ai<chess_core::Position>;
