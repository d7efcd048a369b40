//! Error types for the search core and the orchestrator.

use thiserror::Error;

/// Failures raised from inside the recursive search.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The bounded scratch node stack ran out of room. Only reachable with a
    /// ply / capacity configuration that does not fit together.
    #[error("scratch node stack exhausted (capacity {capacity})")]
    StackCapacityExceeded { capacity: usize },
}

/// Failures surfaced by the [`Ai`](crate::Ai) controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The cached tree no longer matches the game: the move just played is not
    /// among the cached root's children. Resynchronize with `setup`.
    #[error("move {mv} is not among the cached root's children")]
    NodeNotFound { mv: String },

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("rejected: a search is in progress")]
    SearchInProgress,

    #[error("asked to move while the opponent is on move")]
    OutOfTurn,

    #[error("illegal move {0}")]
    IllegalMove(String),

    #[error("invalid setup: {0}")]
    InvalidSetup(String),

    #[error("worker disconnected before delivering its result")]
    WorkerDisconnected,

    #[error("failed to spawn thread: {0}")]
    Spawn(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
