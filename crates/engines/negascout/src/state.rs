//! The contract between the search core and a concrete game.

use std::fmt;

/// One of the two players.
pub trait Side: Copy + Eq + Send + Sync + fmt::Debug + 'static {
    fn opponent(self) -> Self;
}

/// A mutable game position with move history.
///
/// The search core only talks to the game through this trait, so any board
/// representation can be plugged in. `Tables` is the representation's
/// precomputed move data: built once per engine and then shared read-only by
/// every worker thread.
pub trait GameState: Clone + Send + 'static {
    type Move: Copy + Eq + Send + Sync + fmt::Debug + fmt::Display + 'static;
    type Side: Side;
    type Tables: Send + Sync + 'static;
    type SetupError: std::error::Error + Send + Sync + 'static;

    fn generate_tables() -> Self::Tables;

    /// The standard starting position.
    fn initial() -> Self;

    /// Parses a textual setup (FEN for chess).
    fn parse_setup(text: &str) -> Result<Self, Self::SetupError>;

    fn side_to_move(&self) -> Self::Side;

    fn apply_move(&mut self, mv: Self::Move);

    /// Takes back the last applied move, if any.
    fn undo_move(&mut self) -> Option<Self::Move>;

    fn move_history(&self) -> &[Self::Move];

    /// Legal moves of `side` (the side on move) into `out`, replacing its
    /// contents.
    fn legal_moves_into(&mut self, tables: &Self::Tables, side: Self::Side, out: &mut Vec<Self::Move>);

    /// Static score from `side`'s point of view. `ply_depth` is the distance
    /// from the search root; implementations use it to prefer quicker mates.
    fn evaluate(&mut self, tables: &Self::Tables, side: Self::Side, ply_depth: u32) -> f64;
}
