//! [`GameState`] for the chess position model.

use chess_core::{Color, FenError, Move, MoveTables, Position};

use crate::state::{GameState, Side};

impl Side for Color {
    fn opponent(self) -> Self {
        self.other()
    }
}

impl GameState for Position {
    type Move = Move;
    type Side = Color;
    type Tables = MoveTables;
    type SetupError = FenError;

    fn generate_tables() -> MoveTables {
        MoveTables::generate()
    }

    fn initial() -> Self {
        Position::startpos()
    }

    /// Accepts `startpos` or a FEN string.
    fn parse_setup(text: &str) -> Result<Self, FenError> {
        match text.trim() {
            "startpos" => Ok(Position::startpos()),
            fen => Position::from_fen(fen),
        }
    }

    fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    fn apply_move(&mut self, mv: Move) {
        Position::apply_move(self, mv)
    }

    fn undo_move(&mut self) -> Option<Move> {
        Position::undo_move(self)
    }

    fn move_history(&self) -> &[Move] {
        self.history()
    }

    fn legal_moves_into(&mut self, tables: &MoveTables, side: Color, out: &mut Vec<Move>) {
        debug_assert_eq!(side, self.side_to_move, "generating moves for the side not on move");
        chess_core::legal_moves_into(self, tables, out);
    }

    fn evaluate(&mut self, tables: &MoveTables, side: Color, ply_depth: u32) -> f64 {
        chess_core::evaluate(self, tables, side, ply_depth)
    }
}
