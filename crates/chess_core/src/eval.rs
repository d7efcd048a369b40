//! Static evaluation.

use crate::{board::Position, movegen::has_legal_move, tables::MoveTables, types::*};

/// Magnitude of a checkmate at the root. Deeper mates are divided down by
/// their distance so that faster mates always compare higher.
pub const CHECKMATE: f64 = 1.0e15;

/// Material values in centipawns, indexed by PieceKind::idx().
/// Order: Pawn, Knight, Bishop, Rook, Queen, King
const PIECE_VALUES: [i32; 6] = [100, 320, 330, 500, 900, 0];

/// Returns the material value of a piece in centipawns.
#[inline]
pub fn piece_value(kind: PieceKind) -> i32 {
    PIECE_VALUES[kind.idx()]
}

/// Material balance in centipawns from `side`'s perspective.
pub fn material(pos: &Position, side: Color) -> i32 {
    let mut score = 0i32;
    for sq in pos.occupied() {
        if let Some(pc) = pos.piece_at(sq) {
            let v = piece_value(pc.kind);
            score += if pc.color == side { v } else { -v };
        }
    }
    score
}

/// Evaluates the position for `side`, which must be the side to move.
///
/// `ply_depth` is the distance from the search root. A mated side scores
/// `-CHECKMATE / (ply_depth + 1)`, stalemate scores 0, anything else is the
/// material balance.
pub fn evaluate(pos: &mut Position, tables: &MoveTables, side: Color, ply_depth: u32) -> f64 {
    debug_assert_eq!(side, pos.side_to_move, "evaluating for the side not on move");
    if !has_legal_move(pos, tables) {
        return if pos.in_check(tables, side) {
            -CHECKMATE / (ply_depth as f64 + 1.0)
        } else {
            0.0
        };
    }
    material(pos, side) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startpos_is_balanced() {
        let tables = MoveTables::generate();
        let mut pos = Position::startpos();
        assert_eq!(evaluate(&mut pos, &tables, Color::White, 0), 0.0);
    }

    #[test]
    fn test_material_is_antisymmetric() {
        let pos = Position::from_fen("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1").unwrap();
        assert_eq!(material(&pos, Color::White), -400);
        assert_eq!(material(&pos, Color::Black), 400);
    }

    #[test]
    fn test_mate_score_shrinks_with_distance() {
        let tables = MoveTables::generate();
        let mut mated =
            Position::from_fen("r1bqkbnr/pppp1Qpp/2n5/4p3/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 0 1")
                .unwrap();
        let near = evaluate(&mut mated, &tables, Color::Black, 1);
        let far = evaluate(&mut mated, &tables, Color::Black, 3);
        assert_eq!(near, -CHECKMATE / 2.0);
        assert!(near < far && far < 0.0);
    }

    #[test]
    fn test_stalemate_scores_zero() {
        let tables = MoveTables::generate();
        let mut pos = Position::from_fen("k7/8/1Q6/8/8/8/8/1K6 b - - 0 1").unwrap();
        assert_eq!(evaluate(&mut pos, &tables, Color::Black, 2), 0.0);
    }
}
