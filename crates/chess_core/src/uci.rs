use std::fmt;

use crate::{board::Position, movegen::legal_moves, tables::MoveTables, types::*};

pub fn move_to_uci(mv: Move) -> String {
    let mut s = String::with_capacity(5);
    s.push_str(&sq_to_coord(mv.from));
    s.push_str(&sq_to_coord(mv.to));
    if let Some(p) = mv.promo {
        s.push(match p {
            PieceKind::Rook => 'r',
            PieceKind::Bishop => 'b',
            PieceKind::Knight => 'n',
            _ => 'q',
        });
    }
    s
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&move_to_uci(*self))
    }
}

/// Resolves long algebraic notation against the legal moves of `pos`, so
/// castling and en-passant flags come out right. `None` if illegal.
pub fn parse_uci_move(pos: &Position, tables: &MoveTables, txt: &str) -> Option<Move> {
    let txt = txt.trim();
    if txt.len() < 4 || !txt.is_ascii() {
        return None;
    }
    let from = coord_to_sq(&txt[0..2])?;
    let to = coord_to_sq(&txt[2..4])?;
    let promo = match txt.as_bytes().get(4).map(u8::to_ascii_lowercase) {
        None => None,
        Some(b'q') => Some(PieceKind::Queen),
        Some(b'r') => Some(PieceKind::Rook),
        Some(b'b') => Some(PieceKind::Bishop),
        Some(b'n') => Some(PieceKind::Knight),
        Some(_) => return None,
    };

    legal_moves(pos, tables)
        .into_iter()
        .find(|m| m.from == from && m.to == to && m.promo == promo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_with_flags() {
        let tables = MoveTables::generate();
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let castle = parse_uci_move(&pos, &tables, "e1g1").unwrap();
        assert!(castle.is_castle);
        assert_eq!(castle.to_string(), "e1g1");
    }

    #[test]
    fn test_promotion_suffix_is_required_and_matched() {
        let tables = MoveTables::generate();
        let pos = Position::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        assert_eq!(parse_uci_move(&pos, &tables, "a7a8"), None);
        let mv = parse_uci_move(&pos, &tables, "a7a8n").unwrap();
        assert_eq!(mv.promo, Some(PieceKind::Knight));
    }

    #[test]
    fn test_illegal_move_is_rejected() {
        let tables = MoveTables::generate();
        assert_eq!(parse_uci_move(&Position::startpos(), &tables, "e2e5"), None);
        assert_eq!(parse_uci_move(&Position::startpos(), &tables, "zz"), None);
    }
}
