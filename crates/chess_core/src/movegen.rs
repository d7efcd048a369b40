use crate::{bitboard::Bitboard, board::Position, tables::MoveTables, types::*};

/// Generate all legal moves, returning a freshly allocated vector.
pub fn legal_moves(pos: &Position, tables: &MoveTables) -> Vec<Move> {
    let mut tmp = pos.clone();
    let mut out = Vec::with_capacity(64);
    legal_moves_into(&mut tmp, tables, &mut out);
    out
}

/// Generate all legal moves for the side to move into `out`, reusing the
/// buffer. The position is restored before returning.
pub fn legal_moves_into(pos: &mut Position, tables: &MoveTables, out: &mut Vec<Move>) {
    out.clear();
    pseudo_moves(pos, tables, out);

    let mover = pos.side_to_move;
    out.retain(|&mv| is_legal_after(pos, tables, mover, mv));
}

/// True when the side to move has at least one legal move.
pub fn has_legal_move(pos: &mut Position, tables: &MoveTables) -> bool {
    let mut pseudo = Vec::with_capacity(64);
    pseudo_moves(pos, tables, &mut pseudo);

    let mover = pos.side_to_move;
    pseudo
        .into_iter()
        .any(|mv| is_legal_after(pos, tables, mover, mv))
}

fn is_legal_after(pos: &mut Position, tables: &MoveTables, mover: Color, mv: Move) -> bool {
    let undo = pos.make_move(mv);
    let legal = !pos.in_check(tables, mover);
    pos.unmake_move(mv, undo);
    legal
}

fn pseudo_moves(pos: &Position, tables: &MoveTables, out: &mut Vec<Move>) {
    let us = pos.side_to_move;
    let own = pos.pieces_of(us);
    let occupied = pos.occupied();

    for from in own {
        let Some(pc) = pos.piece_at(from) else {
            continue;
        };
        let targets = match pc.kind {
            PieceKind::Pawn => {
                gen_pawn(pos, tables, from, us, out);
                continue;
            }
            PieceKind::Knight => tables.knight_attacks(from),
            PieceKind::Bishop => tables.bishop_attacks(from, occupied),
            PieceKind::Rook => tables.rook_attacks(from, occupied),
            PieceKind::Queen => tables.queen_attacks(from, occupied),
            PieceKind::King => {
                gen_castle(pos, tables, from, us, out);
                tables.king_attacks(from)
            }
        };
        push_targets(from, targets & !own, out);
    }
}

fn push_targets(from: u8, targets: Bitboard, out: &mut Vec<Move>) {
    out.extend(targets.map(|to| Move::new(from, to)));
}

fn push_pawn_move(from: u8, to: u8, promo_rank: i8, out: &mut Vec<Move>) {
    if rank_of(to) == promo_rank {
        out.extend(
            PieceKind::PROMOTIONS
                .iter()
                .map(|&kind| Move::promoting(from, to, kind)),
        );
    } else {
        out.push(Move::new(from, to));
    }
}

fn gen_pawn(pos: &Position, tables: &MoveTables, from: u8, c: Color, out: &mut Vec<Move>) {
    let f = file_of(from);
    let r = rank_of(from);
    let (dir, start_rank, promo_rank): (i8, i8, i8) = match c {
        Color::White => (1, 1, 7),
        Color::Black => (-1, 6, 0),
    };

    if let Some(to) = sq(f, r + dir) {
        if pos.piece_at(to).is_none() {
            push_pawn_move(from, to, promo_rank, out);

            if r == start_rank {
                if let Some(to2) = sq(f, r + 2 * dir) {
                    if pos.piece_at(to2).is_none() {
                        out.push(Move::new(from, to2));
                    }
                }
            }
        }
    }

    let attacks = tables.pawn_attacks(c, from);
    for to in attacks & pos.pieces_of(c.other()) {
        push_pawn_move(from, to, promo_rank, out);
    }
    if let Some(ep) = pos.en_passant {
        if attacks.contains(ep) {
            let mut mv = Move::new(from, ep);
            mv.is_en_passant = true;
            out.push(mv);
        }
    }
}

fn gen_castle(pos: &Position, tables: &MoveTables, from: u8, c: Color, out: &mut Vec<Move>) {
    // (king_from, right, squares that must be empty, squares that must be safe, king_to)
    let options: [(u8, bool, &[u8], &[u8], u8); 2] = match c {
        Color::White => [
            (4, pos.castling.wk, &[5, 6][..], &[5, 6][..], 6),
            (4, pos.castling.wq, &[1, 2, 3][..], &[2, 3][..], 2),
        ],
        Color::Black => [
            (60, pos.castling.bk, &[61, 62][..], &[61, 62][..], 62),
            (60, pos.castling.bq, &[57, 58, 59][..], &[58, 59][..], 58),
        ],
    };

    // Can't castle out of, through, or into check.
    if from != options[0].0 || pos.in_check(tables, c) {
        return;
    }
    let enemy = c.other();
    for (_, right, empty, safe, to) in options {
        if right
            && empty.iter().all(|&s| pos.piece_at(s).is_none())
            && safe
                .iter()
                .all(|&s| !pos.is_square_attacked(tables, s, enemy))
        {
            let mut mv = Move::new(from, to);
            mv.is_castle = true;
            out.push(mv);
        }
    }
}

#[cfg(test)]
#[path = "movegen_tests.rs"]
mod movegen_tests;
