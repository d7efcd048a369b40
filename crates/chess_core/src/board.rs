use thiserror::Error;

use crate::bitboard::Bitboard;
use crate::tables::MoveTables;
use crate::types::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CastlingRights {
    pub wk: bool,
    pub wq: bool,
    pub bk: bool,
    pub bq: bool,
}

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights {
        wk: false,
        wq: false,
        bk: false,
        bq: false,
    };
}

/// Reasons a FEN string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("expected at least 4 FEN fields, found {0}")]
    MissingFields(usize),
    #[error("invalid board section: {0}")]
    Board(String),
    #[error("invalid piece character '{0}'")]
    Piece(char),
    #[error("invalid side to move '{0}'")]
    SideToMove(String),
    #[error("invalid castling character '{0}'")]
    Castling(char),
    #[error("invalid en-passant square '{0}'")]
    EnPassant(String),
    #[error("invalid move counter '{0}'")]
    Counter(String),
}

/// Mailbox position plus the history of moves applied to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub board: [Option<Piece>; 64],
    pub side_to_move: Color,
    pub castling: CastlingRights,
    pub en_passant: Option<u8>, // square behind a pawn that just advanced 2
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
    occupancy: [Bitboard; 2],
    history: Vec<Move>,
    undo_stack: Vec<Undo>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Undo {
    pub captured: Option<Piece>,
    pub castling: CastlingRights,
    pub en_passant: Option<u8>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
    pub moved_piece: Piece,
    pub rook_move: Option<(u8, u8)>, // (rook_from, rook_to) for castling
    pub ep_captured_sq: Option<u8>,  // square actually captured in en-passant
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl Position {
    fn empty(side_to_move: Color, castling: CastlingRights) -> Self {
        Position {
            board: [None; 64],
            side_to_move,
            castling,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            occupancy: [Bitboard::EMPTY; 2],
            history: Vec::new(),
            undo_stack: Vec::new(),
        }
    }

    pub fn startpos() -> Self {
        let mut p = Position::empty(
            Color::White,
            CastlingRights {
                wk: true,
                wq: true,
                bk: true,
                bq: true,
            },
        );

        let back = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        for (f, &kind) in back.iter().enumerate() {
            let f = f as u8;
            p.set_piece(f, Some(Piece::new(Color::White, kind)));
            p.set_piece(8 + f, Some(Piece::new(Color::White, PieceKind::Pawn)));
            p.set_piece(48 + f, Some(Piece::new(Color::Black, PieceKind::Pawn)));
            p.set_piece(56 + f, Some(Piece::new(Color::Black, kind)));
        }
        p
    }

    /// Parses Forsyth-Edwards Notation. The move counters are optional.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(FenError::MissingFields(parts.len()));
        }

        let side_to_move = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::SideToMove(other.to_string())),
        };

        let mut castling = CastlingRights::NONE;
        if parts[2] != "-" {
            for c in parts[2].chars() {
                match c {
                    'K' => castling.wk = true,
                    'Q' => castling.wq = true,
                    'k' => castling.bk = true,
                    'q' => castling.bq = true,
                    _ => return Err(FenError::Castling(c)),
                }
            }
        }

        let mut pos = Position::empty(side_to_move, castling);

        let ranks: Vec<&str> = parts[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::Board(format!("expected 8 ranks, found {}", ranks.len())));
        }
        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_idx as i8; // FEN lists rank 8 .. 1
            let mut file: i8 = 0;
            for ch in rank_str.chars() {
                if let Some(d) = ch.to_digit(10) {
                    file += d as i8;
                } else {
                    let color = if ch.is_ascii_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    let kind = match ch.to_ascii_lowercase() {
                        'p' => PieceKind::Pawn,
                        'n' => PieceKind::Knight,
                        'b' => PieceKind::Bishop,
                        'r' => PieceKind::Rook,
                        'q' => PieceKind::Queen,
                        'k' => PieceKind::King,
                        _ => return Err(FenError::Piece(ch)),
                    };
                    let square = sq(file, rank)
                        .ok_or_else(|| FenError::Board(format!("rank '{rank_str}' overflows")))?;
                    pos.set_piece(square, Some(Piece::new(color, kind)));
                    file += 1;
                }
            }
            if file != 8 {
                return Err(FenError::Board(format!("rank '{rank_str}' has {file} files")));
            }
        }

        pos.en_passant = match parts[3] {
            "-" => None,
            ep => Some(coord_to_sq(ep).ok_or_else(|| FenError::EnPassant(ep.to_string()))?),
        };

        let counter = |idx: usize, default: u32| -> Result<u32, FenError> {
            match parts.get(idx) {
                Some(txt) => txt.parse().map_err(|_| FenError::Counter(txt.to_string())),
                None => Ok(default),
            }
        };
        pos.halfmove_clock = counter(4, 0)?;
        pos.fullmove_number = counter(5, 1)?;

        Ok(pos)
    }

    /// The same position seen from the other side: ranks flipped, colours
    /// swapped. History is not carried over.
    pub fn mirrored(&self) -> Self {
        let mut m = Position::empty(
            self.side_to_move.other(),
            CastlingRights {
                wk: self.castling.bk,
                wq: self.castling.bq,
                bk: self.castling.wk,
                bq: self.castling.wq,
            },
        );
        for s in 0..64u8 {
            if let Some(pc) = self.piece_at(s) {
                m.set_piece(flip_rank(s), Some(Piece::new(pc.color.other(), pc.kind)));
            }
        }
        m.en_passant = self.en_passant.map(flip_rank);
        m.halfmove_clock = self.halfmove_clock;
        m.fullmove_number = self.fullmove_number;
        m
    }

    /// Moves applied through [`Position::apply_move`], oldest first.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn last_move(&self) -> Option<Move> {
        self.history.last().copied()
    }

    pub fn apply_move(&mut self, mv: Move) {
        let undo = self.make_move(mv);
        self.history.push(mv);
        self.undo_stack.push(undo);
    }

    /// Takes back the most recent move; `None` when there is nothing to undo.
    pub fn undo_move(&mut self) -> Option<Move> {
        let mv = self.history.pop()?;
        let undo = self.undo_stack.pop()?;
        self.unmake_move(mv, undo);
        Some(mv)
    }

    pub fn king_sq(&self, c: Color) -> Option<u8> {
        let mut own = self.occupancy[c.idx()];
        own.find(|&s| self.board[s as usize] == Some(Piece::new(c, PieceKind::King)))
    }

    #[inline]
    pub fn piece_at(&self, sq: u8) -> Option<Piece> {
        self.board[sq as usize]
    }

    pub fn set_piece(&mut self, sq: u8, pc: Option<Piece>) {
        if let Some(old) = self.board[sq as usize] {
            self.occupancy[old.color.idx()].clear(sq);
        }
        if let Some(new) = pc {
            self.occupancy[new.color.idx()].set(sq);
        }
        self.board[sq as usize] = pc;
    }

    #[inline]
    pub fn pieces_of(&self, c: Color) -> Bitboard {
        self.occupancy[c.idx()]
    }

    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.occupancy[0] | self.occupancy[1]
    }

    pub fn in_check(&self, tables: &MoveTables, c: Color) -> bool {
        match self.king_sq(c) {
            Some(ksq) => self.is_square_attacked(tables, ksq, c.other()),
            None => false,
        }
    }

    pub fn is_square_attacked(&self, tables: &MoveTables, target: u8, by: Color) -> bool {
        let attackers = self.pieces_of(by);
        let occupied = self.occupied();
        let any = |set: Bitboard, kinds: &[PieceKind]| {
            (set & attackers).any(|s| {
                self.board[s as usize].is_some_and(|pc| kinds.contains(&pc.kind))
            })
        };

        // A pawn of `by` attacks `target` iff a pawn of the other colour on
        // `target` would attack the pawn's square.
        any(tables.pawn_attacks(by.other(), target), &[PieceKind::Pawn])
            || any(tables.knight_attacks(target), &[PieceKind::Knight])
            || any(tables.king_attacks(target), &[PieceKind::King])
            || any(
                tables.bishop_attacks(target, occupied),
                &[PieceKind::Bishop, PieceKind::Queen],
            )
            || any(
                tables.rook_attacks(target, occupied),
                &[PieceKind::Rook, PieceKind::Queen],
            )
    }

    /// Plays `mv` without recording it in the history. Pair with
    /// [`Position::unmake_move`].
    pub fn make_move(&mut self, mv: Move) -> Undo {
        let from = mv.from;
        let to = mv.to;
        let moved = self.piece_at(from).expect("no piece on from-square");
        let mut captured = self.piece_at(to);
        let undo_castling = self.castling.clone();
        let prev_ep = self.en_passant;
        let prev_hmc = self.halfmove_clock;
        let prev_fmn = self.fullmove_number;

        self.en_passant = None;
        let mut reset_hmc = moved.kind == PieceKind::Pawn || captured.is_some();

        let mut ep_captured_sq = None;
        if mv.is_en_passant {
            let behind = match moved.color {
                Color::White => -1,
                Color::Black => 1,
            };
            if let Some(cs) = sq(file_of(to), rank_of(to) + behind) {
                captured = self.piece_at(cs);
                self.set_piece(cs, None);
                ep_captured_sq = Some(cs);
                reset_hmc = true;
            }
        }

        self.set_piece(from, None);
        self.set_piece(to, Some(moved));

        if moved.kind == PieceKind::Pawn && is_last_rank(moved.color, to) {
            let promo = mv.promo.unwrap_or(PieceKind::Queen);
            self.set_piece(to, Some(Piece::new(moved.color, promo)));
        }

        let mut rook_move = None;
        if mv.is_castle && moved.kind == PieceKind::King {
            // e1->g1 rook h1->f1, e1->c1 rook a1->d1 (and the same on rank 8)
            let castle_rook = match (moved.color, from, to) {
                (Color::White, 4, 6) => Some((7, 5)),
                (Color::White, 4, 2) => Some((0, 3)),
                (Color::Black, 60, 62) => Some((63, 61)),
                (Color::Black, 60, 58) => Some((56, 59)),
                _ => None,
            };
            if let Some((rf, rt)) = castle_rook {
                let rook = self.piece_at(rf);
                self.set_piece(rf, None);
                self.set_piece(rt, rook);
                rook_move = Some((rf, rt));
            }
        }

        self.revoke_castling(moved, from);
        if let Some(cp) = captured {
            if cp.kind == PieceKind::Rook {
                self.revoke_castling(cp, to);
            }
        }

        // Double pawn push sets the square passed over as en-passant target
        if moved.kind == PieceKind::Pawn && (rank_of(from) - rank_of(to)).abs() == 2 {
            self.en_passant = sq(file_of(from), (rank_of(from) + rank_of(to)) / 2);
        }

        self.halfmove_clock = if reset_hmc {
            0
        } else {
            self.halfmove_clock + 1
        };
        if self.side_to_move == Color::Black {
            self.fullmove_number += 1;
        }
        self.side_to_move = self.side_to_move.other();

        Undo {
            captured,
            castling: undo_castling,
            en_passant: prev_ep,
            halfmove_clock: prev_hmc,
            fullmove_number: prev_fmn,
            moved_piece: moved,
            rook_move,
            ep_captured_sq,
        }
    }

    pub fn unmake_move(&mut self, mv: Move, undo: Undo) {
        self.side_to_move = self.side_to_move.other();
        self.castling = undo.castling;
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;
        self.fullmove_number = undo.fullmove_number;

        if let Some((rf, rt)) = undo.rook_move {
            let rook = self.piece_at(rt);
            self.set_piece(rt, None);
            self.set_piece(rf, rook);
        }

        // The moved piece goes back as it was, which also reverts promotions
        self.set_piece(mv.to, None);
        self.set_piece(mv.from, Some(undo.moved_piece));

        match undo.ep_captured_sq {
            Some(cs) => self.set_piece(cs, undo.captured),
            None => self.set_piece(mv.to, undo.captured),
        }
    }

    /// Clears castling rights tied to a king or rook leaving (or being
    /// captured on) `square`.
    fn revoke_castling(&mut self, piece: Piece, square: u8) {
        match (piece.color, piece.kind, square) {
            (Color::White, PieceKind::King, _) => {
                self.castling.wk = false;
                self.castling.wq = false;
            }
            (Color::Black, PieceKind::King, _) => {
                self.castling.bk = false;
                self.castling.bq = false;
            }
            (Color::White, PieceKind::Rook, 0) => self.castling.wq = false,
            (Color::White, PieceKind::Rook, 7) => self.castling.wk = false,
            (Color::Black, PieceKind::Rook, 56) => self.castling.bq = false,
            (Color::Black, PieceKind::Rook, 63) => self.castling.bk = false,
            _ => {}
        }
    }
}

fn is_last_rank(color: Color, sq: u8) -> bool {
    match color {
        Color::White => rank_of(sq) == 7,
        Color::Black => rank_of(sq) == 0,
    }
}

#[cfg(test)]
#[path = "board_tests.rs"]
mod board_tests;
