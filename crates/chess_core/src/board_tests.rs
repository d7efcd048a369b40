use super::*;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -";

#[test]
fn test_fen_startpos_matches_startpos() {
    let parsed =
        Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
    assert_eq!(parsed, Position::startpos());
}

#[test]
fn test_fen_rejects_malformed_input() {
    assert_eq!(
        Position::from_fen("8/8/8 w"),
        Err(FenError::MissingFields(2))
    );
    assert_eq!(
        Position::from_fen("8/8/8/8/8/8/8/7X w - -"),
        Err(FenError::Piece('X'))
    );
    assert!(matches!(
        Position::from_fen("8/8/8/8/8/8/8/9 w - -"),
        Err(FenError::Board(_))
    ));
    assert_eq!(
        Position::from_fen("8/8/8/8/8/8/8/8 x - -"),
        Err(FenError::SideToMove("x".to_string()))
    );
    assert_eq!(
        Position::from_fen("8/8/8/8/8/8/8/8 w - z9"),
        Err(FenError::EnPassant("z9".to_string()))
    );
}

#[test]
fn test_apply_and_undo_restore_position() {
    let tables = MoveTables::generate();
    let original = Position::from_fen(KIWIPETE).unwrap();
    let mut pos = original.clone();

    let moves = crate::legal_moves(&pos, &tables);
    for mv in moves {
        pos.apply_move(mv);
        assert_eq!(pos.last_move(), Some(mv));
        assert_eq!(pos.undo_move(), Some(mv));
        assert_eq!(pos, original, "undo of {mv:?} did not restore the position");
    }
}

#[test]
fn test_undo_on_empty_history_is_noop() {
    let mut pos = Position::startpos();
    assert_eq!(pos.undo_move(), None);
    assert_eq!(pos, Position::startpos());
}

#[test]
fn test_castling_moves_rook_and_clears_rights() {
    let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let mut castle = Move::new(4, 6);
    castle.is_castle = true;
    pos.apply_move(castle);

    assert_eq!(pos.piece_at(6).map(|p| p.kind), Some(PieceKind::King));
    assert_eq!(pos.piece_at(5).map(|p| p.kind), Some(PieceKind::Rook));
    assert!(pos.piece_at(7).is_none());
    assert!(!pos.castling.wk && !pos.castling.wq);
    assert!(pos.castling.bk && pos.castling.bq);
}

#[test]
fn test_en_passant_capture_and_undo() {
    let mut pos = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
    let before = pos.clone();
    let mut ep = Move::new(36, 43); // e5xd6
    ep.is_en_passant = true;
    pos.apply_move(ep);
    assert!(pos.piece_at(35).is_none(), "captured pawn on d5 must be removed");
    pos.undo_move();
    assert_eq!(pos, before);
}

#[test]
fn test_mirrored_swaps_colors_and_ranks() {
    let pos = Position::from_fen("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1").unwrap();
    let m = pos.mirrored();
    assert_eq!(m.side_to_move, Color::Black);
    assert_eq!(m.piece_at(52), Some(Piece::new(Color::Black, PieceKind::Pawn))); // e7
    assert_eq!(m.king_sq(Color::Black), Some(60));
    assert_eq!(m.king_sq(Color::White), Some(4));
    assert_eq!(m.mirrored(), pos);
}

#[test]
fn test_in_check_detection() {
    let tables = MoveTables::generate();
    let pos = Position::from_fen("4k3/8/8/8/8/8/8/4R1K1 b - - 0 1").unwrap();
    assert!(pos.in_check(&tables, Color::Black));
    assert!(!pos.in_check(&tables, Color::White));
}
