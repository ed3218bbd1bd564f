//! Property tests over random game walks.

use proptest::prelude::*;

use basalt::{GenMode, MoveList, Position};

/// Play out a walk, picking each move by index from the legal list.
fn walk(choices: &[usize]) -> Position {
    let mut pos = Position::startpos();
    for &choice in choices {
        let legal = pos.legal_moves();
        if legal.is_empty() {
            break;
        }
        let mv = legal[choice % legal.len()];
        assert!(pos.make_move(mv));
    }
    pos
}

proptest! {
    /// The incrementally maintained hash always equals the recomputation
    /// from scratch.
    #[test]
    fn hash_matches_recomputation(choices in prop::collection::vec(0usize..218, 0..60)) {
        let pos = walk(&choices);
        prop_assert_eq!(pos.hash(), pos.compute_hash());
    }

    /// Any reachable position survives a FEN round trip exactly.
    #[test]
    fn fen_roundtrip(choices in prop::collection::vec(0usize..218, 0..40)) {
        let pos = walk(&choices);
        let reparsed = Position::from_fen(&pos.to_fen()).unwrap();
        prop_assert_eq!(reparsed.hash(), pos.hash());
        prop_assert_eq!(reparsed.to_fen(), pos.to_fen());
    }

    /// Pseudo-legal generation in tactical mode is a subset of the full
    /// generation, holding only tactical moves.
    #[test]
    fn tactical_subset(choices in prop::collection::vec(0usize..218, 0..40)) {
        let pos = walk(&choices);
        let mut all = MoveList::new();
        pos.generate_moves(&mut all, GenMode::All);
        let mut tactical = MoveList::new();
        pos.generate_moves(&mut tactical, GenMode::TacticalOnly);
        for &mv in &tactical {
            prop_assert!(mv.is_tactical());
            prop_assert!(all.iter().any(|&m| m == mv), "{mv} missing from full list");
        }
    }

    /// The SEE sign agrees with the win/lose classification on every
    /// generated capture.
    #[test]
    fn see_sign_consistent(choices in prop::collection::vec(0usize..218, 0..40)) {
        let pos = walk(&choices);
        let mut tactical = MoveList::new();
        pos.generate_moves(&mut tactical, GenMode::TacticalOnly);
        for &mv in &tactical {
            let score = pos.static_exchange_eval(mv);
            prop_assert_eq!(pos.see_non_negative(mv), score >= 0);
        }
    }

    /// Making any legal move preserves the board invariants: one king
    /// each, disjoint occupancy, and material bounds.
    #[test]
    fn make_move_preserves_structure(choices in prop::collection::vec(0usize..218, 0..60)) {
        let pos = walk(&choices);
        for color in [basalt::Color::White, basalt::Color::Black] {
            let side = pos.side(color);
            prop_assert_eq!(side.pieces(basalt::Piece::King).count(), 1);
            prop_assert!(side.occupancy().count() <= 16);
            prop_assert!(side.pieces(basalt::Piece::Pawn).count() <= 8);
        }
        let white = pos.side(basalt::Color::White).occupancy();
        let black = pos.side(basalt::Color::Black).occupancy();
        prop_assert!((white & black).is_empty());
    }
}
