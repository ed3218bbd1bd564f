//! Static exchange evaluation.
//!
//! Plays out the capture sequence on a single square, each side always
//! recapturing with its least valuable attacker, and returns the net
//! material balance for the side making the first move. Sliders hidden
//! behind the current attacker are revealed as pieces come off the board.

use super::attack_tables::{bishop_attacks, rook_attacks};
use super::position::Position;
use super::types::{Bitboard, Color, Move, Piece, ALL_PIECES};

/// Piece values used only for exchange evaluation.
const SEE_VALUES: [i32; 6] = [
    100,   // pawn
    320,   // knight
    330,   // bishop
    500,   // rook
    900,   // queen
    20000, // king
];

/// Value of a piece in exchange terms.
#[inline]
#[must_use]
pub fn see_value(piece: Piece) -> i32 {
    SEE_VALUES[piece.index()]
}

impl Position {
    /// Net material balance of the exchange started by `mv`, in
    /// centipawns from the mover's perspective. A quiet move to a safe
    /// square scores 0; a quiet move to an attacked square scores the
    /// loss of the moved piece.
    #[must_use]
    pub fn static_exchange_eval(&self, mv: Move) -> i32 {
        const MAX_EXCHANGES: usize = 32;

        let us = self.side_to_move();
        let them = us.opponent();
        let to = mv.to();

        let mut occupancy = self.occupancy();
        let first_victim = if mv.is_en_passant() {
            let victim_sq = to.forward(them).expect("ep target inside board");
            occupancy.clear(victim_sq);
            Some(Piece::Pawn)
        } else {
            self.side(them).piece_at(to)
        };

        let mut gain = [0i32; MAX_EXCHANGES];
        gain[0] = first_victim.map_or(0, see_value);

        // The moving piece leaves its square; conceptually it now stands
        // on `to` and is the next capture target.
        occupancy.clear(mv.from());
        let mut target_piece = mv.piece();
        let mut side = them;
        let mut depth = 0;

        let mut attackers = (self.attackers_of_with_occupancy(to, Color::White, occupancy)
            | self.attackers_of_with_occupancy(to, Color::Black, occupancy))
            & occupancy;

        loop {
            // Re-scan sliders: removing an attacker may reveal an x-ray.
            let diagonal = self.sliders(Piece::Bishop);
            let straight = self.sliders(Piece::Rook);
            attackers |= bishop_attacks(to, occupancy) & diagonal;
            attackers |= rook_attacks(to, occupancy) & straight;
            attackers &= occupancy;

            let side_attackers = attackers & self.side(side).occupancy();
            if side_attackers.is_empty() {
                break;
            }

            let (lva_piece, lva_sq) = self
                .least_valuable_attacker(side_attackers, side)
                .expect("nonempty attacker set");

            // The king may only recapture if nothing can answer.
            if lva_piece == Piece::King
                && !(attackers & self.side(side.opponent()).occupancy()).is_empty()
            {
                break;
            }

            depth += 1;
            if depth >= MAX_EXCHANGES {
                break;
            }
            gain[depth] = see_value(target_piece) - gain[depth - 1];

            // Neither continuing nor standing pat can recover: stop.
            if (-gain[depth - 1]).max(gain[depth]) < 0 {
                break;
            }

            occupancy.clear(lva_sq);
            attackers.clear(lva_sq);
            target_piece = lva_piece;
            side = side.opponent();
        }

        // Propagate the option to stop capturing back to the root.
        while depth > 0 {
            depth -= 1;
            gain[depth] = -((-gain[depth]).max(gain[depth + 1]));
        }
        gain[0]
    }

    /// True iff the exchange started by `mv` wins non-negative material.
    #[inline]
    #[must_use]
    pub fn see_non_negative(&self, mv: Move) -> bool {
        self.static_exchange_eval(mv) >= 0
    }

    /// Both sides' bishops-or-queens (`kind == Bishop`) or
    /// rooks-or-queens (`kind == Rook`).
    fn sliders(&self, kind: Piece) -> Bitboard {
        self.pieces(Color::White, kind)
            | self.pieces(Color::Black, kind)
            | self.pieces(Color::White, Piece::Queen)
            | self.pieces(Color::Black, Piece::Queen)
    }

    fn least_valuable_attacker(
        &self,
        attackers: Bitboard,
        side: Color,
    ) -> Option<(Piece, super::types::Square)> {
        for piece in ALL_PIECES {
            let candidates = attackers & self.pieces(side, piece);
            if let Some(sq) = candidates.first() {
                return Some((piece, sq));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn see(fen: &str, mv: &str) -> i32 {
        let pos = Position::from_fen(fen).unwrap();
        let mv = pos.parse_move(mv).unwrap();
        pos.static_exchange_eval(mv)
    }

    #[test]
    fn quiet_move_to_safe_square() {
        let pos = Position::from_fen("7k/8/1p6/8/8/1Q6/8/7K w - - 0 1").unwrap();
        let mv = pos.parse_move("b3b4").unwrap();
        assert_eq!(pos.static_exchange_eval(mv), 0);
        assert!(pos.see_non_negative(mv));
    }

    #[test]
    fn hanging_pawn_wins_a_pawn() {
        assert_eq!(see("7k/8/1p6/8/8/1Q6/8/7K w - - 0 1", "b3b6"), 100);
    }

    #[test]
    fn defended_pawn_loses_the_queen() {
        let value = see("7k/p7/1p6/8/8/1Q6/8/7K w - - 0 1", "b3b6");
        assert_eq!(value, 100 - 900);
        let pos = Position::from_fen("7k/p7/1p6/8/8/1Q6/8/7K w - - 0 1").unwrap();
        let mv = pos.parse_move("b3b6").unwrap();
        assert!(!pos.see_non_negative(mv));
    }

    #[test]
    fn queen_trade_is_even() {
        // Qxb6 axb6 is an even queen trade: the defender recaptures and
        // the ledger closes at zero.
        assert_eq!(see("7k/p7/1q6/8/8/1Q6/8/7K w - - 0 1", "b3b6"), 0);
    }

    #[test]
    fn rook_and_bishop_vs_knights() {
        // Rxb6 Nxb6 Bxb6: rook for knight, then the bishop wins the
        // second knight: 320 - 500 + 320 = +140.
        assert_eq!(see("7k/3n4/1n6/8/8/1R2B3/8/7K w - - 0 1", "b3b6"), 140);
    }

    #[test]
    fn xray_recapture_counts() {
        // Doubled rooks against a single defender: Rxd5 Rxd5 Rxd5 nets
        // the pawn, with the back rook revealed by the front one leaving.
        assert_eq!(see("3r3k/8/8/3p4/8/8/3R4/3R3K w - - 0 1", "d2d5"), 100);
    }

    #[test]
    fn en_passant_exchange() {
        let pos = Position::from_fen(
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
        )
        .unwrap();
        let mv = pos.parse_move("e5f6").unwrap();
        // exf6 gxf6: pawn for pawn.
        assert_eq!(pos.static_exchange_eval(mv), 0);
    }

    #[test]
    fn sign_law_matches_boolean() {
        for (fen, mv) in [
            ("7k/8/1p6/8/8/1Q6/8/7K w - - 0 1", "b3b6"),
            ("7k/p7/1p6/8/8/1Q6/8/7K w - - 0 1", "b3b6"),
            ("7k/p7/1q6/8/8/1Q6/8/7K w - - 0 1", "b3b6"),
        ] {
            let pos = Position::from_fen(fen).unwrap();
            let mv = pos.parse_move(mv).unwrap();
            assert_eq!(
                pos.see_non_negative(mv),
                pos.static_exchange_eval(mv) >= 0
            );
        }
    }
}
