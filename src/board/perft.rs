//! Perft: exhaustive legal move counting, for move generator validation.

use super::movegen::GenMode;
use super::position::Position;
use super::types::{Move, MoveList};

impl Position {
    /// Number of strictly legal move sequences of length `depth`.
    #[must_use]
    pub fn perft(&self, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }
        let mut moves = MoveList::new();
        self.generate_moves(&mut moves, GenMode::All);
        let mut nodes = 0;
        for &mv in &moves {
            let mut child = *self;
            if !child.make_move(mv) {
                continue;
            }
            nodes += if depth == 1 { 1 } else { child.perft(depth - 1) };
        }
        nodes
    }

    /// Perft split by root move, for debugging generator discrepancies.
    #[must_use]
    pub fn perft_divide(&self, depth: u32) -> Vec<(Move, u64)> {
        let mut results = Vec::new();
        if depth == 0 {
            return results;
        }
        let mut moves = MoveList::new();
        self.generate_moves(&mut moves, GenMode::All);
        for &mv in &moves {
            let mut child = *self;
            if !child.make_move(mv) {
                continue;
            }
            results.push((mv, child.perft(depth - 1)));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_shallow() {
        let pos = Position::startpos();
        assert_eq!(pos.perft(1), 20);
        assert_eq!(pos.perft(2), 400);
        assert_eq!(pos.perft(3), 8902);
    }

    #[test]
    fn divide_sums_to_perft() {
        let pos = Position::startpos();
        let total: u64 = pos.perft_divide(3).iter().map(|(_, n)| n).sum();
        assert_eq!(total, pos.perft(3));
    }

    #[test]
    fn en_passant_pin_edge_case() {
        // The classic discovered-check-through-ep trap: exd6 would expose
        // the king to the rook on the fifth rank.
        let pos =
            Position::from_fen("8/8/8/KPp4r/8/8/6k1/8 w - c6 0 1").unwrap();
        let ep = pos
            .legal_moves()
            .iter()
            .any(|m| m.is_en_passant());
        assert!(!ep);
    }
}
