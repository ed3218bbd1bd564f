//! Position evaluation.
//!
//! The static score of a position, from the side to move's perspective:
//! material-signature endgame rules answer first, then the NNUE network
//! (or a coarse material count when no network is loaded), followed by
//! game-phase scaling and saturation of extreme values.

pub mod endgame;
pub mod nnue;

use std::sync::Arc;

use crate::board::{see_value, Color, Piece, Position};

use nnue::{Network, NnueState};

/// Checkmate score magnitude; mate-in-N is `MATE_SCORE - N` plies.
pub const MATE_SCORE: i32 = 32_000;

/// Scores at or above this many plies-adjusted points denote a forced mate.
pub const MATE_THRESHOLD: i32 = MATE_SCORE - 1000;

/// Tablebase/endgame-rule "known win" floor. Static evaluation never
/// crosses it; only mate and endgame-rule scores live above.
pub const KNOWN_WIN_SCORE: i32 = 10_000;

/// Static scores beyond this are compressed toward it at 1/8 slope.
pub const EVAL_SATURATION_THRESHOLD: i32 = 8_000;

pub const DRAW_SCORE: i32 = 0;

/// Static evaluator: endgame shortcut table plus an optional network.
#[derive(Clone, Default)]
pub struct Evaluator {
    network: Option<Arc<Network>>,
}

impl Evaluator {
    #[must_use]
    pub fn new(network: Option<Arc<Network>>) -> Self {
        Evaluator { network }
    }

    #[must_use]
    pub fn network(&self) -> Option<&Arc<Network>> {
        self.network.as_ref()
    }

    /// Evaluate at a search node, maintaining `nnue` incrementally.
    #[must_use]
    pub fn evaluate(&self, pos: &Position, nnue: &mut NnueState, ply: usize) -> i32 {
        if let Some(white_score) = endgame::probe(pos) {
            return from_perspective(white_score, pos.side_to_move());
        }

        let base = match &self.network {
            Some(network) => nnue.evaluate(pos, ply, network),
            None => material_score(pos),
        };
        scale_and_saturate(base, pos)
    }

    /// One-off evaluation outside a search (driver diagnostics, tests).
    #[must_use]
    pub fn evaluate_standalone(&self, pos: &Position) -> i32 {
        if let Some(white_score) = endgame::probe(pos) {
            return from_perspective(white_score, pos.side_to_move());
        }
        let base = match &self.network {
            Some(network) => {
                let mut state = NnueState::new(network, 0);
                state.reset_root(pos, network);
                state.evaluate(pos, 0, network)
            }
            None => material_score(pos),
        };
        scale_and_saturate(base, pos)
    }
}

#[inline]
fn from_perspective(white_score: i32, side_to_move: Color) -> i32 {
    match side_to_move {
        Color::White => white_score,
        Color::Black => -white_score,
    }
}

/// Coarse material count, the no-network fallback.
fn material_score(pos: &Position) -> i32 {
    let mut score = 0;
    for piece in [
        Piece::Pawn,
        Piece::Knight,
        Piece::Bishop,
        Piece::Rook,
        Piece::Queen,
    ] {
        let diff = pos.pieces(Color::White, piece).count() as i32
            - pos.pieces(Color::Black, piece).count() as i32;
        score += diff * see_value(piece);
    }
    from_perspective(score, pos.side_to_move())
}

/// Piece-weighted game phase: 0 = bare endgame, 64 = full board.
#[must_use]
pub fn game_phase(pos: &Position) -> i32 {
    let count = |piece: Piece| {
        (pos.pieces(Color::White, piece).count() + pos.pieces(Color::Black, piece).count()) as i32
    };
    let minors = count(Piece::Knight) + count(Piece::Bishop);
    (3 * minors + 5 * count(Piece::Rook) + 10 * count(Piece::Queen)).min(64)
}

fn scale_and_saturate(score: i32, pos: &Position) -> i32 {
    let mut value = score * (96 + game_phase(pos)) / 128;
    if value > EVAL_SATURATION_THRESHOLD {
        value = EVAL_SATURATION_THRESHOLD + (value - EVAL_SATURATION_THRESHOLD) / 8;
    } else if value < -EVAL_SATURATION_THRESHOLD {
        value = -EVAL_SATURATION_THRESHOLD + (value + EVAL_SATURATION_THRESHOLD) / 8;
    }
    debug_assert!(value.abs() < KNOWN_WIN_SCORE);
    value
}
