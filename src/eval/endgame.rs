//! Endgame shortcuts.
//!
//! A table of material-signature rules answered before the network runs:
//! bare-king draws, known wins with forced-mate material, and king-and-
//! pawn endings probed in a KPK bitbase. The bitbase covers 2 x 24 x 64
//! x 64 positions (side to move, pawn on files a-d ranks 2-7 after
//! mirroring, both kings) and is generated at first use by retrograde
//! fixpoint iteration.

use once_cell::sync::Lazy;

use crate::board::attack_tables::{king_attacks, pawn_attacks};
use crate::board::{Color, Piece, Position, Square, DARK_SQUARES, LIGHT_SQUARES};

use super::KNOWN_WIN_SCORE;

/// Chebyshev distance to the nearest corner.
fn corner_distance(sq: Square) -> u32 {
    [
        Square::new(0, 0),
        Square::new(0, 7),
        Square::new(7, 0),
        Square::new(7, 7),
    ]
    .into_iter()
    .map(|c| sq.distance(c))
    .min()
    .unwrap()
}

/// Chebyshev distance to the nearest dark corner (a1 or h8).
fn dark_corner_distance(sq: Square) -> u32 {
    sq.distance(Square::new(0, 0)).min(sq.distance(Square::new(7, 7)))
}

/// Distance to the nearest board edge.
fn edge_distance(sq: Square) -> u32 {
    let r = sq.rank().min(7 - sq.rank());
    let f = sq.file().min(7 - sq.file());
    (r.min(f)) as u32
}

/// Material signature: one bit per (color, non-king kind) presence.
fn material_mask(pos: &Position) -> u32 {
    let mut mask = 0u32;
    for (shift, color) in [(0u32, Color::White), (5u32, Color::Black)] {
        for piece in [
            Piece::Pawn,
            Piece::Knight,
            Piece::Bishop,
            Piece::Rook,
            Piece::Queen,
        ] {
            if !pos.pieces(color, piece).is_empty() {
                mask |= 1 << (shift + piece.index() as u32);
            }
        }
    }
    mask
}

const WHITE_PAWN: u32 = 1 << 0;
const WHITE_KNIGHT: u32 = 1 << 1;
const WHITE_BISHOP: u32 = 1 << 2;
const WHITE_ROOK: u32 = 1 << 3;
const WHITE_QUEEN: u32 = 1 << 4;
const BLACK_PAWN: u32 = 1 << 5;
const BLACK_KNIGHT: u32 = 1 << 6;
const BLACK_BISHOP: u32 = 1 << 7;
const BLACK_ROOK: u32 = 1 << 8;
const BLACK_QUEEN: u32 = 1 << 9;

/// Probe the endgame rules. Returns a score from White's perspective,
/// or `None` when no rule covers the material on the board.
#[must_use]
pub fn probe(pos: &Position) -> Option<i32> {
    let white_king = pos.king_square(Color::White);
    let black_king = pos.king_square(Color::Black);
    let kings_close = (7 - white_king.distance(black_king)) as i32;

    match material_mask(pos) {
        // Bare kings.
        0 => Some(0),

        // Knights only cannot force mate with one or two of them.
        WHITE_KNIGHT if pos.pieces(Color::White, Piece::Knight).count() <= 2 => Some(0),
        BLACK_KNIGHT if pos.pieces(Color::Black, Piece::Knight).count() <= 2 => Some(0),

        // A single bishop (or any number on one square color) is a draw.
        WHITE_BISHOP => {
            let bishops = pos.pieces(Color::White, Piece::Bishop);
            if (bishops & LIGHT_SQUARES).is_empty() || (bishops & DARK_SQUARES).is_empty() {
                Some(0)
            } else {
                // Bishops on both colors win; herd the king to a corner.
                let score = KNOWN_WIN_SCORE
                    + 8 * (3 - corner_distance(black_king) as i32)
                    + kings_close;
                Some(score)
            }
        }
        BLACK_BISHOP => {
            let bishops = pos.pieces(Color::Black, Piece::Bishop);
            if (bishops & LIGHT_SQUARES).is_empty() || (bishops & DARK_SQUARES).is_empty() {
                Some(0)
            } else {
                let score = KNOWN_WIN_SCORE
                    + 8 * (3 - corner_distance(white_king) as i32)
                    + kings_close;
                Some(-score)
            }
        }

        // Rook or queen (or both) against a bare king: known win; drive
        // the defending king to the edge.
        m if m == WHITE_ROOK || m == WHITE_QUEEN || m == (WHITE_ROOK | WHITE_QUEEN) => {
            Some(
                KNOWN_WIN_SCORE
                    + 1000
                    + 8 * (3 - edge_distance(black_king) as i32)
                    + kings_close,
            )
        }
        m if m == BLACK_ROOK || m == BLACK_QUEEN || m == (BLACK_ROOK | BLACK_QUEEN) => {
            Some(
                -(KNOWN_WIN_SCORE
                    + 1000
                    + 8 * (3 - edge_distance(white_king) as i32)
                    + kings_close),
            )
        }

        // Bishop and knight: mate happens in the corner of the bishop's
        // color; mirror the defending king into the dark-corner frame.
        m if m == (WHITE_KNIGHT | WHITE_BISHOP)
            && pos.pieces(Color::White, Piece::Knight).count() == 1
            && pos.pieces(Color::White, Piece::Bishop).count() == 1 =>
        {
            let dark_bishop =
                !(pos.pieces(Color::White, Piece::Bishop) & DARK_SQUARES).is_empty();
            let target = if dark_bishop {
                black_king
            } else {
                black_king.mirror_file()
            };
            Some(
                KNOWN_WIN_SCORE
                    + 8 * (7 - dark_corner_distance(target) as i32)
                    + kings_close,
            )
        }
        m if m == (BLACK_KNIGHT | BLACK_BISHOP)
            && pos.pieces(Color::Black, Piece::Knight).count() == 1
            && pos.pieces(Color::Black, Piece::Bishop).count() == 1 =>
        {
            let dark_bishop =
                !(pos.pieces(Color::Black, Piece::Bishop) & DARK_SQUARES).is_empty();
            let target = if dark_bishop {
                white_king
            } else {
                white_king.mirror_file()
            };
            Some(
                -(KNOWN_WIN_SCORE
                    + 8 * (7 - dark_corner_distance(target) as i32)
                    + kings_close),
            )
        }

        // Lone pawn: exact bitbase answer.
        WHITE_PAWN if pos.pieces(Color::White, Piece::Pawn).count() == 1 => {
            let pawn = pos.pieces(Color::White, Piece::Pawn).first().unwrap();
            Some(probe_kpk_oriented(
                white_king,
                pawn,
                black_king,
                pos.side_to_move(),
            ))
        }
        BLACK_PAWN if pos.pieces(Color::Black, Piece::Pawn).count() == 1 => {
            // Flip ranks so the bitbase's White is the strong side.
            let pawn = pos.pieces(Color::Black, Piece::Pawn).first().unwrap();
            let score = probe_kpk_oriented(
                black_king.mirror_rank(),
                pawn.mirror_rank(),
                white_king.mirror_rank(),
                pos.side_to_move().opponent(),
            );
            Some(-score)
        }

        _ => None,
    }
}

/// KPK with the strong side normalized to White; mirrors the pawn onto
/// files a-d and converts the bitbase bit into a score.
fn probe_kpk_oriented(
    mut strong_king: Square,
    mut pawn: Square,
    mut weak_king: Square,
    side_to_move: Color,
) -> i32 {
    if pawn.file() >= 4 {
        strong_king = strong_king.mirror_file();
        pawn = pawn.mirror_file();
        weak_king = weak_king.mirror_file();
    }
    if !kpk_probe(strong_king, pawn, weak_king, side_to_move) {
        return 0;
    }
    KNOWN_WIN_SCORE
        + 8 * pawn.rank() as i32
        + 7
        - (pawn.distance(strong_king) as i32 - 1).max(0)
}

// ---------------------------------------------------------------------
// KPK bitbase
// ---------------------------------------------------------------------

const KPK_MAX_INDEX: usize = 2 * 24 * 64 * 64;

const INVALID: u8 = 0;
const UNKNOWN: u8 = 1;
const DRAW: u8 = 2;
const WIN: u8 = 4;

/// Dense index: white king | black king << 6 | stm << 12 | pawn file << 13
/// | (6 - pawn rank) << 15. Pawn is always on files a-d, ranks 2-7.
fn kpk_index(side_to_move: Color, black_king: Square, white_king: Square, pawn: Square) -> usize {
    debug_assert!(pawn.file() <= 3);
    debug_assert!((1..=6).contains(&pawn.rank()));
    white_king.index()
        | black_king.index() << 6
        | side_to_move.index() << 12
        | pawn.file() << 13
        | (6 - pawn.rank()) << 15
}

struct KpkPosition {
    side_to_move: Color,
    white_king: Square,
    black_king: Square,
    pawn: Square,
    result: u8,
}

impl KpkPosition {
    fn decode(idx: usize) -> Self {
        let white_king = Square::from_index(idx & 0x3F);
        let black_king = Square::from_index((idx >> 6) & 0x3F);
        let side_to_move = Color::from_index((idx >> 12) & 0x1);
        let pawn = Square::new(6 - ((idx >> 15) & 0x7), (idx >> 13) & 0x3);
        let attacks = pawn_attacks(pawn, Color::White);

        let result = if white_king.distance(black_king) <= 1
            || white_king == pawn
            || black_king == pawn
            || (side_to_move == Color::White && attacks.contains(black_king))
        {
            INVALID
        } else if side_to_move == Color::White
            && pawn.rank() == 6
            && white_king != pawn.offset(1, 0).unwrap()
            && (black_king.distance(pawn.offset(1, 0).unwrap()) > 1
                || white_king.distance(pawn.offset(1, 0).unwrap()) == 1)
        {
            // The pawn promotes next move and cannot be taken.
            WIN
        } else if side_to_move == Color::Black
            && ((king_attacks(black_king)
                & !(king_attacks(white_king) | attacks))
                .is_empty()
                || (king_attacks(black_king)
                    & !king_attacks(white_king))
                .contains(pawn))
        {
            // Stalemated, or the pawn falls.
            DRAW
        } else {
            UNKNOWN
        };

        KpkPosition {
            side_to_move,
            white_king,
            black_king,
            pawn,
            result,
        }
    }

    /// Union successor results; White needs one WIN, Black one DRAW.
    fn classify(&self, db: &[u8]) -> u8 {
        let good = if self.side_to_move == Color::White {
            WIN
        } else {
            DRAW
        };
        let bad = if self.side_to_move == Color::White {
            DRAW
        } else {
            WIN
        };

        let mut r = INVALID;
        let mover = if self.side_to_move == Color::White {
            self.white_king
        } else {
            self.black_king
        };
        for to in king_attacks(mover) {
            r |= if self.side_to_move == Color::White {
                db[kpk_index(Color::Black, self.black_king, to, self.pawn)]
            } else {
                db[kpk_index(Color::White, to, self.white_king, self.pawn)]
            };
        }

        // Pawn pushes. A push onto a king square decodes as INVALID and
        // contributes nothing; the double push additionally requires the
        // jumped square to be free.
        if self.side_to_move == Color::White && self.pawn.rank() < 6 {
            let push = self.pawn.offset(1, 0).unwrap();
            r |= db[kpk_index(Color::Black, self.black_king, self.white_king, push)];
            if self.pawn.rank() == 1 && push != self.white_king && push != self.black_king {
                let double = self.pawn.offset(2, 0).unwrap();
                r |= db[kpk_index(Color::Black, self.black_king, self.white_king, double)];
            }
        }

        if r & good != 0 {
            good
        } else if r & UNKNOWN != 0 {
            UNKNOWN
        } else {
            bad
        }
    }
}

/// One bit per KPK position: set = win for the pawn's side.
static KPK_BITBASE: Lazy<Vec<u64>> = Lazy::new(|| {
    let mut db = vec![0u8; KPK_MAX_INDEX];
    let positions: Vec<KpkPosition> = (0..KPK_MAX_INDEX).map(KpkPosition::decode).collect();
    for (i, p) in positions.iter().enumerate() {
        db[i] = p.result;
    }

    let mut changed = true;
    while changed {
        changed = false;
        for (i, p) in positions.iter().enumerate() {
            if db[i] == UNKNOWN {
                let r = p.classify(&db);
                if r != UNKNOWN {
                    db[i] = r;
                    changed = true;
                }
            }
        }
    }

    let mut bits = vec![0u64; KPK_MAX_INDEX / 64];
    for (i, &r) in db.iter().enumerate() {
        if r == WIN {
            bits[i / 64] |= 1 << (i % 64);
        }
    }
    bits
});

fn kpk_probe(white_king: Square, pawn: Square, black_king: Square, side_to_move: Color) -> bool {
    let idx = kpk_index(side_to_move, black_king, white_king, pawn);
    KPK_BITBASE[idx / 64] & (1 << (idx % 64)) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitbase_win_count_matches_reference() {
        let wins: u32 = KPK_BITBASE.iter().map(|w| w.count_ones()).sum();
        assert_eq!(wins, 111_282);
    }

    #[test]
    fn kpk_known_positions() {
        // King on the sixth rank in front of its pawn always wins.
        let pos = Position::from_fen("3k4/8/3K4/3P4/8/8/8/8 w - - 0 1").unwrap();
        let score = probe(&pos).unwrap();
        assert!(score >= KNOWN_WIN_SCORE, "score {score}");

        // Rook pawn with the defending king in the corner: dead draw.
        let pos = Position::from_fen("k7/8/K7/P7/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(probe(&pos), Some(0));
    }

    #[test]
    fn kpk_black_pawn_mirrors() {
        // The same winning setup with colors reversed scores negative.
        let pos = Position::from_fen("8/8/8/8/3p4/3k4/8/3K4 b - - 0 1").unwrap();
        let score = probe(&pos).unwrap();
        assert!(score <= -KNOWN_WIN_SCORE, "score {score}");
    }

    #[test]
    fn bare_material_rules() {
        assert_eq!(
            probe(&Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap()),
            Some(0)
        );
        assert_eq!(
            probe(&Position::from_fen("4k3/8/8/8/8/8/8/2N1K3 w - - 0 1").unwrap()),
            Some(0)
        );
        assert_eq!(
            probe(&Position::from_fen("4k3/8/8/8/8/8/8/1NN1K3 w - - 0 1").unwrap()),
            Some(0)
        );
        assert_eq!(
            probe(&Position::from_fen("4k3/8/8/8/8/8/8/2B1K3 b - - 0 1").unwrap()),
            Some(0)
        );
    }

    #[test]
    fn rook_and_queen_endings_are_known_wins() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        assert!(probe(&pos).unwrap() > KNOWN_WIN_SCORE);
        let pos = Position::from_fen("3qk3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(probe(&pos).unwrap() < -KNOWN_WIN_SCORE);
    }

    #[test]
    fn bishop_knight_prefers_right_corner() {
        // Dark-squared bishop on c1: the defending king in the dark
        // corner a1 scores higher than in the light corner a8.
        let near_dark = probe(
            &Position::from_fen("8/8/8/8/8/8/8/k1B1KN2 w - - 0 1").unwrap(),
        )
        .unwrap();
        let near_light = probe(
            &Position::from_fen("k7/8/8/8/8/8/8/2B1KN2 w - - 0 1").unwrap(),
        )
        .unwrap();
        assert!(near_dark >= KNOWN_WIN_SCORE);
        assert!(near_light >= KNOWN_WIN_SCORE);
        assert!(near_dark > near_light);
    }

    #[test]
    fn no_rule_for_mixed_material() {
        let pos = Position::startpos();
        assert_eq!(probe(&pos), None);
        let pos = Position::from_fen("4k3/8/8/8/8/8/4P3/R3K3 w - - 0 1").unwrap();
        assert_eq!(probe(&pos), None);
    }
}
