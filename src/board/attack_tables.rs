//! Precomputed attack geometry.
//!
//! King, knight, and pawn attacks are table lookups. Sliding attacks use
//! the classic ray scheme: each square has eight precomputed rays, and an
//! attack set is the ray truncated at its first blocker (blocker included,
//! shadow excluded). The first blocker is the lowest set bit on rays that
//! point toward higher square indices and the highest set bit otherwise.

use once_cell::sync::Lazy;

use super::types::{Bitboard, Color, Square};

/// Compass directions, indexed into [`RAYS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
enum Direction {
    North = 0,
    NorthEast = 1,
    East = 2,
    SouthEast = 3,
    South = 4,
    SouthWest = 5,
    West = 6,
    NorthWest = 7,
}

impl Direction {
    const fn delta(self) -> (i8, i8) {
        match self {
            Direction::North => (1, 0),
            Direction::NorthEast => (1, 1),
            Direction::East => (0, 1),
            Direction::SouthEast => (-1, 1),
            Direction::South => (-1, 0),
            Direction::SouthWest => (-1, -1),
            Direction::West => (0, -1),
            Direction::NorthWest => (1, -1),
        }
    }

    /// True when the ray scans toward higher square indices.
    const fn is_positive(self) -> bool {
        matches!(
            self,
            Direction::North | Direction::NorthEast | Direction::East | Direction::NorthWest
        )
    }
}

const ALL_DIRECTIONS: [Direction; 8] = [
    Direction::North,
    Direction::NorthEast,
    Direction::East,
    Direction::SouthEast,
    Direction::South,
    Direction::SouthWest,
    Direction::West,
    Direction::NorthWest,
];

const ORTHOGONAL: [Direction; 4] = [
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
];

const DIAGONAL: [Direction; 4] = [
    Direction::NorthEast,
    Direction::SouthEast,
    Direction::SouthWest,
    Direction::NorthWest,
];

/// `RAYS[dir][sq]`: squares strictly beyond `sq` in direction `dir`.
static RAYS: Lazy<[[u64; 64]; 8]> = Lazy::new(|| {
    let mut rays = [[0u64; 64]; 8];
    for dir in ALL_DIRECTIONS {
        let (dr, df) = dir.delta();
        for sq in 0..64 {
            let mut mask = 0u64;
            let mut cursor = Square::from_index(sq).offset(dr, df);
            while let Some(s) = cursor {
                mask |= 1u64 << s.index();
                cursor = s.offset(dr, df);
            }
            rays[dir as usize][sq] = mask;
        }
    }
    rays
});

static KNIGHT_ATTACKS: Lazy<[u64; 64]> = Lazy::new(|| {
    const JUMPS: [(i8, i8); 8] = [
        (2, 1),
        (2, -1),
        (-2, 1),
        (-2, -1),
        (1, 2),
        (1, -2),
        (-1, 2),
        (-1, -2),
    ];
    let mut attacks = [0u64; 64];
    for sq in 0..64 {
        for (dr, df) in JUMPS {
            if let Some(s) = Square::from_index(sq).offset(dr, df) {
                attacks[sq] |= 1u64 << s.index();
            }
        }
    }
    attacks
});

static KING_ATTACKS: Lazy<[u64; 64]> = Lazy::new(|| {
    let mut attacks = [0u64; 64];
    for sq in 0..64 {
        for dir in ALL_DIRECTIONS {
            let (dr, df) = dir.delta();
            if let Some(s) = Square::from_index(sq).offset(dr, df) {
                attacks[sq] |= 1u64 << s.index();
            }
        }
    }
    attacks
});

/// `PAWN_ATTACKS[color][sq]`: squares a pawn of `color` on `sq` attacks.
static PAWN_ATTACKS: Lazy<[[u64; 64]; 2]> = Lazy::new(|| {
    let mut attacks = [[0u64; 64]; 2];
    for sq in 0..64 {
        for (c_idx, dr) in [(0usize, 1i8), (1usize, -1i8)] {
            for df in [-1i8, 1i8] {
                if let Some(s) = Square::from_index(sq).offset(dr, df) {
                    attacks[c_idx][sq] |= 1u64 << s.index();
                }
            }
        }
    }
    attacks
});

/// One ray truncated at its first blocker (blocker included).
#[inline]
fn ray_attack(sq: usize, dir: Direction, occupancy: u64) -> u64 {
    let ray = RAYS[dir as usize][sq];
    let blockers = ray & occupancy;
    if blockers == 0 {
        return ray;
    }
    let first = if dir.is_positive() {
        blockers.trailing_zeros() as usize
    } else {
        63 - blockers.leading_zeros() as usize
    };
    ray & !RAYS[dir as usize][first]
}

/// Rook attacks from `sq` given board occupancy.
#[inline]
#[must_use]
pub fn rook_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    let mut attacks = 0u64;
    for dir in ORTHOGONAL {
        attacks |= ray_attack(sq.index(), dir, occupancy.0);
    }
    Bitboard(attacks)
}

/// Bishop attacks from `sq` given board occupancy.
#[inline]
#[must_use]
pub fn bishop_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    let mut attacks = 0u64;
    for dir in DIAGONAL {
        attacks |= ray_attack(sq.index(), dir, occupancy.0);
    }
    Bitboard(attacks)
}

/// Queen attacks from `sq` given board occupancy.
#[inline]
#[must_use]
pub fn queen_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    rook_attacks(sq, occupancy) | bishop_attacks(sq, occupancy)
}

#[inline]
#[must_use]
pub fn knight_attacks(sq: Square) -> Bitboard {
    Bitboard(KNIGHT_ATTACKS[sq.index()])
}

#[inline]
#[must_use]
pub fn king_attacks(sq: Square) -> Bitboard {
    Bitboard(KING_ATTACKS[sq.index()])
}

#[inline]
#[must_use]
pub fn pawn_attacks(sq: Square, color: Color) -> Bitboard {
    Bitboard(PAWN_ATTACKS[color.index()][sq.index()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn knight_attack_counts() {
        assert_eq!(knight_attacks(sq("a1")).count(), 2);
        assert_eq!(knight_attacks(sq("b1")).count(), 3);
        assert_eq!(knight_attacks(sq("e4")).count(), 8);
    }

    #[test]
    fn king_attack_counts() {
        assert_eq!(king_attacks(sq("a1")).count(), 3);
        assert_eq!(king_attacks(sq("e1")).count(), 5);
        assert_eq!(king_attacks(sq("d5")).count(), 8);
    }

    #[test]
    fn pawn_attacks_masked_to_board() {
        assert_eq!(pawn_attacks(sq("a2"), Color::White).count(), 1);
        assert!(pawn_attacks(sq("a2"), Color::White).contains(sq("b3")));
        assert_eq!(pawn_attacks(sq("e4"), Color::Black).count(), 2);
        assert!(pawn_attacks(sq("e4"), Color::Black).contains(sq("d3")));
        // Pawns on the last rank have no forward attacks.
        assert!(pawn_attacks(sq("e8"), Color::White).is_empty());
    }

    #[test]
    fn rook_open_board() {
        assert_eq!(rook_attacks(sq("a1"), Bitboard::EMPTY).count(), 14);
        assert_eq!(rook_attacks(sq("d4"), Bitboard::EMPTY).count(), 14);
    }

    #[test]
    fn rook_blocker_included_shadow_excluded() {
        let blocker = Bitboard::from_square(sq("d6"));
        let attacks = rook_attacks(sq("d4"), blocker);
        assert!(attacks.contains(sq("d5")));
        assert!(attacks.contains(sq("d6")));
        assert!(!attacks.contains(sq("d7")));
        assert!(!attacks.contains(sq("d8")));
        // Other rays unaffected.
        assert!(attacks.contains(sq("d1")));
        assert!(attacks.contains(sq("h4")));
    }

    #[test]
    fn bishop_blocker_on_negative_ray() {
        let blocker = Bitboard::from_square(sq("b2"));
        let attacks = bishop_attacks(sq("e5"), blocker);
        assert!(attacks.contains(sq("c3")));
        assert!(attacks.contains(sq("b2")));
        assert!(!attacks.contains(sq("a1")));
    }

    #[test]
    fn queen_is_rook_plus_bishop() {
        let occ = Bitboard::from_square(sq("f6")) | Bitboard::from_square(sq("d2"));
        let q = queen_attacks(sq("d4"), occ);
        assert_eq!(q, rook_attacks(sq("d4"), occ) | bishop_attacks(sq("d4"), occ));
    }
}
