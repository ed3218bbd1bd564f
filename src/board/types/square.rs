//! Board squares, stored as a compact 0-63 index.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::board::error::SquareError;

/// A square on the board.
///
/// Index layout: `rank * 8 + file`, where a1 = 0, b1 = 1, ..., h8 = 63.
/// File 0 is the a-file; rank 0 is White's back rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Square(u8);

impl Square {
    /// Create a square from rank and file (both 0-7). Unchecked.
    #[inline]
    #[must_use]
    pub const fn new(rank: usize, file: usize) -> Self {
        Square((rank * 8 + file) as u8)
    }

    /// Checked construction.
    #[must_use]
    pub const fn try_new(rank: usize, file: usize) -> Option<Self> {
        if rank < 8 && file < 8 {
            Some(Square::new(rank, file))
        } else {
            None
        }
    }

    /// Rank 0-7 (0 = rank 1).
    #[inline]
    #[must_use]
    pub const fn rank(self) -> usize {
        (self.0 / 8) as usize
    }

    /// File 0-7 (0 = file a).
    #[inline]
    #[must_use]
    pub const fn file(self) -> usize {
        (self.0 % 8) as usize
    }

    /// Index 0-63.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    #[must_use]
    pub const fn from_index(idx: usize) -> Self {
        Square(idx as u8)
    }

    /// Mirror across the horizontal axis (a1 <-> a8).
    #[inline]
    #[must_use]
    pub const fn mirror_rank(self) -> Self {
        Square(self.0 ^ 56)
    }

    /// Mirror across the vertical axis (a1 <-> h1).
    #[inline]
    #[must_use]
    pub const fn mirror_file(self) -> Self {
        Square(self.0 ^ 7)
    }

    /// The square one rank ahead from `color`'s point of view, if on board.
    #[inline]
    #[must_use]
    pub const fn forward(self, color: super::Color) -> Option<Self> {
        let rank = self.rank() as i8 + color.forward();
        if rank >= 0 && rank < 8 {
            Some(Square::new(rank as usize, self.file()))
        } else {
            None
        }
    }

    /// Offset by rank/file deltas, if the result stays on board.
    #[inline]
    #[must_use]
    pub const fn offset(self, dr: i8, df: i8) -> Option<Self> {
        let rank = self.rank() as i8 + dr;
        let file = self.file() as i8 + df;
        if rank >= 0 && rank < 8 && file >= 0 && file < 8 {
            Some(Square::new(rank as usize, file as usize))
        } else {
            None
        }
    }

    /// Chebyshev distance to another square.
    #[inline]
    #[must_use]
    pub fn distance(self, other: Square) -> u32 {
        let dr = (self.rank() as i32 - other.rank() as i32).unsigned_abs();
        let df = (self.file() as i32 - other.file() as i32).unsigned_abs();
        dr.max(df)
    }

    /// True for light squares (b1, d1, ...).
    #[inline]
    #[must_use]
    pub const fn is_light(self) -> bool {
        (self.rank() + self.file()) % 2 == 1
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (self.file() as u8 + b'a') as char, self.rank() + 1)
    }
}

impl FromStr for Square {
    type Err = SquareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(SquareError::InvalidNotation {
                notation: s.to_string(),
            });
        }
        let file = match bytes[0] {
            b'a'..=b'h' => (bytes[0] - b'a') as usize,
            _ => {
                return Err(SquareError::InvalidNotation {
                    notation: s.to_string(),
                })
            }
        };
        let rank = match bytes[1] {
            b'1'..=b'8' => (bytes[1] - b'1') as usize,
            _ => {
                return Err(SquareError::InvalidNotation {
                    notation: s.to_string(),
                })
            }
        };
        Ok(Square::new(rank, file))
    }
}
