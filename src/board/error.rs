//! Error types for board operations.

use std::fmt;

/// Square notation parsing failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SquareError {
    /// Not a valid algebraic square ("a1".."h8")
    InvalidNotation { notation: String },
}

impl fmt::Display for SquareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SquareError::InvalidNotation { notation } => {
                write!(f, "invalid square notation '{notation}'")
            }
        }
    }
}

impl std::error::Error for SquareError {}

/// FEN parsing or validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    /// Fewer than the two mandatory fields
    TooFewFields { found: usize },
    /// Invalid piece character in the board field
    InvalidPiece { ch: char },
    /// Board field does not describe exactly 8 ranks of 8 files
    BadBoardShape,
    /// Invalid side-to-move field (must be 'w' or 'b')
    InvalidSideToMove { found: String },
    /// Invalid castling field character
    InvalidCastling { ch: char },
    /// Invalid en passant field
    InvalidEnPassant { found: String },
    /// Move counter is not a number in range
    InvalidCounter { found: String },
    /// A side has no king, two kings, or too many pieces
    BadMaterial,
    /// Pawn on rank 1 or rank 8
    PawnOnBackRank,
    /// Castling rights inconsistent with king/rook placement
    InconsistentCastling,
    /// The side not to move is in check
    OpponentInCheck,
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::TooFewFields { found } => {
                write!(f, "FEN needs at least board and side fields, found {found}")
            }
            FenError::InvalidPiece { ch } => write!(f, "invalid piece character '{ch}' in FEN"),
            FenError::BadBoardShape => write!(f, "FEN board field must be 8 ranks of 8 files"),
            FenError::InvalidSideToMove { found } => {
                write!(f, "invalid side to move '{found}', expected 'w' or 'b'")
            }
            FenError::InvalidCastling { ch } => write!(f, "invalid castling character '{ch}'"),
            FenError::InvalidEnPassant { found } => {
                write!(f, "invalid en passant square '{found}'")
            }
            FenError::InvalidCounter { found } => write!(f, "invalid move counter '{found}'"),
            FenError::BadMaterial => write!(f, "FEN describes an impossible material setup"),
            FenError::PawnOnBackRank => write!(f, "FEN places a pawn on rank 1 or 8"),
            FenError::InconsistentCastling => {
                write!(f, "castling rights inconsistent with piece placement")
            }
            FenError::OpponentInCheck => write!(f, "side not to move is in check"),
        }
    }
}

impl std::error::Error for FenError {}

/// Long-algebraic move parsing failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveParseError {
    /// Move string has invalid length (must be 4-5 characters)
    InvalidLength { len: usize },
    /// Invalid square notation
    InvalidSquare { notation: String },
    /// Invalid promotion suffix
    InvalidPromotion { ch: char },
    /// No legal move in the position matches
    IllegalMove { notation: String },
}

impl fmt::Display for MoveParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveParseError::InvalidLength { len } => {
                write!(f, "move must be 4-5 characters, found {len}")
            }
            MoveParseError::InvalidSquare { notation } => {
                write!(f, "invalid square in move '{notation}'")
            }
            MoveParseError::InvalidPromotion { ch } => {
                write!(f, "invalid promotion piece '{ch}'")
            }
            MoveParseError::IllegalMove { notation } => write!(f, "illegal move '{notation}'"),
        }
    }
}

impl std::error::Error for MoveParseError {}
