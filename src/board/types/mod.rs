//! Core value types: squares, pieces, bitboards, moves.

mod bitboard;
mod castling;
mod moves;
mod piece;
mod square;

pub use bitboard::{Bitboard, BitboardIter, DARK_SQUARES, LIGHT_SQUARES};
pub use castling::CastlingRights;
pub use moves::{Move, MoveList, PackedMove, ScoredMove, ScoredMoveList, MAX_MOVES};
pub use piece::{Color, Piece, ALL_PIECES, PROMOTION_PIECES};
pub use square::Square;
