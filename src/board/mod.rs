//! Board representation and rules.
//!
//! Bitboard-based position state, pseudo-legal move generation with a
//! copy-make legality filter, Zobrist hashing, and static exchange
//! evaluation.

pub mod attack_tables;
mod error;
mod fen;
mod make_move;
mod movegen;
mod perft;
mod position;
mod see;
pub mod types;
mod zobrist;

pub use error::{FenError, MoveParseError, SquareError};
pub use make_move::{DirtyList, DirtyPiece};
pub use movegen::GenMode;
pub use position::{Position, SidePosition};
pub use see::see_value;
pub use types::{
    Bitboard, CastlingRights, Color, Move, MoveList, PackedMove, Piece, ScoredMove,
    ScoredMoveList, Square, ALL_PIECES, DARK_SQUARES, LIGHT_SQUARES, MAX_MOVES,
    PROMOTION_PIECES,
};
