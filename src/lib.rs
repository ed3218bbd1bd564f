//! basalt: a UCI chess engine.
//!
//! Bitboard move generation with a copy-make legality filter, an NNUE
//! evaluator with incrementally maintained accumulators, a shared
//! clustered transposition table, and a lazy-SMP principal-variation
//! search under UCI time controls.

pub mod board;
pub mod eval;
pub mod search;
pub mod sync;
pub mod tt;
pub mod uci;

pub use board::{Color, GenMode, Move, MoveList, Piece, Position, Square};
pub use eval::Evaluator;
pub use search::{GameHistory, SearchLimits, SearchResult, Searcher};
pub use sync::StopFlag;
pub use tt::TranspositionTable;
