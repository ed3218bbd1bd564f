//! NNUE position evaluation.
//!
//! A quantized feed-forward network: a feature transformer maps sparse
//! king-bucket-conditioned piece-square inputs to one accumulator per
//! perspective, maintained incrementally as the search makes moves; a
//! small per-material-bucket output head turns the two clamped
//! accumulators into a score.

mod accumulator;
mod features;
mod network;

pub use accumulator::{NnueState, RefreshCache};
pub use features::{
    feature_index, king_state, KingState, FEATURES_PER_BUCKET, NUM_KING_BUCKETS, NUM_FEATURES,
};
pub use network::{Network, NnueLoadError, NNUE_MAGIC, NNUE_VERSION};

/// Clipped-ReLU upper bound; also the activation quantization scale.
pub const ACTIVATION_MAX: i32 = 127;

/// Output-head weights carry a fixed-point scale of 2^6.
pub const OUTPUT_SHIFT: i32 = 6;

/// Number of output-head variants, selected by non-king piece count.
pub const NUM_OUTPUT_BUCKETS: usize = 8;

/// Output head variant for a position: one bucket per four non-king men.
#[must_use]
pub fn output_bucket(non_king_pieces: u32) -> usize {
    ((non_king_pieces / 4) as usize).min(NUM_OUTPUT_BUCKETS - 1)
}
