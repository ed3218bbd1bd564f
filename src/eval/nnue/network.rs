//! Network weights: file format, loading, and the output head.
//!
//! The weights file is little-endian. Header: magic, version, king-bucket
//! count, accumulator size, output-bucket count (all u32). Body: feature
//! transformer weights (i16, feature-major), transformer biases (i16),
//! then per output bucket 2 x accumulator-size hidden weights (i8) and a
//! bias (i32). Any magic/version/shape mismatch is a hard load failure;
//! the evaluator then runs without a network.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::{
    ACTIVATION_MAX, NUM_KING_BUCKETS, NUM_OUTPUT_BUCKETS, NUM_FEATURES, OUTPUT_SHIFT,
};

/// File magic: "bnne" in little-endian byte order.
pub const NNUE_MAGIC: u32 = 0x656E_6E62;
/// Current format version.
pub const NNUE_VERSION: u32 = 1;

/// Network load failure.
#[derive(Debug)]
pub enum NnueLoadError {
    Io(io::Error),
    BadMagic { found: u32 },
    BadVersion { found: u32 },
    /// Header shape does not match what this engine was built for.
    BadShape { what: &'static str, found: u32 },
}

impl fmt::Display for NnueLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NnueLoadError::Io(e) => write!(f, "failed to read weights: {e}"),
            NnueLoadError::BadMagic { found } => {
                write!(f, "bad weights magic {found:#010x}, expected {NNUE_MAGIC:#010x}")
            }
            NnueLoadError::BadVersion { found } => {
                write!(f, "unsupported weights version {found}, expected {NNUE_VERSION}")
            }
            NnueLoadError::BadShape { what, found } => {
                write!(f, "unsupported network shape: {what} = {found}")
            }
        }
    }
}

impl std::error::Error for NnueLoadError {}

impl From<io::Error> for NnueLoadError {
    fn from(e: io::Error) -> Self {
        NnueLoadError::Io(e)
    }
}

/// One output-head variant.
#[derive(Debug)]
pub(crate) struct OutputBucket {
    /// `2 * accumulator_size` weights: own perspective first.
    pub(crate) weights: Vec<i8>,
    pub(crate) bias: i32,
}

/// Loaded, read-only network weights. Shared by all search threads.
#[derive(Debug)]
pub struct Network {
    pub(crate) accumulator_size: usize,
    /// Feature transformer, feature-major: `[NUM_FEATURES][accumulator_size]`.
    pub(crate) feature_weights: Vec<i16>,
    pub(crate) feature_bias: Vec<i16>,
    pub(crate) buckets: Vec<OutputBucket>,
}

impl Network {
    /// Load a weights file.
    pub fn load(path: &Path) -> Result<Self, NnueLoadError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let magic = read_u32(&mut reader)?;
        if magic != NNUE_MAGIC {
            return Err(NnueLoadError::BadMagic { found: magic });
        }
        let version = read_u32(&mut reader)?;
        if version != NNUE_VERSION {
            return Err(NnueLoadError::BadVersion { found: version });
        }

        let king_buckets = read_u32(&mut reader)?;
        if king_buckets as usize != NUM_KING_BUCKETS {
            return Err(NnueLoadError::BadShape {
                what: "king buckets",
                found: king_buckets,
            });
        }
        let accumulator_size = read_u32(&mut reader)?;
        if !(8..=2048).contains(&accumulator_size) || !accumulator_size.is_power_of_two() {
            return Err(NnueLoadError::BadShape {
                what: "accumulator size",
                found: accumulator_size,
            });
        }
        let output_buckets = read_u32(&mut reader)?;
        if output_buckets as usize != NUM_OUTPUT_BUCKETS {
            return Err(NnueLoadError::BadShape {
                what: "output buckets",
                found: output_buckets,
            });
        }
        let accumulator_size = accumulator_size as usize;

        let feature_weights = read_i16_vec(&mut reader, NUM_FEATURES * accumulator_size)?;
        let feature_bias = read_i16_vec(&mut reader, accumulator_size)?;

        let mut buckets = Vec::with_capacity(NUM_OUTPUT_BUCKETS);
        for _ in 0..NUM_OUTPUT_BUCKETS {
            let weights = read_i8_vec(&mut reader, 2 * accumulator_size)?;
            let bias = read_i32(&mut reader)?;
            buckets.push(OutputBucket { weights, bias });
        }

        Ok(Network {
            accumulator_size,
            feature_weights,
            feature_bias,
            buckets,
        })
    }

    #[inline]
    #[must_use]
    pub fn accumulator_size(&self) -> usize {
        self.accumulator_size
    }

    /// Feature transformer column for one input feature.
    #[inline]
    pub(crate) fn feature_column(&self, feature: usize) -> &[i16] {
        let start = feature * self.accumulator_size;
        &self.feature_weights[start..start + self.accumulator_size]
    }

    /// Run the output head on the two perspective accumulators. The
    /// side-to-move accumulator comes first. Returns a raw fixed-point
    /// score from the mover's point of view.
    #[must_use]
    pub fn forward(&self, own: &[i16], other: &[i16], variant: usize) -> i32 {
        debug_assert_eq!(own.len(), self.accumulator_size);
        debug_assert_eq!(other.len(), self.accumulator_size);
        let bucket = &self.buckets[variant];

        let mut sum: i32 = 0;
        for (i, &v) in own.iter().enumerate() {
            let activated = (v as i32).clamp(0, ACTIVATION_MAX);
            sum += activated * bucket.weights[i] as i32;
        }
        for (i, &v) in other.iter().enumerate() {
            let activated = (v as i32).clamp(0, ACTIVATION_MAX);
            sum += activated * bucket.weights[self.accumulator_size + i] as i32;
        }

        // Divide by the weight scale, rounding to nearest.
        ((sum + (1 << (OUTPUT_SHIFT - 1))) >> OUTPUT_SHIFT) + bucket.bias
    }

    /// Raw head output to centipawns.
    #[inline]
    #[must_use]
    pub fn to_centipawns(raw: i32) -> i32 {
        raw * 100 / ACTIVATION_MAX
    }
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_i16_vec<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<i16>> {
    let mut bytes = vec![0u8; len * 2];
    reader.read_exact(&mut bytes)?;
    Ok(bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect())
}

fn read_i8_vec<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<i8>> {
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    Ok(bytes.into_iter().map(|b| b as i8).collect())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Deterministic toy network for tests: small accumulator, nonzero
    /// weights derived from the index so different features disagree.
    pub(crate) fn tiny_network() -> Network {
        let accumulator_size = 8;
        let feature_weights = (0..NUM_FEATURES * accumulator_size)
            .map(|i| ((i * 37 + 11) % 17) as i16 - 8)
            .collect();
        let feature_bias = (0..accumulator_size).map(|i| (i as i16 % 5) - 2).collect();
        let buckets = (0..NUM_OUTPUT_BUCKETS)
            .map(|b| OutputBucket {
                weights: (0..2 * accumulator_size)
                    .map(|i| (((i + b) * 23 + 7) % 13) as i8 - 6)
                    .collect(),
                bias: b as i32 * 10 - 40,
            })
            .collect();
        Network {
            accumulator_size,
            feature_weights,
            feature_bias,
            buckets,
        }
    }

    /// Serialize a network in the on-disk format.
    pub(crate) fn serialize(net: &Network) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&NNUE_MAGIC.to_le_bytes());
        out.extend_from_slice(&NNUE_VERSION.to_le_bytes());
        out.extend_from_slice(&(NUM_KING_BUCKETS as u32).to_le_bytes());
        out.extend_from_slice(&(net.accumulator_size as u32).to_le_bytes());
        out.extend_from_slice(&(NUM_OUTPUT_BUCKETS as u32).to_le_bytes());
        for w in &net.feature_weights {
            out.extend_from_slice(&w.to_le_bytes());
        }
        for b in &net.feature_bias {
            out.extend_from_slice(&b.to_le_bytes());
        }
        for bucket in &net.buckets {
            for w in &bucket.weights {
                out.extend_from_slice(&(*w as u8).to_le_bytes());
            }
            out.extend_from_slice(&bucket.bias.to_le_bytes());
        }
        out
    }
}
