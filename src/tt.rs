//! Shared transposition table.
//!
//! An array of cache-line clusters, three 16-byte entries each, indexed
//! by the high bits of the position hash and keyed by the low 16 bits.
//! Entries are stored as two relaxed atomic words; readers may observe a
//! torn pair, so every consumer validates the stored move against the
//! position's legality filter and clamps scores. A 6-bit generation
//! counter, bumped once per top-level search, steers replacement toward
//! stale entries.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::board::PackedMove;
use crate::eval::MATE_THRESHOLD;

/// Bound of a stored score relative to the search window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    /// Score is a lower bound (the node failed high).
    Lower,
    /// Score is an upper bound (the node failed low).
    Upper,
}

impl Bound {
    const fn to_bits(self) -> u8 {
        match self {
            Bound::Exact => 1,
            Bound::Lower => 2,
            Bound::Upper => 3,
        }
    }

    const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(Bound::Exact),
            2 => Some(Bound::Lower),
            3 => Some(Bound::Upper),
            _ => None,
        }
    }
}

/// Decoded table entry.
#[derive(Clone, Copy, Debug)]
pub struct TtData {
    pub mv: PackedMove,
    pub score: i32,
    pub static_eval: i32,
    pub depth: u32,
    pub bound: Bound,
}

const ENTRIES_PER_CLUSTER: usize = 3;
const WORDS_PER_ENTRY: usize = 2;
const WORDS_PER_CLUSTER: usize = ENTRIES_PER_CLUSTER * WORDS_PER_ENTRY;
const GENERATION_MASK: u8 = 0x3F;

/// Default table size in megabytes.
pub const DEFAULT_TT_MB: usize = 16;

/// Sentinel for "no static eval stored" (positions that were in check).
pub const EVAL_NONE: i32 = i16::MIN as i32;

struct DecodedEntry {
    key: u16,
    data: TtData,
    generation: u8,
}

/// Word 0: key | move | score | static eval. Word 1: depth | bound/gen.
fn encode(key: u16, data: &TtData, generation: u8) -> (u64, u64) {
    let score = data.score.clamp(i16::MIN as i32, i16::MAX as i32) as i16 as u16;
    let eval = data.static_eval.clamp(i16::MIN as i32, i16::MAX as i32) as i16 as u16;
    let word0 = key as u64
        | (data.mv.raw() as u64) << 16
        | (score as u64) << 32
        | (eval as u64) << 48;
    let flags = data.bound.to_bits() | (generation & GENERATION_MASK) << 2;
    let word1 = (data.depth.min(255) as u64) | (flags as u64) << 8;
    (word0, word1)
}

fn decode(word0: u64, word1: u64) -> Option<DecodedEntry> {
    let flags = ((word1 >> 8) & 0xFF) as u8;
    let bound = Bound::from_bits(flags & 0x3)?;
    Some(DecodedEntry {
        key: word0 as u16,
        data: TtData {
            mv: PackedMove::from_raw((word0 >> 16) as u16),
            score: ((word0 >> 32) as u16 as i16) as i32,
            static_eval: ((word0 >> 48) as u16 as i16) as i32,
            depth: (word1 & 0xFF) as u32,
            bound,
        },
        generation: flags >> 2,
    })
}

pub struct TranspositionTable {
    words: Vec<AtomicU64>,
    cluster_mask: usize,
    generation: AtomicU8,
}

impl TranspositionTable {
    /// Allocate a table of roughly `size_mb` megabytes, rounded to a
    /// power of two of clusters.
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        let clusters = Self::clusters_for_mb(size_mb);
        let words = (0..clusters * WORDS_PER_CLUSTER)
            .map(|_| AtomicU64::new(0))
            .collect();
        TranspositionTable {
            words,
            cluster_mask: clusters - 1,
            generation: AtomicU8::new(0),
        }
    }

    fn clusters_for_mb(size_mb: usize) -> usize {
        let bytes = size_mb.max(1) * 1024 * 1024;
        let wanted = bytes / (WORDS_PER_CLUSTER * 8);
        wanted.next_power_of_two().max(1024)
    }

    /// Number of clusters (always a power of two).
    #[must_use]
    pub fn num_clusters(&self) -> usize {
        self.cluster_mask + 1
    }

    /// Wipe all entries.
    pub fn clear(&mut self) {
        for word in &self.words {
            word.store(0, Ordering::Relaxed);
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Reallocate to a new size, rehashing surviving entries when asked.
    pub fn resize(&mut self, size_mb: usize, preserve: bool) {
        let clusters = Self::clusters_for_mb(size_mb);
        if clusters == self.num_clusters() {
            return;
        }
        log::debug!(
            "resizing transposition table: {} -> {clusters} clusters",
            self.num_clusters()
        );
        let old = std::mem::replace(
            &mut self.words,
            (0..clusters * WORDS_PER_CLUSTER)
                .map(|_| AtomicU64::new(0))
                .collect(),
        );
        let old_mask = self.cluster_mask;
        self.cluster_mask = clusters - 1;

        if preserve {
            for cluster in 0..=old_mask {
                for slot in 0..ENTRIES_PER_CLUSTER {
                    let base = cluster * WORDS_PER_CLUSTER + slot * WORDS_PER_ENTRY;
                    let word0 = old[base].load(Ordering::Relaxed);
                    let word1 = old[base + 1].load(Ordering::Relaxed);
                    if decode(word0, word1).is_some() {
                        // Only the cluster index and the 16-bit key of the
                        // original hash survive in the entry, so rehashing
                        // is exact when shrinking; when growing, entries
                        // whose new index bits cannot be recovered simply
                        // miss on their next probe.
                        let hash = (cluster as u64) << 32;
                        self.store_raw(hash, word0, word1);
                    }
                }
            }
        }
    }

    /// Start a new top-level search: age every stored entry by one.
    pub fn new_generation(&self) {
        let next = (self.generation() + 1) & GENERATION_MASK;
        self.generation.store(next, Ordering::Relaxed);
    }

    #[must_use]
    pub fn generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    #[inline]
    fn cluster_base(&self, hash: u64) -> usize {
        (((hash >> 32) as usize) & self.cluster_mask) * WORDS_PER_CLUSTER
    }

    #[inline]
    fn entry_key(hash: u64) -> u16 {
        hash as u16
    }

    /// Look up a position. `ply` converts stored mate scores back to
    /// root-relative form.
    #[must_use]
    pub fn probe(&self, hash: u64, ply: u32) -> Option<TtData> {
        let base = self.cluster_base(hash);
        let key = Self::entry_key(hash);
        for slot in 0..ENTRIES_PER_CLUSTER {
            let idx = base + slot * WORDS_PER_ENTRY;
            let word0 = self.words[idx].load(Ordering::Relaxed);
            let word1 = self.words[idx + 1].load(Ordering::Relaxed);
            if let Some(entry) = decode(word0, word1) {
                if entry.key == key {
                    let mut data = entry.data;
                    data.score = score_from_tt(data.score, ply);
                    return Some(data);
                }
            }
        }
        None
    }

    /// Store a search result. `ply` converts root-relative mate scores
    /// to node-relative form for storage.
    pub fn store(&self, hash: u64, mut data: TtData, ply: u32) {
        data.score = score_to_tt(data.score, ply);
        let base = self.cluster_base(hash);
        let key = Self::entry_key(hash);

        let mut victim_slot = 0;
        let mut victim_priority = i32::MAX;
        for slot in 0..ENTRIES_PER_CLUSTER {
            let idx = base + slot * WORDS_PER_ENTRY;
            let word0 = self.words[idx].load(Ordering::Relaxed);
            let word1 = self.words[idx + 1].load(Ordering::Relaxed);
            let Some(entry) = decode(word0, word1) else {
                // Invalid entry: take it immediately.
                victim_slot = slot;
                victim_priority = i32::MIN;
                break;
            };

            if entry.key == key {
                // Same position: a same-bound store only replaces when at
                // least as deep; keep the old move if the new has none.
                if entry.data.bound == data.bound && data.depth < entry.data.depth {
                    return;
                }
                if data.mv.is_none() {
                    data.mv = entry.data.mv;
                }
                victim_slot = slot;
                victim_priority = i32::MIN;
                break;
            }

            let staleness =
                (self.generation().wrapping_sub(entry.generation) & GENERATION_MASK) as i32;
            let priority = entry.data.depth as i32 - 2 * staleness;
            if priority < victim_priority {
                victim_priority = priority;
                victim_slot = slot;
            }
        }

        let (word0, word1) = encode(key, &data, self.generation());
        let idx = base + victim_slot * WORDS_PER_ENTRY;
        self.words[idx].store(word0, Ordering::Relaxed);
        self.words[idx + 1].store(word1, Ordering::Relaxed);
    }

    fn store_raw(&self, hash: u64, word0: u64, word1: u64) {
        let base = self.cluster_base(hash);
        for slot in 0..ENTRIES_PER_CLUSTER {
            let idx = base + slot * WORDS_PER_ENTRY;
            if decode(
                self.words[idx].load(Ordering::Relaxed),
                self.words[idx + 1].load(Ordering::Relaxed),
            )
            .is_none()
            {
                self.words[idx].store(word0, Ordering::Relaxed);
                self.words[idx + 1].store(word1, Ordering::Relaxed);
                return;
            }
        }
        // Cluster full after rehash: drop the entry.
    }

    /// Occupancy of the current generation, per mille, sampled over the
    /// first clusters.
    #[must_use]
    pub fn hashfull_per_mille(&self) -> u32 {
        let sample_clusters = 1000.min(self.num_clusters());
        let mut used = 0;
        for cluster in 0..sample_clusters {
            for slot in 0..ENTRIES_PER_CLUSTER {
                let idx = cluster * WORDS_PER_CLUSTER + slot * WORDS_PER_ENTRY;
                let word1 = self.words[idx + 1].load(Ordering::Relaxed);
                if let Some(entry) = decode(self.words[idx].load(Ordering::Relaxed), word1) {
                    if entry.generation == self.generation() {
                        used += 1;
                    }
                }
            }
        }
        (used * 1000 / (sample_clusters as u32 * ENTRIES_PER_CLUSTER as u32)) as u32
    }
}

/// Mate scores are stored relative to the storing node so they survive
/// re-entry at different depths.
#[inline]
#[must_use]
pub fn score_to_tt(score: i32, ply: u32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply as i32
    } else if score <= -MATE_THRESHOLD {
        score - ply as i32
    } else {
        score
    }
}

#[inline]
#[must_use]
pub fn score_from_tt(score: i32, ply: u32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply as i32
    } else if score <= -MATE_THRESHOLD {
        score + ply as i32
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::MATE_SCORE;

    fn data(depth: u32, score: i32, bound: Bound) -> TtData {
        TtData {
            mv: PackedMove::from_raw(0x1234),
            score,
            static_eval: 42,
            depth,
            bound,
        }
    }

    #[test]
    fn probe_returns_stored_entry() {
        let tt = TranspositionTable::new(1);
        let hash = 0xDEAD_BEEF_1234_5678;
        tt.store(hash, data(7, 150, Bound::Exact), 0);
        let found = tt.probe(hash, 0).expect("entry present");
        assert_eq!(found.depth, 7);
        assert_eq!(found.score, 150);
        assert_eq!(found.static_eval, 42);
        assert_eq!(found.bound, Bound::Exact);
        assert_eq!(found.mv.raw(), 0x1234);
    }

    #[test]
    fn probe_misses_different_key() {
        let tt = TranspositionTable::new(1);
        tt.store(0xAAAA_0000_0000_1111, data(5, 10, Bound::Lower), 0);
        // Same cluster bits, different low key.
        assert!(tt.probe(0xAAAA_0000_0000_2222, 0).is_none());
    }

    #[test]
    fn same_bound_needs_depth_to_replace() {
        let tt = TranspositionTable::new(1);
        let hash = 0x1111_2222_3333_4444;
        tt.store(hash, data(10, 100, Bound::Exact), 0);
        tt.store(hash, data(3, -50, Bound::Exact), 0);
        assert_eq!(tt.probe(hash, 0).unwrap().score, 100);
        tt.store(hash, data(12, 77, Bound::Exact), 0);
        assert_eq!(tt.probe(hash, 0).unwrap().score, 77);
    }

    #[test]
    fn moveless_store_preserves_old_move() {
        let tt = TranspositionTable::new(1);
        let hash = 0x5555_6666_7777_8888;
        tt.store(hash, data(4, 10, Bound::Exact), 0);
        let mut update = data(9, 20, Bound::Exact);
        update.mv = PackedMove::NONE;
        tt.store(hash, update, 0);
        let found = tt.probe(hash, 0).unwrap();
        assert_eq!(found.score, 20);
        assert_eq!(found.mv.raw(), 0x1234);
    }

    #[test]
    fn mate_scores_adjusted_by_ply() {
        let tt = TranspositionTable::new(1);
        let hash = 0x9999_AAAA_BBBB_CCCC;
        // Mate found 5 plies into the search, scored from root.
        let mate_at_root = MATE_SCORE - 8;
        tt.store(hash, data(6, mate_at_root, Bound::Exact), 5);
        // Probing at a different height restores root-relative distance.
        let found = tt.probe(hash, 2).unwrap();
        assert_eq!(found.score, MATE_SCORE - 8 + 5 - 2);
    }

    #[test]
    fn stale_entries_evicted_first() {
        let mut tt = TranspositionTable::new(1);
        // Three entries in the same cluster, old generation.
        let base = 0x0101_0000_0000_0000u64;
        tt.store(base | 1, data(9, 1, Bound::Exact), 0);
        tt.store(base | 2, data(8, 2, Bound::Exact), 0);
        tt.store(base | 3, data(7, 3, Bound::Exact), 0);
        for _ in 0..10 {
            tt.new_generation();
        }
        // A shallow fresh entry evicts one of the stale ones.
        tt.store(base | 4, data(1, 4, Bound::Exact), 0);
        assert!(tt.probe(base | 4, 0).is_some());
    }

    #[test]
    fn resize_preserves_when_asked() {
        let mut tt = TranspositionTable::new(1);
        // High index bits zero so growth keeps the cluster recoverable.
        let hash = 0x0000_5678_9ABC_DEF0;
        tt.store(hash, data(6, 60, Bound::Lower), 0);
        tt.resize(4, true);
        let found = tt.probe(hash, 0);
        assert!(found.is_some(), "entry should survive a preserving resize");
        assert_eq!(found.unwrap().score, 60);
        tt.resize(1, false);
        assert!(tt.probe(hash, 0).is_none());
    }

    #[test]
    fn clear_empties_table() {
        let mut tt = TranspositionTable::new(1);
        let hash = 0x4444_3333_2222_1111;
        tt.store(hash, data(5, 5, Bound::Upper), 0);
        tt.clear();
        assert!(tt.probe(hash, 0).is_none());
    }
}
