//! Incrementally maintained accumulators.
//!
//! Each search frame carries one accumulator per perspective plus a dirty
//! flag and the piece deltas of the move that led there. When a frame's
//! accumulator is needed, the nearest clean ancestor whose king bucket
//! and mirror state (for that perspective) match is found and the deltas
//! are replayed forward. If the king changed bucket or crossed the board
//! half anywhere on the path, the accumulator is rebuilt from a
//! per-(perspective, bucket, mirror) cache holding a bitboard snapshot of
//! the last position computed there.

use crate::board::{Bitboard, Color, DirtyList, Position, Square, ALL_PIECES};

use super::features::{feature_index, king_state, KingState, NUM_KING_BUCKETS};
use super::network::Network;
use super::output_bucket;

/// One perspective's accumulator values. Additions saturate.
#[derive(Clone)]
pub(crate) struct Accumulator {
    values: Vec<i16>,
}

impl Accumulator {
    fn new(size: usize) -> Self {
        Accumulator {
            values: vec![0; size],
        }
    }

    fn load_bias(&mut self, network: &Network) {
        self.values.copy_from_slice(&network.feature_bias);
    }

    fn add_feature(&mut self, feature: usize, network: &Network) {
        for (v, w) in self.values.iter_mut().zip(network.feature_column(feature)) {
            *v = v.saturating_add(*w);
        }
    }

    fn sub_feature(&mut self, feature: usize, network: &Network) {
        for (v, w) in self.values.iter_mut().zip(network.feature_column(feature)) {
            *v = v.saturating_sub(*w);
        }
    }

    fn copy_from(&mut self, other: &Accumulator) {
        self.values.copy_from_slice(&other.values);
    }

    pub(crate) fn values(&self) -> &[i16] {
        &self.values
    }
}

/// Per-(perspective, king bucket, mirror) refresh slot: the accumulator
/// of the last position computed in that bucket plus its piece boards.
struct CacheSlot {
    pieces: [[Bitboard; 6]; 2],
    accumulator: Accumulator,
}

/// Refresh cache for king-bucket changes.
pub struct RefreshCache {
    slots: Vec<CacheSlot>,
}

impl RefreshCache {
    fn new(network: &Network) -> Self {
        let mut slots = Vec::with_capacity(2 * NUM_KING_BUCKETS * 2);
        for _ in 0..2 * NUM_KING_BUCKETS * 2 {
            let mut accumulator = Accumulator::new(network.accumulator_size());
            accumulator.load_bias(network);
            slots.push(CacheSlot {
                pieces: [[Bitboard::EMPTY; 6]; 2],
                accumulator,
            });
        }
        RefreshCache { slots }
    }

    fn slot_mut(&mut self, perspective: Color, state: KingState) -> &mut CacheSlot {
        let mirror = usize::from(state.mirrored);
        let idx = perspective.index() * NUM_KING_BUCKETS * 2 + state.bucket * 2 + mirror;
        &mut self.slots[idx]
    }
}

struct Frame {
    dirty: DirtyList,
    kings: [Square; 2],
    computed: [bool; 2],
    accumulators: [Accumulator; 2],
}

/// One searcher's accumulator stack plus its refresh cache.
pub struct NnueState {
    frames: Vec<Frame>,
    cache: RefreshCache,
}

impl NnueState {
    #[must_use]
    pub fn new(network: &Network, max_ply: usize) -> Self {
        let size = network.accumulator_size();
        let frames = (0..=max_ply)
            .map(|_| Frame {
                dirty: DirtyList::default(),
                kings: [Square::from_index(0); 2],
                computed: [false, false],
                accumulators: [Accumulator::new(size), Accumulator::new(size)],
            })
            .collect();
        NnueState {
            frames,
            cache: RefreshCache::new(network),
        }
    }

    /// Install the root position: both root accumulators are rebuilt from
    /// scratch and every deeper frame is invalidated.
    pub fn reset_root(&mut self, root: &Position, network: &Network) {
        for frame in &mut self.frames {
            frame.computed = [false, false];
        }
        let frame = &mut self.frames[0];
        frame.kings = [
            root.king_square(Color::White),
            root.king_square(Color::Black),
        ];
        frame.dirty.clear();
        for perspective in [Color::White, Color::Black] {
            let acc = &mut frame.accumulators[perspective.index()];
            acc.load_bias(network);
            for feature in super::features::active_features(root, perspective) {
                acc.add_feature(feature, network);
            }
            frame.computed[perspective.index()] = true;
        }
    }

    /// Record the frame reached by making a move: the position after it
    /// and the piece deltas it caused. Marks both accumulators dirty.
    pub fn push(&mut self, ply: usize, pos: &Position, dirty: &DirtyList) {
        let frame = &mut self.frames[ply];
        frame.dirty = *dirty;
        frame.kings = [
            pos.king_square(Color::White),
            pos.king_square(Color::Black),
        ];
        frame.computed = [false, false];
    }

    /// Record a null-move frame: no piece deltas.
    pub fn push_null(&mut self, ply: usize, pos: &Position) {
        let frame = &mut self.frames[ply];
        frame.dirty.clear();
        frame.kings = [
            pos.king_square(Color::White),
            pos.king_square(Color::Black),
        ];
        frame.computed = [false, false];
    }

    /// Evaluate the position at `ply`, updating accumulators as needed.
    /// Returns the centipawn score from the side to move's perspective.
    #[must_use]
    pub fn evaluate(&mut self, pos: &Position, ply: usize, network: &Network) -> i32 {
        self.ensure(Color::White, pos, ply, network);
        self.ensure(Color::Black, pos, ply, network);

        let stm = pos.side_to_move();
        let frame = &self.frames[ply];
        let own = frame.accumulators[stm.index()].values();
        let other = frame.accumulators[stm.opponent().index()].values();
        let non_king = pos.occupancy().count() - 2;
        let raw = network.forward(own, other, output_bucket(non_king));
        Network::to_centipawns(raw)
    }

    /// Make `perspective`'s accumulator at `ply` valid.
    fn ensure(&mut self, perspective: Color, pos: &Position, ply: usize, network: &Network) {
        let p = perspective.index();
        if self.frames[ply].computed[p] {
            return;
        }
        let target = king_state(self.frames[ply].kings[p], perspective);

        // Closest clean ancestor with a compatible king configuration.
        let mut anchor = None;
        for i in (0..=ply).rev() {
            if king_state(self.frames[i].kings[p], perspective) != target {
                break;
            }
            if self.frames[i].computed[p] {
                anchor = Some(i);
                break;
            }
        }

        let Some(anchor) = anchor else {
            self.refresh_from_cache(perspective, pos, ply, network);
            return;
        };

        // Replay the dirty-piece lists forward, materializing every
        // intermediate frame so sibling nodes can reuse them.
        for i in anchor + 1..=ply {
            let (before, rest) = self.frames.split_at_mut(i);
            let prev = &before[i - 1].accumulators[p];
            let frame = &mut rest[0];
            frame.accumulators[p].copy_from(prev);
            for delta in frame.dirty.iter() {
                if let Some(from) = delta.from {
                    let feature =
                        feature_index(target, perspective, delta.color, delta.piece, from);
                    frame.accumulators[p].sub_feature(feature, network);
                }
                if let Some(to) = delta.to {
                    let feature = feature_index(target, perspective, delta.color, delta.piece, to);
                    frame.accumulators[p].add_feature(feature, network);
                }
            }
            frame.computed[p] = true;
        }
    }

    /// Rebuild from the bucket cache: apply the set difference between
    /// the cached snapshot and the current position, then snapshot it.
    fn refresh_from_cache(
        &mut self,
        perspective: Color,
        pos: &Position,
        ply: usize,
        network: &Network,
    ) {
        let p = perspective.index();
        let target = king_state(self.frames[ply].kings[p], perspective);
        let slot = self.cache.slot_mut(perspective, target);

        for color in [Color::White, Color::Black] {
            for piece in ALL_PIECES {
                let now = pos.pieces(color, piece);
                let then = slot.pieces[color.index()][piece.index()];
                for sq in now & !then {
                    let feature = feature_index(target, perspective, color, piece, sq);
                    slot.accumulator.add_feature(feature, network);
                }
                for sq in then & !now {
                    let feature = feature_index(target, perspective, color, piece, sq);
                    slot.accumulator.sub_feature(feature, network);
                }
                slot.pieces[color.index()][piece.index()] = now;
            }
        }

        let frame = &mut self.frames[ply];
        frame.accumulators[p].copy_from(&slot.accumulator);
        frame.computed[p] = true;
    }

    /// Accumulator values rebuilt from scratch, for equivalence checks.
    #[cfg(test)]
    fn full_refresh(pos: &Position, perspective: Color, network: &Network) -> Vec<i16> {
        let mut acc = Accumulator::new(network.accumulator_size());
        acc.load_bias(network);
        for feature in super::features::active_features(pos, perspective) {
            acc.add_feature(feature, network);
        }
        acc.values
    }
}
