//! Principal-variation negamax.

use once_cell::sync::Lazy;

use crate::board::{DirtyList, GenMode, Move, MoveList, PackedMove};
use crate::eval::{DRAW_SCORE, MATE_SCORE};
use crate::tt::{Bound, TtData, EVAL_NONE};

use super::{Searcher, ABORTED_SCORE, MAX_PLY};

/// Quiet moves tried at full depth before reductions kick in.
const LMR_FULL_DEPTH_MOVES: usize = 3;
/// Reductions need some remaining depth to be meaningful.
const LMR_MIN_DEPTH: u32 = 3;
/// Null-move pruning preconditions.
const NULL_MOVE_MIN_DEPTH: u32 = 3;

/// Reduction table over (depth, move index): `0.5 + ln(d) * ln(i) / 2.5`.
static LMR_TABLE: Lazy<[[u32; 64]; 64]> = Lazy::new(|| {
    let mut table = [[0u32; 64]; 64];
    for (depth, row) in table.iter_mut().enumerate().skip(1) {
        for (index, cell) in row.iter_mut().enumerate().skip(1) {
            let value = 0.5 + (depth as f64).ln() * (index as f64).ln() / 2.5;
            *cell = value as u32;
        }
    }
    table
});

fn lmr_reduction(depth: u32, move_index: usize) -> u32 {
    LMR_TABLE[(depth as usize).min(63)][move_index.min(63)]
}

impl Searcher {
    /// Negamax with alpha-beta, from the frame at `ply`.
    pub(super) fn negamax(
        &mut self,
        ply: usize,
        depth: u32,
        mut alpha: i32,
        mut beta: i32,
        allow_null: bool,
    ) -> i32 {
        self.stats.nodes = self.stats.nodes.wrapping_add(1);
        if self.should_abort() {
            return ABORTED_SCORE;
        }
        self.pv[ply].clear();

        let is_root = ply == 0;
        let is_pv = beta > alpha + 1;
        let pos = self.frames[ply].position;

        if !is_root {
            // Draw detection: path/history repetition (first recurrence
            // suffices), the fifty-move rule, and bare material.
            if self.is_repetition(ply)
                || pos.halfmove_clock() >= 100
                || pos.is_insufficient_material()
            {
                return DRAW_SCORE;
            }
            if ply >= MAX_PLY - 1 {
                return self.static_eval(ply);
            }

            // Tablebase hit: exact score, no search below this node. A
            // failed probe ("not available") falls through.
            if let Some(tablebase) = &self.tablebase {
                if let Some(score) = tablebase.probe(&pos, ply) {
                    return score;
                }
            }

            // Mate-distance pruning: the best possible outcome from here
            // cannot beat an already-found shorter mate.
            alpha = alpha.max(-MATE_SCORE + ply as i32);
            beta = beta.min(MATE_SCORE - ply as i32 - 1);
            if alpha >= beta {
                return alpha;
            }
        }

        if depth == 0 {
            return self.quiescence(ply, alpha, beta);
        }

        if ply as u32 + 1 > self.stats.seldepth {
            self.stats.seldepth = ply as u32 + 1;
        }

        // Transposition table: cutoffs at non-PV nodes, move hint always.
        let mut tt_move = PackedMove::NONE;
        let mut tt_static_eval = None;
        if let Some(entry) = self.tt.probe(pos.hash(), ply as u32) {
            tt_move = entry.mv;
            if entry.static_eval != EVAL_NONE {
                tt_static_eval = Some(entry.static_eval);
            }
            if !is_pv && !is_root && entry.depth >= depth {
                self.stats.tt_hits += 1;
                match entry.bound {
                    Bound::Exact => return entry.score,
                    Bound::Lower => alpha = alpha.max(entry.score),
                    Bound::Upper => beta = beta.min(entry.score),
                }
                if alpha >= beta {
                    return alpha;
                }
            }
        }

        let us = pos.side_to_move();
        let in_check = pos.is_in_check(us);

        // Static eval, cached on the frame; all eval-gated pruning is
        // switched off while in check.
        let static_eval = if in_check {
            None
        } else if let Some(eval) = tt_static_eval {
            self.frames[ply].static_eval = Some(eval);
            Some(eval)
        } else {
            Some(self.static_eval(ply))
        };

        // Null-move pruning: hand the opponent a free move; if a reduced
        // search still fails high, the real position surely would.
        if allow_null
            && !is_pv
            && !is_root
            && !in_check
            && depth >= NULL_MOVE_MIN_DEPTH
            && static_eval.is_some_and(|eval| eval >= beta)
            && pos.has_non_pawn_material(us)
        {
            let mut child = pos;
            child.make_null_move();
            self.enter_child(ply + 1, child, Move::NONE);
            if let Some(nnue) = &mut self.nnue {
                nnue.push_null(ply + 1, &child);
            }
            let null_depth = depth.saturating_sub(3 + depth / 6);
            let score = -self.negamax(ply + 1, null_depth, -beta, -beta + 1, false);
            if self.aborted {
                return ABORTED_SCORE;
            }
            if score >= beta {
                return beta;
            }
        }

        let mut moves = MoveList::new();
        pos.generate_moves(&mut moves, GenMode::All);
        let previous = self.frames[ply].previous;
        let mut scored = self.orderer.score_moves(&pos, &moves, tt_move, ply, previous);

        let original_alpha = alpha;
        let mut best_score = -MATE_SCORE - 1;
        let mut best_move = Move::NONE;
        let mut legal_moves = 0usize;
        let mut dirty = DirtyList::default();

        let mut index = 0;
        while let Some(scored_move) = scored.pick_best(index) {
            index += 1;
            let mv = scored_move.mv;

            if is_root && !self.is_searchable_root_move(mv) {
                continue;
            }

            let mut child = pos;
            if !child.make_move_dirty(mv, &mut dirty) {
                continue;
            }
            legal_moves += 1;

            self.enter_child(ply + 1, child, mv);
            if let Some(nnue) = &mut self.nnue {
                nnue.push(ply + 1, &child, &dirty);
            }

            let gives_check = child.is_in_check(child.side_to_move());
            let extension = u32::from(gives_check);
            let child_depth = depth - 1 + extension;

            // Late-move reductions for quiet, non-checking, non-killer
            // moves once the best candidates have been searched at full
            // depth.
            let mut reduction = 0;
            if depth >= LMR_MIN_DEPTH
                && legal_moves > LMR_FULL_DEPTH_MOVES
                && mv.is_quiet()
                && !in_check
                && !gives_check
                && !self.orderer.is_killer(ply, mv)
            {
                reduction = lmr_reduction(depth, index).min(child_depth.saturating_sub(1));
            }

            let mut score;
            if legal_moves == 1 {
                score = -self.negamax(ply + 1, child_depth, -beta, -alpha, true);
            } else {
                // Zero-window probe, with two re-search stages: undo the
                // reduction first, then open the window.
                score =
                    -self.negamax(ply + 1, child_depth - reduction, -alpha - 1, -alpha, true);
                if !self.aborted && reduction > 0 && score > alpha {
                    score = -self.negamax(ply + 1, child_depth, -alpha - 1, -alpha, true);
                }
                if !self.aborted && score > alpha && score < beta {
                    score = -self.negamax(ply + 1, child_depth, -beta, -alpha, true);
                }
            }
            if self.aborted {
                return ABORTED_SCORE;
            }

            if score > best_score {
                best_score = score;
                best_move = mv;
                if score > alpha {
                    alpha = score;
                    self.update_pv(ply, mv);
                    if alpha >= beta {
                        self.orderer.on_beta_cutoff(us, mv, previous, ply, depth);
                        break;
                    }
                }
            }
        }

        if legal_moves == 0 {
            return if in_check {
                -MATE_SCORE + ply as i32
            } else {
                DRAW_SCORE
            };
        }

        let bound = if best_score >= beta {
            Bound::Lower
        } else if best_score > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        // A root restricted by searchmoves or MultiPV exclusions would
        // poison the table with subset results.
        let filtered_root =
            is_root && !(self.root_moves.is_empty() && self.excluded_root_moves.is_empty());
        if !filtered_root {
            self.tt.store(
                pos.hash(),
                TtData {
                    mv: best_move.packed(),
                    score: best_score,
                    static_eval: static_eval.unwrap_or(EVAL_NONE),
                    depth,
                    bound,
                },
                ply as u32,
            );
        }

        best_score
    }

    fn is_searchable_root_move(&self, mv: Move) -> bool {
        if self.excluded_root_moves.contains(&mv) {
            return false;
        }
        self.root_moves.is_empty() || self.root_moves.contains(&mv)
    }

    /// Prepend `mv` to the child's line.
    fn update_pv(&mut self, ply: usize, mv: Move) {
        let (head, tail) = self.pv.split_at_mut(ply + 1);
        let line = &mut head[ply];
        line.clear();
        line.push(mv);
        line.extend_from_slice(&tail[0]);
    }
}
