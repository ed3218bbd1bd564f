//! Iterative deepening with aspiration windows and MultiPV.

use std::time::Instant;

use crate::board::Position;
use crate::eval::MATE_SCORE;
use crate::sync::StopFlag;

use super::{IterationInfo, SearchLimits, SearchResult, SearchStats, Searcher};

/// Aspiration half-width once a guess exists; wider below depth 20.
const NARROW_WINDOW: i32 = 40;
const WIDE_WINDOW: i32 = 150;
/// First depth that searches with a window at all.
const MIN_ASPIRATION_DEPTH: u32 = 5;

impl Searcher {
    /// Run iterative deepening on `root` and return the best line of the
    /// deepest fully completed iteration.
    pub fn run(
        &mut self,
        root: &Position,
        limits: SearchLimits,
        stop: StopFlag,
        multi_pv: usize,
    ) -> SearchResult {
        self.limits = limits;
        self.stop = stop;
        self.start_time = Instant::now();
        self.aborted = false;
        self.stats = SearchStats::default();
        self.frames[0].position = *root;
        self.frames[0].previous = crate::board::Move::NONE;
        self.frames[0].static_eval = None;
        if let (Some(nnue), Some(network)) = (&mut self.nnue, self.evaluator.network()) {
            nnue.reset_root(root, network);
        }

        let multi_pv = multi_pv.max(1);
        let mut result = SearchResult::default();
        let mut previous_score = 0;
        let mut have_guess = false;

        'deepening: for depth in 1..=self.limits.max_depth {
            if self.is_main {
                self.tt.new_generation();
            }
            self.stats.seldepth = 0;
            self.excluded_root_moves.clear();
            let mut lines: Vec<(i32, Vec<crate::board::Move>)> = Vec::new();

            for pv_index in 0..multi_pv {
                let score = self.aspiration_search(depth, previous_score, have_guess);
                if self.aborted {
                    // A hard abort mid-iteration: discard the partial
                    // result and keep the previous completed one.
                    break 'deepening;
                }
                let line = self.pv[0].clone();
                if pv_index == 0 {
                    previous_score = score;
                    have_guess = true;
                    if line.is_empty() {
                        // Mate or stalemate at the root.
                        result = SearchResult {
                            best_move: None,
                            ponder_move: None,
                            score,
                            depth,
                            pv: Vec::new(),
                        };
                        break 'deepening;
                    }
                }
                let Some(&first) = line.first() else {
                    break;
                };
                self.excluded_root_moves.push(first);
                self.report_iteration(depth, pv_index, score, &line);
                lines.push((score, line));
            }

            if let Some((score, line)) = lines.first() {
                result = SearchResult {
                    best_move: line.first().copied(),
                    ponder_move: line.get(1).copied(),
                    score: *score,
                    depth,
                    pv: line.clone(),
                };
            }

            if self
                .limits
                .soft_expired(Instant::now(), self.stats.nodes)
            {
                break;
            }
        }

        // Never finish without a move while one exists.
        if result.best_move.is_none() {
            result.best_move = root.legal_moves().iter().next().copied();
        }
        result
    }

    /// One aspiration-window search at the root, re-searching with the
    /// window doubled on whichever side it failed.
    fn aspiration_search(&mut self, depth: u32, guess: i32, have_guess: bool) -> i32 {
        let mut width = if depth >= 20 { NARROW_WINDOW } else { WIDE_WINDOW };
        let (mut alpha, mut beta) = if have_guess && depth >= MIN_ASPIRATION_DEPTH {
            (
                (guess - width).max(-MATE_SCORE),
                (guess + width).min(MATE_SCORE),
            )
        } else {
            (-MATE_SCORE, MATE_SCORE)
        };

        loop {
            let score = self.negamax(0, depth, alpha, beta, true);
            if self.aborted {
                return score;
            }
            if score <= alpha {
                width = width.saturating_mul(2);
                alpha = (score - width).max(-MATE_SCORE);
            } else if score >= beta {
                width = width.saturating_mul(2);
                beta = (score + width).min(MATE_SCORE);
            } else {
                return score;
            }
        }
    }

    fn report_iteration(&self, depth: u32, pv_index: usize, score: i32, pv: &[crate::board::Move]) {
        let Some(callback) = &self.info_callback else {
            return;
        };
        if !self.is_main {
            return;
        }
        let elapsed = self.start_time.elapsed();
        let time_ms = elapsed.as_millis() as u64;
        let nps = if time_ms > 0 {
            self.stats.nodes * 1000 / time_ms
        } else {
            self.stats.nodes * 1000
        };
        callback(&IterationInfo {
            depth,
            seldepth: self.stats.seldepth,
            multipv: pv_index + 1,
            score,
            nodes: self.stats.nodes,
            nps,
            time_ms,
            hashfull: self.tt.hashfull_per_mille(),
            pv: pv.to_vec(),
        });
    }
}
