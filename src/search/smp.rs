//! Lazy SMP.
//!
//! Helper threads run the same iterative deepening on copies of the root
//! position, sharing only the transposition table and network weights.
//! There is no work splitting: cross-pollination through the shared
//! table is the whole coordination mechanism. Helpers search one ply
//! deeper on odd worker ids to desynchronize their trees.

use std::sync::Arc;
use std::thread;

use crate::board::{Move, Position};
use crate::eval::Evaluator;
use crate::sync::StopFlag;
use crate::tt::TranspositionTable;

use super::{GameHistory, InfoCallback, SearchLimits, SearchResult, Searcher};

/// Deep recursion with per-frame move lists needs a roomy stack.
const SEARCH_STACK_SIZE: usize = 16 * 1024 * 1024;

/// Everything a parallel search needs.
pub struct SmpRequest {
    pub root: Position,
    pub history: GameHistory,
    pub limits: SearchLimits,
    pub threads: usize,
    pub multi_pv: usize,
    pub root_moves: Vec<Move>,
    pub info_callback: Option<InfoCallback>,
}

/// Search with `threads` workers; blocks until the main worker finishes
/// and all helpers have been stopped and joined.
#[must_use]
pub fn search(
    request: SmpRequest,
    tt: &Arc<TranspositionTable>,
    evaluator: &Evaluator,
    stop: &StopFlag,
) -> SearchResult {
    let threads = request.threads.max(1);
    let helper_stop = stop.clone();

    let mut handles = Vec::new();
    for worker_id in 1..threads {
        let tt = Arc::clone(tt);
        let evaluator = evaluator.clone();
        let stop = stop.clone();
        let root = request.root;
        let history = request.history.clone();
        let root_moves = request.root_moves.clone();
        // Odd helpers search one ply deeper to diversify the shared TT.
        let limits = request
            .limits
            .depth(request.limits.max_depth.saturating_add(worker_id as u32 % 2));
        let handle = thread::Builder::new()
            .name(format!("search-{worker_id}"))
            .stack_size(SEARCH_STACK_SIZE)
            .spawn(move || {
                let mut searcher = Searcher::new(tt, evaluator);
                searcher.set_main(false);
                searcher.set_game_history(history);
                searcher.set_root_moves(root_moves);
                searcher.run(&root, limits, stop, 1)
            })
            .expect("failed to spawn search worker");
        handles.push(handle);
    }

    let mut main = Searcher::new(Arc::clone(tt), evaluator.clone());
    main.set_game_history(request.history);
    main.set_root_moves(request.root_moves);
    main.set_info_callback(request.info_callback);
    let result = main.run(&request.root, request.limits, stop.clone(), request.multi_pv);

    // The main worker decides; helpers only feed the table.
    helper_stop.set();
    for handle in handles {
        let _ = handle.join();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tt::DEFAULT_TT_MB;

    #[test]
    fn parallel_and_single_agree_on_obvious_position() {
        // Mate in one: every thread count must find it.
        let root =
            Position::from_fen("6k1/5ppp/8/8/8/8/8/4Q2K w - - 0 1").unwrap();
        for threads in [1, 3] {
            let tt = Arc::new(TranspositionTable::new(DEFAULT_TT_MB));
            let stop = StopFlag::new();
            let request = SmpRequest {
                root,
                history: GameHistory::new(),
                limits: SearchLimits::default().depth(4),
                threads,
                multi_pv: 1,
                root_moves: Vec::new(),
                info_callback: None,
            };
            let result = search(request, &tt, &Evaluator::new(None), &stop);
            assert_eq!(
                result.best_move.map(|m| m.to_string()),
                Some("e1e8".to_string()),
                "threads {threads}"
            );
        }
    }
}
