//! Alpha-beta search.
//!
//! Iterative deepening with aspiration windows drives a principal-
//! variation negamax with null-move pruning, late-move reductions, and a
//! tactical quiescence tail. Each searcher owns its frame stack, move
//! ordering state, and NNUE accumulators; the transposition table and
//! network weights are shared.

mod alphabeta;
pub mod control;
mod history;
mod iterative;
mod ordering;
mod quiescence;
pub mod smp;

pub use control::{SearchLimits, TimeConfig, TimeControl};
pub use history::GameHistory;
pub use ordering::MoveOrderer;

use std::sync::Arc;
use std::time::Instant;

use crate::board::{Move, Position};
use crate::eval::nnue::NnueState;
use crate::eval::Evaluator;
use crate::sync::StopFlag;
use crate::tt::TranspositionTable;

/// Search stack height; no line grows past this many plies.
pub const MAX_PLY: usize = 256;

/// Sentinel for an aborted node. Recognized (and discarded) by iterative
/// deepening; never a legal evaluation.
pub(crate) const ABORTED_SCORE: i32 = i32::MIN + 1;

/// Result of a completed search.
#[derive(Clone, Debug, Default)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub ponder_move: Option<Move>,
    pub score: i32,
    pub depth: u32,
    pub pv: Vec<Move>,
}

/// Counters reported on `info` lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct SearchStats {
    pub nodes: u64,
    pub seldepth: u32,
    pub tt_hits: u64,
}

/// Per-iteration report for the driver.
#[derive(Clone, Debug)]
pub struct IterationInfo {
    pub depth: u32,
    pub seldepth: u32,
    pub multipv: usize,
    pub score: i32,
    pub nodes: u64,
    pub nps: u64,
    pub time_ms: u64,
    pub hashfull: u32,
    pub pv: Vec<Move>,
}

pub type InfoCallback = Arc<dyn Fn(&IterationInfo) + Send + Sync>;

/// Endgame tablebase probe interface. The engine ships no file reader;
/// a prober that answers `None` ("not available") makes the search fall
/// back to its normal path.
pub trait TablebaseProbe: Send + Sync {
    /// Exact score for the position, from the side to move, if probing
    /// succeeds.
    fn probe(&self, pos: &Position, ply: usize) -> Option<i32>;
}

/// One frame per ply. The position is copied in from the parent; there
/// is no unmake.
#[derive(Clone, Copy)]
struct Frame {
    position: Position,
    /// Move that created this node; `Move::NONE` at the root and after a
    /// null move.
    previous: Move,
    /// Static eval cached at this node, or `None` while in check.
    static_eval: Option<i32>,
}

impl Frame {
    fn empty() -> Self {
        Frame {
            position: Position::startpos(),
            previous: Move::NONE,
            static_eval: None,
        }
    }
}

/// One search thread's state.
pub struct Searcher {
    tt: Arc<TranspositionTable>,
    evaluator: Evaluator,
    frames: Vec<Frame>,
    pv: Vec<Vec<Move>>,
    orderer: MoveOrderer,
    nnue: Option<NnueState>,
    history: GameHistory,
    stop: StopFlag,
    limits: SearchLimits,
    start_time: Instant,
    aborted: bool,
    pub stats: SearchStats,
    /// Root move filter (`searchmoves`); empty means all moves.
    root_moves: Vec<Move>,
    /// First moves of already-found PV lines, excluded in MultiPV.
    excluded_root_moves: Vec<Move>,
    info_callback: Option<InfoCallback>,
    tablebase: Option<Arc<dyn TablebaseProbe>>,
    /// Only the main searcher bumps the TT generation and reports info.
    is_main: bool,
}

impl Searcher {
    #[must_use]
    pub fn new(tt: Arc<TranspositionTable>, evaluator: Evaluator) -> Self {
        let nnue = evaluator
            .network()
            .map(|network| NnueState::new(network, MAX_PLY));
        Searcher {
            tt,
            evaluator,
            frames: vec![Frame::empty(); MAX_PLY + 1],
            pv: vec![Vec::new(); MAX_PLY + 1],
            orderer: MoveOrderer::new(),
            nnue,
            history: GameHistory::new(),
            stop: StopFlag::new(),
            limits: SearchLimits::default(),
            start_time: Instant::now(),
            aborted: false,
            stats: SearchStats::default(),
            root_moves: Vec::new(),
            excluded_root_moves: Vec::new(),
            info_callback: None,
            tablebase: None,
            is_main: true,
        }
    }

    pub fn set_main(&mut self, is_main: bool) {
        self.is_main = is_main;
    }

    pub fn set_tablebase(&mut self, tablebase: Option<Arc<dyn TablebaseProbe>>) {
        self.tablebase = tablebase;
    }

    pub fn set_game_history(&mut self, history: GameHistory) {
        self.history = history;
    }

    pub fn set_root_moves(&mut self, moves: Vec<Move>) {
        self.root_moves = moves;
    }

    pub fn set_info_callback(&mut self, callback: Option<InfoCallback>) {
        self.info_callback = callback;
    }

    /// Clear state that persists between games.
    pub fn new_game(&mut self) {
        self.orderer.clear();
        self.history.clear();
    }

    /// Cooperative cancellation poll. Checked at every node; the wall
    /// clock is consulted once per 1024 nodes.
    #[inline]
    fn should_abort(&mut self) -> bool {
        if self.aborted {
            return true;
        }
        if self.stop.is_set() {
            self.aborted = true;
            return true;
        }
        if self.stats.nodes & 1023 == 0 && self.limits.hard_expired(Instant::now()) {
            self.aborted = true;
            return true;
        }
        false
    }

    /// Static eval at `ply`, computed once and cached on the frame.
    fn static_eval(&mut self, ply: usize) -> i32 {
        if let Some(cached) = self.frames[ply].static_eval {
            return cached;
        }
        let pos = self.frames[ply].position;
        let value = match (&mut self.nnue, self.evaluator.network()) {
            (Some(nnue), Some(_)) => self.evaluator.evaluate(&pos, nnue, ply),
            _ => self.evaluator.evaluate_standalone(&pos),
        };
        self.frames[ply].static_eval = Some(value);
        value
    }

    /// Repetition along the current search path or in the played game.
    /// One prior occurrence anywhere suffices.
    fn is_repetition(&self, ply: usize) -> bool {
        let hash = self.frames[ply].position.hash();
        for i in (0..ply).rev() {
            if self.frames[i].position.hash() == hash {
                return true;
            }
        }
        self.history.count(hash) > 0
    }

    /// Install a child frame after a successful make.
    fn enter_child(&mut self, ply: usize, position: Position, previous: Move) {
        let child = &mut self.frames[ply];
        child.position = position;
        child.previous = previous;
        child.static_eval = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::MATE_SCORE;
    use crate::tt::DEFAULT_TT_MB;

    fn searcher() -> Searcher {
        Searcher::new(
            Arc::new(TranspositionTable::new(DEFAULT_TT_MB)),
            Evaluator::new(None),
        )
    }

    /// A node whose hash already appears on the search path scores
    /// exactly zero, the moment it recurs.
    #[test]
    fn path_repetition_scores_zero() {
        let mut s = searcher();
        let mut pos = Position::startpos();
        s.frames[0].position = pos;
        for (ply, text) in ["g1f3", "g8f6", "f3g1", "f6g8"].iter().enumerate() {
            let mv = pos.parse_move(text).unwrap();
            assert!(pos.make_move(mv));
            s.frames[ply + 1].position = pos;
        }
        // Frame 4 is the start position again.
        assert_eq!(s.frames[4].position.hash(), s.frames[0].position.hash());
        assert!(s.is_repetition(4));
        let score = s.negamax(4, 3, -MATE_SCORE, MATE_SCORE, true);
        assert_eq!(score, 0);
    }

    /// One prior occurrence in the played game counts like a path
    /// ancestor.
    #[test]
    fn game_history_repetition_scores_zero() {
        let mut s = searcher();
        let startpos = Position::startpos();
        let mut history = GameHistory::new();
        history.push(startpos.hash());
        s.set_game_history(history);
        // The root is a different position; the node under it recreates
        // the start position known only from the game history.
        let mut root = startpos;
        assert!(root.make_move(root.parse_move("e2e4").unwrap()));
        s.frames[0].position = root;
        s.frames[1].position = startpos;
        assert!(s.is_repetition(1));
        let score = s.negamax(1, 3, -MATE_SCORE, MATE_SCORE, true);
        assert_eq!(score, 0);
    }
}
