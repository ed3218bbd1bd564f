//! UCI driver: the newline-delimited text protocol on stdin/stdout.

pub mod command;
pub mod options;

use std::fmt;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crate::board::{Color, FenError, MoveParseError, Position};
use crate::eval::nnue::Network;
use crate::eval::{Evaluator, MATE_SCORE, MATE_THRESHOLD};
use crate::search::smp::{self, SmpRequest};
use crate::search::{
    GameHistory, IterationInfo, SearchLimits, TimeConfig, TimeControl,
};
use crate::sync::StopFlag;
use crate::tt::TranspositionTable;

use command::{GoParams, UciCommand};
use options::EngineOptions;

const ENGINE_NAME: &str = concat!("basalt ", env!("CARGO_PKG_VERSION"));
const ENGINE_AUTHOR: &str = "basalt developers";

/// Where protocol output goes. Swappable so tests can capture it.
pub type Output = Arc<dyn Fn(&str) + Send + Sync>;

/// `position` command failure.
#[derive(Debug, Clone)]
pub enum UciError {
    /// Invalid FEN string
    InvalidFen(FenError),
    /// Invalid move in the move list
    InvalidMove {
        move_str: String,
        error: MoveParseError,
    },
    /// Missing required parts in the command
    MissingParts,
}

impl fmt::Display for UciError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UciError::InvalidFen(e) => write!(f, "invalid fen: {e}"),
            UciError::InvalidMove { move_str, error } => {
                write!(f, "invalid move '{move_str}': {error}")
            }
            UciError::MissingParts => {
                write!(f, "position expects 'startpos' or 'fen'")
            }
        }
    }
}

impl std::error::Error for UciError {}

impl From<FenError> for UciError {
    fn from(e: FenError) -> Self {
        UciError::InvalidFen(e)
    }
}

/// Engine state driven by the command loop.
pub struct Engine {
    options: EngineOptions,
    tt: Arc<TranspositionTable>,
    evaluator: Evaluator,
    position: Position,
    history: GameHistory,
    stop: StopFlag,
    search_handle: Option<JoinHandle<()>>,
    out: Output,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Engine::with_output(Arc::new(|line: &str| println!("{line}")))
    }

    #[must_use]
    pub fn with_output(out: Output) -> Self {
        let options = EngineOptions::default();
        Engine {
            tt: Arc::new(TranspositionTable::new(options.hash_mb)),
            options,
            evaluator: Evaluator::new(None),
            position: Position::startpos(),
            history: GameHistory::new(),
            stop: StopFlag::new(),
            search_handle: None,
            out,
        }
    }

    fn send(&self, line: &str) {
        (self.out)(line);
    }

    /// Handle one input line. Returns `false` on `quit`.
    pub fn handle_line(&mut self, line: &str) -> bool {
        match UciCommand::parse(line) {
            UciCommand::Uci => self.cmd_uci(),
            UciCommand::IsReady => self.send("readyok"),
            UciCommand::UciNewGame => self.cmd_new_game(),
            UciCommand::Position(tokens) => self.cmd_position(&tokens),
            UciCommand::Go(tokens) => self.cmd_go(&tokens),
            UciCommand::SetOption { name, value } => self.cmd_setoption(&name, value.as_deref()),
            UciCommand::Stop => self.finish_search(),
            UciCommand::Quit => {
                self.stop.set();
                self.finish_search();
                return false;
            }
            UciCommand::Unknown(text) => {
                if !text.is_empty() {
                    self.send(&format!("info string unknown command '{text}'"));
                }
            }
        }
        true
    }

    fn cmd_uci(&self) {
        self.send(&format!("id name {ENGINE_NAME}"));
        self.send(&format!("id author {ENGINE_AUTHOR}"));
        for declaration in EngineOptions::declarations() {
            self.send(&declaration);
        }
        self.send("uciok");
    }

    fn cmd_new_game(&mut self) {
        self.finish_search();
        if let Some(tt) = Arc::get_mut(&mut self.tt) {
            tt.clear();
        }
        self.history.clear();
        self.position = Position::startpos();
    }

    /// `position [startpos | fen <FEN>] [moves <m1> ...]`. Transactional:
    /// any failure leaves the previous position in place.
    fn cmd_position(&mut self, tokens: &[String]) {
        match parse_position(tokens) {
            Ok((position, history)) => {
                self.position = position;
                self.history = history;
            }
            Err(error) => self.send(&format!("info string {error}")),
        }
    }

    fn cmd_setoption(&mut self, name: &str, value: Option<&str>) {
        self.finish_search();
        match name {
            "Hash" => {
                let Some(mb) = value.and_then(|v| v.parse::<usize>().ok()) else {
                    self.send("info string Hash expects a size in MB");
                    return;
                };
                self.options.hash_mb = mb.max(1);
                if let Some(tt) = Arc::get_mut(&mut self.tt) {
                    tt.resize(self.options.hash_mb, true);
                } else {
                    self.tt = Arc::new(TranspositionTable::new(self.options.hash_mb));
                }
            }
            "Threads" => {
                if let Some(threads) = value.and_then(|v| v.parse::<usize>().ok()) {
                    self.options.threads = threads.clamp(1, 256);
                }
            }
            "MultiPV" => {
                if let Some(lines) = value.and_then(|v| v.parse::<usize>().ok()) {
                    self.options.multi_pv = lines.clamp(1, 64);
                }
            }
            "MoveOverhead" => {
                if let Some(ms) = value.and_then(|v| v.parse::<u64>().ok()) {
                    self.options.move_overhead_ms = ms.min(10_000);
                }
            }
            "EvalFile" => {
                let path = value.map(PathBuf::from);
                self.options.eval_file = path.clone();
                self.load_network(path);
            }
            "SyzygyPath" => {
                self.options.syzygy_path = value.map(PathBuf::from);
            }
            _ => self.send(&format!("info string unknown option '{name}'")),
        }
    }

    /// Load weights, or fall back to network-less evaluation.
    fn load_network(&mut self, path: Option<PathBuf>) {
        let Some(path) = path else {
            self.evaluator = Evaluator::new(None);
            return;
        };
        match Network::load(&path) {
            Ok(network) => {
                self.evaluator = Evaluator::new(Some(Arc::new(network)));
                self.send(&format!("info string loaded eval file {}", path.display()));
            }
            Err(error) => {
                log::warn!("NNUE load failed: {error}");
                self.evaluator = Evaluator::new(None);
                self.send(&format!(
                    "info string eval file load failed ({error}), using material evaluation"
                ));
            }
        }
    }

    fn cmd_go(&mut self, tokens: &[String]) {
        self.finish_search();
        let params = GoParams::parse(tokens);

        if let Some(depth) = params.perft {
            self.run_perft(depth);
            return;
        }

        let limits = self.build_limits(&params);
        let mut root_moves = Vec::new();
        for text in &params.searchmoves {
            match self.position.parse_move(text) {
                Ok(mv) => root_moves.push(mv),
                Err(error) => self.send(&format!("info string searchmoves: {error}")),
            }
        }

        self.stop = StopFlag::new();
        let stop = self.stop.clone();
        let tt = Arc::clone(&self.tt);
        let evaluator = self.evaluator.clone();
        let out = Arc::clone(&self.out);
        let info_out = Arc::clone(&self.out);
        let request = SmpRequest {
            root: self.position,
            history: self.history.clone(),
            limits,
            threads: self.options.threads,
            multi_pv: self.options.multi_pv,
            root_moves,
            info_callback: Some(Arc::new(move |info: &IterationInfo| {
                info_out(&format_info_line(info));
            })),
        };

        self.search_handle = Some(std::thread::spawn(move || {
            let result = smp::search(request, &tt, &evaluator, &stop);
            let mut line = match result.best_move {
                Some(mv) => format!("bestmove {mv}"),
                None => "bestmove 0000".to_string(),
            };
            if let Some(ponder) = result.ponder_move {
                line.push_str(&format!(" ponder {ponder}"));
            }
            out(&line);
        }));
    }

    fn run_perft(&self, depth: u32) {
        let start = Instant::now();
        let mut total = 0u64;
        for (mv, nodes) in self.position.perft_divide(depth) {
            self.send(&format!("{mv}: {nodes}"));
            total += nodes;
        }
        let elapsed_ms = start.elapsed().as_millis().max(1);
        self.send(&format!(
            "info string perft {depth} total {total} time {elapsed_ms}ms"
        ));
    }

    fn build_limits(&self, params: &GoParams) -> SearchLimits {
        let config = TimeConfig {
            move_overhead_ms: self.options.move_overhead_ms,
        };
        let (time_left, increment) = match self.position.side_to_move() {
            Color::White => (params.wtime, params.winc),
            Color::Black => (params.btime, params.binc),
        };

        let control = if params.infinite {
            TimeControl::Infinite
        } else if let Some(time_ms) = params.movetime {
            TimeControl::MoveTime { time_ms }
        } else if let Some(time_left_ms) = time_left {
            TimeControl::Clock {
                time_left_ms,
                increment_ms: increment.unwrap_or(0),
                moves_to_go: params.movestogo,
            }
        } else if params.depth.is_some() || params.nodes.is_some() {
            TimeControl::FixedDepth
        } else {
            TimeControl::Infinite
        };

        let mut limits = SearchLimits::from_time_control(control, config, Instant::now());
        if let Some(depth) = params.depth {
            limits = limits.depth(depth);
        }
        if let Some(nodes) = params.nodes {
            limits = limits.nodes(nodes);
        }
        limits
    }

    /// Stop any running search and wait for its `bestmove`.
    fn finish_search(&mut self) {
        self.stop.set();
        if let Some(handle) = self.search_handle.take() {
            let _ = handle.join();
        }
    }

    /// Wait for a bounded search to finish on its own.
    #[cfg(test)]
    fn wait_search(&mut self) {
        if let Some(handle) = self.search_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.finish_search();
    }
}

/// Build position and history from `position` command tokens.
fn parse_position(tokens: &[String]) -> Result<(Position, GameHistory), UciError> {
    let mut index = 0;
    let mut position = match tokens.first().map(String::as_str) {
        Some("startpos") => {
            index += 1;
            Position::startpos()
        }
        Some("fen") => {
            let fen_end = tokens
                .iter()
                .position(|t| t == "moves")
                .unwrap_or(tokens.len());
            let fen = tokens[1..fen_end].join(" ");
            index = fen_end;
            Position::from_fen(&fen)?
        }
        _ => return Err(UciError::MissingParts),
    };

    let mut history = GameHistory::new();
    history.push(position.hash());

    if tokens.get(index).map(String::as_str) == Some("moves") {
        for text in &tokens[index + 1..] {
            let mv = position
                .parse_move(text)
                .map_err(|error| UciError::InvalidMove {
                    move_str: text.clone(),
                    error,
                })?;
            if !position.make_move(mv) {
                return Err(UciError::InvalidMove {
                    move_str: text.clone(),
                    error: MoveParseError::IllegalMove {
                        notation: text.clone(),
                    },
                });
            }
            history.push(position.hash());
        }
    }
    Ok((position, history))
}

/// `info depth .. score .. nodes .. time .. pv ..`
fn format_info_line(info: &IterationInfo) -> String {
    let mut line = format!(
        "info depth {} seldepth {} multipv {} score {} nodes {} nps {} hashfull {} time {}",
        info.depth,
        info.seldepth,
        info.multipv,
        format_score(info.score),
        info.nodes,
        info.nps,
        info.hashfull,
        info.time_ms,
    );
    if !info.pv.is_empty() {
        line.push_str(" pv");
        for mv in &info.pv {
            line.push_str(&format!(" {mv}"));
        }
    }
    line
}

/// `cp N`, or `mate N` in full moves once past the mate threshold.
fn format_score(score: i32) -> String {
    if score >= MATE_THRESHOLD {
        format!("mate {}", (MATE_SCORE - score + 1) / 2)
    } else if score <= -MATE_THRESHOLD {
        format!("mate -{}", (MATE_SCORE + score + 1) / 2)
    } else {
        format!("cp {score}")
    }
}

/// Run the blocking stdin command loop. Returns the process exit code.
pub fn run() -> i32 {
    let stdin = std::io::stdin();
    let mut engine = Engine::new();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            return 1;
        };
        if !engine.handle_line(&line) {
            return 0;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn capturing_engine() -> (Engine, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let engine = Engine::with_output(Arc::new(move |line: &str| {
            sink.lock().push(line.to_string());
        }));
        (engine, lines)
    }

    fn drain(lines: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        std::mem::take(&mut *lines.lock())
    }

    #[test]
    fn uci_handshake() {
        let (mut engine, lines) = capturing_engine();
        engine.handle_line("uci");
        let output = drain(&lines);
        assert!(output[0].starts_with("id name"));
        assert!(output.iter().any(|l| l.starts_with("id author")));
        assert!(output.iter().any(|l| l.contains("option name Hash")));
        assert_eq!(output.last().map(String::as_str), Some("uciok"));

        engine.handle_line("isready");
        assert_eq!(drain(&lines), ["readyok"]);
    }

    #[test]
    fn position_startpos_with_moves() {
        let (mut engine, lines) = capturing_engine();
        engine.handle_line("position startpos moves e2e4 e7e5");
        assert!(drain(&lines).is_empty());
        assert_eq!(engine.position.fullmove_number(), 2);
        assert_eq!(engine.position.side_to_move(), Color::White);
    }

    #[test]
    fn position_rejects_illegal_move_and_keeps_state() {
        let (mut engine, lines) = capturing_engine();
        engine.handle_line("position startpos moves e2e4");
        drain(&lines);
        let before = engine.position;
        engine.handle_line("position startpos moves e2e4 e2e5");
        let output = drain(&lines);
        assert!(output.iter().any(|l| l.starts_with("info string")));
        assert_eq!(engine.position, before);
    }

    #[test]
    fn parse_position_reports_typed_errors() {
        let tokens = |s: &str| -> Vec<String> {
            s.split_whitespace().map(str::to_string).collect()
        };
        assert!(matches!(
            parse_position(&tokens("sideways")),
            Err(UciError::MissingParts)
        ));
        assert!(matches!(
            parse_position(&tokens("fen 8/8/8/8/8/8/8/8 w - - 0 1")),
            Err(UciError::InvalidFen(_))
        ));
        assert!(matches!(
            parse_position(&tokens("startpos moves e2e5")),
            Err(UciError::InvalidMove { .. })
        ));
    }

    #[test]
    fn position_fen_roundtrip() {
        let (mut engine, lines) = capturing_engine();
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        engine.handle_line(&format!("position fen {fen}"));
        assert!(drain(&lines).is_empty());
        assert_eq!(engine.position.to_fen(), fen);
    }

    #[test]
    fn go_depth_emits_info_and_bestmove() {
        let (mut engine, lines) = capturing_engine();
        engine.handle_line("position startpos moves e2e4 e7e5");
        engine.handle_line("go depth 1");
        engine.wait_search();
        let output = drain(&lines);
        assert!(
            output.iter().any(|l| l.starts_with("info depth 1")),
            "{output:?}"
        );
        let bestmove = output
            .iter()
            .find(|l| l.starts_with("bestmove "))
            .expect("bestmove line");
        let mv_text = bestmove.split_whitespace().nth(1).unwrap();
        // The reply must be one of the current position's legal moves.
        assert!(engine.position.parse_move(mv_text).is_ok());
    }

    #[test]
    fn stop_still_emits_bestmove() {
        let (mut engine, lines) = capturing_engine();
        engine.handle_line("position startpos");
        engine.handle_line("go infinite");
        std::thread::sleep(std::time::Duration::from_millis(50));
        engine.handle_line("stop");
        let output = drain(&lines);
        assert!(output.iter().any(|l| l.starts_with("bestmove ")));
    }

    #[test]
    fn searchmoves_restricts_root() {
        let (mut engine, lines) = capturing_engine();
        engine.handle_line("position startpos");
        engine.handle_line("go depth 2 searchmoves a2a3");
        engine.wait_search();
        let output = drain(&lines);
        let bestmove = output
            .iter()
            .find(|l| l.starts_with("bestmove "))
            .expect("bestmove line");
        assert!(bestmove.starts_with("bestmove a2a3"), "{bestmove}");
    }

    #[test]
    fn go_perft_reports_totals() {
        let (mut engine, lines) = capturing_engine();
        engine.handle_line("position startpos");
        engine.handle_line("go perft 2");
        let output = drain(&lines);
        assert_eq!(
            output
                .iter()
                .filter(|l| !l.starts_with("info string"))
                .count(),
            20
        );
        assert!(output.last().unwrap().contains("total 400"));
    }

    #[test]
    fn score_formatting() {
        assert_eq!(format_score(123), "cp 123");
        assert_eq!(format_score(MATE_SCORE - 3), "mate 2");
        assert_eq!(format_score(-(MATE_SCORE - 4)), "mate -2");
    }

    #[test]
    fn setoption_updates_options() {
        let (mut engine, _lines) = capturing_engine();
        engine.handle_line("setoption name Threads value 4");
        assert_eq!(engine.options.threads, 4);
        engine.handle_line("setoption name MultiPV value 3");
        assert_eq!(engine.options.multi_pv, 3);
        engine.handle_line("setoption name Hash value 8");
        assert_eq!(engine.options.hash_mb, 8);
        engine.handle_line("setoption name SyzygyPath value /tmp/tb");
        assert_eq!(
            engine.options.syzygy_path,
            Some(PathBuf::from("/tmp/tb"))
        );
    }

    #[test]
    fn missing_eval_file_falls_back() {
        let (mut engine, lines) = capturing_engine();
        engine.handle_line("setoption name EvalFile value /nonexistent/weights.bnn");
        let output = drain(&lines);
        assert!(output
            .iter()
            .any(|l| l.contains("eval file load failed")));
        assert!(engine.evaluator.network().is_none());
    }
}
