//! Engine options set through `setoption`.

use std::path::PathBuf;

use crate::tt::DEFAULT_TT_MB;

/// Current option values. Mutated by `setoption`, snapshot at `go`.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Transposition table size in megabytes.
    pub hash_mb: usize,
    pub threads: usize,
    pub multi_pv: usize,
    /// Move overhead compensation, milliseconds.
    pub move_overhead_ms: u64,
    /// NNUE weights file.
    pub eval_file: Option<PathBuf>,
    /// Tablebase directory; stored for the probe interface.
    pub syzygy_path: Option<PathBuf>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            hash_mb: DEFAULT_TT_MB,
            threads: 1,
            multi_pv: 1,
            move_overhead_ms: 10,
            eval_file: None,
            syzygy_path: None,
        }
    }
}

impl EngineOptions {
    /// The `option` declaration lines printed in reply to `uci`.
    #[must_use]
    pub fn declarations() -> Vec<String> {
        vec![
            format!("option name Hash type spin default {DEFAULT_TT_MB} min 1 max 65536"),
            "option name Threads type spin default 1 min 1 max 256".to_string(),
            "option name MultiPV type spin default 1 min 1 max 64".to_string(),
            "option name MoveOverhead type spin default 10 min 0 max 10000".to_string(),
            "option name EvalFile type string default <empty>".to_string(),
            "option name SyzygyPath type string default <empty>".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let options = EngineOptions::default();
        assert_eq!(options.threads, 1);
        assert_eq!(options.multi_pv, 1);
        assert!(options.eval_file.is_none());
    }

    #[test]
    fn declarations_cover_all_options() {
        let text = EngineOptions::declarations().join("\n");
        for name in ["Hash", "Threads", "MultiPV", "MoveOverhead", "EvalFile", "SyzygyPath"] {
            assert!(text.contains(name), "{name} missing");
        }
    }
}
