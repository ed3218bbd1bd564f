//! Time and node control.
//!
//! Soft limits stop iterative deepening between iterations; hard limits
//! abort the running iteration mid-tree, whose partial result is then
//! discarded in favour of the last completed one.

use std::time::{Duration, Instant};

use super::MAX_PLY;

/// Default moves-to-go estimate when the clock does not say.
const DEFAULT_MOVES_TO_GO: u64 = 30;

/// Moves-to-go estimates by remaining time.
const LONG_TIME_CONTROL_MS: u64 = 300_000;
const MEDIUM_TIME_CONTROL_MS: u64 = 60_000;
const LONG_MOVES_ESTIMATE: u64 = 40;
const MEDIUM_MOVES_ESTIMATE: u64 = 30;
const SHORT_MOVES_ESTIMATE: u64 = 25;

/// Latency compensation and overhead settings.
#[derive(Debug, Clone, Copy)]
pub struct TimeConfig {
    /// Reserve per move for I/O and scheduling latency.
    pub move_overhead_ms: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        TimeConfig {
            move_overhead_ms: 10,
        }
    }
}

/// How the `go` command bounded this search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeControl {
    /// No limit; runs until `stop`.
    #[default]
    Infinite,
    /// Bounded by depth/nodes only.
    FixedDepth,
    /// Exactly this long.
    MoveTime { time_ms: u64 },
    /// Remaining clock plus increment.
    Clock {
        time_left_ms: u64,
        increment_ms: u64,
        moves_to_go: Option<u64>,
    },
}

/// Resolved limits for one search.
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub max_depth: u32,
    pub node_budget: Option<u64>,
    pub soft_deadline: Option<Instant>,
    pub hard_deadline: Option<Instant>,
    pub infinite: bool,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_depth: MAX_PLY as u32 - 1,
            node_budget: None,
            soft_deadline: None,
            hard_deadline: None,
            infinite: false,
        }
    }
}

impl SearchLimits {
    /// Resolve deadlines for a time control starting at `now`.
    #[must_use]
    pub fn from_time_control(control: TimeControl, config: TimeConfig, now: Instant) -> Self {
        let mut limits = SearchLimits::default();
        match control {
            TimeControl::Infinite => limits.infinite = true,
            TimeControl::FixedDepth => {}
            TimeControl::MoveTime { time_ms } => {
                let budget = time_ms.saturating_sub(config.move_overhead_ms).max(1);
                let deadline = now + Duration::from_millis(budget);
                limits.soft_deadline = Some(deadline);
                limits.hard_deadline = Some(deadline);
            }
            TimeControl::Clock {
                time_left_ms,
                increment_ms,
                moves_to_go,
            } => {
                let moves = moves_to_go
                    .filter(|&m| m > 0)
                    .unwrap_or_else(|| estimate_moves_to_go(time_left_ms));
                let usable = time_left_ms.saturating_sub(config.move_overhead_ms);
                let target = (usable / moves.max(1)) + increment_ms * 3 / 4;
                // Never budget more than half the clock for one move.
                let half = (usable / 2).max(1);
                let soft = target.clamp(1, half);
                let hard = (target * 3).clamp(soft, half.max(soft));
                limits.soft_deadline = Some(now + Duration::from_millis(soft));
                limits.hard_deadline = Some(now + Duration::from_millis(hard));
            }
        }
        limits
    }

    #[must_use]
    pub fn depth(mut self, depth: u32) -> Self {
        self.max_depth = depth.clamp(1, MAX_PLY as u32 - 1);
        self
    }

    #[must_use]
    pub fn nodes(mut self, nodes: u64) -> Self {
        self.node_budget = Some(nodes);
        self
    }

    /// Soft limit: consulted between iterations.
    #[must_use]
    pub fn soft_expired(&self, now: Instant, nodes: u64) -> bool {
        if self.infinite {
            return false;
        }
        if let Some(budget) = self.node_budget {
            if nodes >= budget {
                return true;
            }
        }
        self.soft_deadline.is_some_and(|d| now >= d)
    }

    /// Hard limit: consulted inside the tree. The node budget is a soft
    /// limit only; it stops deepening at iteration boundaries.
    #[must_use]
    pub fn hard_expired(&self, now: Instant) -> bool {
        if self.infinite {
            return false;
        }
        self.hard_deadline.is_some_and(|d| now >= d)
    }
}

fn estimate_moves_to_go(time_left_ms: u64) -> u64 {
    if time_left_ms >= LONG_TIME_CONTROL_MS {
        LONG_MOVES_ESTIMATE
    } else if time_left_ms >= MEDIUM_TIME_CONTROL_MS {
        MEDIUM_MOVES_ESTIMATE
    } else {
        SHORT_MOVES_ESTIMATE
    }
}
