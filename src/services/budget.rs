//! Shared budget accounting for one search run.
//!
//! Counters are increment-only atomics shared by every concurrent branch;
//! no lock is needed for increments or reads. Gating is best-effort by
//! design: branches already in flight when a budget trips complete their
//! work, only new branches are prevented from starting.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::domain::models::SearchConfig;

/// Atomic call counters plus the early-stop flag for one search run.
#[derive(Debug, Default)]
pub struct BudgetCounters {
    tool_calls_used: AtomicU64,
    llm_calls_used: AtomicU64,
    stop_early: AtomicBool,
}

impl BudgetCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one LLM call. Returns the new total.
    pub fn record_llm_call(&self) -> u64 {
        self.llm_calls_used.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record `n` tool calls. Returns the new total.
    pub fn record_tool_calls(&self, n: u64) -> u64 {
        self.tool_calls_used.fetch_add(n, Ordering::Relaxed) + n
    }

    pub fn llm_calls_used(&self) -> u64 {
        self.llm_calls_used.load(Ordering::Relaxed)
    }

    pub fn tool_calls_used(&self) -> u64 {
        self.tool_calls_used.load(Ordering::Relaxed)
    }

    /// Whether either budget dimension is spent.
    pub fn exhausted(&self, config: &SearchConfig) -> bool {
        self.llm_calls_used() >= config.max_llm_calls
            || self.tool_calls_used() >= config.max_tool_calls
    }

    /// Set the early-stop flag. Returns `true` for the caller that actually
    /// flipped it (compare-and-set), `false` if it was already set.
    pub fn request_stop(&self) -> bool {
        self.stop_early
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_early.load(Ordering::Acquire)
    }
}
