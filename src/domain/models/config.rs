//! Search configuration: bounds and knobs for one search run.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{SearchError, SearchResult};

/// Bounds and knobs for the evolutionary search.
///
/// Zero-valued numeric fields are treated as "use the default": callers can
/// deserialize a partial override file (every field has a serde default) and
/// pass it straight in; [`SearchConfig::normalized`] fills the holes.
/// Booleans are taken at face value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of evolutionary generations after the seed round.
    pub max_generations: u32,
    /// Parents selected (and branches spawned) per generation.
    pub branches_per_generation: u32,
    /// Early-exit threshold on `answer_quality`.
    pub target_score: f64,
    /// Hard ceiling on tool invocations across the whole search.
    pub max_tool_calls: u64,
    /// Hard ceiling on LLM calls across the whole search.
    pub max_llm_calls: u64,
    /// Pareto archive capacity.
    pub archive_size: usize,
    /// Whether to attempt one crossover per generation.
    pub enable_crossover: bool,
    /// Wall-clock bound for one path execution.
    pub execution_timeout_ms: u64,
    /// Run branches concurrently when more than one parent is selected.
    pub enable_parallel_branches: bool,
    /// Semaphore capacity for concurrent branches.
    /// Zero means `min(branches_per_generation, 5)`.
    pub max_parallel_branches: usize,
    /// Upper bound on LLM turns in the tool loop.
    pub max_tool_loop_iterations: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_generations: 3,
            branches_per_generation: 3,
            target_score: 0.95,
            max_tool_calls: 20,
            max_llm_calls: 30,
            archive_size: 10,
            enable_crossover: true,
            execution_timeout_ms: 120_000,
            enable_parallel_branches: true,
            max_parallel_branches: 0,
            max_tool_loop_iterations: 5,
        }
    }
}

impl SearchConfig {
    /// Replace zero-valued numeric fields with their defaults.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.max_generations == 0 {
            self.max_generations = defaults.max_generations;
        }
        if self.branches_per_generation == 0 {
            self.branches_per_generation = defaults.branches_per_generation;
        }
        if self.target_score == 0.0 {
            self.target_score = defaults.target_score;
        }
        if self.max_tool_calls == 0 {
            self.max_tool_calls = defaults.max_tool_calls;
        }
        if self.max_llm_calls == 0 {
            self.max_llm_calls = defaults.max_llm_calls;
        }
        if self.archive_size == 0 {
            self.archive_size = defaults.archive_size;
        }
        if self.execution_timeout_ms == 0 {
            self.execution_timeout_ms = defaults.execution_timeout_ms;
        }
        if self.max_tool_loop_iterations == 0 {
            self.max_tool_loop_iterations = defaults.max_tool_loop_iterations;
        }
        // max_parallel_branches == 0 stays: it encodes the derived default.
        self
    }

    /// Effective semaphore capacity for the branch scheduler.
    pub fn effective_max_parallel(&self) -> usize {
        if self.max_parallel_branches > 0 {
            self.max_parallel_branches
        } else {
            (self.branches_per_generation as usize).min(5).max(1)
        }
    }

    /// Validate a normalized config. Returns `InvalidInput` on nonsense.
    pub fn validate(&self) -> SearchResult<()> {
        if !(0.0..=1.0).contains(&self.target_score) {
            return Err(SearchError::InvalidInput(format!(
                "target_score must be in [0, 1], got {}",
                self.target_score
            )));
        }
        Ok(())
    }
}
