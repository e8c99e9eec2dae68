//! Input and output envelopes for one search run.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::candidate::PathCandidate;
use super::config::SearchConfig;
use crate::domain::ports::llm::ToolDescriptor;
use crate::domain::ports::notifier::Notifier;
use crate::domain::ports::tool_runner::ToolRunner;

/// Everything the orchestrator needs to run one search.
///
/// Built with the `with_*` helpers; only `query` is required.
#[derive(Clone)]
pub struct SearchInput {
    /// The user query. Must be non-empty.
    pub query: String,
    /// Custom seed strategy; empty/absent means the library default.
    pub seed_strategy: Option<String>,
    /// Knobs; zero-valued fields retain defaults.
    pub config: SearchConfig,
    /// Tool catalog offered to the LLM. May be empty.
    pub tools: Vec<ToolDescriptor>,
    /// Executes tool calls. Absent means single-turn mode.
    pub tool_runner: Option<Arc<dyn ToolRunner>>,
    /// Optional external observer.
    pub notifier: Option<Arc<dyn Notifier>>,
    /// Root cancellation carrier; propagated to every in-flight branch.
    pub cancellation: CancellationToken,
}

impl SearchInput {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            seed_strategy: None,
            config: SearchConfig::default(),
            tools: Vec::new(),
            tool_runner: None,
            notifier: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_seed_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.seed_strategy = Some(strategy.into());
        self
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDescriptor>, runner: Arc<dyn ToolRunner>) -> Self {
        self.tools = tools;
        self.tool_runner = Some(runner);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Result of one search run.
#[derive(Debug, Clone)]
pub struct SearchOutput {
    /// The highest-quality candidate ever seen.
    pub best: Arc<PathCandidate>,
    /// `best`'s final answer.
    pub answer: String,
    /// `best`'s answer-quality score.
    pub score: f64,
    /// Seed round plus fully-completed generations.
    pub iterations: u32,
    /// Non-dominated archive members at termination.
    pub pareto_front: Vec<Arc<PathCandidate>>,
}

/// Coarse orchestrator state, readable while a search is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Input accepted, nothing executed yet.
    Created,
    /// Seed candidate executed and evaluated.
    SeedExecuted,
    /// A generation's branches are running.
    GenRunning,
    /// A generation finished integrating results.
    GenComplete,
    /// Target score met before the generation finished.
    EarlyExit,
    /// Search finished (result returned or error surfaced).
    Terminated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_builder() {
        let input = SearchInput::new("what is 2+2?")
            .with_seed_strategy("be brief")
            .with_config(SearchConfig {
                max_generations: 1,
                ..Default::default()
            });
        assert_eq!(input.query, "what is 2+2?");
        assert_eq!(input.seed_strategy.as_deref(), Some("be brief"));
        assert_eq!(input.config.max_generations, 1);
        assert!(input.tool_runner.is_none());
        assert!(!input.cancellation.is_cancelled());
    }
}
