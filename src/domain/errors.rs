//! Domain errors for the Gepa search engine.

use thiserror::Error;

/// Errors that can occur while running a search.
///
/// Variants are semantic categories, not transport types: the orchestrator
/// and scheduler dispatch on the category to decide whether a failure is
/// fatal to the search, fatal to one branch, or merely recorded.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Caller handed us something unusable. Surfaced before any side effect.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The LLM port failed. Contained to the affected branch or sub-step.
    #[error("LLM call failed: {0}")]
    Llm(String),

    /// A tool invocation failed. Recorded in the trace, never fatal.
    #[error("tool '{name}' failed: {message}")]
    Tool { name: String, message: String },

    /// Per-path execution deadline exceeded.
    #[error("path execution timed out after {0} ms")]
    Timeout(u64),

    /// The root cancellation token fired.
    #[error("search canceled")]
    Canceled,

    /// The evaluator could not produce a usable score vector.
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

impl SearchError {
    /// Whether this error came from cooperative cancellation (as opposed to
    /// a deadline or a transport failure).
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Whether this error is a per-path timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

pub type SearchResult<T> = Result<T, SearchError>;
