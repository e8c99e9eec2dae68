//! Domain models
//!
//! Pure domain entities for the search space: score vectors, path
//! candidates, execution traces, and the configuration/input/output
//! envelopes. These models are framework-agnostic and contain no
//! infrastructure concerns.

pub mod candidate;
pub mod config;
pub mod envelope;
pub mod score;
pub mod trace;

pub use candidate::{PathCandidate, DEFAULT_SEED_STRATEGY};
pub use config::SearchConfig;
pub use envelope::{SearchInput, SearchOutput, SearchPhase};
pub use score::ScoreVector;
pub use trace::{ExecutionTrace, ToolCallRecord};
