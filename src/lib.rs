//! Gepa - Genetic-Pareto search engine for budgeted LLM response generation.
//!
//! Given one user query, the engine explores multiple candidate execution
//! paths (each a strategy prompt driving an LLM-plus-tool loop), scores each
//! path on five dimensions, keeps a bounded non-dominated archive, and evolves
//! strategies through LLM-backed mutation and crossover until a quality
//! target is met or the call budget runs out.
//!
//! - Five-dimensional Pareto archive with diversity-preserving eviction
//! - Parallel branch scheduler with shared atomic budget counters
//! - Multi-turn tool loop executor with per-path timeouts
//! - Cooperative cancellation plumbed through every I/O suspension point

pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export key types for convenience
pub use domain::errors::{SearchError, SearchResult};
pub use domain::models::{
    ExecutionTrace, PathCandidate, ScoreVector, SearchConfig, SearchInput, SearchOutput,
    ToolCallRecord,
};
pub use domain::ports::{IdGenerator, LlmPort, Notifier, ToolRunner};
pub use services::archive::ParetoArchive;
pub use services::orchestrator::SearchOrchestrator;
