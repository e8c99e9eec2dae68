//! Path candidates: points in the strategy search space.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::score::ScoreVector;
use super::trace::ExecutionTrace;

/// Library default seed strategy, used when the caller supplies none.
pub const DEFAULT_SEED_STRATEGY: &str = "You are a careful assistant. Read the query, plan briefly, \
use the available tools when they help, and give a direct, complete answer. \
Prefer verified facts over speculation and say so when you are unsure.";

/// One candidate execution path: a strategy prompt, its inherited lessons,
/// and (once the path has run) its trace, scores, and critique.
///
/// Lineage is a DAG held by id only (`parent_ids`), never by back-reference,
/// so archive eviction involves no re-linking and no cycles are possible.
///
/// Lifecycle: constructed by the orchestrator or scheduler, finalized via the
/// single-assignment setters, then shared read-only (typically behind `Arc`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathCandidate {
    /// Opaque unique id, minted by the host's `IdGenerator`.
    pub id: String,
    /// Groups every candidate of one search run.
    pub run_id: String,
    /// Evolutionary generation; 0 for the seed.
    pub generation: u32,
    /// 0 parents = seed, 1 = mutation, 2 = crossover.
    pub parent_ids: Vec<String>,
    /// The text that steers the LLM for this candidate.
    pub strategy_prompt: String,
    /// Ordered lessons inherited and grown from ancestors.
    pub accumulated_lessons: Vec<String>,
    pub created_at: DateTime<Utc>,

    trace: Option<ExecutionTrace>,
    scores: Option<ScoreVector>,
    feedback: Option<String>,
}

impl PathCandidate {
    /// Generation-0 candidate with the library default strategy (or the
    /// caller's custom seed text).
    pub fn new_seed(id: impl Into<String>, run_id: impl Into<String>, strategy: Option<String>) -> Self {
        let strategy = match strategy {
            Some(s) if !s.trim().is_empty() => s,
            _ => DEFAULT_SEED_STRATEGY.to_string(),
        };
        Self::new_with_strategy(id, run_id, 0, Vec::new(), strategy, Vec::new())
    }

    pub fn new_with_strategy(
        id: impl Into<String>,
        run_id: impl Into<String>,
        generation: u32,
        parent_ids: Vec<String>,
        strategy_prompt: String,
        accumulated_lessons: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            run_id: run_id.into(),
            generation,
            parent_ids,
            strategy_prompt,
            accumulated_lessons,
            created_at: Utc::now(),
            trace: None,
            scores: None,
            feedback: None,
        }
    }

    /// Record the execution trace. Panics if called twice: candidates are
    /// immutable after finalization and a second run is a programmer error.
    pub fn set_trace(&mut self, trace: ExecutionTrace) {
        assert!(self.trace.is_none(), "trace already set on candidate {}", self.id);
        self.trace = Some(trace);
    }

    /// Record the evaluation scores. Panics if called twice.
    pub fn set_scores(&mut self, scores: ScoreVector) {
        assert!(self.scores.is_none(), "scores already set on candidate {}", self.id);
        self.scores = Some(scores);
    }

    /// Record the evaluator critique. Panics if called twice.
    pub fn set_feedback(&mut self, feedback: String) {
        assert!(self.feedback.is_none(), "feedback already set on candidate {}", self.id);
        self.feedback = Some(feedback);
    }

    pub fn trace(&self) -> Option<&ExecutionTrace> {
        self.trace.as_ref()
    }

    pub fn scores(&self) -> Option<&ScoreVector> {
        self.scores.as_ref()
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    /// Scores, defaulting to the zero vector for unevaluated candidates.
    pub fn scores_or_zero(&self) -> ScoreVector {
        self.scores.unwrap_or_else(ScoreVector::zero)
    }

    /// The quality axis the search optimizes for termination and `best`
    /// tracking. Zero when unevaluated.
    pub fn quality(&self) -> f64 {
        self.scores.map_or(0.0, |s| s.answer_quality)
    }

    /// Final answer text, empty when the path never produced one.
    pub fn answer(&self) -> &str {
        self.trace.as_ref().map_or("", |t| t.final_answer.as_str())
    }
}
