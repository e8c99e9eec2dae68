//! LLM-backed strategy transforms: mutation and crossover.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;

use crate::domain::errors::{SearchError, SearchResult};
use crate::domain::models::{ExecutionTrace, PathCandidate};
use crate::domain::ports::llm::{ChatMessage, LlmPort};
use crate::services::evaluator::extract_json;
use crate::services::prompts::{CROSSOVER_SYSTEM_PROMPT, MUTATION_SYSTEM_PROMPT};

#[derive(Debug, Deserialize)]
struct MutationPayload {
    strategy: String,
    #[serde(default)]
    lesson: Option<String>,
}

/// Rewrites and combines strategy prompts via the LLM port.
///
/// Each operation costs exactly one LLM call, charged by the caller. On
/// failure the caller skips the branch; the archive is never touched here.
pub struct Mutator {
    llm: Arc<dyn LlmPort>,
}

impl Mutator {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self { llm }
    }

    /// Rewrite `parent`'s strategy to address `feedback`, producing a child
    /// candidate one generation down with the parent's lessons (plus any new
    /// lesson the model offers, appended at the end).
    pub async fn mutate_strategy(
        &self,
        parent: &PathCandidate,
        trace: &ExecutionTrace,
        feedback: &str,
        child_id: String,
    ) -> SearchResult<PathCandidate> {
        let user = format!(
            "CURRENT STRATEGY:\n{}\n\nEXECUTION SUMMARY:\n{}\n\nCRITIQUE:\n{}",
            parent.strategy_prompt,
            trace.summary(),
            feedback,
        );
        let messages = [
            ChatMessage::system(MUTATION_SYSTEM_PROMPT),
            ChatMessage::user(user),
        ];

        let response = self.llm.chat(&messages).await?;
        let (strategy, lesson) = parse_strategy_payload(&response.content)?;

        let mut lessons = parent.accumulated_lessons.clone();
        if let Some(lesson) = lesson {
            if !lesson.trim().is_empty() {
                lessons.push(lesson);
            }
        }

        Ok(PathCandidate::new_with_strategy(
            child_id,
            parent.run_id.clone(),
            parent.generation + 1,
            vec![parent.id.clone()],
            strategy,
            lessons,
        ))
    }

    /// Combine two strategies into a child of generation `max(a, b) + 1`
    /// whose lessons are the concatenation of both parents' lists,
    /// de-duplicated by exact string match with first occurrence winning.
    pub async fn crossover(
        &self,
        parent_a: &PathCandidate,
        parent_b: &PathCandidate,
        child_id: String,
    ) -> SearchResult<PathCandidate> {
        let user = format!(
            "STRATEGY A:\n{}\n\nSTRATEGY B:\n{}",
            parent_a.strategy_prompt, parent_b.strategy_prompt,
        );
        let messages = [
            ChatMessage::system(CROSSOVER_SYSTEM_PROMPT),
            ChatMessage::user(user),
        ];

        let response = self.llm.chat(&messages).await?;
        let (strategy, _) = parse_strategy_payload(&response.content)?;

        Ok(PathCandidate::new_with_strategy(
            child_id,
            parent_a.run_id.clone(),
            parent_a.generation.max(parent_b.generation) + 1,
            vec![parent_a.id.clone(), parent_b.id.clone()],
            strategy,
            merge_lessons(&parent_a.accumulated_lessons, &parent_b.accumulated_lessons),
        ))
    }
}

/// Parse a `{"strategy": ..., "lesson": ...?}` payload. Non-JSON content
/// falls back to being the strategy text verbatim; empty content is a
/// failure.
fn parse_strategy_payload(content: &str) -> SearchResult<(String, Option<String>)> {
    if let Some(json) = extract_json(content) {
        if let Ok(payload) = serde_json::from_str::<MutationPayload>(json) {
            if !payload.strategy.trim().is_empty() {
                return Ok((payload.strategy, payload.lesson));
            }
        }
    }
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(SearchError::Llm(
            "empty mutation response from LLM".to_string(),
        ));
    }
    Ok((trimmed.to_string(), None))
}

/// Concatenate `a` then `b`, dropping exact-string duplicates while
/// preserving first-occurrence order.
fn merge_lessons(a: &[String], b: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    a.iter()
        .chain(b.iter())
        .filter(|lesson| seen.insert((*lesson).clone()))
        .cloned()
        .collect()
}
