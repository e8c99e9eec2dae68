//! LLM-backed evaluation of execution traces.

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::errors::{SearchError, SearchResult};
use crate::domain::models::{ExecutionTrace, ScoreVector};
use crate::domain::ports::llm::{ChatMessage, LlmPort};
use crate::services::prompts::EVALUATOR_SYSTEM_PROMPT;

/// The JSON object the evaluator prompt demands. All five axes are
/// required: a response missing one is an evaluation failure.
#[derive(Debug, Deserialize)]
struct EvaluationPayload {
    answer_quality: f64,
    efficiency: f64,
    cost: f64,
    robustness: f64,
    latency: f64,
    #[serde(default)]
    critique: String,
}

/// Scores one trace against the query it was answering.
///
/// Costs exactly one LLM call per evaluation; the call is charged to the
/// budget by the caller. Failures are returned as errors and the caller
/// substitutes zero scores, keeping the branch alive.
pub struct Evaluator {
    llm: Arc<dyn LlmPort>,
}

impl Evaluator {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self { llm }
    }

    /// Score `trace` on the five axes and return textual feedback.
    ///
    /// Out-of-range or non-finite axes are clamped/zeroed and the feedback
    /// is annotated with `invalid axis <name>` for each offender.
    pub async fn evaluate(
        &self,
        query: &str,
        trace: &ExecutionTrace,
    ) -> SearchResult<(ScoreVector, String)> {
        let messages = [
            ChatMessage::system(EVALUATOR_SYSTEM_PROMPT),
            ChatMessage::user(render_trace(query, trace)),
        ];

        let response = self.llm.chat(&messages).await?;

        let json = extract_json(&response.content).ok_or_else(|| {
            SearchError::Evaluation(format!(
                "no JSON object in evaluator response: {:?}",
                truncate(&response.content, 120)
            ))
        })?;

        let payload: EvaluationPayload = serde_json::from_str(json)
            .map_err(|e| SearchError::Evaluation(format!("malformed evaluator JSON: {e}")))?;

        let raw = ScoreVector {
            answer_quality: payload.answer_quality,
            efficiency: payload.efficiency,
            cost: payload.cost,
            robustness: payload.robustness,
            latency: payload.latency,
        };
        let (scores, invalid_axes) = raw.sanitized();

        let mut feedback = payload.critique;
        for axis in invalid_axes {
            if !feedback.is_empty() {
                feedback.push_str("; ");
            }
            feedback.push_str("invalid axis ");
            feedback.push_str(axis);
        }

        Ok((scores, feedback))
    }
}

/// Render the query and trace for the evaluator prompt.
fn render_trace(query: &str, trace: &ExecutionTrace) -> String {
    let mut out = format!("QUERY:\n{query}\n\nFINAL ANSWER:\n{}\n", trace.final_answer);
    if !trace.tool_calls.is_empty() {
        out.push_str("\nTOOL CALLS:\n");
        for call in &trace.tool_calls {
            if call.success {
                out.push_str(&format!("- {} -> ok\n", call.tool_name));
            } else {
                out.push_str(&format!("- {} -> error: {}\n", call.tool_name, call.error));
            }
        }
    }
    out.push_str(&format!(
        "\nTOKENS: {}\nDURATION_MS: {}\n",
        trace.total_tokens, trace.duration_ms
    ));
    out
}

/// The substring from the first `{` to the last `}`, if any.
pub(crate) fn extract_json(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&content[start..=end])
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
