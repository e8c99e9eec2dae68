//! Execution traces: the observable record of one path run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tool invocation requested by the LLM during a path run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Registered tool name as requested by the model.
    pub tool_name: String,
    /// Arguments exactly as the model supplied them.
    pub arguments: Value,
    /// Whether the runner reported success.
    pub success: bool,
    /// Runner result; absent for failures and for optimistic captures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure message. Empty iff `success`.
    #[serde(default)]
    pub error: String,
}

impl ToolCallRecord {
    /// A successfully executed call.
    pub fn ok(tool_name: impl Into<String>, arguments: Value, result: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            success: true,
            result: Some(result),
            error: String::new(),
        }
    }

    /// A failed call. The error text is surfaced to the LLM on the next turn.
    pub fn failed(tool_name: impl Into<String>, arguments: Value, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            success: false,
            result: None,
            error: error.into(),
        }
    }

    /// A call the model emitted but the executor did not run (single-turn
    /// mode with no tool runner attached). Captured optimistically.
    pub fn optimistic(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            success: true,
            result: None,
            error: String::new(),
        }
    }
}

/// Record of one `PathExecutor` run.
///
/// `tool_calls` entries appear in the order the LLM requested them, even when
/// the executor ran them in parallel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTrace {
    /// The user query the path was answering.
    pub query: String,
    /// The final assistant answer.
    pub final_answer: String,
    /// All tool invocations, in request order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Model reasoning snippets, one per turn that produced any. May be empty.
    pub reasoning_steps: Vec<String>,
    /// Heuristic token count: `(prompt_chars + response_chars) / 4`.
    /// Informational only; budgets count calls, not tokens.
    pub total_tokens: u64,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
}

impl ExecutionTrace {
    /// An empty trace for a path that never produced output. Used as the
    /// degenerate baseline when seed execution fails.
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            final_answer: String::new(),
            tool_calls: Vec::new(),
            reasoning_steps: Vec::new(),
            total_tokens: 0,
            duration_ms: 0,
        }
    }

    /// Short human-readable summary used in mutation prompts.
    pub fn summary(&self) -> String {
        let tools: Vec<String> = self
            .tool_calls
            .iter()
            .map(|t| {
                if t.success {
                    t.tool_name.clone()
                } else {
                    format!("{} (failed: {})", t.tool_name, t.error)
                }
            })
            .collect();
        format!(
            "answer: {}\ntools used: [{}]\ntokens: {}, duration: {}ms",
            if self.final_answer.is_empty() {
                "<none>"
            } else {
                &self.final_answer
            },
            tools.join(", "),
            self.total_tokens,
            self.duration_ms,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_empty_iff_success() {
        let ok = ToolCallRecord::ok("echo", json!({"text": "hi"}), json!("hi"));
        assert!(ok.success);
        assert!(ok.error.is_empty());

        let failed = ToolCallRecord::failed("echo", json!({}), "boom");
        assert!(!failed.success);
        assert_eq!(failed.error, "boom");
        assert!(failed.result.is_none());
    }

    #[test]
    fn test_optimistic_capture_has_no_result() {
        let rec = ToolCallRecord::optimistic("search", json!({"q": "rust"}));
        assert!(rec.success);
        assert!(rec.result.is_none());
        assert!(rec.error.is_empty());
    }

    #[test]
    fn test_empty_trace() {
        let trace = ExecutionTrace::empty("2+2?");
        assert_eq!(trace.query, "2+2?");
        assert!(trace.final_answer.is_empty());
        assert!(trace.tool_calls.is_empty());
        assert_eq!(trace.duration_ms, 0);
    }

    #[test]
    fn test_summary_mentions_failed_tools() {
        let mut trace = ExecutionTrace::empty("q");
        trace.final_answer = "done".to_string();
        trace.tool_calls.push(ToolCallRecord::failed("web", json!({}), "503"));
        let summary = trace.summary();
        assert!(summary.contains("web (failed: 503)"));
        assert!(summary.contains("done"));
    }
}
