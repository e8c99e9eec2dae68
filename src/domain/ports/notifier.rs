//! Notifier port - optional external observer of search progress.

use async_trait::async_trait;
use serde_json::Value;

/// Observer callbacks emitted while a search runs.
///
/// Every method defaults to a no-op so hosts implement only what they
/// broadcast. The executor serializes the `tool_use_start`/`tool_use_complete`
/// pair for one call behind a mutex, so observers see well-ordered event
/// streams per tool call even when tools run in parallel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// The search started working on the query.
    async fn generation_started(&self, _run_id: &str) {}

    /// The search finished; `answer` is the best candidate's final answer.
    async fn generation_complete(&self, _run_id: &str, _answer: &str) {}

    /// The search failed without producing any usable candidate.
    async fn generation_failed(&self, _run_id: &str, _error: &str) {}

    /// A path produced a reasoning/thinking summary.
    async fn thinking_summary(&self, _candidate_id: &str, _text: &str) {}

    /// A tool call is about to execute.
    async fn tool_use_start(
        &self,
        _tool_use_id: &str,
        _candidate_id: &str,
        _name: &str,
        _arguments: &Value,
    ) {
    }

    /// A tool call finished.
    async fn tool_use_complete(
        &self,
        _tool_use_id: &str,
        _candidate_id: &str,
        _success: bool,
        _result: Option<&Value>,
        _error: &str,
    ) {
    }
}

/// Notifier that ignores everything. Used when the caller attaches none.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {}
