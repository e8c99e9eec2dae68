//! Tool runner port - executes tool calls requested by the model.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::SearchResult;

/// Executes a named tool with model-supplied arguments.
///
/// Errors cover transport and execution failures alike; invalid-argument
/// rejections from the tool come back the same way. The engine performs no
/// retries: a failure is recorded in the trace and shown to the model, which
/// may adapt on its next turn.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, name: &str, arguments: &Value) -> SearchResult<Value>;
}
