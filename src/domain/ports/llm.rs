//! LLM port - interface for chat-completion backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::errors::SearchResult;

/// Message role in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self { role: Role::Tool, content: content.into() }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Backend-assigned id for pairing results with requests.
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// One completed chat turn from the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Assistant text. May be empty when the model only requested tools.
    pub content: String,
    /// Optional reasoning/thinking summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Tool invocations requested this turn, in model order.
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ChatResponse {
    /// Plain text response with no tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            reasoning: None,
            tool_calls: Vec::new(),
        }
    }
}

/// Schema advertised to the model for one callable tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool's arguments.
    pub input_schema: Value,
}

/// Trait for chat-completion backends.
///
/// Implementations must be cancel-safe: the engine races every call against
/// its cancellation token and drops the future on cancellation.
#[async_trait]
pub trait LlmPort: Send + Sync {
    /// One chat turn without a tool catalog.
    async fn chat(&self, messages: &[ChatMessage]) -> SearchResult<ChatResponse>;

    /// One chat turn with a tool catalog the model may call into.
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDescriptor],
    ) -> SearchResult<ChatResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        assert_eq!(ChatMessage::system("s").role, Role::System);
        assert_eq!(ChatMessage::user("u").role, Role::User);
        assert_eq!(ChatMessage::assistant("a").role, Role::Assistant);
        assert_eq!(ChatMessage::tool("t").role, Role::Tool);
    }

    #[test]
    fn test_role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
    }

    #[test]
    fn test_text_response_has_no_tool_calls() {
        let resp = ChatResponse::text("hello");
        assert_eq!(resp.content, "hello");
        assert!(resp.tool_calls.is_empty());
        assert!(resp.reasoning.is_none());
    }

    #[test]
    fn test_response_deserializes_without_tool_calls_field() {
        let resp: ChatResponse = serde_json::from_str(r#"{"content": "hi"}"#).unwrap();
        assert!(resp.tool_calls.is_empty());
    }
}
