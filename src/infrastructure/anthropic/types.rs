//! Wire types for the Anthropic Messages API, plus conversions between the
//! engine's chat shapes and the API's content-block model.
//!
//! The engine's messages are plain `{role, content}` strings, so tool
//! results are carried to the API as text blocks on a `user` turn rather
//! than as paired `tool_result` blocks; `tool_use` blocks coming back are
//! lifted into [`ToolCallRequest`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ports::llm::{ChatMessage, ChatResponse, Role, ToolCallRequest, ToolDescriptor};

/// Request body for `POST /v1/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ApiTool>>,
}

/// One conversation turn on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: String,
}

/// Tool definition on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl From<&ToolDescriptor> for ApiTool {
    fn from(tool: &ToolDescriptor) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.input_schema.clone(),
        }
    }
}

/// Response body for `POST /v1/messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ResponseBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Content block in a response.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
}

/// Split the engine's message list into the API's `system` string and turn
/// list. System messages concatenate into the `system` field; tool-result
/// messages become labeled `user` turns.
pub fn to_api_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<ApiMessage>) {
    let mut system_parts: Vec<&str> = Vec::new();
    let mut turns: Vec<ApiMessage> = Vec::new();

    for message in messages {
        match message.role {
            Role::System => system_parts.push(&message.content),
            Role::User => turns.push(ApiMessage {
                role: "user".to_string(),
                content: message.content.clone(),
            }),
            Role::Assistant => turns.push(ApiMessage {
                role: "assistant".to_string(),
                content: message.content.clone(),
            }),
            Role::Tool => turns.push(ApiMessage {
                role: "user".to_string(),
                content: format!("[tool result] {}", message.content),
            }),
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (system, turns)
}

/// Collapse a response's blocks into the engine's `ChatResponse`.
pub fn from_api_response(response: MessagesResponse) -> ChatResponse {
    let mut content = String::new();
    let mut reasoning: Option<String> = None;
    let mut tool_calls: Vec<ToolCallRequest> = Vec::new();

    for block in response.content {
        match block {
            ResponseBlock::Text { text } => {
                if !content.is_empty() {
                    content.push('\n');
                }
                content.push_str(&text);
            }
            ResponseBlock::Thinking { thinking } => {
                reasoning = Some(match reasoning.take() {
                    Some(mut existing) => {
                        existing.push('\n');
                        existing.push_str(&thinking);
                        existing
                    }
                    None => thinking,
                });
            }
            ResponseBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCallRequest {
                    id,
                    name,
                    arguments: input,
                });
            }
        }
    }

    ChatResponse {
        content,
        reasoning,
        tool_calls,
    }
}
