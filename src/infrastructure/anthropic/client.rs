//! HTTP client for the Anthropic Messages API implementing the `LlmPort`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use super::error::AnthropicApiError;
use super::types::{from_api_response, to_api_messages, ApiTool, MessagesRequest, MessagesResponse};
use crate::domain::errors::{SearchError, SearchResult};
use crate::domain::ports::llm::{ChatMessage, ChatResponse, LlmPort, ToolDescriptor};

/// Configuration for [`AnthropicClient`].
#[derive(Debug, Clone)]
pub struct AnthropicClientConfig {
    /// API key. Defaults to the `ANTHROPIC_API_KEY` environment variable.
    pub api_key: String,
    pub base_url: String,
    /// Model id used for every request.
    pub model: String,
    /// Generation cap per request.
    pub max_tokens: u32,
    /// Whole-request timeout.
    pub timeout_secs: u64,
    /// Retries on transient failures (429/5xx/network).
    pub max_retries: u32,
    /// First backoff delay; doubles per attempt.
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Cap on concurrently in-flight requests across all branches.
    pub max_concurrent_requests: usize,
}

impl Default for AnthropicClientConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 4096,
            timeout_secs: 300,
            max_retries: 3,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
            max_concurrent_requests: 4,
        }
    }
}

/// `LlmPort` implementation over the Anthropic Messages API.
///
/// Connection pooling comes from the shared `reqwest::Client`; a semaphore
/// bounds in-flight requests so a wide branch wave cannot stampede the API;
/// transient failures retry with exponential backoff.
pub struct AnthropicClient {
    http: ReqwestClient,
    config: AnthropicClientConfig,
    in_flight: Semaphore,
}

impl AnthropicClient {
    /// Client with default configuration and the given API key.
    pub fn new(api_key: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_config(AnthropicClientConfig {
            api_key: api_key.into(),
            ..Default::default()
        })
    }

    pub fn with_config(config: AnthropicClientConfig) -> anyhow::Result<Self> {
        let http = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(config.max_concurrent_requests.max(1))
            .build()?;
        Ok(Self {
            http,
            in_flight: Semaphore::new(config.max_concurrent_requests.max(1)),
            config,
        })
    }

    async fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse, AnthropicApiError> {
        let response = self
            .http
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| AnthropicApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnthropicApiError::from_status(status, body));
        }

        response
            .json::<MessagesResponse>()
            .await
            .map_err(|e| AnthropicApiError::MalformedResponse(e.to_string()))
    }

    async fn send_with_retry(
        &self,
        request: &MessagesRequest,
    ) -> Result<MessagesResponse, AnthropicApiError> {
        let mut backoff_ms = self.config.initial_backoff_ms;
        let mut attempt = 0;
        loop {
            match self.send(request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max = self.config.max_retries,
                        backoff_ms,
                        error = %err,
                        "transient Anthropic API error; retrying"
                    );
                    sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = (backoff_ms * 2).min(self.config.max_backoff_ms);
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDescriptor]>,
    ) -> SearchResult<ChatResponse> {
        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|_| SearchError::Llm("client is shut down".to_string()))?;

        let (system, api_messages) = to_api_messages(messages);
        let request = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system,
            messages: api_messages,
            tools: tools
                .filter(|t| !t.is_empty())
                .map(|t| t.iter().map(ApiTool::from).collect()),
        };

        let response = self.send_with_retry(&request).await?;
        Ok(from_api_response(response))
    }
}

#[async_trait]
impl LlmPort for AnthropicClient {
    async fn chat(&self, messages: &[ChatMessage]) -> SearchResult<ChatResponse> {
        self.complete(messages, None).await
    }

    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDescriptor],
    ) -> SearchResult<ChatResponse> {
        self.complete(messages, Some(tools)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_client(base_url: String) -> AnthropicClient {
        AnthropicClient::with_config(AnthropicClientConfig {
            api_key: "test-key".to_string(),
            base_url,
            max_retries: 2,
            initial_backoff_ms: 10,
            max_backoff_ms: 50,
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_chat_parses_text_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", "2023-06-01")
            .with_status(200)
            .with_body(
                json!({
                    "content": [{"type": "text", "text": "4"}],
                    "stop_reason": "end_turn"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = test_client(server.url());
        let response = client
            .chat(&[ChatMessage::system("be terse"), ChatMessage::user("2+2?")])
            .await
            .unwrap();
        assert_eq!(response.content, "4");
        assert!(response.tool_calls.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chat_with_tools_surfaces_tool_use() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(
                json!({
                    "content": [
                        {"type": "text", "text": "checking"},
                        {"type": "tool_use", "id": "tu_1", "name": "echo",
                         "input": {"text": "hi"}}
                    ],
                    "stop_reason": "tool_use"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = test_client(server.url());
        let tools = [ToolDescriptor {
            name: "echo".to_string(),
            description: "echoes".to_string(),
            input_schema: json!({"type": "object"}),
        }];
        let response = client
            .chat_with_tools(&[ChatMessage::user("ping")], &tools)
            .await
            .unwrap();
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "echo");
        assert_eq!(response.tool_calls[0].arguments, json!({"text": "hi"}));
    }

    #[tokio::test]
    async fn test_transient_error_exhausts_retries() {
        let mut server = mockito::Server::new_async().await;
        // max_retries = 2 → one initial attempt plus two retries.
        let mock = server
            .mock("POST", "/v1/messages")
            .with_status(503)
            .with_body("overloaded")
            .expect(3)
            .create_async()
            .await;

        let client = test_client(server.url());
        let err = client.chat(&[ChatMessage::user("q")]).await.unwrap_err();
        assert!(matches!(err, SearchError::Llm(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_permanent_error_does_not_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .with_status(400)
            .with_body("bad request")
            .expect(1)
            .create_async()
            .await;

        let client = test_client(server.url());
        let err = client.chat(&[ChatMessage::user("q")]).await.unwrap_err();
        assert!(matches!(err, SearchError::Llm(_)));
        mock.assert_async().await;
    }
}
