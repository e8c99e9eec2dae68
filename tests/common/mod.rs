//! Common test utilities for integration tests
//!
//! Provides a scripted stub LLM port and stub tool runners shared across
//! the integration test files.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use gepa::domain::ports::llm::{
    ChatMessage, ChatResponse, LlmPort, ToolCallRequest, ToolDescriptor,
};
use gepa::{SearchError, SearchResult, ToolRunner};

/// Scripted LLM stub.
///
/// Calls are classified by their system prompt: evaluator, mutation,
/// crossover, or agent-execution. Each class pops from its own queue and
/// falls back to a fixed default when the queue is empty, so tests only
/// script the turns they care about.
pub struct StubLlm {
    agent_turns: Mutex<VecDeque<ChatResponse>>,
    eval_scores: Mutex<VecDeque<[f64; 5]>>,
    mutation_strategies: Mutex<VecDeque<String>>,
    default_eval: Mutex<[f64; 5]>,
    eval_garbage: std::sync::atomic::AtomicBool,
    mutation_delay: Mutex<Duration>,
    /// Total chat calls of any kind.
    pub calls: AtomicU64,
    /// Message lists seen by agent-execution calls, in call order.
    pub agent_messages_seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl StubLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            agent_turns: Mutex::new(VecDeque::new()),
            eval_scores: Mutex::new(VecDeque::new()),
            mutation_strategies: Mutex::new(VecDeque::new()),
            default_eval: Mutex::new([0.5; 5]),
            eval_garbage: std::sync::atomic::AtomicBool::new(false),
            mutation_delay: Mutex::new(Duration::ZERO),
            calls: AtomicU64::new(0),
            agent_messages_seen: Mutex::new(Vec::new()),
        })
    }

    pub fn push_agent_text(&self, text: &str) {
        self.agent_turns
            .lock()
            .unwrap()
            .push_back(ChatResponse::text(text));
    }

    pub fn push_agent_tool_call(&self, name: &str, arguments: Value) {
        self.agent_turns.lock().unwrap().push_back(ChatResponse {
            content: String::new(),
            reasoning: None,
            tool_calls: vec![ToolCallRequest {
                id: String::new(),
                name: name.to_string(),
                arguments,
            }],
        });
    }

    pub fn push_eval(&self, scores: [f64; 5]) {
        self.eval_scores.lock().unwrap().push_back(scores);
    }

    pub fn push_eval_uniform(&self, value: f64) {
        self.push_eval([value; 5]);
    }

    pub fn set_default_eval(&self, scores: [f64; 5]) {
        *self.default_eval.lock().unwrap() = scores;
    }

    pub fn push_mutation(&self, strategy: &str) {
        self.mutation_strategies
            .lock()
            .unwrap()
            .push_back(strategy.to_string());
    }

    pub fn set_mutation_delay(&self, delay: Duration) {
        *self.mutation_delay.lock().unwrap() = delay;
    }

    /// Make every evaluator call return non-JSON prose.
    pub fn set_eval_garbage(&self, garbage: bool) {
        self.eval_garbage.store(garbage, Ordering::SeqCst);
    }

    pub fn total_calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self, messages: &[ChatMessage]) -> SearchResult<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let system = messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        if system.contains("strict evaluator") {
            if self.eval_garbage.load(Ordering::SeqCst) {
                return Ok(ChatResponse::text("I will not produce scores today."));
            }
            let scores = self
                .eval_scores
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(*self.default_eval.lock().unwrap());
            return Ok(ChatResponse::text(
                json!({
                    "answer_quality": scores[0],
                    "efficiency": scores[1],
                    "cost": scores[2],
                    "robustness": scores[3],
                    "latency": scores[4],
                    "critique": "stub critique",
                })
                .to_string(),
            ));
        }

        if system.contains("You improve strategy prompts")
            || system.contains("You combine two strategy prompts")
        {
            let delay = *self.mutation_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let strategy = self
                .mutation_strategies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "stub mutated strategy".to_string());
            return Ok(ChatResponse::text(
                json!({ "strategy": strategy }).to_string(),
            ));
        }

        // Agent execution turn.
        self.agent_messages_seen
            .lock()
            .unwrap()
            .push(messages.to_vec());
        Ok(self
            .agent_turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ChatResponse::text("stub answer")))
    }
}

#[async_trait]
impl LlmPort for StubLlm {
    async fn chat(&self, messages: &[ChatMessage]) -> SearchResult<ChatResponse> {
        self.respond(messages).await
    }

    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDescriptor],
    ) -> SearchResult<ChatResponse> {
        self.respond(messages).await
    }
}

/// Echoes the `text` argument back as the tool result.
pub struct EchoRunner;

#[async_trait]
impl ToolRunner for EchoRunner {
    async fn run(&self, _name: &str, arguments: &Value) -> SearchResult<Value> {
        Ok(arguments.get("text").cloned().unwrap_or(Value::Null))
    }
}

/// Fails every call with a fixed message.
pub struct FailingRunner {
    pub message: String,
}

#[async_trait]
impl ToolRunner for FailingRunner {
    async fn run(&self, name: &str, _arguments: &Value) -> SearchResult<Value> {
        Err(SearchError::Tool {
            name: name.to_string(),
            message: self.message.clone(),
        })
    }
}

/// Descriptor for the echo tool used across scenarios.
pub fn echo_tool() -> ToolDescriptor {
    ToolDescriptor {
        name: "echo".to_string(),
        description: "echo the text argument back".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"],
        }),
    }
}
