//! Path executor: runs one candidate's strategy against the LLM port.
//!
//! A run is either single-turn (no tool runner attached) or a bounded
//! multi-turn tool loop. Tool calls within one turn execute in parallel but
//! their results are reassembled in the model's request order, so the next
//! LLM turn always sees a deterministic message sequence.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{SearchError, SearchResult};
use crate::domain::models::{ExecutionTrace, PathCandidate, ToolCallRecord};
use crate::domain::ports::id_generator::IdGenerator;
use crate::domain::ports::llm::{ChatMessage, ChatResponse, LlmPort, ToolCallRequest, ToolDescriptor};
use crate::domain::ports::notifier::Notifier;
use crate::domain::ports::tool_runner::ToolRunner;
use crate::services::prompts::AGENT_INSTRUCTION;

/// Answer substituted when the tool loop hits its iteration bound with the
/// model still asking for tools and no text to show.
const MAX_ITERATIONS_ANSWER: &str = "Max tool execution iterations reached.";

/// Executes one candidate path end to end.
pub struct PathExecutor {
    llm: Arc<dyn LlmPort>,
    tools: Vec<ToolDescriptor>,
    tool_runner: Option<Arc<dyn ToolRunner>>,
    notifier: Arc<dyn Notifier>,
    ids: Arc<dyn IdGenerator>,
    timeout_ms: u64,
    max_tool_loop_iterations: u32,
    /// Serializes notifier events so parallel tool executions produce
    /// well-ordered observer streams.
    notify_gate: Arc<tokio::sync::Mutex<()>>,
}

impl PathExecutor {
    pub fn new(
        llm: Arc<dyn LlmPort>,
        tools: Vec<ToolDescriptor>,
        tool_runner: Option<Arc<dyn ToolRunner>>,
        notifier: Arc<dyn Notifier>,
        ids: Arc<dyn IdGenerator>,
        timeout_ms: u64,
        max_tool_loop_iterations: u32,
    ) -> Self {
        Self {
            llm,
            tools,
            tool_runner,
            notifier,
            ids,
            timeout_ms,
            max_tool_loop_iterations: max_tool_loop_iterations.max(1),
            notify_gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Run `candidate`'s strategy against `query`.
    ///
    /// The whole run is bounded by the per-path timeout; timeout and
    /// cancellation surface as distinct error kinds and neither leaves a
    /// partial trace behind.
    pub async fn execute(
        &self,
        query: &str,
        candidate: &PathCandidate,
        cancel: &CancellationToken,
    ) -> SearchResult<ExecutionTrace> {
        let started = Instant::now();
        let mut trace = match timeout(
            Duration::from_millis(self.timeout_ms),
            self.run(query, candidate, cancel),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(SearchError::Timeout(self.timeout_ms)),
        };
        trace.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(trace)
    }

    async fn run(
        &self,
        query: &str,
        candidate: &PathCandidate,
        cancel: &CancellationToken,
    ) -> SearchResult<ExecutionTrace> {
        let agent_prompt = self.build_agent_prompt(candidate);
        let mut messages = vec![ChatMessage::system(agent_prompt), ChatMessage::user(query)];
        let mut prompt_chars: u64 = messages.iter().map(|m| m.content.len() as u64).sum();
        let mut response_chars: u64 = 0;
        let mut tool_records: Vec<ToolCallRecord> = Vec::new();
        let mut reasoning_steps: Vec<String> = Vec::new();

        let advertise_tools = !self.tools.is_empty();

        // Single-turn mode: no runner (or nothing to run). Tool calls the
        // model emits anyway are captured optimistically, not executed.
        let Some(runner) = self.tool_runner.clone().filter(|_| advertise_tools) else {
            let response = self.chat_turn(&messages, advertise_tools, cancel).await?;
            response_chars += response.content.len() as u64;
            self.record_reasoning(candidate, &response, &mut reasoning_steps).await;
            for call in &response.tool_calls {
                tool_records.push(ToolCallRecord::optimistic(
                    call.name.clone(),
                    call.arguments.clone(),
                ));
            }
            return Ok(ExecutionTrace {
                query: query.to_string(),
                final_answer: response.content,
                tool_calls: tool_records,
                reasoning_steps,
                total_tokens: (prompt_chars + response_chars) / 4,
                duration_ms: 0,
            });
        };

        let mut final_answer = String::new();
        for iteration in 0..self.max_tool_loop_iterations {
            if cancel.is_cancelled() {
                return Err(SearchError::Canceled);
            }

            let response = self.chat_turn(&messages, true, cancel).await?;
            response_chars += response.content.len() as u64;
            self.record_reasoning(candidate, &response, &mut reasoning_steps).await;
            messages.push(ChatMessage::assistant(response.content.clone()));

            if response.tool_calls.is_empty() {
                final_answer = response.content;
                break;
            }

            let results = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SearchError::Canceled),
                r = self.run_tool_calls(&runner, &response.tool_calls, &candidate.id) => r,
            };
            for record in results {
                let tool_message = tool_message_content(&record);
                prompt_chars += tool_message.len() as u64;
                messages.push(ChatMessage::tool(tool_message));
                tool_records.push(record);
            }

            if iteration + 1 == self.max_tool_loop_iterations {
                final_answer = if response.content.is_empty() {
                    MAX_ITERATIONS_ANSWER.to_string()
                } else {
                    response.content
                };
            }
        }

        Ok(ExecutionTrace {
            query: query.to_string(),
            final_answer,
            tool_calls: tool_records,
            reasoning_steps,
            total_tokens: (prompt_chars + response_chars) / 4,
            duration_ms: 0,
        })
    }

    /// One LLM turn, raced against cancellation so a canceled search never
    /// waits out a slow backend.
    async fn chat_turn(
        &self,
        messages: &[ChatMessage],
        with_tools: bool,
        cancel: &CancellationToken,
    ) -> SearchResult<ChatResponse> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(SearchError::Canceled),
            response = async {
                if with_tools {
                    self.llm.chat_with_tools(messages, &self.tools).await
                } else {
                    self.llm.chat(messages).await
                }
            } => response,
        }
    }

    async fn record_reasoning(
        &self,
        candidate: &PathCandidate,
        response: &ChatResponse,
        reasoning_steps: &mut Vec<String>,
    ) {
        if let Some(reasoning) = &response.reasoning {
            if !reasoning.is_empty() {
                self.notifier.thinking_summary(&candidate.id, reasoning).await;
                reasoning_steps.push(reasoning.clone());
            }
        }
    }

    /// Execute one turn's tool calls and return their records in the
    /// original request order. A single call runs inline; multiple calls
    /// each get their own task.
    async fn run_tool_calls(
        &self,
        runner: &Arc<dyn ToolRunner>,
        calls: &[ToolCallRequest],
        candidate_id: &str,
    ) -> Vec<ToolCallRecord> {
        if calls.len() == 1 {
            return vec![
                run_one_tool(
                    runner.clone(),
                    self.notifier.clone(),
                    self.notify_gate.clone(),
                    self.tool_use_id(&calls[0]),
                    candidate_id.to_string(),
                    calls[0].clone(),
                )
                .await,
            ];
        }

        let handles: Vec<_> = calls
            .iter()
            .map(|call| {
                tokio::spawn(run_one_tool(
                    runner.clone(),
                    self.notifier.clone(),
                    self.notify_gate.clone(),
                    self.tool_use_id(call),
                    candidate_id.to_string(),
                    call.clone(),
                ))
            })
            .collect();

        // join_all preserves spawn order, which reassembles results in the
        // model's request order regardless of completion order.
        futures::future::join_all(handles)
            .await
            .into_iter()
            .zip(calls)
            .map(|(joined, call)| {
                joined.unwrap_or_else(|join_err| {
                    ToolCallRecord::failed(
                        call.name.clone(),
                        call.arguments.clone(),
                        format!("tool task failed: {join_err}"),
                    )
                })
            })
            .collect()
    }

    fn tool_use_id(&self, call: &ToolCallRequest) -> String {
        if call.id.is_empty() {
            self.ids.tool_use_id()
        } else {
            call.id.clone()
        }
    }

    fn build_agent_prompt(&self, candidate: &PathCandidate) -> String {
        let mut prompt = candidate.strategy_prompt.clone();
        if !candidate.accumulated_lessons.is_empty() {
            prompt.push_str("\n\nACCUMULATED LESSONS:\n");
            for lesson in &candidate.accumulated_lessons {
                prompt.push_str("- ");
                prompt.push_str(lesson);
                prompt.push('\n');
            }
        }
        if !self.tools.is_empty() {
            prompt.push_str("\nAVAILABLE TOOLS:\n");
            for tool in &self.tools {
                prompt.push_str(&format!("- {}: {}\n", tool.name, tool.description));
            }
        }
        prompt.push('\n');
        prompt.push_str(AGENT_INSTRUCTION);
        prompt
    }
}

/// What the next LLM turn sees for one tool result.
fn tool_message_content(record: &ToolCallRecord) -> String {
    if record.success {
        record
            .result
            .as_ref()
            .map(std::string::ToString::to_string)
            .unwrap_or_default()
    } else {
        format!("ERROR: {}", record.error)
    }
}

async fn run_one_tool(
    runner: Arc<dyn ToolRunner>,
    notifier: Arc<dyn Notifier>,
    gate: Arc<tokio::sync::Mutex<()>>,
    tool_use_id: String,
    candidate_id: String,
    call: ToolCallRequest,
) -> ToolCallRecord {
    {
        let _guard = gate.lock().await;
        notifier
            .tool_use_start(&tool_use_id, &candidate_id, &call.name, &call.arguments)
            .await;
    }

    let record = match runner.run(&call.name, &call.arguments).await {
        Ok(result) => ToolCallRecord::ok(call.name.clone(), call.arguments.clone(), result),
        Err(err) => ToolCallRecord::failed(call.name.clone(), call.arguments.clone(), err.to_string()),
    };

    {
        let _guard = gate.lock().await;
        notifier
            .tool_use_complete(
                &tool_use_id,
                &candidate_id,
                record.success,
                record.result.as_ref(),
                &record.error,
            )
            .await;
    }

    record
}
