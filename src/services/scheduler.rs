//! Branch scheduler: parallel mutate → execute → evaluate waves.
//!
//! Each selected parent becomes one branch task gated by a counting
//! semaphore. Results flow back through one bounded channel and the archive
//! is updated in a single batched pass after every branch has finished,
//! which keeps archive lock contention low and makes the final state a
//! deterministic function of the result set rather than completion order.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{SearchError, SearchResult};
use crate::domain::models::{PathCandidate, ScoreVector, SearchConfig};
use crate::domain::ports::id_generator::IdGenerator;
use crate::services::archive::ParetoArchive;
use crate::services::budget::BudgetCounters;
use crate::services::evaluator::Evaluator;
use crate::services::executor::PathExecutor;
use crate::services::mutator::Mutator;

/// Outcome of one branch's pipeline.
#[derive(Debug)]
pub struct BranchResult {
    /// Position of the parent in this generation's selection. Used to order
    /// the batched archive pass deterministically.
    pub index: usize,
    /// The finalized mutant; `None` when the branch was skipped or failed.
    pub candidate: Option<Arc<PathCandidate>>,
    /// Whether this branch's mutant met the target score.
    pub target_met: bool,
}

/// Result of one full generation wave.
#[derive(Debug)]
pub struct GenerationOutcome {
    /// Highest-quality candidate seen so far, after integrating the wave.
    pub best: Arc<PathCandidate>,
    /// True when some branch met the target score.
    pub early_exit: bool,
    /// Branches that produced a finalized mutant.
    pub completed_branches: usize,
}

/// Runs one generation's branches, concurrently or one at a time.
pub struct BranchScheduler {
    mutator: Arc<Mutator>,
    executor: Arc<PathExecutor>,
    evaluator: Arc<Evaluator>,
    ids: Arc<dyn IdGenerator>,
}

impl BranchScheduler {
    pub fn new(
        mutator: Arc<Mutator>,
        executor: Arc<PathExecutor>,
        evaluator: Arc<Evaluator>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            mutator,
            executor,
            evaluator,
            ids,
        }
    }

    /// Run every parent through the branch pipeline concurrently, then
    /// integrate the surviving mutants into the archive in one batched pass.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_generation(
        self: &Arc<Self>,
        parents: Vec<Arc<PathCandidate>>,
        query: &str,
        config: &SearchConfig,
        budget: &Arc<BudgetCounters>,
        archive: &ParetoArchive,
        fallback_feedback: &str,
        mut best: Arc<PathCandidate>,
        cancel: &CancellationToken,
    ) -> GenerationOutcome {
        let semaphore = Arc::new(Semaphore::new(config.effective_max_parallel()));
        let (tx, mut rx) = mpsc::channel::<BranchResult>(parents.len().max(1));

        for (index, parent) in parents.into_iter().enumerate() {
            let scheduler = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            let budget = Arc::clone(budget);
            let config = config.clone();
            let query = query.to_string();
            let fallback = fallback_feedback.to_string();
            let cancel = cancel.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                // Closed semaphore means the wave is being torn down.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let result = match scheduler
                    .run_branch(&parent, &query, &config, &budget, &fallback, &cancel)
                    .await
                {
                    Ok(Some((candidate, target_met))) => BranchResult {
                        index,
                        candidate: Some(candidate),
                        target_met,
                    },
                    Ok(None) => BranchResult {
                        index,
                        candidate: None,
                        target_met: false,
                    },
                    Err(err) => {
                        tracing::warn!(branch = index, error = %err, "branch failed; continuing");
                        BranchResult {
                            index,
                            candidate: None,
                            target_met: false,
                        }
                    }
                };
                let _ = tx.send(result).await;
            });
        }
        drop(tx);

        // Collector: drain every branch result, then integrate as a batch.
        let mut results: Vec<BranchResult> = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results.sort_by_key(|r| r.index);

        let mut early_exit = false;
        let mut completed = 0;
        for result in results {
            early_exit |= result.target_met;
            if let Some(candidate) = result.candidate {
                completed += 1;
                archive.add(candidate.clone());
                if candidate.quality() > best.quality() {
                    best = candidate;
                }
            }
        }

        GenerationOutcome {
            best,
            early_exit,
            completed_branches: completed,
        }
    }

    /// One branch: mutate → execute → evaluate → finalize.
    ///
    /// Returns `Ok(None)` when the branch was skipped before doing any work
    /// (early-stop flag set, cancellation, or budget already spent — gating
    /// is best-effort and only stops branches from *starting*). Errors abort
    /// this branch only.
    pub async fn run_branch(
        &self,
        parent: &Arc<PathCandidate>,
        query: &str,
        config: &SearchConfig,
        budget: &BudgetCounters,
        fallback_feedback: &str,
        cancel: &CancellationToken,
    ) -> SearchResult<Option<(Arc<PathCandidate>, bool)>> {
        if budget.stop_requested() || cancel.is_cancelled() || budget.exhausted(config) {
            return Ok(None);
        }

        let feedback = parent.feedback().unwrap_or(fallback_feedback);
        let parent_trace = parent.trace().cloned().unwrap_or_else(|| {
            crate::domain::models::ExecutionTrace::empty(query)
        });

        budget.record_llm_call();
        let mut child = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(SearchError::Canceled),
            c = self.mutator.mutate_strategy(
                parent,
                &parent_trace,
                feedback,
                self.ids.candidate_id(),
            ) => c?,
        };

        budget.record_llm_call();
        let trace = self.executor.execute(query, &child, cancel).await?;
        budget.record_tool_calls(trace.tool_calls.len() as u64);
        child.set_trace(trace);

        budget.record_llm_call();
        let evaluation = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(SearchError::Canceled),
            r = self
                .evaluator
                .evaluate(query, child.trace().unwrap_or(&parent_trace)) => r,
        };
        let (scores, feedback) = match evaluation {
            Ok(result) => result,
            Err(err) => {
                tracing::debug!(candidate = %child.id, error = %err, "evaluation degraded to zero scores");
                (ScoreVector::zero(), format!("Evaluation failed: {err}"))
            }
        };
        let target_met = scores.answer_quality >= config.target_score;
        child.set_scores(scores);
        child.set_feedback(feedback);

        if target_met {
            budget.request_stop();
        }

        Ok(Some((Arc::new(child), target_met)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ExecutionTrace;
    use crate::domain::ports::id_generator::UuidIdGenerator;
    use crate::domain::ports::llm::{ChatMessage, ChatResponse, LlmPort, ToolDescriptor};
    use crate::domain::ports::notifier::NullNotifier;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves a fixed cycle of mutation → execution → evaluation responses,
    /// regardless of interleaving across branches.
    struct CyclingLlm {
        calls: Mutex<usize>,
        eval_quality: f64,
    }

    #[async_trait]
    impl LlmPort for CyclingLlm {
        async fn chat(&self, messages: &[ChatMessage]) -> SearchResult<ChatResponse> {
            let system = &messages[0].content;
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if system.contains("You improve strategy prompts") {
                Ok(ChatResponse::text(
                    r#"{"strategy": "improved strategy", "lesson": "be faster"}"#,
                ))
            } else if system.contains("strict evaluator") {
                Ok(ChatResponse::text(format!(
                    r#"{{"answer_quality": {q}, "efficiency": {q}, "cost": {q},
                        "robustness": {q}, "latency": {q}, "critique": "fine"}}"#,
                    q = self.eval_quality
                )))
            } else {
                Ok(ChatResponse::text("the answer"))
            }
        }

        async fn chat_with_tools(
            &self,
            messages: &[ChatMessage],
            _tools: &[ToolDescriptor],
        ) -> SearchResult<ChatResponse> {
            self.chat(messages).await
        }
    }

    fn scheduler_with(eval_quality: f64) -> Arc<BranchScheduler> {
        let llm: Arc<dyn LlmPort> = Arc::new(CyclingLlm {
            calls: Mutex::new(0),
            eval_quality,
        });
        let ids: Arc<dyn IdGenerator> = Arc::new(UuidIdGenerator);
        let executor = Arc::new(PathExecutor::new(
            llm.clone(),
            Vec::new(),
            None,
            Arc::new(NullNotifier),
            ids.clone(),
            5_000,
            3,
        ));
        Arc::new(BranchScheduler::new(
            Arc::new(Mutator::new(llm.clone())),
            executor,
            Arc::new(Evaluator::new(llm)),
            ids,
        ))
    }

    fn evaluated_parent(id: &str, quality: f64) -> Arc<PathCandidate> {
        let mut parent = PathCandidate::new_seed(id, "run", None);
        parent.set_trace(ExecutionTrace::empty("q"));
        parent.set_scores(ScoreVector::uniform(quality));
        parent.set_feedback("needs work".to_string());
        Arc::new(parent)
    }

    #[tokio::test]
    async fn test_run_branch_pipeline_charges_three_llm_calls() {
        let scheduler = scheduler_with(0.5);
        let budget = BudgetCounters::new();
        let config = SearchConfig::default();
        let parent = evaluated_parent("p", 0.4);

        let out = scheduler
            .run_branch(&parent, "q", &config, &budget, "fallback", &CancellationToken::new())
            .await
            .unwrap();
        let (child, target_met) = out.unwrap();
        assert!(!target_met);
        assert_eq!(child.generation, 1);
        assert_eq!(child.parent_ids, vec!["p".to_string()]);
        assert_eq!(child.strategy_prompt, "improved strategy");
        assert_eq!(child.answer(), "the answer");
        assert_eq!(budget.llm_calls_used(), 3);
    }

    #[tokio::test]
    async fn test_run_branch_target_met_sets_stop_flag() {
        let scheduler = scheduler_with(0.99);
        let budget = BudgetCounters::new();
        let config = SearchConfig {
            target_score: 0.9,
            ..Default::default()
        };
        let parent = evaluated_parent("p", 0.4);

        let (child, target_met) = scheduler
            .run_branch(&parent, "q", &config, &budget, "fb", &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert!(target_met);
        assert!(budget.stop_requested());
        assert!(child.quality() >= 0.9);
    }

    #[tokio::test]
    async fn test_run_branch_skips_on_exhausted_budget() {
        let scheduler = scheduler_with(0.5);
        let budget = BudgetCounters::new();
        let config = SearchConfig {
            max_llm_calls: 1,
            ..Default::default()
        };
        budget.record_llm_call();
        let parent = evaluated_parent("p", 0.4);

        let out = scheduler
            .run_branch(&parent, "q", &config, &budget, "fb", &CancellationToken::new())
            .await
            .unwrap();
        assert!(out.is_none());
        // Gating is pre-flight only: no extra calls were made.
        assert_eq!(budget.llm_calls_used(), 1);
    }

    #[tokio::test]
    async fn test_run_branch_skips_after_stop_requested() {
        let scheduler = scheduler_with(0.5);
        let budget = BudgetCounters::new();
        budget.request_stop();
        let parent = evaluated_parent("p", 0.4);

        let out = scheduler
            .run_branch(
                &parent,
                "q",
                &SearchConfig::default(),
                &budget,
                "fb",
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_run_generation_updates_best_and_reports_early_exit() {
        let scheduler = scheduler_with(0.97);
        let budget = Arc::new(BudgetCounters::new());
        let config = SearchConfig {
            target_score: 0.9,
            ..Default::default()
        };
        let archive = ParetoArchive::new(config.archive_size);
        let seed = evaluated_parent("seed", 0.4);
        archive.add(seed.clone());

        let outcome = scheduler
            .run_generation(
                vec![seed.clone(), evaluated_parent("p2", 0.3)],
                "q",
                &config,
                &budget,
                &archive,
                "fallback",
                seed,
                &CancellationToken::new(),
            )
            .await;

        assert!(outcome.early_exit);
        assert!(outcome.best.quality() >= 0.9);
        assert!(outcome.completed_branches >= 1);
        // The winning mutant dominated the 0.4-uniform seed out of the archive.
        assert!(archive.len() >= 1);
    }

    #[tokio::test]
    async fn test_all_branches_failing_leaves_best_unchanged() {
        struct FailingLlm;
        #[async_trait]
        impl LlmPort for FailingLlm {
            async fn chat(&self, _m: &[ChatMessage]) -> SearchResult<ChatResponse> {
                Err(SearchError::Llm("backend down".to_string()))
            }
            async fn chat_with_tools(
                &self,
                m: &[ChatMessage],
                _t: &[ToolDescriptor],
            ) -> SearchResult<ChatResponse> {
                self.chat(m).await
            }
        }
        let llm: Arc<dyn LlmPort> = Arc::new(FailingLlm);
        let ids: Arc<dyn IdGenerator> = Arc::new(UuidIdGenerator);
        let scheduler = Arc::new(BranchScheduler::new(
            Arc::new(Mutator::new(llm.clone())),
            Arc::new(PathExecutor::new(
                llm.clone(),
                Vec::new(),
                None,
                Arc::new(NullNotifier),
                ids.clone(),
                5_000,
                3,
            )),
            Arc::new(Evaluator::new(llm)),
            ids,
        ));

        let budget = Arc::new(BudgetCounters::new());
        let archive = ParetoArchive::new(5);
        let seed = evaluated_parent("seed", 0.4);
        archive.add(seed.clone());

        let outcome = scheduler
            .run_generation(
                vec![seed.clone()],
                "q",
                &SearchConfig::default(),
                &budget,
                &archive,
                "fb",
                seed.clone(),
                &CancellationToken::new(),
            )
            .await;

        assert!(!outcome.early_exit);
        assert_eq!(outcome.completed_branches, 0);
        assert_eq!(outcome.best.id, seed.id);
        assert_eq!(archive.len(), 1);
    }
}
