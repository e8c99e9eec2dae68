//! Search orchestrator: seed → generations → termination.
//!
//! Owns one search run end to end: executes and evaluates the seed, drives
//! the generational loop through the branch scheduler, performs the optional
//! crossover step, and assembles the output envelope. Termination conditions
//! are checked in a fixed order at the top of every generation:
//! cancellation → budget exhausted → target met → max generations.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{SearchError, SearchResult};
use crate::domain::models::{
    ExecutionTrace, PathCandidate, ScoreVector, SearchConfig, SearchInput, SearchOutput,
    SearchPhase,
};
use crate::domain::ports::id_generator::{IdGenerator, UuidIdGenerator};
use crate::domain::ports::llm::LlmPort;
use crate::domain::ports::notifier::{Notifier, NullNotifier};
use crate::services::archive::ParetoArchive;
use crate::services::budget::BudgetCounters;
use crate::services::evaluator::Evaluator;
use crate::services::executor::PathExecutor;
use crate::services::mutator::Mutator;
use crate::services::scheduler::BranchScheduler;

/// Feedback used for branches whose parent carries none.
const FALLBACK_FEEDBACK: &str =
    "No evaluator feedback available; improve answer quality and efficiency.";

/// Drives one Genetic-Pareto search per [`run`](Self::run) call.
///
/// The orchestrator itself holds only the LLM port and the ID generator;
/// every run constructs its own archive, budget, and execution context, so
/// concurrent top-level searches are isolated by construction. The `phase`
/// accessor reports the most recently started run.
pub struct SearchOrchestrator {
    llm: Arc<dyn LlmPort>,
    ids: Arc<dyn IdGenerator>,
    phase: Arc<RwLock<SearchPhase>>,
}

impl SearchOrchestrator {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self {
            llm,
            ids: Arc::new(UuidIdGenerator),
            phase: Arc::new(RwLock::new(SearchPhase::Created)),
        }
    }

    /// Replace the default UUID generator with the host's own.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Coarse state of the most recently started run.
    pub async fn phase(&self) -> SearchPhase {
        *self.phase.read().await
    }

    async fn set_phase(&self, phase: SearchPhase) {
        *self.phase.write().await = phase;
    }

    /// Run the search to completion and return the best candidate found.
    pub async fn run(&self, input: SearchInput) -> SearchResult<SearchOutput> {
        if input.query.trim().is_empty() {
            return Err(SearchError::InvalidInput("query must not be empty".to_string()));
        }
        let config = input.config.clone().normalized();
        config.validate()?;

        let notifier: Arc<dyn Notifier> = input
            .notifier
            .clone()
            .unwrap_or_else(|| Arc::new(NullNotifier));
        let cancel = input.cancellation.clone();
        let run_id = self.ids.run_id();
        self.set_phase(SearchPhase::Created).await;

        let executor = Arc::new(PathExecutor::new(
            self.llm.clone(),
            input.tools.clone(),
            input.tool_runner.clone(),
            notifier.clone(),
            self.ids.clone(),
            config.execution_timeout_ms,
            config.max_tool_loop_iterations,
        ));
        let evaluator = Arc::new(Evaluator::new(self.llm.clone()));
        let mutator = Arc::new(Mutator::new(self.llm.clone()));
        let scheduler = Arc::new(BranchScheduler::new(
            mutator.clone(),
            executor.clone(),
            evaluator.clone(),
            self.ids.clone(),
        ));
        let archive = ParetoArchive::new(config.archive_size);
        let budget = Arc::new(BudgetCounters::new());

        notifier.generation_started(&run_id).await;
        tracing::info!(run_id = %run_id, query_len = input.query.len(), "search started");

        // Seed round: execute and evaluate the starting strategy. Execution
        // failure degrades to an empty trace so the search still has a
        // baseline to mutate away from; only cancellation aborts outright.
        let mut seed = PathCandidate::new_seed(
            self.ids.candidate_id(),
            run_id.clone(),
            input.seed_strategy.clone(),
        );
        budget.record_llm_call();
        let seed_trace = match executor.execute(&input.query, &seed, &cancel).await {
            Ok(trace) => trace,
            Err(err) if err.is_canceled() => {
                return self.fail(&notifier, &run_id, "no valid path found").await;
            }
            Err(err) => {
                tracing::warn!(run_id = %run_id, error = %err, "seed execution failed; using empty trace");
                ExecutionTrace::empty(&input.query)
            }
        };
        budget.record_tool_calls(seed_trace.tool_calls.len() as u64);

        budget.record_llm_call();
        let evaluation = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(SearchError::Canceled),
            r = evaluator.evaluate(&input.query, &seed_trace) => r,
        };
        let (seed_scores, seed_feedback) = evaluation.unwrap_or_else(|err| {
            tracing::debug!(run_id = %run_id, error = %err, "seed evaluation degraded to zero scores");
            (ScoreVector::zero(), format!("Evaluation failed: {err}"))
        });
        seed.set_trace(seed_trace);
        seed.set_scores(seed_scores);
        seed.set_feedback(seed_feedback);

        let seed = Arc::new(seed);
        archive.add(seed.clone());
        let mut best = seed;
        self.set_phase(SearchPhase::SeedExecuted).await;

        // Seed round counts as iteration 1; each fully-completed generation
        // adds one. A generation that exits early does not.
        let mut iterations: u32 = 1;

        for gen in 0..config.max_generations {
            if cancel.is_cancelled() {
                tracing::info!(run_id = %run_id, gen, "search canceled; returning best so far");
                break;
            }
            if budget.exhausted(&config) {
                tracing::info!(
                    run_id = %run_id,
                    gen,
                    llm_calls = budget.llm_calls_used(),
                    tool_calls = budget.tool_calls_used(),
                    "budget exhausted"
                );
                break;
            }
            if best.quality() >= config.target_score {
                break;
            }

            let mut parents = archive.select_for_mutation(config.branches_per_generation as usize);
            if parents.is_empty() {
                parents = vec![best.clone()];
            }
            let fallback = best
                .feedback()
                .filter(|f| !f.is_empty())
                .unwrap_or(FALLBACK_FEEDBACK)
                .to_string();
            self.set_phase(SearchPhase::GenRunning).await;

            let early_exit = if config.enable_parallel_branches && parents.len() > 1 {
                let outcome = scheduler
                    .run_generation(
                        parents,
                        &input.query,
                        &config,
                        &budget,
                        &archive,
                        &fallback,
                        best.clone(),
                        &cancel,
                    )
                    .await;
                best = outcome.best;
                outcome.early_exit
            } else {
                let mut hit_target = false;
                for parent in parents {
                    match scheduler
                        .run_branch(&parent, &input.query, &config, &budget, &fallback, &cancel)
                        .await
                    {
                        Ok(Some((candidate, target_met))) => {
                            archive.add(candidate.clone());
                            if candidate.quality() > best.quality() {
                                best = candidate;
                            }
                            if target_met {
                                hit_target = true;
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            tracing::warn!(run_id = %run_id, gen, error = %err, "branch failed; continuing");
                        }
                    }
                }
                hit_target
            };

            if early_exit {
                self.set_phase(SearchPhase::EarlyExit).await;
                tracing::info!(run_id = %run_id, gen, best_score = best.quality(), "target met; early exit");
                break;
            }

            if config.enable_crossover
                && archive.len() >= 2
                && !budget.exhausted(&config)
                && !cancel.is_cancelled()
            {
                match self
                    .run_crossover(&archive, &input.query, &config, &budget, &mutator, &executor, &evaluator, &cancel)
                    .await
                {
                    Ok(Some(candidate)) => {
                        archive.add(candidate.clone());
                        if candidate.quality() > best.quality() {
                            best = candidate;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(run_id = %run_id, gen, error = %err, "crossover failed; continuing");
                    }
                }
            }

            self.set_phase(SearchPhase::GenComplete).await;
            iterations += 1;
        }

        if best.trace().is_none() {
            return self.fail(&notifier, &run_id, "no valid path found").await;
        }

        self.set_phase(SearchPhase::Terminated).await;
        let answer = best.answer().to_string();
        notifier.generation_complete(&run_id, &answer).await;
        tracing::info!(
            run_id = %run_id,
            iterations,
            best_score = best.quality(),
            archive_size = archive.len(),
            "search finished"
        );

        Ok(SearchOutput {
            score: best.quality(),
            answer,
            iterations,
            pareto_front: archive.pareto_front(),
            best,
        })
    }

    /// One crossover round: diverse pair → combine → execute → evaluate.
    /// Returns `Ok(None)` when the front is too small to pick a pair.
    #[allow(clippy::too_many_arguments)]
    async fn run_crossover(
        &self,
        archive: &ParetoArchive,
        query: &str,
        config: &SearchConfig,
        budget: &BudgetCounters,
        mutator: &Mutator,
        executor: &PathExecutor,
        evaluator: &Evaluator,
        cancel: &CancellationToken,
    ) -> SearchResult<Option<Arc<PathCandidate>>> {
        let Some((parent_a, parent_b)) = archive.select_diverse_pair() else {
            return Ok(None);
        };

        budget.record_llm_call();
        let mut child = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(SearchError::Canceled),
            c = mutator.crossover(&parent_a, &parent_b, self.ids.candidate_id()) => c?,
        };

        budget.record_llm_call();
        let trace = executor.execute(query, &child, cancel).await?;
        budget.record_tool_calls(trace.tool_calls.len() as u64);

        budget.record_llm_call();
        let evaluation = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(SearchError::Canceled),
            r = evaluator.evaluate(query, &trace) => r,
        };
        let (scores, feedback) = match evaluation {
            Ok(result) => result,
            Err(err) => (ScoreVector::zero(), format!("Evaluation failed: {err}")),
        };
        let target_met = scores.answer_quality >= config.target_score;
        child.set_trace(trace);
        child.set_scores(scores);
        child.set_feedback(feedback);
        if target_met {
            budget.request_stop();
        }

        Ok(Some(Arc::new(child)))
    }

    async fn fail(
        &self,
        notifier: &Arc<dyn Notifier>,
        run_id: &str,
        message: &str,
    ) -> SearchResult<SearchOutput> {
        self.set_phase(SearchPhase::Terminated).await;
        notifier.generation_failed(run_id, message).await;
        tracing::warn!(run_id = %run_id, message, "search failed");
        Err(SearchError::InvalidInput(message.to_string()))
    }
}
