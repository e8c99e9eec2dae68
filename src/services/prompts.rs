//! Fixed prompt text for the LLM-backed operators.
//!
//! The evaluator, mutator, and crossover prompts demand strict JSON so their
//! callers can parse responses without heuristics beyond brace extraction.

/// Fixed instruction appended to every agent prompt.
pub const AGENT_INSTRUCTION: &str = "Think step by step. Use tools as needed.";

/// System prompt for trace evaluation.
pub const EVALUATOR_SYSTEM_PROMPT: &str = "\
You are a strict evaluator of assistant execution traces. Given a user query \
and the trace of one attempt to answer it, score the attempt on five axes, \
each a number between 0.0 and 1.0 where higher is always better:

- answer_quality: how well the final answer addresses the query
- efficiency: how directly the attempt reached the answer (no wasted turns)
- cost: token economy (1.0 = very cheap)
- robustness: how well the attempt handled tool failures and dead ends
- latency: speed (1.0 = very fast)

Respond with ONLY a JSON object of this exact shape:
{\"answer_quality\": 0.0, \"efficiency\": 0.0, \"cost\": 0.0, \
\"robustness\": 0.0, \"latency\": 0.0, \"critique\": \"...\"}

The critique must name the weakest part of the attempt and how to fix it.";

/// System prompt for strategy mutation.
pub const MUTATION_SYSTEM_PROMPT: &str = "\
You improve strategy prompts for an LLM assistant. You are given the current \
strategy, a summary of the execution it produced, and critique of that \
execution. Rewrite the strategy to address the critique while keeping what \
worked.

Respond with ONLY a JSON object:
{\"strategy\": \"the full rewritten strategy text\", \
\"lesson\": \"one short transferable lesson learned, or omit the field\"}";

/// System prompt for strategy crossover.
pub const CROSSOVER_SYSTEM_PROMPT: &str = "\
You combine two strategy prompts for an LLM assistant into one. Merge the \
strongest elements of both into a single coherent strategy; do not simply \
concatenate them.

Respond with ONLY a JSON object:
{\"strategy\": \"the full combined strategy text\"}";
