// Interview sessions: invite tokens, the two-stage question/answer state machine,
// and the adapters it drives (session store, candidate lookup, evaluator, notifier).
// All LLM calls go through llm_client via the evaluator.

pub mod candidates;
pub mod evaluator;
pub mod handlers;
pub mod locks;
pub mod machine;
pub mod notify;
pub mod prompts;
pub mod service;
pub mod store;
pub mod token;

#[cfg(test)]
pub mod testing;
