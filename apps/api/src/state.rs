use std::sync::Arc;

use crate::interview::service::InterviewService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Interview flow with its store, candidate lookup, evaluator and notifier wired in.
    pub interviews: Arc<InterviewService>,
}
