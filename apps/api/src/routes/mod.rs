pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Candidate-facing interview flow
        .route("/api/v1/interview/invite", post(handlers::handle_invite))
        .route("/api/v1/interview/validate", post(handlers::handle_validate))
        .route("/api/v1/interview/question", post(handlers::handle_question))
        .route("/api/v1/interview/answer", post(handlers::handle_answer))
        .route(
            "/api/v1/interview/transcript",
            post(handlers::handle_transcript),
        )
        .route("/api/v1/interview/expire", post(handlers::handle_expire))
        // Recruiter-facing session views and reporting hooks
        .route(
            "/api/v1/interview/sessions",
            get(handlers::handle_list_sessions),
        )
        .route(
            "/api/v1/interview/sessions/:token",
            get(handlers::handle_get_session),
        )
        .route(
            "/api/v1/interview/sessions/:token/analysis",
            put(handlers::handle_put_analysis),
        )
        .route(
            "/api/v1/interview/sessions/:token/report",
            post(handlers::handle_report),
        )
        .with_state(state)
}
