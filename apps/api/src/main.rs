mod config;
mod db;
mod errors;
mod interview;
mod llm_client;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::interview::candidates::PgCandidateDirectory;
use crate::interview::evaluator::LlmEvaluator;
use crate::interview::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::interview::service::InterviewService;
use crate::interview::store::PgSessionStore;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interview API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?
        .with_max_attempts(config.evaluation_max_attempts);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            info!("Notifications delivered via webhook");
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => {
            info!("No NOTIFY_WEBHOOK_URL set, notifications are logged only");
            Arc::new(LogNotifier)
        }
    };

    let policy = config.policy();
    info!(
        "Interview policy: pass threshold {}, {} + {} questions, {} scoring, {}h validity",
        policy.pass_threshold,
        policy.stage1_questions,
        policy.stage2_questions,
        policy.score_aggregation,
        config.invite_validity_hours
    );

    let interviews = Arc::new(InterviewService::new(
        Arc::new(PgSessionStore::new(db.clone())),
        Arc::new(PgCandidateDirectory::new(db)),
        Arc::new(LlmEvaluator(llm)),
        notifier,
        policy,
        config.interview_base_url.clone(),
    ));

    let state = AppState { interviews };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the interview frontend

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
