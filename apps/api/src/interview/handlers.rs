//! Axum route handlers for the Interview API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::service::{
    AnswerOutcome, ExpireOutcome, ServedQuestion, SessionFilter, ValidatedSession,
};
use crate::interview::token::InviteTicket;
use crate::models::session::{SessionAnalysis, SessionSummary, SessionView, Speaker};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub candidate_id: Uuid,
    pub recruiter_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub token: String,
    pub stage: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub token: String,
    pub stage: Option<u8>,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptRequest {
    pub token: String,
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResponse {
    pub transcript_length: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListQuery {
    pub candidate_id: Option<Uuid>,
    pub recruiter_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub published: bool,
}

fn require_token(token: &str) -> Result<&str, AppError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Validation("token cannot be empty".to_string()));
    }
    Ok(token)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/interview/invite
pub async fn handle_invite(
    State(state): State<AppState>,
    Json(req): Json<InviteRequest>,
) -> Result<Json<InviteTicket>, AppError> {
    let ticket = state
        .interviews
        .issue_invite(req.candidate_id, &req.recruiter_id)
        .await?;
    Ok(Json(ticket))
}

/// POST /api/v1/interview/validate
pub async fn handle_validate(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<ValidatedSession>, AppError> {
    let token = require_token(&req.token)?;
    Ok(Json(state.interviews.validate(token).await?))
}

/// POST /api/v1/interview/question
pub async fn handle_question(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<ServedQuestion>, AppError> {
    let token = require_token(&req.token)?;
    Ok(Json(state.interviews.next_question(token, req.stage).await?))
}

/// POST /api/v1/interview/answer
pub async fn handle_answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerOutcome>, AppError> {
    let token = require_token(&req.token)?;
    let outcome = state
        .interviews
        .submit_answer(token, req.stage, &req.question, &req.answer)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/interview/transcript
pub async fn handle_transcript(
    State(state): State<AppState>,
    Json(req): Json<TranscriptRequest>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let token = require_token(&req.token)?;
    let transcript_length = state
        .interviews
        .append_transcript(token, req.speaker, &req.text)
        .await?;
    Ok(Json(TranscriptResponse { transcript_length }))
}

/// POST /api/v1/interview/expire
pub async fn handle_expire(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<ExpireOutcome>, AppError> {
    let token = require_token(&req.token)?;
    Ok(Json(state.interviews.expire(token).await?))
}

/// GET /api/v1/interview/sessions?candidateId=…|recruiterId=…
pub async fn handle_list_sessions(
    State(state): State<AppState>,
    Query(params): Query<SessionListQuery>,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    let filter = match (params.candidate_id, params.recruiter_id) {
        (Some(id), None) => SessionFilter::Candidate(id),
        (None, Some(id)) if !id.trim().is_empty() => SessionFilter::Recruiter(id),
        _ => {
            return Err(AppError::Validation(
                "exactly one of candidateId or recruiterId is required".to_string(),
            ))
        }
    };
    Ok(Json(state.interviews.list_sessions(filter).await?))
}

/// GET /api/v1/interview/sessions/:token
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.interviews.get_session(&token).await?;
    Ok(Json(SessionView::from(&session)))
}

/// PUT /api/v1/interview/sessions/:token/analysis
pub async fn handle_put_analysis(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(analysis): Json<SessionAnalysis>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.interviews.record_analysis(&token, analysis).await?;
    Ok(Json(SessionView::from(&session)))
}

/// POST /api/v1/interview/sessions/:token/report
pub async fn handle_report(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<ReportRequest>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.interviews.mark_report(&token, req.published).await?;
    Ok(Json(SessionView::from(&session)))
}
