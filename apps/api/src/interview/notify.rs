//! Notification delivery. Always fire-and-forget from the caller's side.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::candidate::CandidateProfile;
use crate::models::session::{InterviewSession, SessionStatus};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook rejected notification with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log. Used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        info!("Notification for {recipient}:\n{message}");
        Ok(())
    }
}

/// POSTs `{"recipient": …, "message": …}` to a configured endpoint.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "recipient": recipient, "message": message }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Sends in the background; a failure is logged and never reaches the caller.
pub fn dispatch(notifier: Arc<dyn Notifier>, recipient: String, message: String) {
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&recipient, &message).await {
            warn!("Notification to {recipient} failed: {e}");
        }
    });
}

pub fn render_invite_message(
    candidate: &CandidateProfile,
    interview_url: &str,
    expires_at: DateTime<Utc>,
) -> String {
    format!(
        "Hi {name},\n\n\
         You have been invited to an AI-assisted interview for the {title} position.\n\n\
         Start your interview here: {url}\n\n\
         The link is valid until {expiry} and can only be used for one interview.\n",
        name = candidate.candidate_name,
        title = candidate.job_title,
        url = interview_url,
        expiry = expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

pub fn render_outcome_message(candidate: &CandidateProfile, session: &InterviewSession) -> String {
    let outcome = match session.status {
        SessionStatus::Completed => "completed both interview stages",
        SessionStatus::Failed => "did not pass the screening stage",
        _ => "has an interview update",
    };
    let by_stage = session
        .stage_scores()
        .iter()
        .map(|(stage, mean)| format!("stage {stage}: {mean:.1}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{name} ({title}) {outcome}.\n\
         Overall score: {score:.1} across {count} answered questions ({by_stage}).\n\
         Session token: {token}\n",
        name = candidate.candidate_name,
        title = candidate.job_title,
        score = session.overall_score,
        count = session.questions.len(),
        token = session.token,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::{QuestionRecord, Rating};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn candidate() -> CandidateProfile {
        CandidateProfile {
            id: Uuid::new_v4(),
            candidate_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            job_title: "Backend Engineer".to_string(),
            resume_text: "Rust, Postgres".to_string(),
            job_description: "Build APIs".to_string(),
        }
    }

    #[test]
    fn test_invite_message_contains_link_and_expiry() {
        let expires_at = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let message = render_invite_message(
            &candidate(),
            "http://localhost:3000/interview/abc123",
            expires_at,
        );
        assert!(message.contains("Ada Lovelace"));
        assert!(message.contains("Backend Engineer"));
        assert!(message.contains("http://localhost:3000/interview/abc123"));
        assert!(message.contains("2026-10-18T12:00:00Z"));
    }

    #[test]
    fn test_outcome_message_reports_score() {
        let now = Utc::now();
        let mut session = InterviewSession::new_pending(
            "tok".to_string(),
            Uuid::new_v4(),
            "r-1".to_string(),
            now,
            60.0,
            now,
        );
        session.status = SessionStatus::Failed;
        session.questions = [40.0, 44.0]
            .into_iter()
            .map(|score| QuestionRecord {
                stage: 1,
                question: "Explain lifetimes.".to_string(),
                expected_answer_keywords: vec![],
                actual_answer: "They scope borrows.".to_string(),
                score,
                rating: Rating::Fair,
                feedback: String::new(),
                confidence_hint: 50.0,
                answered_at: now,
            })
            .collect();
        session.overall_score = 42.0;
        let message = render_outcome_message(&candidate(), &session);
        assert!(message.contains("did not pass"));
        assert!(message.contains("42.0 across 2 answered questions"));
        assert!(message.contains("stage 1: 42.0"));
    }
}
