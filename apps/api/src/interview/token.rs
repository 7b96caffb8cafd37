//! Access tokens: issuance and the checks that gate every token-bound request.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::session::{InterviewSession, SessionStatus};

/// What an invite hands back to the recruiter-facing caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteTicket {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub interview_url: String,
}

/// 122 random bits (UUID v4) rendered as 32 lowercase hex chars.
pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn interview_url(base_url: &str, token: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), token)
}

/// Checks applied before a token may be used, in precedence order:
/// expired (by clock or persisted status), then already conducted.
pub fn check_access(session: &InterviewSession, now: DateTime<Utc>) -> Result<(), AppError> {
    if session.status == SessionStatus::Expired || session.is_expired_at(now) {
        return Err(AppError::Expired);
    }
    if session.status.is_conducted() {
        return Err(AppError::AlreadyConducted);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashSet;

    fn session(now: DateTime<Utc>, status: SessionStatus) -> InterviewSession {
        let mut s = InterviewSession::new_pending(
            generate_token(),
            Uuid::new_v4(),
            "recruiter".to_string(),
            now + Duration::hours(48),
            60.0,
            now,
        );
        s.status = status;
        s
    }

    #[test]
    fn test_tokens_are_32_hex_chars_and_unique() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_token()).collect();
        assert_eq!(tokens.len(), 1000);
        assert!(tokens
            .iter()
            .all(|t| t.len() == 32 && t.chars().all(|c| c.is_ascii_hexdigit())));
    }

    #[test]
    fn test_interview_url_joins_cleanly() {
        assert_eq!(
            interview_url("https://hire.example.com/interview/", "abc"),
            "https://hire.example.com/interview/abc"
        );
    }

    #[test]
    fn test_open_session_passes() {
        let now = Utc::now();
        assert!(check_access(&session(now, SessionStatus::Pending), now).is_ok());
        assert!(check_access(&session(now, SessionStatus::Stage2InProgress), now).is_ok());
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let now = Utc::now();
        let s = session(now, SessionStatus::Pending);
        assert!(check_access(&s, s.expires_at - Duration::milliseconds(1)).is_ok());
        assert!(matches!(check_access(&s, s.expires_at), Err(AppError::Expired)));
    }

    #[test]
    fn test_persisted_expiry_is_expired_even_before_deadline() {
        let now = Utc::now();
        let s = session(now, SessionStatus::Expired);
        assert!(matches!(check_access(&s, now), Err(AppError::Expired)));
    }

    #[test]
    fn test_conducted_sessions_are_rejected() {
        let now = Utc::now();
        for status in [SessionStatus::Completed, SessionStatus::Failed] {
            assert!(matches!(
                check_access(&session(now, status), now),
                Err(AppError::AlreadyConducted)
            ));
        }
    }
}
