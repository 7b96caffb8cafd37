use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Candidate profile as read by the interview flow. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProfile {
    pub id: Uuid,
    pub candidate_name: String,
    pub email: String,
    pub job_title: String,
    pub resume_text: String,
    pub job_description: String,
}
