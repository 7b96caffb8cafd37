use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle status of an interview session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    #[serde(rename = "stage1_in_progress")]
    Stage1InProgress,
    #[serde(rename = "stage2_in_progress")]
    Stage2InProgress,
    Completed,
    Failed,
    Expired,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Stage1InProgress => "stage1_in_progress",
            SessionStatus::Stage2InProgress => "stage2_in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Expired => "expired",
        }
    }

    /// No question/answer progress is possible from a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Expired
        )
    }

    /// The interview already ran to an outcome (as opposed to lapsing).
    pub fn is_conducted(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SessionStatus::Pending),
            "stage1_in_progress" => Ok(SessionStatus::Stage1InProgress),
            "stage2_in_progress" => Ok(SessionStatus::Stage2InProgress),
            "completed" => Ok(SessionStatus::Completed),
            "failed" => Ok(SessionStatus::Failed),
            "expired" => Ok(SessionStatus::Expired),
            other => Err(format!("unknown session status '{other}'")),
        }
    }
}

/// Qualitative rating attached to each evaluated answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Poor,
    Fair,
    Good,
    Excellent,
}

/// One asked-and-answered question. Records are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub stage: u8,
    pub question: String,
    pub expected_answer_keywords: Vec<String>,
    pub actual_answer: String,
    pub score: f64,
    pub rating: Rating,
    pub feedback: String,
    pub confidence_hint: f64,
    pub answered_at: DateTime<Utc>,
}

/// The question most recently served and not yet answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingQuestion {
    pub stage: u8,
    pub question: String,
    pub expected_answer_keywords: Vec<String>,
    pub asked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Candidate,
    Interviewer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Post-hoc scoring summary written by the reporting side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAnalysis {
    pub confidence: f64,
    pub communication_rating: f64,
    pub resume_match: f64,
    pub cultural_fit: f64,
    pub technical_depth: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// The sole stateful entity of the interview flow.
///
/// `version` increments on every persisted mutation and backs the optimistic
/// concurrency check in the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSession {
    pub token: String,
    pub candidate_id: Uuid,
    pub recruiter_id: String,
    pub expires_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub current_stage: u8,
    pub questions: Vec<QuestionRecord>,
    pub pending_question: Option<PendingQuestion>,
    pub overall_score: f64,
    pub pass_threshold: f64,
    pub analysis: Option<SessionAnalysis>,
    pub transcript: Vec<TranscriptEntry>,
    pub result_published: bool,
    pub report_sent_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InterviewSession {
    /// A freshly issued session: pending, stage 1, nothing recorded.
    pub fn new_pending(
        token: String,
        candidate_id: Uuid,
        recruiter_id: String,
        expires_at: DateTime<Utc>,
        pass_threshold: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            token,
            candidate_id,
            recruiter_id,
            expires_at,
            status: SessionStatus::Pending,
            current_stage: 1,
            questions: Vec::new(),
            pending_question: None,
            overall_score: 0.0,
            pass_threshold,
            analysis: None,
            transcript: Vec::new(),
            result_published: false,
            report_sent_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Inclusive boundary: a session is expired at exactly `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn answered_in_stage(&self, stage: u8) -> usize {
        self.questions.iter().filter(|q| q.stage == stage).count()
    }

    /// Question texts already put to the candidate, including the pending one.
    pub fn asked_questions(&self) -> Vec<String> {
        self.questions
            .iter()
            .map(|q| q.question.clone())
            .chain(self.pending_question.iter().map(|p| p.question.clone()))
            .collect()
    }

    /// Mean score per stage, `(stage, mean)`, in stage order.
    pub fn stage_scores(&self) -> Vec<(u8, f64)> {
        [1u8, 2u8]
            .into_iter()
            .filter(|stage| self.answered_in_stage(*stage) > 0)
            .map(|stage| {
                let scores = self
                    .questions
                    .iter()
                    .filter(|q| q.stage == stage)
                    .map(|q| q.score);
                (stage, mean(scores))
            })
            .collect()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            token_hint: self.token.chars().take(TOKEN_HINT_CHARS).collect(),
            candidate_id: self.candidate_id,
            recruiter_id: self.recruiter_id.clone(),
            status: self.status,
            current_stage: self.current_stage,
            overall_score: self.overall_score,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}

/// Arithmetic mean; 0 for an empty sequence.
pub fn mean(scores: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = scores.fold((0.0_f64, 0usize), |(s, n), x| (s + x, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Leading token characters shown in listings; enough to correlate, useless as a credential.
pub const TOKEN_HINT_CHARS: usize = 8;

/// Listing view used for invite history and candidate session history.
/// Carries only a token prefix: the full token is the candidate's access credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub token_hint: String,
    pub candidate_id: Uuid,
    pub recruiter_id: String,
    pub status: SessionStatus,
    pub current_stage: u8,
    pub overall_score: f64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// An answered question as shown outside the interview flow, without its expected keywords.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredQuestion {
    pub stage: u8,
    pub question: String,
    pub actual_answer: String,
    pub score: f64,
    pub rating: Rating,
    pub feedback: String,
    pub confidence_hint: f64,
    pub answered_at: DateTime<Utc>,
}

/// Read view of a session served over HTTP.
///
/// The token alone opens it, so it leaves out the live question and every
/// expected-answer keyword list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub token: String,
    pub candidate_id: Uuid,
    pub recruiter_id: String,
    pub expires_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub current_stage: u8,
    pub questions: Vec<AnsweredQuestion>,
    pub awaiting_answer: bool,
    pub overall_score: f64,
    pub pass_threshold: f64,
    pub analysis: Option<SessionAnalysis>,
    pub transcript: Vec<TranscriptEntry>,
    pub result_published: bool,
    pub report_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&InterviewSession> for SessionView {
    fn from(session: &InterviewSession) -> Self {
        Self {
            token: session.token.clone(),
            candidate_id: session.candidate_id,
            recruiter_id: session.recruiter_id.clone(),
            expires_at: session.expires_at,
            status: session.status,
            current_stage: session.current_stage,
            questions: session
                .questions
                .iter()
                .map(|q| AnsweredQuestion {
                    stage: q.stage,
                    question: q.question.clone(),
                    actual_answer: q.actual_answer.clone(),
                    score: q.score,
                    rating: q.rating,
                    feedback: q.feedback.clone(),
                    confidence_hint: q.confidence_hint,
                    answered_at: q.answered_at,
                })
                .collect(),
            awaiting_answer: session.pending_question.is_some(),
            overall_score: session.overall_score,
            pass_threshold: session.pass_threshold,
            analysis: session.analysis.clone(),
            transcript: session.transcript.clone(),
            result_published: session.result_published,
            report_sent_at: session.report_sent_at,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// Row layout of `interview_sessions`.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub token: String,
    pub candidate_id: Uuid,
    pub recruiter_id: String,
    pub expires_at: DateTime<Utc>,
    pub status: String,
    pub current_stage: i16,
    pub questions: Json<Vec<QuestionRecord>>,
    pub pending_question: Option<Json<PendingQuestion>>,
    pub overall_score: f64,
    pub pass_threshold: f64,
    pub analysis: Option<Json<SessionAnalysis>>,
    pub transcript: Json<Vec<TranscriptEntry>>,
    pub result_published: bool,
    pub report_sent_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for InterviewSession {
    type Error = String;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let current_stage = u8::try_from(row.current_stage)
            .map_err(|_| format!("invalid current_stage {}", row.current_stage))?;
        Ok(InterviewSession {
            token: row.token,
            candidate_id: row.candidate_id,
            recruiter_id: row.recruiter_id,
            expires_at: row.expires_at,
            status: row.status.parse()?,
            current_stage,
            questions: row.questions.0,
            pending_question: row.pending_question.map(|p| p.0),
            overall_score: row.overall_score,
            pass_threshold: row.pass_threshold,
            analysis: row.analysis.map(|a| a.0),
            transcript: row.transcript.0,
            result_published: row.result_published,
            report_sent_at: row.report_sent_at,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
