//! Session store: durable interview sessions keyed by token.
//!
//! Updates are optimistic: the caller passes the snapshot it read, and the write
//! only lands if the stored `version` still matches. The returned session carries
//! the bumped version.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::session::{InterviewSession, SessionRow, SessionSummary};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("token {token} already exists")]
    DuplicateToken { token: String },

    #[error("session {token} was modified concurrently")]
    VersionConflict { token: String },

    #[error("session {token} does not exist")]
    Missing { token: String },

    #[error("corrupt session record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &InterviewSession) -> Result<(), StoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<InterviewSession>, StoreError>;

    /// Writes `session` if the stored version equals `session.version`.
    async fn update(&self, session: &InterviewSession) -> Result<InterviewSession, StoreError>;

    /// Newest first.
    async fn list_by_candidate(&self, candidate_id: Uuid)
        -> Result<Vec<SessionSummary>, StoreError>;

    /// Newest first.
    async fn list_by_recruiter(&self, recruiter_id: &str)
        -> Result<Vec<SessionSummary>, StoreError>;
}

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_where(
        &self,
        column: &str,
        bind: ListKey<'_>,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        let sql = format!(
            "SELECT * FROM interview_sessions WHERE {column} = $1 ORDER BY created_at DESC"
        );
        let query = sqlx::query_as::<_, SessionRow>(&sql);
        let rows = match bind {
            ListKey::Candidate(id) => query.bind(id).fetch_all(&self.pool).await?,
            ListKey::Recruiter(id) => query.bind(id).fetch_all(&self.pool).await?,
        };
        rows.into_iter()
            .map(|row| to_session(row).map(|s| s.summary()))
            .collect()
    }
}

enum ListKey<'a> {
    Candidate(Uuid),
    Recruiter(&'a str),
}

fn to_session(row: SessionRow) -> Result<InterviewSession, StoreError> {
    InterviewSession::try_from(row).map_err(StoreError::Corrupt)
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|d| d.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &InterviewSession) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO interview_sessions
                (token, candidate_id, recruiter_id, expires_at, status, current_stage,
                 questions, pending_question, overall_score, pass_threshold, analysis,
                 transcript, result_published, report_sent_at, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(&session.token)
        .bind(session.candidate_id)
        .bind(&session.recruiter_id)
        .bind(session.expires_at)
        .bind(session.status.as_str())
        .bind(i16::from(session.current_stage))
        .bind(Json(&session.questions))
        .bind(session.pending_question.as_ref().map(Json))
        .bind(session.overall_score)
        .bind(session.pass_threshold)
        .bind(session.analysis.as_ref().map(Json))
        .bind(Json(&session.transcript))
        .bind(session.result_published)
        .bind(session.report_sent_at)
        .bind(session.version)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateToken {
                token: session.token.clone(),
            }),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<InterviewSession>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM interview_sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        row.map(to_session).transpose()
    }

    async fn update(&self, session: &InterviewSession) -> Result<InterviewSession, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE interview_sessions
            SET status = $2,
                current_stage = $3,
                questions = $4,
                pending_question = $5,
                overall_score = $6,
                analysis = $7,
                transcript = $8,
                result_published = $9,
                report_sent_at = $10,
                updated_at = $11,
                version = version + 1
            WHERE token = $1 AND version = $12
            RETURNING *
            "#,
        )
        .bind(&session.token)
        .bind(session.status.as_str())
        .bind(i16::from(session.current_stage))
        .bind(Json(&session.questions))
        .bind(session.pending_question.as_ref().map(Json))
        .bind(session.overall_score)
        .bind(session.analysis.as_ref().map(Json))
        .bind(Json(&session.transcript))
        .bind(session.result_published)
        .bind(session.report_sent_at)
        .bind(session.updated_at)
        .bind(session.version)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                debug!("Persisted session {} at version {}", row.token, row.version);
                to_session(row)
            }
            None => {
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM interview_sessions WHERE token = $1)",
                )
                .bind(&session.token)
                .fetch_one(&self.pool)
                .await?;
                let token = session.token.clone();
                Err(if exists {
                    StoreError::VersionConflict { token }
                } else {
                    StoreError::Missing { token }
                })
            }
        }
    }

    async fn list_by_candidate(
        &self,
        candidate_id: Uuid,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        self.list_where("candidate_id", ListKey::Candidate(candidate_id))
            .await
    }

    async fn list_by_recruiter(
        &self,
        recruiter_id: &str,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        self.list_where("recruiter_id", ListKey::Recruiter(recruiter_id))
            .await
    }
}
