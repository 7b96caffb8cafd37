use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::interview::store::StoreError;
use crate::models::candidate::CandidateProfile;

/// Read-only lookup of candidate profiles.
#[async_trait]
pub trait CandidateDirectory: Send + Sync {
    async fn find(&self, candidate_id: Uuid) -> Result<Option<CandidateProfile>, StoreError>;
}

pub struct PgCandidateDirectory {
    pool: PgPool,
}

impl PgCandidateDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateDirectory for PgCandidateDirectory {
    async fn find(&self, candidate_id: Uuid) -> Result<Option<CandidateProfile>, StoreError> {
        Ok(sqlx::query_as::<_, CandidateProfile>(
            r#"
            SELECT id, name AS candidate_name, email, job_title, resume_text, job_description
            FROM candidates
            WHERE id = $1
            "#,
        )
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}
