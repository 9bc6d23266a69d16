/// Encode job repository - database operations for in-flight transcode jobs
///
/// Jobs are tracking rows only: they are inserted when a transcode starts and
/// hard-deleted when it resolves.
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::EncodeJobRepository;
use crate::error::Result;
use crate::models::EncodeJob;

const JOB_COLUMNS: &str =
    "id, capture_session_id, recording_id, job_name, transform, created_at";

pub struct PgEncodeJobRepository {
    pool: PgPool,
}

impl PgEncodeJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EncodeJobRepository for PgEncodeJobRepository {
    async fn find_all(&self) -> Result<Vec<EncodeJob>> {
        let jobs = sqlx::query_as::<_, EncodeJob>(&format!(
            "SELECT {JOB_COLUMNS} FROM encode_jobs ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    async fn find_any(&self, id: Uuid) -> Result<Option<EncodeJob>> {
        let job = sqlx::query_as::<_, EncodeJob>(&format!(
            "SELECT {JOB_COLUMNS} FROM encode_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    async fn find_all_by_capture_session(
        &self,
        capture_session_id: Uuid,
    ) -> Result<Vec<EncodeJob>> {
        let jobs = sqlx::query_as::<_, EncodeJob>(&format!(
            "SELECT {JOB_COLUMNS} FROM encode_jobs
             WHERE capture_session_id = $1
             ORDER BY created_at ASC"
        ))
        .bind(capture_session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    async fn save(&self, job: &EncodeJob) -> Result<()> {
        sqlx::query(
            "INSERT INTO encode_jobs (
                id, capture_session_id, recording_id, job_name, transform, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET job_name = EXCLUDED.job_name,
                transform = EXCLUDED.transform",
        )
        .bind(job.id)
        .bind(job.capture_session_id)
        .bind(job.recording_id)
        .bind(&job.job_name)
        .bind(&job.transform)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM encode_jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
