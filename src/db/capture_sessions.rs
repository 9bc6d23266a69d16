/// Capture session repository - database operations for capture sessions
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::CaptureSessionRepository;
use crate::error::Result;
use crate::models::{CaptureSession, RecordingStatus};

const SESSION_COLUMNS: &str = "id, booking_id, origin, status, ingest_address, live_output_url, \
     started_at, started_by_user_id, finished_at, finished_by_user_id, \
     deleted_at, deleted_via_cascade";

pub struct PgCaptureSessionRepository {
    pool: PgPool,
}

impl PgCaptureSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CaptureSessionRepository for PgCaptureSessionRepository {
    async fn find_any(&self, id: Uuid) -> Result<Option<CaptureSession>> {
        let session = sqlx::query_as::<_, CaptureSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM capture_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find_live(&self, id: Uuid) -> Result<Option<CaptureSession>> {
        let session = sqlx::query_as::<_, CaptureSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM capture_sessions WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn save(&self, session: &CaptureSession) -> Result<()> {
        sqlx::query(
            "INSERT INTO capture_sessions (
                id, booking_id, origin, status, ingest_address, live_output_url,
                started_at, started_by_user_id, finished_at, finished_by_user_id,
                deleted_at, deleted_via_cascade
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE
            SET booking_id = EXCLUDED.booking_id,
                origin = EXCLUDED.origin,
                status = EXCLUDED.status,
                ingest_address = EXCLUDED.ingest_address,
                live_output_url = EXCLUDED.live_output_url,
                started_at = EXCLUDED.started_at,
                started_by_user_id = EXCLUDED.started_by_user_id,
                finished_at = EXCLUDED.finished_at,
                finished_by_user_id = EXCLUDED.finished_by_user_id,
                deleted_at = EXCLUDED.deleted_at,
                deleted_via_cascade = EXCLUDED.deleted_via_cascade",
        )
        .bind(session.id)
        .bind(session.booking_id)
        .bind(&session.origin)
        .bind(&session.status)
        .bind(&session.ingest_address)
        .bind(&session.live_output_url)
        .bind(session.started_at)
        .bind(session.started_by_user_id)
        .bind(session.finished_at)
        .bind(session.finished_by_user_id)
        .bind(session.deleted_at)
        .bind(session.deleted_via_cascade)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn exists_live_by_booking(&self, booking_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM capture_sessions
                WHERE booking_id = $1 AND deleted_at IS NULL
             )",
        )
        .bind(booking_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn find_all_live_by_booking(&self, booking_id: Uuid) -> Result<Vec<CaptureSession>> {
        let sessions = sqlx::query_as::<_, CaptureSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM capture_sessions
             WHERE booking_id = $1 AND deleted_at IS NULL"
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn find_all_by_status(&self, status: &str) -> Result<Vec<CaptureSession>> {
        let sessions = sqlx::query_as::<_, CaptureSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM capture_sessions
             WHERE status = $1 AND deleted_at IS NULL"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn find_failed_started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CaptureSession>> {
        let sessions = sqlx::query_as::<_, CaptureSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM capture_sessions
             WHERE status = $1 AND started_at >= $2 AND started_at <= $3
             ORDER BY started_at ASC"
        ))
        .bind(RecordingStatus::Failure.as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>, via_cascade: bool) -> Result<()> {
        sqlx::query(
            "UPDATE capture_sessions SET deleted_at = $2, deleted_via_cascade = $3
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .bind(via_cascade)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn undelete(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE capture_sessions SET deleted_at = NULL, deleted_via_cascade = FALSE
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
