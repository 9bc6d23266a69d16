/// Recording repository - database operations for recordings
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::RecordingRepository;
use crate::error::Result;
use crate::models::Recording;

const RECORDING_COLUMNS: &str = "id, capture_session_id, parent_recording_id, version, \
     filename, duration_seconds, created_at, deleted_at, deleted_via_cascade";

pub struct PgRecordingRepository {
    pool: PgPool,
}

impl PgRecordingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordingRepository for PgRecordingRepository {
    async fn find_any(&self, id: Uuid) -> Result<Option<Recording>> {
        let recording = sqlx::query_as::<_, Recording>(&format!(
            "SELECT {RECORDING_COLUMNS} FROM recordings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(recording)
    }

    async fn find_live(&self, id: Uuid) -> Result<Option<Recording>> {
        let recording = sqlx::query_as::<_, Recording>(&format!(
            "SELECT {RECORDING_COLUMNS} FROM recordings WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(recording)
    }

    async fn save(&self, recording: &Recording) -> Result<()> {
        sqlx::query(
            "INSERT INTO recordings (
                id, capture_session_id, parent_recording_id, version,
                filename, duration_seconds, created_at, deleted_at, deleted_via_cascade
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE
            SET capture_session_id = EXCLUDED.capture_session_id,
                parent_recording_id = EXCLUDED.parent_recording_id,
                version = EXCLUDED.version,
                filename = EXCLUDED.filename,
                duration_seconds = EXCLUDED.duration_seconds,
                deleted_at = EXCLUDED.deleted_at,
                deleted_via_cascade = EXCLUDED.deleted_via_cascade",
        )
        .bind(recording.id)
        .bind(recording.capture_session_id)
        .bind(recording.parent_recording_id)
        .bind(recording.version)
        .bind(&recording.filename)
        .bind(recording.duration_seconds)
        .bind(recording.created_at)
        .bind(recording.deleted_at)
        .bind(recording.deleted_via_cascade)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn exists_live_by_case(&self, case_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1
                FROM recordings r
                JOIN capture_sessions cs ON cs.id = r.capture_session_id
                JOIN bookings b ON b.id = cs.booking_id
                WHERE b.case_id = $1 AND r.deleted_at IS NULL
             )",
        )
        .bind(case_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn exists_live_by_booking(&self, booking_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1
                FROM recordings r
                JOIN capture_sessions cs ON cs.id = r.capture_session_id
                WHERE cs.booking_id = $1 AND r.deleted_at IS NULL
             )",
        )
        .bind(booking_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn count_by_parent_recording(&self, parent_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM recordings WHERE parent_recording_id = $1",
        )
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_all_live_by_capture_session(
        &self,
        capture_session_id: Uuid,
    ) -> Result<Vec<Recording>> {
        let recordings = sqlx::query_as::<_, Recording>(&format!(
            "SELECT {RECORDING_COLUMNS} FROM recordings
             WHERE capture_session_id = $1 AND deleted_at IS NULL"
        ))
        .bind(capture_session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(recordings)
    }

    async fn mark_all_deleted_by_capture_session(
        &self,
        capture_session_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE recordings SET deleted_at = $2, deleted_via_cascade = TRUE
             WHERE capture_session_id = $1 AND deleted_at IS NULL",
        )
        .bind(capture_session_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>, via_cascade: bool) -> Result<()> {
        sqlx::query(
            "UPDATE recordings SET deleted_at = $2, deleted_via_cascade = $3
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
            "UPDATE recordings SET deleted_at = NULL, deleted_via_cascade = FALSE WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
