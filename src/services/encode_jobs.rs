/// Encode job service
///
/// Tracking rows for in-flight transcode jobs. A job may only be attached
/// to a session that is currently PROCESSING; re-saving an existing row
/// with a new name and stage is how the two-stage pipeline chains.
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{CaptureSessionRepository, EncodeJobRepository};
use crate::error::{AppError, Result};
use crate::models::{EncodeJob, RecordingStatus};

pub struct EncodeJobService {
    jobs: Arc<dyn EncodeJobRepository>,
    sessions: Arc<dyn CaptureSessionRepository>,
}

impl EncodeJobService {
    pub fn new(
        jobs: Arc<dyn EncodeJobRepository>,
        sessions: Arc<dyn CaptureSessionRepository>,
    ) -> Self {
        Self { jobs, sessions }
    }

    /// Every persisted job is in flight by definition
    pub async fn find_all_processing(&self) -> Result<Vec<EncodeJob>> {
        self.jobs.find_all().await
    }

    pub async fn find_all_for_capture_session(
        &self,
        capture_session_id: Uuid,
    ) -> Result<Vec<EncodeJob>> {
        self.jobs
            .find_all_by_capture_session(capture_session_id)
            .await
    }

    pub async fn upsert(&self, job: &EncodeJob) -> Result<()> {
        let session = self
            .sessions
            .find_live(job.capture_session_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("CaptureSession: {}", job.capture_session_id))
            })?;

        if session.get_status() != RecordingStatus::Processing {
            return Err(AppError::WrongState(format!(
                "CaptureSession {} is {}, expected PROCESSING",
                session.id,
                session.status
            )));
        }

        self.jobs.save(job).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.jobs.delete(id).await? {
            return Err(AppError::NotFound(format!("EncodeJob: {id}")));
        }
        Ok(())
    }
}
