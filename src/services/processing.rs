/// Encode job tracker
///
/// Drives persisted encode jobs to resolution: polls the media gateway for
/// completion, chains the two-stage transcode, and applies a wall-clock
/// processing timeout as a dead-man's-switch. Every per-job error is
/// isolated; a bad poll marks that session FAILURE and moves on.
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::media::MediaGateway;
use crate::models::{EncodeJob, EncodeTransform, RecordingStatus};
use crate::services::{CaptureSessionService, EncodeJobService};
use crate::storage::IngestStorage;

/// Counts reported by one tracking pass
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessingSummary {
    pub checked: usize,
    pub timed_out: usize,
}

pub struct ProcessingService {
    capture_sessions: Arc<CaptureSessionService>,
    encode_jobs: Arc<EncodeJobService>,
    media: Arc<dyn MediaGateway>,
    ingest_storage: Arc<dyn IngestStorage>,
    processing_timeout: chrono::Duration,
}

impl ProcessingService {
    pub fn new(
        capture_sessions: Arc<CaptureSessionService>,
        encode_jobs: Arc<EncodeJobService>,
        media: Arc<dyn MediaGateway>,
        ingest_storage: Arc<dyn IngestStorage>,
        processing_timeout: chrono::Duration,
    ) -> Self {
        Self {
            capture_sessions,
            encode_jobs,
            media,
            ingest_storage,
            processing_timeout,
        }
    }

    /// One tracking pass over every in-flight job
    pub async fn process_all_capture_sessions(&self) -> Result<ProcessingSummary> {
        let mut summary = ProcessingSummary::default();

        for job in self.encode_jobs.find_all_processing().await? {
            summary.checked += 1;
            if let Err(err) = self.check_job(&job).await {
                error!(
                    job = %job.job_name,
                    capture_session = %job.capture_session_id,
                    "Failed to check job, marking as FAILURE: {err}"
                );
                self.fail_job(&job).await;
            }
        }

        // Dead-man's-switch: whatever the per-job checks concluded, a job
        // past the processing timeout is abandoned
        let cutoff = Utc::now() - self.processing_timeout;
        for job in self.encode_jobs.find_all_processing().await? {
            if job.created_at < cutoff {
                error!(
                    job = %job.job_name,
                    capture_session = %job.capture_session_id,
                    "Processing job has timed out"
                );
                summary.timed_out += 1;
                self.fail_job(&job).await;
            }
        }

        Ok(summary)
    }

    /// Move a session into PROCESSING and persist the first-stage encode
    /// job. Returns the job id, or `None` when the ingest produced nothing
    /// and the session was stopped with NO_RECORDING.
    pub async fn start_processing(&self, capture_session_id: Uuid) -> Result<Option<Uuid>> {
        let session = self.capture_sessions.find_by_id(capture_session_id).await?;
        if session.get_status().is_terminal() {
            return Err(AppError::WrongState(format!(
                "CaptureSession {capture_session_id} is already {}",
                session.status
            )));
        }

        let recording_id = Uuid::new_v4();
        let job_name = match self
            .media
            .trigger_processing_step1(capture_session_id, recording_id)
            .await?
        {
            Some(name) => name,
            None => {
                info!(capture_session = %capture_session_id, "Nothing ingested, no recording");
                self.capture_sessions
                    .stop_capture_session(capture_session_id, RecordingStatus::NoRecording, None)
                    .await?;
                return Ok(None);
            }
        };

        self.capture_sessions
            .start_capture_session(capture_session_id, RecordingStatus::Processing, None)
            .await?;

        let job = EncodeJob {
            id: Uuid::new_v4(),
            capture_session_id,
            recording_id,
            job_name,
            transform: EncodeTransform::EncodeFromIngest.as_str().to_string(),
            created_at: Utc::now(),
        };
        self.encode_jobs.upsert(&job).await?;

        Ok(Some(job.id))
    }

    async fn check_job(&self, job: &EncodeJob) -> Result<()> {
        let status = self
            .media
            .has_job_completed(job.get_transform(), &job.job_name)
            .await?;

        match status {
            RecordingStatus::RecordingAvailable => match job.get_transform() {
                EncodeTransform::EncodeFromIngest => self.on_encode_from_ingest_complete(job).await,
                EncodeTransform::EncodeFromMp4 => self.on_encode_from_mp4_complete(job).await,
            },
            RecordingStatus::Failure => {
                error!(
                    job = %job.job_name,
                    capture_session = %job.capture_session_id,
                    "Processing job failed"
                );
                self.encode_jobs.delete(job.id).await?;
                self.capture_sessions
                    .stop_capture_session(job.capture_session_id, RecordingStatus::Failure, None)
                    .await?;
                Ok(())
            }
            _ => {
                info!(
                    job = %job.job_name,
                    capture_session = %job.capture_session_id,
                    "Job is still processing"
                );
                Ok(())
            }
        }
    }

    async fn on_encode_from_ingest_complete(&self, job: &EncodeJob) -> Result<()> {
        info!(capture_session = %job.capture_session_id, "EncodeFromIngest is complete");

        let next_job_name = self
            .media
            .trigger_processing_step2(job.recording_id, false)
            .await?;

        let Some(next_job_name) = next_job_name else {
            info!(capture_session = %job.capture_session_id, "No recording found");
            self.encode_jobs.delete(job.id).await?;
            self.capture_sessions
                .stop_capture_session(job.capture_session_id, RecordingStatus::NoRecording, None)
                .await?;
            return Ok(());
        };

        // Chain onto the same tracking row: second stage, new external name
        let mut chained = job.clone();
        chained.job_name = next_job_name;
        chained.transform = EncodeTransform::EncodeFromMp4.as_str().to_string();
        self.encode_jobs.upsert(&chained).await
    }

    async fn on_encode_from_mp4_complete(&self, job: &EncodeJob) -> Result<()> {
        info!(capture_session = %job.capture_session_id, "EncodeFromMp4 is complete");
        self.encode_jobs.delete(job.id).await?;

        let asset_status = self.media.verify_final_asset_exists(job.recording_id).await?;
        if asset_status == RecordingStatus::RecordingAvailable {
            info!(capture_session = %job.capture_session_id, "Final asset found");
            let session = self
                .capture_sessions
                .stop_capture_session(
                    job.capture_session_id,
                    RecordingStatus::RecordingAvailable,
                    Some(job.recording_id),
                )
                .await?;

            self.ingest_storage
                .mark_container_as_safe_to_delete(&session.booking_id.to_string())
                .await?;
            self.ingest_storage
                .mark_container_as_safe_to_delete(&job.recording_id.to_string())
                .await?;
        } else {
            error!(capture_session = %job.capture_session_id, "Final asset not found");
            self.capture_sessions
                .stop_capture_session(job.capture_session_id, RecordingStatus::Failure, None)
                .await?;
        }

        Ok(())
    }

    /// Abandon the job and force its session to FAILURE; secondary errors
    /// are logged so the rest of the pass keeps going
    async fn fail_job(&self, job: &EncodeJob) {
        if let Err(err) = self.encode_jobs.delete(job.id).await {
            error!(job = %job.job_name, "Failed to delete encode job: {err}");
        }
        if let Err(err) = self
            .capture_sessions
            .stop_capture_session(job.capture_session_id, RecordingStatus::Failure, None)
            .await
        {
            error!(
                capture_session = %job.capture_session_id,
                "Failed to stop capture session: {err}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::RobotAccessPolicy;
    use crate::testing::{
        booking, capture_session_for, encode_job, FakeIngestStorage, FakeMediaGateway,
        InMemoryBookingRepository, InMemoryCaptureSessionRepository, InMemoryEncodeJobRepository,
        InMemoryRecordingRepository, InMemoryStore, StubFinalStorage,
    };
    use crate::models::CaptureSession;

    struct Fixture {
        store: Arc<InMemoryStore>,
        media: Arc<FakeMediaGateway>,
        ingest: Arc<FakeIngestStorage>,
        service: ProcessingService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::default());
        let media = Arc::new(FakeMediaGateway::default());
        let ingest = Arc::new(FakeIngestStorage::default());
        let capture_sessions = Arc::new(CaptureSessionService::new(
            Arc::new(InMemoryCaptureSessionRepository(store.clone())),
            Arc::new(InMemoryBookingRepository(store.clone())),
            Arc::new(InMemoryRecordingRepository(store.clone())),
            Arc::new(StubFinalStorage::with_recording()),
            Arc::new(RobotAccessPolicy),
        ));
        let encode_jobs = Arc::new(EncodeJobService::new(
            Arc::new(InMemoryEncodeJobRepository(store.clone())),
            Arc::new(InMemoryCaptureSessionRepository(store.clone())),
        ));
        let service = ProcessingService::new(
            capture_sessions,
            encode_jobs,
            media.clone(),
            ingest.clone(),
            chrono::Duration::hours(2),
        );
        Fixture {
            store,
            media,
            ingest,
            service,
        }
    }

    fn processing_session(f: &Fixture) -> CaptureSession {
        let session = capture_session_for(Uuid::new_v4(), RecordingStatus::Processing);
        f.store.insert_session(session.clone());
        session
    }

    #[tokio::test]
    async fn finished_ingest_job_chains_to_mp4_stage() {
        let f = fixture();
        let session = processing_session(&f);
        let job = encode_job(session.id, EncodeTransform::EncodeFromIngest);
        f.store.insert_job(job.clone());
        f.media
            .set_job_status(&job.job_name, RecordingStatus::RecordingAvailable);
        f.media
            .step2_jobs
            .lock()
            .unwrap()
            .insert(job.recording_id, "mp4-job".to_string());

        f.service.process_all_capture_sessions().await.unwrap();

        // Same row, new stage and name
        let chained = f.store.job(job.id).unwrap();
        assert_eq!(chained.get_transform(), EncodeTransform::EncodeFromMp4);
        assert_eq!(chained.job_name, "mp4-job");
        assert_eq!(f.media.step2_calls.lock().unwrap().len(), 1);
        assert_eq!(
            f.store.session(session.id).unwrap().get_status(),
            RecordingStatus::Processing
        );
    }

    #[tokio::test]
    async fn finished_ingest_job_without_recording_stops_no_recording() {
        let f = fixture();
        let session = processing_session(&f);
        let job = encode_job(session.id, EncodeTransform::EncodeFromIngest);
        f.store.insert_job(job.clone());
        f.media
            .set_job_status(&job.job_name, RecordingStatus::RecordingAvailable);
        // No step-2 job scripted: nothing was ingested

        f.service.process_all_capture_sessions().await.unwrap();

        assert!(f.store.job(job.id).is_none());
        assert_eq!(
            f.store.session(session.id).unwrap().get_status(),
            RecordingStatus::NoRecording
        );
    }

    #[tokio::test]
    async fn finished_mp4_job_promotes_session_and_marks_containers() {
        let f = fixture();
        let b = booking();
        f.store.insert_booking(b.clone());
        let session = capture_session_for(b.id, RecordingStatus::Processing);
        f.store.insert_session(session.clone());
        let job = encode_job(session.id, EncodeTransform::EncodeFromMp4);
        f.store.insert_job(job.clone());
        f.media
            .set_job_status(&job.job_name, RecordingStatus::RecordingAvailable);
        f.media
            .set_final_asset(job.recording_id, RecordingStatus::RecordingAvailable);

        f.service.process_all_capture_sessions().await.unwrap();

        assert!(f.store.job(job.id).is_none());
        assert_eq!(
            f.store.session(session.id).unwrap().get_status(),
            RecordingStatus::RecordingAvailable
        );
        assert!(f.store.recording(job.recording_id).is_some());
        let marked = f.ingest.marked_safe();
        assert!(marked.contains(&b.id.to_string()));
        assert!(marked.contains(&job.recording_id.to_string()));
    }

    #[tokio::test]
    async fn finished_mp4_job_with_missing_asset_fails_session() {
        let f = fixture();
        let session = processing_session(&f);
        let job = encode_job(session.id, EncodeTransform::EncodeFromMp4);
        f.store.insert_job(job.clone());
        f.media
            .set_job_status(&job.job_name, RecordingStatus::RecordingAvailable);
        // No final asset scripted: verification reports FAILURE

        f.service.process_all_capture_sessions().await.unwrap();

        assert!(f.store.job(job.id).is_none());
        assert_eq!(
            f.store.session(session.id).unwrap().get_status(),
            RecordingStatus::Failure
        );
        assert!(f.ingest.marked_safe().is_empty());
    }

    #[tokio::test]
    async fn failed_job_is_deleted_and_session_failed() {
        let f = fixture();
        let session = processing_session(&f);
        let job = encode_job(session.id, EncodeTransform::EncodeFromIngest);
        f.store.insert_job(job.clone());
        f.media.set_job_status(&job.job_name, RecordingStatus::Failure);

        f.service.process_all_capture_sessions().await.unwrap();

        assert!(f.store.job(job.id).is_none());
        assert_eq!(
            f.store.session(session.id).unwrap().get_status(),
            RecordingStatus::Failure
        );
    }

    #[tokio::test]
    async fn gateway_error_is_treated_as_failure() {
        let f = fixture();
        let session = processing_session(&f);
        let job = encode_job(session.id, EncodeTransform::EncodeFromIngest);
        f.store.insert_job(job.clone());
        f.media
            .erroring_jobs
            .lock()
            .unwrap()
            .insert(job.job_name.clone());

        f.service.process_all_capture_sessions().await.unwrap();

        assert!(f.store.job(job.id).is_none());
        assert_eq!(
            f.store.session(session.id).unwrap().get_status(),
            RecordingStatus::Failure
        );
    }

    #[tokio::test]
    async fn one_bad_job_does_not_block_the_rest() {
        let f = fixture();
        let bad_session = processing_session(&f);
        let bad_job = encode_job(bad_session.id, EncodeTransform::EncodeFromIngest);
        f.store.insert_job(bad_job.clone());
        f.media
            .erroring_jobs
            .lock()
            .unwrap()
            .insert(bad_job.job_name.clone());

        let good_session = processing_session(&f);
        let good_job = encode_job(good_session.id, EncodeTransform::EncodeFromIngest);
        f.store.insert_job(good_job.clone());
        f.media
            .set_job_status(&good_job.job_name, RecordingStatus::RecordingAvailable);
        f.media
            .step2_jobs
            .lock()
            .unwrap()
            .insert(good_job.recording_id, "mp4-job".to_string());

        let summary = f.service.process_all_capture_sessions().await.unwrap();

        assert_eq!(summary.checked, 2);
        assert!(f.store.job(bad_job.id).is_none());
        assert_eq!(
            f.store.job(good_job.id).unwrap().get_transform(),
            EncodeTransform::EncodeFromMp4
        );
    }

    #[tokio::test]
    async fn stale_job_times_out_even_while_still_processing() {
        let f = fixture();
        let session = processing_session(&f);
        let mut job = encode_job(session.id, EncodeTransform::EncodeFromIngest);
        job.created_at = Utc::now() - chrono::Duration::hours(3);
        f.store.insert_job(job.clone());
        f.media.set_job_status(&job.job_name, RecordingStatus::Processing);

        let summary = f.service.process_all_capture_sessions().await.unwrap();

        assert_eq!(summary.timed_out, 1);
        assert!(f.store.job(job.id).is_none());
        assert_eq!(
            f.store.session(session.id).unwrap().get_status(),
            RecordingStatus::Failure
        );
    }

    #[tokio::test]
    async fn fresh_processing_job_is_left_alone() {
        let f = fixture();
        let session = processing_session(&f);
        let job = encode_job(session.id, EncodeTransform::EncodeFromIngest);
        f.store.insert_job(job.clone());
        f.media.set_job_status(&job.job_name, RecordingStatus::Processing);

        let summary = f.service.process_all_capture_sessions().await.unwrap();

        assert_eq!(summary.timed_out, 0);
        assert!(f.store.job(job.id).is_some());
        assert_eq!(
            f.store.session(session.id).unwrap().get_status(),
            RecordingStatus::Processing
        );
    }

    #[tokio::test]
    async fn start_processing_with_empty_ingest_stops_no_recording() {
        let f = fixture();
        let session = capture_session_for(Uuid::new_v4(), RecordingStatus::Recording);
        f.store.insert_session(session.clone());
        // No step-1 job scripted: the live event received nothing

        let job_id = f.service.start_processing(session.id).await.unwrap();

        assert!(job_id.is_none());
        assert_eq!(f.store.job_count(), 0);
        assert_eq!(
            f.store.session(session.id).unwrap().get_status(),
            RecordingStatus::NoRecording
        );
    }

    #[tokio::test]
    async fn start_processing_creates_first_stage_job() {
        let f = fixture();
        let session = capture_session_for(Uuid::new_v4(), RecordingStatus::Recording);
        f.store.insert_session(session.clone());
        f.media
            .step1_jobs
            .lock()
            .unwrap()
            .insert(session.id, "ingest-job".to_string());

        let job_id = f.service.start_processing(session.id).await.unwrap().unwrap();

        let job = f.store.job(job_id).unwrap();
        assert_eq!(job.get_transform(), EncodeTransform::EncodeFromIngest);
        assert_eq!(job.job_name, "ingest-job");
        assert_eq!(
            f.store.session(session.id).unwrap().get_status(),
            RecordingStatus::Processing
        );
    }

    #[tokio::test]
    async fn start_processing_rejects_terminal_session() {
        let f = fixture();
        let session = capture_session_for(Uuid::new_v4(), RecordingStatus::Failure);
        f.store.insert_session(session.clone());

        let err = f.service.start_processing(session.id).await.unwrap_err();
        assert!(matches!(err, AppError::WrongState(_)));
    }
}
