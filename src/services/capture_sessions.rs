/// Capture session lifecycle service
///
/// Single source of truth for capture session status transitions:
/// `INITIALISING -> STANDBY -> RECORDING -> PROCESSING ->
/// {RECORDING_AVAILABLE | NO_RECORDING | FAILURE}`. The one backward edge,
/// `FAILURE -> NO_RECORDING`, exists for the status-correction task. All
/// transitions are idempotent so a crashed invocation can safely retry.
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::{BookingRepository, CaptureSessionRepository, RecordingRepository};
use crate::error::{AppError, Result};
use crate::models::{
    CaptureSession, CreateCaptureSession, Recording, RecordingStatus, UpsertResult,
};
use crate::security::{AccessPolicy, Resource};
use crate::storage::FinalStorage;

pub struct CaptureSessionService {
    sessions: Arc<dyn CaptureSessionRepository>,
    bookings: Arc<dyn BookingRepository>,
    recordings: Arc<dyn RecordingRepository>,
    final_storage: Arc<dyn FinalStorage>,
    policy: Arc<dyn AccessPolicy>,
}

impl CaptureSessionService {
    pub fn new(
        sessions: Arc<dyn CaptureSessionRepository>,
        bookings: Arc<dyn BookingRepository>,
        recordings: Arc<dyn RecordingRepository>,
        final_storage: Arc<dyn FinalStorage>,
        policy: Arc<dyn AccessPolicy>,
    ) -> Self {
        Self {
            sessions,
            bookings,
            recordings,
            final_storage,
            policy,
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<CaptureSession> {
        self.policy
            .ensure_access(Resource::CaptureSession(id))
            .await?;

        self.sessions
            .find_live(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("CaptureSession: {id}")))
    }

    pub async fn upsert(&self, dto: CreateCaptureSession) -> Result<UpsertResult> {
        self.policy
            .ensure_access(Resource::CaptureSession(dto.id))
            .await?;

        let found = self.sessions.find_any(dto.id).await?;
        if let Some(existing) = &found {
            if existing.is_deleted() {
                return Err(AppError::DeletedState(format!("CaptureSession: {}", dto.id)));
            }
        }

        self.bookings
            .find_live(dto.booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking: {}", dto.booking_id)))?;

        let session = CaptureSession {
            id: dto.id,
            booking_id: dto.booking_id,
            origin: dto.origin.as_str().to_string(),
            status: dto.status.as_str().to_string(),
            ingest_address: dto.ingest_address,
            live_output_url: dto.live_output_url,
            started_at: dto.started_at,
            started_by_user_id: dto.started_by_user_id,
            finished_at: dto.finished_at,
            finished_by_user_id: dto.finished_by_user_id,
            deleted_at: None,
            deleted_via_cascade: false,
        };
        self.sessions.save(&session).await?;

        Ok(if found.is_some() {
            UpsertResult::Updated
        } else {
            UpsertResult::Created
        })
    }

    /// Move a session forward through its pre-terminal states (or to
    /// FAILURE when startup breaks), recording the ingest address when one
    /// is known. Re-applying the current status is a no-op.
    pub async fn start_capture_session(
        &self,
        id: Uuid,
        status: RecordingStatus,
        ingest_address: Option<&str>,
    ) -> Result<CaptureSession> {
        if status.is_terminal() && status != RecordingStatus::Failure {
            return Err(AppError::WrongState(format!(
                "Cannot start capture session {id} into terminal status {}",
                status.as_str()
            )));
        }

        let mut session = self
            .sessions
            .find_any(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("CaptureSession: {id}")))?;

        session.status = status.as_str().to_string();
        if let Some(address) = ingest_address {
            session.ingest_address = Some(address.to_string());
        }
        if session.started_at.is_none() {
            session.started_at = Some(Utc::now());
        }
        self.sessions.save(&session).await?;

        info!(capture_session = %id, status = status.as_str(), "Capture session started");
        Ok(session)
    }

    /// Move a session to a terminal status. Stopping with the status the
    /// session already has is a no-op; the only permitted transition out of
    /// a terminal status is FAILURE -> NO_RECORDING (status correction).
    /// Promotion to RECORDING_AVAILABLE persists the recording row.
    pub async fn stop_capture_session(
        &self,
        id: Uuid,
        status: RecordingStatus,
        recording_id: Option<Uuid>,
    ) -> Result<CaptureSession> {
        if !status.is_terminal() {
            return Err(AppError::WrongState(format!(
                "Cannot stop capture session {id} with non-terminal status {}",
                status.as_str()
            )));
        }

        let mut session = self
            .sessions
            .find_any(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("CaptureSession: {id}")))?;

        let current = session.get_status();
        if current == status {
            return Ok(session);
        }
        if current.is_terminal()
            && !(current == RecordingStatus::Failure && status == RecordingStatus::NoRecording)
        {
            return Err(AppError::WrongState(format!(
                "Capture session {id} is already {}, cannot become {}",
                current.as_str(),
                status.as_str()
            )));
        }

        let now = Utc::now();
        if status == RecordingStatus::RecordingAvailable {
            let recording_id = recording_id.ok_or_else(|| {
                AppError::WrongState(format!(
                    "Capture session {id} cannot become RECORDING_AVAILABLE without a recording"
                ))
            })?;
            self.create_recording_if_missing(&session, recording_id, now)
                .await?;
        }

        session.status = status.as_str().to_string();
        if session.finished_at.is_none() {
            session.finished_at = Some(now);
        }
        self.sessions.save(&session).await?;

        info!(capture_session = %id, status = status.as_str(), "Capture session stopped");
        Ok(session)
    }

    async fn create_recording_if_missing(
        &self,
        session: &CaptureSession,
        recording_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.recordings.find_any(recording_id).await?.is_some() {
            return Ok(());
        }

        let container = recording_id.to_string();
        let filename = self.final_storage.get_mp4_file_name(&container).await.ok();
        let duration_seconds = self.final_storage.get_recording_duration(recording_id).await;

        self.recordings
            .save(&Recording {
                id: recording_id,
                capture_session_id: session.id,
                parent_recording_id: None,
                version: 1,
                filename,
                duration_seconds,
                created_at: now,
                deleted_at: None,
                deleted_via_cascade: false,
            })
            .await
    }

    pub async fn delete_by_id(&self, id: Uuid) -> Result<()> {
        self.policy
            .ensure_access(Resource::CaptureSession(id))
            .await?;

        let session = self
            .sessions
            .find_live(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("CaptureSession: {id}")))?;

        let now = Utc::now();
        self.recordings
            .mark_all_deleted_by_capture_session(session.id, now)
            .await?;
        self.sessions.mark_deleted(session.id, now, false).await?;

        Ok(())
    }

    /// Cascade used by booking deletion: recordings first, then the
    /// sessions themselves, all flagged as cascade deletes
    pub async fn delete_cascade(&self, booking_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        for session in self.sessions.find_all_live_by_booking(booking_id).await? {
            self.recordings
                .mark_all_deleted_by_capture_session(session.id, at)
                .await?;
            self.sessions.mark_deleted(session.id, at, true).await?;
        }

        Ok(())
    }

    /// Undelete propagates upward: the owning booking is restored before
    /// the session. A live session is left untouched.
    pub async fn undelete(&self, id: Uuid) -> Result<()> {
        self.policy
            .ensure_access(Resource::CaptureSession(id))
            .await?;

        let session = self
            .sessions
            .find_any(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("CaptureSession: {id}")))?;
        if !session.is_deleted() {
            return Ok(());
        }

        if let Some(booking) = self.bookings.find_any(session.booking_id).await? {
            if booking.is_deleted() {
                self.bookings.undelete(booking.id).await?;
            }
        }
        self.sessions.undelete(id).await?;

        Ok(())
    }

    pub async fn find_failed_sessions_started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CaptureSession>> {
        self.sessions.find_failed_started_between(from, to).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::RobotAccessPolicy;
    use crate::testing::{
        booking, capture_session, recording, InMemoryBookingRepository,
        InMemoryCaptureSessionRepository, InMemoryRecordingRepository, InMemoryStore,
        StubFinalStorage,
    };

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: CaptureSessionService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::default());
        let service = CaptureSessionService::new(
            Arc::new(InMemoryCaptureSessionRepository(store.clone())),
            Arc::new(InMemoryBookingRepository(store.clone())),
            Arc::new(InMemoryRecordingRepository(store.clone())),
            Arc::new(StubFinalStorage::with_recording()),
            Arc::new(RobotAccessPolicy),
        );
        Fixture { store, service }
    }

    #[tokio::test]
    async fn start_unknown_session_is_not_found() {
        let f = fixture();
        let err = f
            .service
            .start_capture_session(Uuid::new_v4(), RecordingStatus::Standby, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn start_records_ingest_address() {
        let f = fixture();
        let session = capture_session(RecordingStatus::Initialising);
        f.store.insert_session(session.clone());

        let updated = f
            .service
            .start_capture_session(session.id, RecordingStatus::Standby, Some("rtmp://in"))
            .await
            .unwrap();

        assert_eq!(updated.get_status(), RecordingStatus::Standby);
        assert_eq!(updated.ingest_address.as_deref(), Some("rtmp://in"));
        assert!(updated.started_at.is_some());
    }

    #[tokio::test]
    async fn stop_sets_terminal_status_and_finished_at() {
        let f = fixture();
        let session = capture_session(RecordingStatus::Processing);
        f.store.insert_session(session.clone());

        let updated = f
            .service
            .stop_capture_session(session.id, RecordingStatus::Failure, None)
            .await
            .unwrap();

        assert_eq!(updated.get_status(), RecordingStatus::Failure);
        assert!(updated.finished_at.is_some());
    }

    #[tokio::test]
    async fn stop_rejects_non_terminal_target() {
        let f = fixture();
        let session = capture_session(RecordingStatus::Recording);
        f.store.insert_session(session.clone());

        let err = f
            .service
            .stop_capture_session(session.id, RecordingStatus::Processing, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WrongState(_)));
    }

    #[tokio::test]
    async fn stop_is_idempotent_on_repeated_target() {
        let f = fixture();
        let session = capture_session(RecordingStatus::Processing);
        f.store.insert_session(session.clone());

        f.service
            .stop_capture_session(session.id, RecordingStatus::Failure, None)
            .await
            .unwrap();
        let first = f.store.session(session.id).unwrap();

        f.service
            .stop_capture_session(session.id, RecordingStatus::Failure, None)
            .await
            .unwrap();
        let second = f.store.session(session.id).unwrap();

        assert_eq!(first.finished_at, second.finished_at);
        assert_eq!(second.get_status(), RecordingStatus::Failure);
    }

    #[tokio::test]
    async fn stop_rejects_changing_terminal_status() {
        let f = fixture();
        let session = capture_session(RecordingStatus::RecordingAvailable);
        f.store.insert_session(session.clone());

        let err = f
            .service
            .stop_capture_session(session.id, RecordingStatus::Failure, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WrongState(_)));
    }

    #[tokio::test]
    async fn stop_allows_failure_to_no_recording_correction() {
        let f = fixture();
        let session = capture_session(RecordingStatus::Failure);
        f.store.insert_session(session.clone());

        let updated = f
            .service
            .stop_capture_session(session.id, RecordingStatus::NoRecording, None)
            .await
            .unwrap();
        assert_eq!(updated.get_status(), RecordingStatus::NoRecording);
    }

    #[tokio::test]
    async fn stop_with_recording_creates_recording_row() {
        let f = fixture();
        let session = capture_session(RecordingStatus::Processing);
        f.store.insert_session(session.clone());
        let recording_id = Uuid::new_v4();

        f.service
            .stop_capture_session(
                session.id,
                RecordingStatus::RecordingAvailable,
                Some(recording_id),
            )
            .await
            .unwrap();

        let created = f.store.recording(recording_id).unwrap();
        assert_eq!(created.capture_session_id, session.id);
        assert_eq!(created.version, 1);
        assert!(created.filename.is_some());
    }

    #[tokio::test]
    async fn stop_requires_recording_for_promotion() {
        let f = fixture();
        let session = capture_session(RecordingStatus::Processing);
        f.store.insert_session(session.clone());

        let err = f
            .service
            .stop_capture_session(session.id, RecordingStatus::RecordingAvailable, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WrongState(_)));
    }

    #[tokio::test]
    async fn upsert_rejects_deleted_session() {
        let f = fixture();
        let b = booking();
        f.store.insert_booking(b.clone());
        let mut session = capture_session(RecordingStatus::Initialising);
        session.booking_id = b.id;
        session.deleted_at = Some(Utc::now());
        f.store.insert_session(session.clone());

        let err = f
            .service
            .upsert(CreateCaptureSession::new(session.id, b.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DeletedState(_)));
    }

    #[tokio::test]
    async fn upsert_requires_live_booking() {
        let f = fixture();
        let err = f
            .service
            .upsert(CreateCaptureSession::new(Uuid::new_v4(), Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn undelete_restores_booking_first() {
        let f = fixture();
        let mut b = booking();
        b.deleted_at = Some(Utc::now());
        f.store.insert_booking(b.clone());
        let mut session = capture_session(RecordingStatus::Failure);
        session.booking_id = b.id;
        session.deleted_at = Some(Utc::now());
        f.store.insert_session(session.clone());

        f.service.undelete(session.id).await.unwrap();

        assert!(!f.store.booking(b.id).unwrap().is_deleted());
        assert!(!f.store.session(session.id).unwrap().is_deleted());
    }

    #[tokio::test]
    async fn undelete_is_noop_on_live_session() {
        let f = fixture();
        let session = capture_session(RecordingStatus::Standby);
        f.store.insert_session(session.clone());

        f.service.undelete(session.id).await.unwrap();
        assert!(!f.store.session(session.id).unwrap().is_deleted());
    }

    #[tokio::test]
    async fn delete_cascades_to_recordings() {
        let f = fixture();
        let session = capture_session(RecordingStatus::RecordingAvailable);
        f.store.insert_session(session.clone());
        let rec = recording(session.id);
        f.store.insert_recording(rec.clone());

        f.service.delete_by_id(session.id).await.unwrap();

        let deleted_session = f.store.session(session.id).unwrap();
        assert!(deleted_session.is_deleted());
        assert!(!deleted_session.deleted_via_cascade);
        let deleted_recording = f.store.recording(rec.id).unwrap();
        assert!(deleted_recording.is_deleted());
        assert!(deleted_recording.deleted_via_cascade);
    }
}
