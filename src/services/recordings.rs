/// Recording service
///
/// Recordings form version chains: the original capture is version 1 and
/// each edit derives from a parent recording. Undelete propagates upward
/// through the owning capture session and booking.
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{BookingRepository, CaptureSessionRepository, RecordingRepository};
use crate::error::{AppError, Result};
use crate::models::{CreateRecording, Recording, UpsertResult};
use crate::security::{AccessPolicy, Resource};

pub struct RecordingService {
    recordings: Arc<dyn RecordingRepository>,
    sessions: Arc<dyn CaptureSessionRepository>,
    bookings: Arc<dyn BookingRepository>,
    policy: Arc<dyn AccessPolicy>,
}

impl RecordingService {
    pub fn new(
        recordings: Arc<dyn RecordingRepository>,
        sessions: Arc<dyn CaptureSessionRepository>,
        bookings: Arc<dyn BookingRepository>,
        policy: Arc<dyn AccessPolicy>,
    ) -> Self {
        Self {
            recordings,
            sessions,
            bookings,
            policy,
        }
    }

    /// A recording is only visible while it and its whole ownership chain
    /// are live
    pub async fn find_by_id(&self, id: Uuid) -> Result<Recording> {
        self.policy.ensure_access(Resource::Recording(id)).await?;

        let recording = self
            .recordings
            .find_live(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recording: {id}")))?;

        let session = self
            .sessions
            .find_live(recording.capture_session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recording: {id}")))?;

        self.bookings
            .find_live(session.booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recording: {id}")))?;

        Ok(recording)
    }

    pub async fn upsert(&self, dto: CreateRecording) -> Result<UpsertResult> {
        self.policy
            .ensure_access(Resource::Recording(dto.id))
            .await?;

        let found = self.recordings.find_any(dto.id).await?;
        if let Some(existing) = &found {
            if existing.is_deleted() {
                return Err(AppError::DeletedState(format!("Recording: {}", dto.id)));
            }
        }

        self.sessions
            .find_live(dto.capture_session_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("CaptureSession: {}", dto.capture_session_id))
            })?;

        let version = match &found {
            // Versions are assigned at creation and never recomputed
            Some(existing) => existing.version,
            None => self.next_version(dto.parent_recording_id).await?,
        };

        self.recordings
            .save(&Recording {
                id: dto.id,
                capture_session_id: dto.capture_session_id,
                parent_recording_id: dto.parent_recording_id,
                version,
                filename: dto.filename,
                duration_seconds: dto.duration_seconds,
                created_at: found
                    .as_ref()
                    .map(|e| e.created_at)
                    .unwrap_or_else(Utc::now),
                deleted_at: None,
                deleted_via_cascade: false,
            })
            .await?;

        Ok(if found.is_some() {
            UpsertResult::Updated
        } else {
            UpsertResult::Created
        })
    }

    /// Version 1 for an original; an edit gets `children-of-parent + 2`, so
    /// the first edit is version 2 and versions grow monotonically per
    /// lineage
    async fn next_version(&self, parent_recording_id: Option<Uuid>) -> Result<i32> {
        match parent_recording_id {
            None => Ok(1),
            Some(parent_id) => {
                self.recordings
                    .find_any(parent_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Recording: {parent_id}")))?;

                let siblings = self.recordings.count_by_parent_recording(parent_id).await?;
                Ok(siblings as i32 + 2)
            }
        }
    }

    pub async fn delete_by_id(&self, id: Uuid) -> Result<()> {
        let recording = self.find_by_id(id).await?;
        self.recordings
            .mark_deleted(recording.id, Utc::now(), false)
            .await
    }

    /// Undelete the owning booking, then the owning capture session, then
    /// the recording itself. A live recording is left untouched; siblings
    /// are not restored.
    pub async fn undelete(&self, id: Uuid) -> Result<()> {
        self.policy.ensure_access(Resource::Recording(id)).await?;

        let recording = self
            .recordings
            .find_any(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recording: {id}")))?;
        if !recording.is_deleted() {
            return Ok(());
        }

        if let Some(session) = self.sessions.find_any(recording.capture_session_id).await? {
            if session.is_deleted() {
                if let Some(booking) = self.bookings.find_any(session.booking_id).await? {
                    if booking.is_deleted() {
                        self.bookings.undelete(booking.id).await?;
                    }
                }
                self.sessions.undelete(session.id).await?;
            }
        }
        self.recordings.undelete(id).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordingStatus;
    use crate::security::RobotAccessPolicy;
    use crate::testing::{
        booking, capture_session_for, recording, InMemoryBookingRepository,
        InMemoryCaptureSessionRepository, InMemoryRecordingRepository, InMemoryStore,
    };

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: RecordingService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::default());
        let service = RecordingService::new(
            Arc::new(InMemoryRecordingRepository(store.clone())),
            Arc::new(InMemoryCaptureSessionRepository(store.clone())),
            Arc::new(InMemoryBookingRepository(store.clone())),
            Arc::new(RobotAccessPolicy),
        );
        Fixture { store, service }
    }

    fn dto(capture_session_id: Uuid, parent: Option<Uuid>) -> CreateRecording {
        CreateRecording {
            id: Uuid::new_v4(),
            capture_session_id,
            parent_recording_id: parent,
            filename: Some("edit.mp4".to_string()),
            duration_seconds: Some(90),
        }
    }

    #[tokio::test]
    async fn original_recording_gets_version_one() {
        let f = fixture();
        let b = booking();
        f.store.insert_booking(b.clone());
        let session = capture_session_for(b.id, RecordingStatus::RecordingAvailable);
        f.store.insert_session(session.clone());

        let payload = dto(session.id, None);
        f.service.upsert(payload.clone()).await.unwrap();

        assert_eq!(f.store.recording(payload.id).unwrap().version, 1);
    }

    #[tokio::test]
    async fn edit_versions_count_existing_children_plus_two() {
        let f = fixture();
        let b = booking();
        f.store.insert_booking(b.clone());
        let session = capture_session_for(b.id, RecordingStatus::RecordingAvailable);
        f.store.insert_session(session.clone());
        let parent = recording(session.id);
        f.store.insert_recording(parent.clone());

        let first_edit = dto(session.id, Some(parent.id));
        f.service.upsert(first_edit.clone()).await.unwrap();
        assert_eq!(f.store.recording(first_edit.id).unwrap().version, 2);

        let second_edit = dto(session.id, Some(parent.id));
        f.service.upsert(second_edit.clone()).await.unwrap();
        assert_eq!(f.store.recording(second_edit.id).unwrap().version, 3);
    }

    #[tokio::test]
    async fn upsert_keeps_version_on_update() {
        let f = fixture();
        let b = booking();
        f.store.insert_booking(b.clone());
        let session = capture_session_for(b.id, RecordingStatus::RecordingAvailable);
        f.store.insert_session(session.clone());
        let parent = recording(session.id);
        f.store.insert_recording(parent.clone());

        let edit = dto(session.id, Some(parent.id));
        f.service.upsert(edit.clone()).await.unwrap();
        let result = f.service.upsert(edit.clone()).await.unwrap();

        assert_eq!(result, UpsertResult::Updated);
        assert_eq!(f.store.recording(edit.id).unwrap().version, 2);
    }

    #[tokio::test]
    async fn upsert_with_unknown_parent_is_not_found() {
        let f = fixture();
        let b = booking();
        f.store.insert_booking(b.clone());
        let session = capture_session_for(b.id, RecordingStatus::RecordingAvailable);
        f.store.insert_session(session.clone());

        let err = f
            .service
            .upsert(dto(session.id, Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn undelete_restores_ownership_chain() {
        let f = fixture();
        let mut b = booking();
        b.deleted_at = Some(Utc::now());
        f.store.insert_booking(b.clone());
        let mut session = capture_session_for(b.id, RecordingStatus::RecordingAvailable);
        session.deleted_at = Some(Utc::now());
        f.store.insert_session(session.clone());
        let mut rec = recording(session.id);
        rec.deleted_at = Some(Utc::now());
        f.store.insert_recording(rec.clone());
        let mut sibling = recording(session.id);
        sibling.deleted_at = Some(Utc::now());
        f.store.insert_recording(sibling.clone());

        f.service.undelete(rec.id).await.unwrap();

        assert!(!f.store.recording(rec.id).unwrap().is_deleted());
        assert!(!f.store.session(session.id).unwrap().is_deleted());
        assert!(!f.store.booking(b.id).unwrap().is_deleted());
        // Siblings stay deleted
        assert!(f.store.recording(sibling.id).unwrap().is_deleted());
    }

    #[tokio::test]
    async fn undelete_is_noop_on_live_recording() {
        let f = fixture();
        let b = booking();
        f.store.insert_booking(b.clone());
        let session = capture_session_for(b.id, RecordingStatus::RecordingAvailable);
        f.store.insert_session(session.clone());
        let rec = recording(session.id);
        f.store.insert_recording(rec.clone());

        f.service.undelete(rec.id).await.unwrap();
        assert!(!f.store.recording(rec.id).unwrap().is_deleted());
    }

    #[tokio::test]
    async fn undelete_unknown_recording_is_not_found() {
        let f = fixture();
        let err = f.service.undelete(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn find_by_id_hides_recordings_under_deleted_booking() {
        let f = fixture();
        let mut b = booking();
        b.deleted_at = Some(Utc::now());
        f.store.insert_booking(b.clone());
        let session = capture_session_for(b.id, RecordingStatus::RecordingAvailable);
        f.store.insert_session(session.clone());
        let rec = recording(session.id);
        f.store.insert_recording(rec.clone());

        let err = f.service.find_by_id(rec.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
