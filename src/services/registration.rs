/// Direct registration path
///
/// Synchronous alternative to the encode job tracker for a session whose
/// processing finished outside the polling flow: verify the live event has
/// stopped, the ingest transcode succeeded and the final asset exists, then
/// promote the session in one shot. No retries; every failure is terminal
/// for the call.
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::media::{sanitised_live_event_id, MediaGateway};
use crate::models::{EncodeTransform, RecordingStatus, UpsertResult};
use crate::services::CaptureSessionService;
use crate::storage::IngestStorage;

pub struct RegistrationService {
    capture_sessions: Arc<CaptureSessionService>,
    media: Arc<dyn MediaGateway>,
    ingest_storage: Arc<dyn IngestStorage>,
}

impl RegistrationService {
    pub fn new(
        capture_sessions: Arc<CaptureSessionService>,
        media: Arc<dyn MediaGateway>,
        ingest_storage: Arc<dyn IngestStorage>,
    ) -> Self {
        Self {
            capture_sessions,
            media,
            ingest_storage,
        }
    }

    pub async fn register(&self, capture_session_id: Uuid) -> Result<UpsertResult> {
        info!(capture_session = %capture_session_id, "Registering recording");

        let live_event_name = sanitised_live_event_id(capture_session_id);

        // A live event the platform still knows about means the session is
        // not finished
        if let Some(live_event) = self.media.get_live_event(&live_event_name).await? {
            return Err(AppError::WrongState(format!(
                "Capture session {capture_session_id} cannot be registered: live event still \
                 exists in state {:?}",
                live_event.state
            )));
        }

        // The ingest transcode job is named deterministically from the
        // session id
        let job_name = format!("encode-ingest-{live_event_name}");
        let job_status = self
            .media
            .has_job_completed(EncodeTransform::EncodeFromIngest, &job_name)
            .await?;
        if job_status != RecordingStatus::RecordingAvailable {
            return Err(AppError::WrongState(format!(
                "Capture session {capture_session_id} cannot be registered: ingest job is {}",
                job_status.as_str()
            )));
        }

        let output_assets = self
            .media
            .get_job_output_assets(EncodeTransform::EncodeFromIngest, &job_name)
            .await?;
        let first_asset = output_assets.first().ok_or_else(|| {
            AppError::WrongState(format!(
                "Capture session {capture_session_id} cannot be registered: ingest job has no \
                 output assets"
            ))
        })?;

        let recording_id = Uuid::parse_str(&first_asset.name).map_err(|_| {
            AppError::WrongState(format!(
                "Capture session {capture_session_id} cannot be registered: output asset {} is \
                 not a recording id",
                first_asset.name
            ))
        })?;

        if self.media.verify_final_asset_exists(recording_id).await?
            != RecordingStatus::RecordingAvailable
        {
            return Err(AppError::WrongState(format!(
                "Capture session {capture_session_id} cannot be registered: recording \
                 {recording_id} is not available in storage"
            )));
        }

        info!(capture_session = %capture_session_id, recording = %recording_id, "Found a recording");

        let session = self
            .capture_sessions
            .stop_capture_session(
                capture_session_id,
                RecordingStatus::RecordingAvailable,
                Some(recording_id),
            )
            .await?;

        self.ingest_storage
            .mark_container_as_safe_to_delete(&session.booking_id.to_string())
            .await?;
        self.ingest_storage
            .mark_container_as_safe_to_delete(&recording_id.to_string())
            .await?;

        Ok(UpsertResult::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{LiveEvent, LiveEventState, OutputAsset};
    use crate::security::RobotAccessPolicy;
    use crate::testing::{
        booking, capture_session_for, FakeIngestStorage, FakeMediaGateway,
        InMemoryBookingRepository, InMemoryCaptureSessionRepository, InMemoryRecordingRepository,
        InMemoryStore, StubFinalStorage,
    };
    use crate::models::CaptureSession;

    struct Fixture {
        store: Arc<InMemoryStore>,
        media: Arc<FakeMediaGateway>,
        ingest: Arc<FakeIngestStorage>,
        service: RegistrationService,
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
        let service =
            RegistrationService::new(capture_sessions, media.clone(), ingest.clone());
        Fixture {
            store,
            media,
            ingest,
            service,
        }
    }

    fn processing_session(f: &Fixture) -> CaptureSession {
        let b = booking();
        f.store.insert_booking(b.clone());
        let session = capture_session_for(b.id, RecordingStatus::Processing);
        f.store.insert_session(session.clone());
        session
    }

    fn script_success(f: &Fixture, session_id: Uuid) -> Uuid {
        let job_name = format!("encode-ingest-{}", sanitised_live_event_id(session_id));
        let recording_id = Uuid::new_v4();
        f.media
            .set_job_status(&job_name, RecordingStatus::RecordingAvailable);
        f.media.job_outputs.lock().unwrap().insert(
            job_name,
            vec![OutputAsset {
                name: recording_id.to_string(),
            }],
        );
        f.media
            .set_final_asset(recording_id, RecordingStatus::RecordingAvailable);
        recording_id
    }

    #[tokio::test]
    async fn register_rejects_running_live_event() {
        let f = fixture();
        let session = processing_session(&f);
        let name = sanitised_live_event_id(session.id);
        f.media.live_events.lock().unwrap().insert(
            name.clone(),
            LiveEvent {
                name,
                state: LiveEventState::Running,
                ingest_rtmp: Some("rtmp://in".to_string()),
            },
        );

        let err = f.service.register(session.id).await.unwrap_err();
        assert!(matches!(err, AppError::WrongState(_)));
    }

    #[tokio::test]
    async fn register_rejects_unfinished_ingest_job() {
        let f = fixture();
        let session = processing_session(&f);
        let job_name = format!("encode-ingest-{}", sanitised_live_event_id(session.id));
        f.media.set_job_status(&job_name, RecordingStatus::Processing);

        let err = f.service.register(session.id).await.unwrap_err();
        assert!(matches!(err, AppError::WrongState(_)));
    }

    #[tokio::test]
    async fn register_rejects_job_without_output_assets() {
        let f = fixture();
        let session = processing_session(&f);
        let job_name = format!("encode-ingest-{}", sanitised_live_event_id(session.id));
        f.media
            .set_job_status(&job_name, RecordingStatus::RecordingAvailable);

        let err = f.service.register(session.id).await.unwrap_err();
        assert!(matches!(err, AppError::WrongState(_)));
    }

    #[tokio::test]
    async fn register_rejects_missing_final_asset() {
        let f = fixture();
        let session = processing_session(&f);
        let recording_id = script_success(&f, session.id);
        f.media
            .set_final_asset(recording_id, RecordingStatus::Failure);

        let err = f.service.register(session.id).await.unwrap_err();
        assert!(matches!(err, AppError::WrongState(_)));
    }

    #[tokio::test]
    async fn register_promotes_session_and_marks_containers() {
        let f = fixture();
        let session = processing_session(&f);
        let recording_id = script_success(&f, session.id);

        let result = f.service.register(session.id).await.unwrap();

        assert_eq!(result, UpsertResult::Updated);
        let updated = f.store.session(session.id).unwrap();
        assert_eq!(updated.get_status(), RecordingStatus::RecordingAvailable);
        assert!(f.store.recording(recording_id).is_some());
        let marked = f.ingest.marked_safe();
        assert!(marked.contains(&session.booking_id.to_string()));
        assert!(marked.contains(&recording_id.to_string()));
    }
}
