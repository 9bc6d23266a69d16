/// Case service
///
/// The cascade entry point for whole-case deletion: blocked while any
/// recording under the case is still live, otherwise deletion timestamps
/// flow down through bookings, capture sessions, recordings and shares.
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{CaseRepository, RecordingRepository};
use crate::error::{AppError, Result};
use crate::models::Case;
use crate::security::{AccessPolicy, Resource};
use crate::services::BookingService;

pub struct CaseService {
    cases: Arc<dyn CaseRepository>,
    recordings: Arc<dyn RecordingRepository>,
    booking_service: Arc<BookingService>,
    policy: Arc<dyn AccessPolicy>,
}

impl CaseService {
    pub fn new(
        cases: Arc<dyn CaseRepository>,
        recordings: Arc<dyn RecordingRepository>,
        booking_service: Arc<BookingService>,
        policy: Arc<dyn AccessPolicy>,
    ) -> Self {
        Self {
            cases,
            recordings,
            booking_service,
            policy,
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Case> {
        self.policy.ensure_access(Resource::Case(id)).await?;

        self.cases
            .find_live(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Case: {id}")))
    }

    pub async fn delete_by_id(&self, id: Uuid) -> Result<()> {
        self.policy.ensure_access(Resource::Case(id)).await?;

        let case = self
            .cases
            .find_live(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Case: {id}")))?;

        if self.recordings.exists_live_by_case(case.id).await? {
            return Err(AppError::CaptureSessionNotDeleted(format!("Case: {id}")));
        }

        let now = Utc::now();
        self.booking_service.delete_cascade(case.id, now).await?;
        self.cases.mark_deleted(case.id, now).await?;

        Ok(())
    }

    /// No-op on a live case; descendants are not restored
    pub async fn undelete(&self, id: Uuid) -> Result<()> {
        self.policy.ensure_access(Resource::Case(id)).await?;

        let case = self
            .cases
            .find_any(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Case: {id}")))?;
        if !case.is_deleted() {
            return Ok(());
        }

        self.cases.undelete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseState, RecordingStatus};
    use crate::security::RobotAccessPolicy;
    use crate::testing::{
        booking_for, capture_session_for, case_with_state, recording, share_for,
        InMemoryBookingRepository, InMemoryCaptureSessionRepository, InMemoryCaseRepository,
        InMemoryRecordingRepository, InMemoryShareBookingRepository, InMemoryStore,
    };

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: CaseService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::default());
        let booking_service = Arc::new(BookingService::new(
            Arc::new(InMemoryBookingRepository(store.clone())),
            Arc::new(InMemoryCaptureSessionRepository(store.clone())),
            Arc::new(InMemoryRecordingRepository(store.clone())),
            Arc::new(InMemoryShareBookingRepository(store.clone())),
            Arc::new(RobotAccessPolicy),
        ));
        let service = CaseService::new(
            Arc::new(InMemoryCaseRepository(store.clone())),
            Arc::new(InMemoryRecordingRepository(store.clone())),
            booking_service,
            Arc::new(RobotAccessPolicy),
        );
        Fixture { store, service }
    }

    #[tokio::test]
    async fn delete_blocked_while_descendant_recording_is_live() {
        let f = fixture();
        let case = case_with_state(CaseState::Open);
        f.store.insert_case(case.clone());
        let b = booking_for(case.id);
        f.store.insert_booking(b.clone());
        let session = capture_session_for(b.id, RecordingStatus::RecordingAvailable);
        f.store.insert_session(session.clone());
        let rec = recording(session.id);
        f.store.insert_recording(rec.clone());

        let err = f.service.delete_by_id(case.id).await.unwrap_err();
        assert!(matches!(err, AppError::CaptureSessionNotDeleted(_)));

        // Nothing was mutated
        assert!(!f.store.case(case.id).unwrap().is_deleted());
        assert!(!f.store.booking(b.id).unwrap().is_deleted());
        assert!(!f.store.session(session.id).unwrap().is_deleted());
        assert!(!f.store.recording(rec.id).unwrap().is_deleted());
    }

    #[tokio::test]
    async fn delete_cascades_once_recordings_are_gone() {
        let f = fixture();
        let case = case_with_state(CaseState::Open);
        f.store.insert_case(case.clone());
        let b = booking_for(case.id);
        f.store.insert_booking(b.clone());
        let session = capture_session_for(b.id, RecordingStatus::RecordingAvailable);
        f.store.insert_session(session.clone());
        let mut rec = recording(session.id);
        rec.deleted_at = Some(Utc::now());
        f.store.insert_recording(rec.clone());
        let share = share_for(b.id);
        f.store.insert_share(share.clone());

        f.service.delete_by_id(case.id).await.unwrap();

        assert!(f.store.case(case.id).unwrap().is_deleted());
        let deleted_booking = f.store.booking(b.id).unwrap();
        assert!(deleted_booking.is_deleted());
        assert!(deleted_booking.deleted_via_cascade);
        let deleted_session = f.store.session(session.id).unwrap();
        assert!(deleted_session.is_deleted());
        assert!(deleted_session.deleted_via_cascade);
        assert!(f.store.share(share.id).unwrap().is_deleted());
    }

    #[tokio::test]
    async fn delete_unknown_case_is_not_found() {
        let f = fixture();
        let err = f.service.delete_by_id(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn undelete_is_noop_on_live_case() {
        let f = fixture();
        let case = case_with_state(CaseState::Open);
        f.store.insert_case(case.clone());

        f.service.undelete(case.id).await.unwrap();
        assert!(!f.store.case(case.id).unwrap().is_deleted());
    }
}
