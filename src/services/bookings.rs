/// Booking service
///
/// Bookings sit between cases and capture sessions in the deletion
/// hierarchy. Soft-deleting a booking cascades over its capture sessions
/// (and their recordings) and its share grants, but is blocked while any
/// recording underneath is still live.
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    BookingRepository, CaptureSessionRepository, RecordingRepository, ShareBookingRepository,
};
use crate::error::{AppError, Result};
use crate::models::Booking;
use crate::security::{AccessPolicy, Resource};

pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    sessions: Arc<dyn CaptureSessionRepository>,
    recordings: Arc<dyn RecordingRepository>,
    shares: Arc<dyn ShareBookingRepository>,
    policy: Arc<dyn AccessPolicy>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        sessions: Arc<dyn CaptureSessionRepository>,
        recordings: Arc<dyn RecordingRepository>,
        shares: Arc<dyn ShareBookingRepository>,
        policy: Arc<dyn AccessPolicy>,
    ) -> Self {
        Self {
            bookings,
            sessions,
            recordings,
            shares,
            policy,
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Booking> {
        self.policy.ensure_access(Resource::Booking(id)).await?;

        self.bookings
            .find_live(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking: {id}")))
    }

    /// Direct soft-delete of one booking. Fails fast while a live
    /// recording exists underneath rather than orphaning it.
    pub async fn mark_as_deleted(&self, id: Uuid) -> Result<()> {
        self.policy.ensure_access(Resource::Booking(id)).await?;

        let booking = self
            .bookings
            .find_live(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking: {id}")))?;

        if self.recordings.exists_live_by_booking(booking.id).await? {
            return Err(AppError::CaptureSessionNotDeleted(format!(
                "Booking: {id}"
            )));
        }

        let now = Utc::now();
        self.cascade_children(booking.id, now).await?;
        self.bookings.mark_deleted(booking.id, now, false).await?;

        Ok(())
    }

    /// Cascade used by case deletion: every live booking of the case goes,
    /// flagged as a cascade delete
    pub async fn delete_cascade(&self, case_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        for booking in self.bookings.find_all_live_by_case(case_id).await? {
            self.cascade_children(booking.id, at).await?;
            self.bookings.mark_deleted(booking.id, at, true).await?;
        }

        Ok(())
    }

    async fn cascade_children(&self, booking_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        for session in self.sessions.find_all_live_by_booking(booking_id).await? {
            self.recordings
                .mark_all_deleted_by_capture_session(session.id, at)
                .await?;
            self.sessions.mark_deleted(session.id, at, true).await?;
        }
        self.shares
            .mark_all_deleted_by_booking(booking_id, at)
            .await?;

        Ok(())
    }

    /// No-op on a live booking; does not restore the owning case
    pub async fn undelete(&self, id: Uuid) -> Result<()> {
        self.policy.ensure_access(Resource::Booking(id)).await?;

        let booking = self
            .bookings
            .find_any(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking: {id}")))?;
        if !booking.is_deleted() {
            return Ok(());
        }

        self.bookings.undelete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordingStatus;
    use crate::security::RobotAccessPolicy;
    use crate::testing::{
        booking, capture_session_for, recording, share_for, InMemoryBookingRepository,
        InMemoryCaptureSessionRepository, InMemoryRecordingRepository,
        InMemoryShareBookingRepository, InMemoryStore,
    };

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: BookingService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::default());
        let service = BookingService::new(
            Arc::new(InMemoryBookingRepository(store.clone())),
            Arc::new(InMemoryCaptureSessionRepository(store.clone())),
            Arc::new(InMemoryRecordingRepository(store.clone())),
            Arc::new(InMemoryShareBookingRepository(store.clone())),
            Arc::new(RobotAccessPolicy),
        );
        Fixture { store, service }
    }

    #[tokio::test]
    async fn delete_blocked_by_live_recording() {
        let f = fixture();
        let b = booking();
        f.store.insert_booking(b.clone());
        let session = capture_session_for(b.id, RecordingStatus::RecordingAvailable);
        f.store.insert_session(session.clone());
        f.store.insert_recording(recording(session.id));

        let err = f.service.mark_as_deleted(b.id).await.unwrap_err();
        assert!(matches!(err, AppError::CaptureSessionNotDeleted(_)));
        assert!(!f.store.booking(b.id).unwrap().is_deleted());
        assert!(!f.store.session(session.id).unwrap().is_deleted());
    }

    #[tokio::test]
    async fn delete_cascades_sessions_and_shares() {
        let f = fixture();
        let b = booking();
        f.store.insert_booking(b.clone());
        let session = capture_session_for(b.id, RecordingStatus::NoRecording);
        f.store.insert_session(session.clone());
        let share = share_for(b.id);
        f.store.insert_share(share.clone());

        f.service.mark_as_deleted(b.id).await.unwrap();

        let deleted_booking = f.store.booking(b.id).unwrap();
        assert!(deleted_booking.is_deleted());
        assert!(!deleted_booking.deleted_via_cascade);
        let deleted_session = f.store.session(session.id).unwrap();
        assert!(deleted_session.is_deleted());
        assert!(deleted_session.deleted_via_cascade);
        let deleted_share = f.store.share(share.id).unwrap();
        assert!(deleted_share.is_deleted());
        assert!(deleted_share.deleted_via_cascade);
    }

    #[tokio::test]
    async fn undelete_is_noop_on_live_booking() {
        let f = fixture();
        let b = booking();
        f.store.insert_booking(b.clone());

        f.service.undelete(b.id).await.unwrap();
        assert!(!f.store.booking(b.id).unwrap().is_deleted());
    }

    #[tokio::test]
    async fn undelete_unknown_booking_is_not_found() {
        let f = fixture();
        let err = f.service.undelete(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
