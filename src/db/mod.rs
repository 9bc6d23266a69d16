/// Persistence boundary for capture-service
///
/// Each entity has a repository trait consumed by the service layer and a
/// Postgres implementation backed by sqlx. Services never touch SQL directly;
/// cascades are composed from these calls by the coordinating service.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Booking, CaptureSession, Case, EncodeJob, Recording, ShareBooking};

pub mod bookings;
pub mod capture_sessions;
pub mod cases;
pub mod encode_jobs;
pub mod recordings;
pub mod share_bookings;

pub use bookings::PgBookingRepository;
pub use capture_sessions::PgCaptureSessionRepository;
pub use cases::PgCaseRepository;
pub use encode_jobs::PgEncodeJobRepository;
pub use recordings::PgRecordingRepository;
pub use share_bookings::PgShareBookingRepository;

#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// Fetch a case regardless of deletion state
    async fn find_any(&self, id: Uuid) -> Result<Option<Case>>;

    /// Fetch a case that has not been soft-deleted
    async fn find_live(&self, id: Uuid) -> Result<Option<Case>>;

    async fn save(&self, case: &Case) -> Result<()>;

    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;

    async fn undelete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_any(&self, id: Uuid) -> Result<Option<Booking>>;

    async fn find_live(&self, id: Uuid) -> Result<Option<Booking>>;

    async fn find_all_live_by_case(&self, case_id: Uuid) -> Result<Vec<Booking>>;

    /// Live bookings scheduled within [from, to)
    async fn find_scheduled_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>>;

    async fn save(&self, booking: &Booking) -> Result<()>;

    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>, via_cascade: bool) -> Result<()>;

    async fn undelete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait CaptureSessionRepository: Send + Sync {
    async fn find_any(&self, id: Uuid) -> Result<Option<CaptureSession>>;

    async fn find_live(&self, id: Uuid) -> Result<Option<CaptureSession>>;

    /// Insert or update by primary key
    async fn save(&self, session: &CaptureSession) -> Result<()>;

    async fn exists_live_by_booking(&self, booking_id: Uuid) -> Result<bool>;

    async fn find_all_live_by_booking(&self, booking_id: Uuid) -> Result<Vec<CaptureSession>>;

    async fn find_all_by_status(&self, status: &str) -> Result<Vec<CaptureSession>>;

    /// FAILURE sessions whose start time falls within [from, to]
    async fn find_failed_started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CaptureSession>>;

    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>, via_cascade: bool) -> Result<()>;

    async fn undelete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait RecordingRepository: Send + Sync {
    async fn find_any(&self, id: Uuid) -> Result<Option<Recording>>;

    async fn find_live(&self, id: Uuid) -> Result<Option<Recording>>;

    async fn save(&self, recording: &Recording) -> Result<()>;

    /// Any live recording under any booking of the case?
    async fn exists_live_by_case(&self, case_id: Uuid) -> Result<bool>;

    /// Any live recording under any capture session of the booking?
    async fn exists_live_by_booking(&self, booking_id: Uuid) -> Result<bool>;

    /// Number of child recordings referencing the parent, deleted or not
    async fn count_by_parent_recording(&self, parent_id: Uuid) -> Result<i64>;

    async fn find_all_live_by_capture_session(
        &self,
        capture_session_id: Uuid,
    ) -> Result<Vec<Recording>>;

    /// Cascade-mark every live recording of the session; returns rows touched
    async fn mark_all_deleted_by_capture_session(
        &self,
        capture_session_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64>;

    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>, via_cascade: bool) -> Result<()>;

    async fn undelete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait ShareBookingRepository: Send + Sync {
    async fn save(&self, share: &ShareBooking) -> Result<()>;

    async fn find_all_live_by_booking(&self, booking_id: Uuid) -> Result<Vec<ShareBooking>>;

    /// Cascade-mark every live share of the booking; returns rows touched
    async fn mark_all_deleted_by_booking(&self, booking_id: Uuid, at: DateTime<Utc>)
        -> Result<u64>;
}

#[async_trait]
pub trait EncodeJobRepository: Send + Sync {
    /// Every persisted job is in flight; resolved jobs are deleted
    async fn find_all(&self) -> Result<Vec<EncodeJob>>;

    async fn find_any(&self, id: Uuid) -> Result<Option<EncodeJob>>;

    async fn find_all_by_capture_session(
        &self,
        capture_session_id: Uuid,
    ) -> Result<Vec<EncodeJob>>;

    /// Insert or update by primary key
    async fn save(&self, job: &EncodeJob) -> Result<()>;

    /// Hard delete; returns whether a row existed
    async fn delete(&self, id: Uuid) -> Result<bool>;
}
