/// Service layer for the capture-session lifecycle
///
/// This module provides business logic for:
/// - Capture session state machine and upserts
/// - Encode job tracking and the two-stage transcode pipeline
/// - Direct registration of finished sessions
/// - Cascade soft-delete/undelete across the scheduling hierarchy
pub mod bookings;
pub mod capture_sessions;
pub mod cases;
pub mod encode_jobs;
pub mod processing;
pub mod recordings;
pub mod registration;

pub use bookings::BookingService;
pub use capture_sessions::CaptureSessionService;
pub use cases::CaseService;
pub use encode_jobs::EncodeJobService;
pub use processing::{ProcessingService, ProcessingSummary};
pub use recordings::RecordingService;
pub use registration::RegistrationService;
