/// Cron-style batch tasks
///
/// Each task is one independently triggered invocation; within a run, work
/// over sessions and jobs is sequential except where the live-event
/// orchestrator batches deliberately.
pub mod process_capture_sessions;
pub mod start_live_events;
pub mod status_correction;

pub use process_capture_sessions::ProcessCaptureSessionsTask;
pub use start_live_events::StartLiveEventsTask;
pub use status_correction::CaptureSessionStatusCorrectionTask;
