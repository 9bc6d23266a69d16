/// Media-processing gateway boundary
///
/// The orchestration layer only ever talks to the media platform through the
/// [`MediaGateway`] trait. All mapping from the platform's stringly-typed
/// resource states to typed enums happens here, at the adapter boundary.
use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CaptureSession, EncodeTransform, RecordingStatus};

pub mod mediakind;

pub use mediakind::MediaKindClient;

/// External transform names understood by the media platform
pub const ENCODE_FROM_INGEST_TRANSFORM: &str = "EncodeFromIngest";
pub const ENCODE_FROM_MP4_TRANSFORM: &str = "EncodeFromMp4";

/// Resource state of a live event, mapped from the platform's state strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveEventState {
    Starting,
    Running,
    Stopping,
    Stopped,
    Deleting,
    Unknown,
}

impl LiveEventState {
    /// Platform states not recognised here map to `Unknown`, which is never
    /// treated as ready.
    pub fn from_api(state: &str) -> Self {
        match state {
            "Starting" => Self::Starting,
            "Running" => Self::Running,
            "Stopping" => Self::Stopping,
            "Stopped" => Self::Stopped,
            "Deleting" => Self::Deleting,
            _ => Self::Unknown,
        }
    }
}

/// A live ingest endpoint as reported by the media platform
#[derive(Debug, Clone)]
pub struct LiveEvent {
    pub name: String,
    pub state: LiveEventState,
    pub ingest_rtmp: Option<String>,
}

impl LiveEvent {
    /// Address a feed can push to, present only once the event is running
    pub fn ready_ingest_address(&self) -> Option<&str> {
        if self.state == LiveEventState::Running {
            self.ingest_rtmp.as_deref()
        } else {
            None
        }
    }
}

/// One output asset of a finished transcode job
#[derive(Debug, Clone)]
pub struct OutputAsset {
    pub name: String,
}

#[async_trait]
pub trait MediaGateway: Send + Sync {
    /// Create and start a live ingest endpoint for the session
    async fn start_live_event(&self, session: &CaptureSession) -> Result<()>;

    /// Fetch one live event; `None` when the platform no longer knows it
    async fn get_live_event(&self, name: &str) -> Result<Option<LiveEvent>>;

    /// List all live events currently known to the platform
    async fn get_live_events(&self) -> Result<Vec<LiveEvent>>;

    /// Completion status of a transcode job: `Processing`,
    /// `RecordingAvailable` (finished) or `Failure`
    async fn has_job_completed(
        &self,
        transform: EncodeTransform,
        job_name: &str,
    ) -> Result<RecordingStatus>;

    async fn get_job_output_assets(
        &self,
        transform: EncodeTransform,
        job_name: &str,
    ) -> Result<Vec<OutputAsset>>;

    /// Kick the first transcode stage for a stopped ingest, encoding into
    /// the recording's asset container; returns the job name, or `None`
    /// when the ingest produced nothing to encode
    async fn trigger_processing_step1(
        &self,
        capture_session_id: Uuid,
        recording_id: Uuid,
    ) -> Result<Option<String>>;

    /// Chain the second transcode stage; returns the job name, or `None`
    /// when there is no recording to encode
    async fn trigger_processing_step2(
        &self,
        recording_id: Uuid,
        force: bool,
    ) -> Result<Option<String>>;

    /// `RecordingAvailable` when the final playable asset is in durable
    /// storage, `Failure` otherwise
    async fn verify_final_asset_exists(&self, recording_id: Uuid) -> Result<RecordingStatus>;
}

/// Live event names must be alphanumeric; the platform rejects dashes
pub fn sanitised_live_event_id(capture_session_id: Uuid) -> String {
    capture_session_id.to_string().replace('-', "")
}

/// External transform name for an encode stage
pub fn transform_name(transform: EncodeTransform) -> &'static str {
    match transform {
        EncodeTransform::EncodeFromIngest => ENCODE_FROM_INGEST_TRANSFORM,
        EncodeTransform::EncodeFromMp4 => ENCODE_FROM_MP4_TRANSFORM,
    }
}

/// Map a platform job state string to a completion status
pub fn job_state_to_status(state: &str) -> RecordingStatus {
    match state {
        "Finished" => RecordingStatus::RecordingAvailable,
        "Error" | "Canceled" | "Canceling" => RecordingStatus::Failure,
        // Scheduled, Queued, Processing and anything unrecognised
        _ => RecordingStatus::Processing,
    }
}
