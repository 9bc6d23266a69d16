/// Data models for capture-service
///
/// This module defines structures for:
/// - Case / Booking: the scheduling hierarchy a capture session belongs to
/// - CaptureSession: one attempt to record a booking
/// - Recording: a playable media artifact produced by a capture session
/// - EncodeJob: tracking record for one in-flight transcode operation
///
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ========================================
// Status enums
// ========================================

/// Capture session status in the recording lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingStatus {
    Initialising,
    Standby,
    Recording,
    Processing,
    RecordingAvailable,
    NoRecording,
    Failure,
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialising => "INITIALISING",
            Self::Standby => "STANDBY",
            Self::Recording => "RECORDING",
            Self::Processing => "PROCESSING",
            Self::RecordingAvailable => "RECORDING_AVAILABLE",
            Self::NoRecording => "NO_RECORDING",
            Self::Failure => "FAILURE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "INITIALISING" => Some(Self::Initialising),
            "STANDBY" => Some(Self::Standby),
            "RECORDING" => Some(Self::Recording),
            "PROCESSING" => Some(Self::Processing),
            "RECORDING_AVAILABLE" => Some(Self::RecordingAvailable),
            "NO_RECORDING" => Some(Self::NoRecording),
            "FAILURE" => Some(Self::Failure),
            _ => None,
        }
    }

    /// Terminal statuses end a session's lifecycle; only the reconciler's
    /// FAILURE -> NO_RECORDING correction may follow one.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RecordingAvailable | Self::NoRecording | Self::Failure
        )
    }
}

/// Where the ingest feed originates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingOrigin {
    Pre,
    Vodafone,
}

impl RecordingOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pre => "PRE",
            Self::Vodafone => "VODAFONE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PRE" => Some(Self::Pre),
            "VODAFONE" => Some(Self::Vodafone),
            _ => None,
        }
    }
}

/// Encode pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncodeTransform {
    EncodeFromIngest,
    EncodeFromMp4,
}

impl EncodeTransform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EncodeFromIngest => "ENCODE_FROM_INGEST",
            Self::EncodeFromMp4 => "ENCODE_FROM_MP4",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ENCODE_FROM_INGEST" => Some(Self::EncodeFromIngest),
            "ENCODE_FROM_MP4" => Some(Self::EncodeFromMp4),
            _ => None,
        }
    }
}

/// Case lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseState {
    Open,
    PendingClosure,
    Closed,
}

impl CaseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::PendingClosure => "PENDING_CLOSURE",
            Self::Closed => "CLOSED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(Self::Open),
            "PENDING_CLOSURE" => Some(Self::PendingClosure),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Outcome of an upsert operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertResult {
    Created,
    Updated,
}

// ========================================
// Entities
// ========================================

/// Court case, the root of the scheduling hierarchy
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Case {
    pub id: Uuid,
    pub reference: String,
    pub state: String,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Case {
    pub fn get_state(&self) -> CaseState {
        CaseState::from_str(&self.state).unwrap_or(CaseState::Open)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Scheduling unit; owns capture sessions and share grants
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub case_id: Uuid,
    pub scheduled_for: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_via_cascade: bool,
}

impl Booking {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// One attempt to capture/record a booking
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CaptureSession {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub origin: String,
    pub status: String,
    pub ingest_address: Option<String>,
    pub live_output_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub started_by_user_id: Option<Uuid>,
    pub finished_at: Option<DateTime<Utc>>,
    pub finished_by_user_id: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_via_cascade: bool,
}

impl CaptureSession {
    pub fn get_status(&self) -> RecordingStatus {
        RecordingStatus::from_str(&self.status).unwrap_or(RecordingStatus::Failure)
    }

    pub fn get_origin(&self) -> RecordingOrigin {
        RecordingOrigin::from_str(&self.origin).unwrap_or(RecordingOrigin::Pre)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A concrete media artifact produced by a capture session
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recording {
    pub id: Uuid,
    pub capture_session_id: Uuid,
    pub parent_recording_id: Option<Uuid>,
    pub version: i32,
    pub filename: Option<String>,
    pub duration_seconds: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_via_cascade: bool,
}

impl Recording {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Tracking record for one in-flight transcode operation.
///
/// Rows are hard-deleted once the job resolves; they are never soft-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EncodeJob {
    pub id: Uuid,
    pub capture_session_id: Uuid,
    pub recording_id: Uuid,
    pub job_name: String,
    pub transform: String,
    pub created_at: DateTime<Utc>,
}

impl EncodeJob {
    pub fn get_transform(&self) -> EncodeTransform {
        EncodeTransform::from_str(&self.transform).unwrap_or(EncodeTransform::EncodeFromIngest)
    }
}

/// Grants a user access to a booking's recordings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShareBooking {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub shared_by_user_id: Uuid,
    pub shared_with_user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_via_cascade: bool,
}

impl ShareBooking {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

// ========================================
// Create/update payloads
// ========================================

/// Payload for creating or updating a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCaptureSession {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub origin: RecordingOrigin,
    pub status: RecordingStatus,
    pub ingest_address: Option<String>,
    pub live_output_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub started_by_user_id: Option<Uuid>,
    pub finished_at: Option<DateTime<Utc>>,
    pub finished_by_user_id: Option<Uuid>,
}

impl CreateCaptureSession {
    /// Minimal payload for a freshly scheduled session
    pub fn new(id: Uuid, booking_id: Uuid) -> Self {
        Self {
            id,
            booking_id,
            origin: RecordingOrigin::Pre,
            status: RecordingStatus::Initialising,
            ingest_address: None,
            live_output_url: None,
            started_at: None,
            started_by_user_id: None,
            finished_at: None,
            finished_by_user_id: None,
        }
    }
}

/// Payload for creating or updating a recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecording {
    pub id: Uuid,
    pub capture_session_id: Uuid,
    pub parent_recording_id: Option<Uuid>,
    pub filename: Option<String>,
    pub duration_seconds: Option<i64>,
}
