/// In-memory test doubles for the repository and gateway traits
///
/// A single `InMemoryStore` backs every repository fake so that queries
/// which join across entities behave like the real schema.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    BookingRepository, CaptureSessionRepository, CaseRepository, EncodeJobRepository,
    RecordingRepository, ShareBookingRepository,
};
use crate::error::{AppError, Result};
use crate::media::{LiveEvent, MediaGateway, OutputAsset};
use crate::models::{
    Booking, CaptureSession, Case, CaseState, EncodeJob, EncodeTransform, Recording,
    RecordingOrigin, RecordingStatus, ShareBooking,
};
use crate::storage::{FinalStorage, IngestStorage};

// ========================================
// Entity builders
// ========================================

pub fn case_with_state(state: CaseState) -> Case {
    Case {
        id: Uuid::new_v4(),
        reference: "CASE-1234".to_string(),
        state: state.as_str().to_string(),
        closed_at: None,
        created_at: Utc::now(),
        deleted_at: None,
    }
}

pub fn booking_for(case_id: Uuid) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        case_id,
        scheduled_for: Utc::now(),
        created_at: Utc::now(),
        deleted_at: None,
        deleted_via_cascade: false,
    }
}

pub fn booking() -> Booking {
    booking_for(Uuid::new_v4())
}

pub fn capture_session_for(booking_id: Uuid, status: RecordingStatus) -> CaptureSession {
    CaptureSession {
        id: Uuid::new_v4(),
        booking_id,
        origin: RecordingOrigin::Pre.as_str().to_string(),
        status: status.as_str().to_string(),
        ingest_address: None,
        live_output_url: None,
        started_at: Some(Utc::now()),
        started_by_user_id: None,
        finished_at: None,
        finished_by_user_id: None,
        deleted_at: None,
        deleted_via_cascade: false,
    }
}

pub fn capture_session(status: RecordingStatus) -> CaptureSession {
    capture_session_for(Uuid::new_v4(), status)
}

pub fn recording(capture_session_id: Uuid) -> Recording {
    Recording {
        id: Uuid::new_v4(),
        capture_session_id,
        parent_recording_id: None,
        version: 1,
        filename: Some("index.mp4".to_string()),
        duration_seconds: Some(120),
        created_at: Utc::now(),
        deleted_at: None,
        deleted_via_cascade: false,
    }
}

pub fn encode_job(capture_session_id: Uuid, transform: EncodeTransform) -> EncodeJob {
    EncodeJob {
        id: Uuid::new_v4(),
        capture_session_id,
        recording_id: Uuid::new_v4(),
        job_name: format!("job-{}", Uuid::new_v4()),
        transform: transform.as_str().to_string(),
        created_at: Utc::now(),
    }
}

pub fn share_for(booking_id: Uuid) -> ShareBooking {
    ShareBooking {
        id: Uuid::new_v4(),
        booking_id,
        shared_by_user_id: Uuid::new_v4(),
        shared_with_user_id: Uuid::new_v4(),
        created_at: Utc::now(),
        deleted_at: None,
        deleted_via_cascade: false,
    }
}

// ========================================
// Shared in-memory store
// ========================================

#[derive(Default)]
pub struct InMemoryStore {
    pub cases: Mutex<HashMap<Uuid, Case>>,
    pub bookings: Mutex<HashMap<Uuid, Booking>>,
    pub sessions: Mutex<HashMap<Uuid, CaptureSession>>,
    pub recordings: Mutex<HashMap<Uuid, Recording>>,
    pub shares: Mutex<HashMap<Uuid, ShareBooking>>,
    pub jobs: Mutex<HashMap<Uuid, EncodeJob>>,
}

impl InMemoryStore {
    pub fn insert_case(&self, case: Case) {
        self.cases.lock().unwrap().insert(case.id, case);
    }

    pub fn insert_booking(&self, booking: Booking) {
        self.bookings.lock().unwrap().insert(booking.id, booking);
    }

    pub fn insert_session(&self, session: CaptureSession) {
        self.sessions.lock().unwrap().insert(session.id, session);
    }

    pub fn insert_recording(&self, recording: Recording) {
        self.recordings
            .lock()
            .unwrap()
            .insert(recording.id, recording);
    }

    pub fn insert_share(&self, share: ShareBooking) {
        self.shares.lock().unwrap().insert(share.id, share);
    }

    pub fn insert_job(&self, job: EncodeJob) {
        self.jobs.lock().unwrap().insert(job.id, job);
    }

    pub fn case(&self, id: Uuid) -> Option<Case> {
        self.cases.lock().unwrap().get(&id).cloned()
    }

    pub fn booking(&self, id: Uuid) -> Option<Booking> {
        self.bookings.lock().unwrap().get(&id).cloned()
    }

    pub fn session(&self, id: Uuid) -> Option<CaptureSession> {
        self.sessions.lock().unwrap().get(&id).cloned()
    }

    pub fn recording(&self, id: Uuid) -> Option<Recording> {
        self.recordings.lock().unwrap().get(&id).cloned()
    }

    pub fn share(&self, id: Uuid) -> Option<ShareBooking> {
        self.shares.lock().unwrap().get(&id).cloned()
    }

    pub fn job(&self, id: Uuid) -> Option<EncodeJob> {
        self.jobs.lock().unwrap().get(&id).cloned()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn sessions_for_booking(&self, booking_id: Uuid) -> Vec<CaptureSession> {
        self.sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.booking_id == booking_id)
            .cloned()
            .collect()
    }

    fn case_of_session(&self, session: &CaptureSession) -> Option<Uuid> {
        self.bookings
            .lock()
            .unwrap()
            .get(&session.booking_id)
            .map(|b| b.case_id)
    }
}

// ========================================
// Repository fakes
// ========================================

pub struct InMemoryCaseRepository(pub Arc<InMemoryStore>);

#[async_trait]
impl CaseRepository for InMemoryCaseRepository {
    async fn find_any(&self, id: Uuid) -> Result<Option<Case>> {
        Ok(self.0.case(id))
    }

    async fn find_live(&self, id: Uuid) -> Result<Option<Case>> {
        Ok(self.0.case(id).filter(|c| !c.is_deleted()))
    }

    async fn save(&self, case: &Case) -> Result<()> {
        self.0.insert_case(case.clone());
        Ok(())
    }

    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if let Some(case) = self.0.cases.lock().unwrap().get_mut(&id) {
            if case.deleted_at.is_none() {
                case.deleted_at = Some(at);
            }
        }
        Ok(())
    }

    async fn undelete(&self, id: Uuid) -> Result<()> {
        if let Some(case) = self.0.cases.lock().unwrap().get_mut(&id) {
            case.deleted_at = None;
        }
        Ok(())
    }
}

pub struct InMemoryBookingRepository(pub Arc<InMemoryStore>);

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn find_any(&self, id: Uuid) -> Result<Option<Booking>> {
        Ok(self.0.booking(id))
    }

    async fn find_live(&self, id: Uuid) -> Result<Option<Booking>> {
        Ok(self.0.booking(id).filter(|b| !b.is_deleted()))
    }

    async fn find_all_live_by_case(&self, case_id: Uuid) -> Result<Vec<Booking>> {
        Ok(self
            .0
            .bookings
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.case_id == case_id && !b.is_deleted())
            .cloned()
            .collect())
    }

    async fn find_scheduled_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .0
            .bookings
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.scheduled_for >= from && b.scheduled_for < to && !b.is_deleted())
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.scheduled_for);
        Ok(bookings)
    }

    async fn save(&self, booking: &Booking) -> Result<()> {
        self.0.insert_booking(booking.clone());
        Ok(())
    }

    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>, via_cascade: bool) -> Result<()> {
        if let Some(booking) = self.0.bookings.lock().unwrap().get_mut(&id) {
            if booking.deleted_at.is_none() {
                booking.deleted_at = Some(at);
                booking.deleted_via_cascade = via_cascade;
            }
        }
        Ok(())
    }

    async fn undelete(&self, id: Uuid) -> Result<()> {
        if let Some(booking) = self.0.bookings.lock().unwrap().get_mut(&id) {
            booking.deleted_at = None;
            booking.deleted_via_cascade = false;
        }
        Ok(())
    }
}

pub struct InMemoryCaptureSessionRepository(pub Arc<InMemoryStore>);

#[async_trait]
impl CaptureSessionRepository for InMemoryCaptureSessionRepository {
    async fn find_any(&self, id: Uuid) -> Result<Option<CaptureSession>> {
        Ok(self.0.session(id))
    }

    async fn find_live(&self, id: Uuid) -> Result<Option<CaptureSession>> {
        Ok(self.0.session(id).filter(|s| !s.is_deleted()))
    }

    async fn save(&self, session: &CaptureSession) -> Result<()> {
        self.0.insert_session(session.clone());
        Ok(())
    }

    async fn exists_live_by_booking(&self, booking_id: Uuid) -> Result<bool> {
        Ok(self
            .0
            .sessions
            .lock()
            .unwrap()
            .values()
            .any(|s| s.booking_id == booking_id && !s.is_deleted()))
    }

    async fn find_all_live_by_booking(&self, booking_id: Uuid) -> Result<Vec<CaptureSession>> {
        Ok(self
            .0
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.booking_id == booking_id && !s.is_deleted())
            .cloned()
            .collect())
    }

    async fn find_all_by_status(&self, status: &str) -> Result<Vec<CaptureSession>> {
        Ok(self
            .0
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.status == status && !s.is_deleted())
            .cloned()
            .collect())
    }

    async fn find_failed_started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CaptureSession>> {
        Ok(self
            .0
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| {
                s.get_status() == RecordingStatus::Failure
                    && s.started_at.map(|at| at >= from && at <= to).unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>, via_cascade: bool) -> Result<()> {
        if let Some(session) = self.0.sessions.lock().unwrap().get_mut(&id) {
            if session.deleted_at.is_none() {
                session.deleted_at = Some(at);
                session.deleted_via_cascade = via_cascade;
            }
        }
        Ok(())
    }

    async fn undelete(&self, id: Uuid) -> Result<()> {
        if let Some(session) = self.0.sessions.lock().unwrap().get_mut(&id) {
            session.deleted_at = None;
            session.deleted_via_cascade = false;
        }
        Ok(())
    }
}

pub struct InMemoryRecordingRepository(pub Arc<InMemoryStore>);

#[async_trait]
impl RecordingRepository for InMemoryRecordingRepository {
    async fn find_any(&self, id: Uuid) -> Result<Option<Recording>> {
        Ok(self.0.recording(id))
    }

    async fn find_live(&self, id: Uuid) -> Result<Option<Recording>> {
        Ok(self.0.recording(id).filter(|r| !r.is_deleted()))
    }

    async fn save(&self, recording: &Recording) -> Result<()> {
        self.0.insert_recording(recording.clone());
        Ok(())
    }

    async fn exists_live_by_case(&self, case_id: Uuid) -> Result<bool> {
        let recordings = self.0.recordings.lock().unwrap();
        let sessions = self.0.sessions.lock().unwrap();
        Ok(recordings.values().any(|r| {
            if r.is_deleted() {
                return false;
            }
            sessions
                .get(&r.capture_session_id)
                .and_then(|s| self.0.case_of_session(s))
                .map(|c| c == case_id)
                .unwrap_or(false)
        }))
    }

    async fn exists_live_by_booking(&self, booking_id: Uuid) -> Result<bool> {
        let recordings = self.0.recordings.lock().unwrap();
        let sessions = self.0.sessions.lock().unwrap();
        Ok(recordings.values().any(|r| {
            !r.is_deleted()
                && sessions
                    .get(&r.capture_session_id)
                    .map(|s| s.booking_id == booking_id)
                    .unwrap_or(false)
        }))
    }

    async fn count_by_parent_recording(&self, parent_id: Uuid) -> Result<i64> {
        Ok(self
            .0
            .recordings
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.parent_recording_id == Some(parent_id))
            .count() as i64)
    }

    async fn find_all_live_by_capture_session(
        &self,
        capture_session_id: Uuid,
    ) -> Result<Vec<Recording>> {
        Ok(self
            .0
            .recordings
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.capture_session_id == capture_session_id && !r.is_deleted())
            .cloned()
            .collect())
    }

    async fn mark_all_deleted_by_capture_session(
        &self,
        capture_session_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let mut touched = 0;
        for recording in self.0.recordings.lock().unwrap().values_mut() {
            if recording.capture_session_id == capture_session_id && !recording.is_deleted() {
                recording.deleted_at = Some(at);
                recording.deleted_via_cascade = true;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>, via_cascade: bool) -> Result<()> {
        if let Some(recording) = self.0.recordings.lock().unwrap().get_mut(&id) {
            if recording.deleted_at.is_none() {
                recording.deleted_at = Some(at);
                recording.deleted_via_cascade = via_cascade;
            }
        }
        Ok(())
    }

    async fn undelete(&self, id: Uuid) -> Result<()> {
        if let Some(recording) = self.0.recordings.lock().unwrap().get_mut(&id) {
            recording.deleted_at = None;
            recording.deleted_via_cascade = false;
        }
        Ok(())
    }
}

pub struct InMemoryShareBookingRepository(pub Arc<InMemoryStore>);

#[async_trait]
impl ShareBookingRepository for InMemoryShareBookingRepository {
    async fn save(&self, share: &ShareBooking) -> Result<()> {
        self.0.insert_share(share.clone());
        Ok(())
    }

    async fn find_all_live_by_booking(&self, booking_id: Uuid) -> Result<Vec<ShareBooking>> {
        Ok(self
            .0
            .shares
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.booking_id == booking_id && !s.is_deleted())
            .cloned()
            .collect())
    }

    async fn mark_all_deleted_by_booking(
        &self,
        booking_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let mut touched = 0;
        for share in self.0.shares.lock().unwrap().values_mut() {
            if share.booking_id == booking_id && !share.is_deleted() {
                share.deleted_at = Some(at);
                share.deleted_via_cascade = true;
                touched += 1;
            }
        }
        Ok(touched)
    }
}

pub struct InMemoryEncodeJobRepository(pub Arc<InMemoryStore>);

#[async_trait]
impl EncodeJobRepository for InMemoryEncodeJobRepository {
    async fn find_all(&self) -> Result<Vec<EncodeJob>> {
        let mut jobs: Vec<EncodeJob> = self.0.jobs.lock().unwrap().values().cloned().collect();
        jobs.sort_by_key(|j| j.created_at);
        Ok(jobs)
    }

    async fn find_any(&self, id: Uuid) -> Result<Option<EncodeJob>> {
        Ok(self.0.job(id))
    }

    async fn find_all_by_capture_session(
        &self,
        capture_session_id: Uuid,
    ) -> Result<Vec<EncodeJob>> {
        let mut jobs: Vec<EncodeJob> = self
            .0
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|j| j.capture_session_id == capture_session_id)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.created_at);
        Ok(jobs)
    }

    async fn save(&self, job: &EncodeJob) -> Result<()> {
        self.0.insert_job(job.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.0.jobs.lock().unwrap().remove(&id).is_some())
    }
}

// ========================================
// Gateway fakes
// ========================================

/// Final storage stub: either every recording exists, or none do
pub struct StubFinalStorage {
    available: bool,
}

impl StubFinalStorage {
    pub fn with_recording() -> Self {
        Self { available: true }
    }

    pub fn empty() -> Self {
        Self { available: false }
    }
}

#[async_trait]
impl FinalStorage for StubFinalStorage {
    async fn does_container_exist(&self, _container_name: &str) -> Result<bool> {
        Ok(self.available)
    }

    async fn does_blob_exist(&self, _container_name: &str, _blob_name: &str) -> Result<bool> {
        Ok(self.available)
    }

    async fn get_mp4_file_name(&self, container_name: &str) -> Result<String> {
        if self.available {
            Ok("index.mp4".to_string())
        } else {
            Err(AppError::NotFound(format!(
                "Mp4 file in container {container_name}"
            )))
        }
    }

    async fn get_recording_duration(&self, _recording_id: Uuid) -> Option<i64> {
        if self.available {
            Some(300)
        } else {
            None
        }
    }

    async fn generate_read_sas_url(
        &self,
        container_name: &str,
        blob_name: &str,
    ) -> Result<String> {
        if self.available {
            Ok(format!("https://final.test/{container_name}/{blob_name}"))
        } else {
            Err(AppError::NotFound(format!(
                "Blob in container {container_name}"
            )))
        }
    }
}

/// Ingest storage fake with explicit container/blob/section state
#[derive(Default)]
pub struct FakeIngestStorage {
    pub containers: Mutex<HashSet<String>>,
    pub blobs: Mutex<HashSet<(String, String)>>,
    pub section_containers: Mutex<HashSet<String>>,
    pub safe_to_delete: Mutex<Vec<String>>,
}

impl FakeIngestStorage {
    pub fn add_container(&self, name: &str) {
        self.containers.lock().unwrap().insert(name.to_string());
    }

    pub fn add_blob(&self, container: &str, blob: &str) {
        self.add_container(container);
        self.blobs
            .lock()
            .unwrap()
            .insert((container.to_string(), blob.to_string()));
    }

    pub fn add_section_marker(&self, container: &str) {
        self.add_container(container);
        self.section_containers
            .lock()
            .unwrap()
            .insert(container.to_string());
    }

    pub fn marked_safe(&self) -> Vec<String> {
        self.safe_to_delete.lock().unwrap().clone()
    }
}

#[async_trait]
impl IngestStorage for FakeIngestStorage {
    async fn does_container_exist(&self, container_name: &str) -> Result<bool> {
        Ok(self.containers.lock().unwrap().contains(container_name))
    }

    async fn does_blob_exist(&self, container_name: &str, blob_name: &str) -> Result<bool> {
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .contains(&(container_name.to_string(), blob_name.to_string())))
    }

    async fn section_file_exist(&self, container_name: &str) -> Result<bool> {
        Ok(self
            .section_containers
            .lock()
            .unwrap()
            .contains(container_name))
    }

    async fn mark_container_as_safe_to_delete(&self, container_name: &str) -> Result<()> {
        self.safe_to_delete
            .lock()
            .unwrap()
            .push(container_name.to_string());
        Ok(())
    }
}

/// Scripted media gateway fake
#[derive(Default)]
pub struct FakeMediaGateway {
    /// Sessions start_live_event was called for
    pub started: Mutex<Vec<Uuid>>,
    /// Sessions whose live-event start should fail
    pub fail_start_for: Mutex<HashSet<Uuid>>,
    /// When set, every live-event start fails
    pub fail_all_starts: std::sync::atomic::AtomicBool,
    /// Live events visible to get_live_event, keyed by event name
    pub live_events: Mutex<HashMap<String, LiveEvent>>,
    /// When non-empty, successive get_live_events calls pop these snapshots
    pub live_event_snapshots: Mutex<VecDeque<Vec<LiveEvent>>>,
    /// Job completion status by job name
    pub job_statuses: Mutex<HashMap<String, RecordingStatus>>,
    /// Job names whose status check should error out
    pub erroring_jobs: Mutex<HashSet<String>>,
    /// Output assets by job name
    pub job_outputs: Mutex<HashMap<String, Vec<OutputAsset>>>,
    /// Step-1 job name by capture session id; absent means "nothing ingested"
    pub step1_jobs: Mutex<HashMap<Uuid, String>>,
    /// Step-2 job name by recording id; absent means "no recording to chain"
    pub step2_jobs: Mutex<HashMap<Uuid, String>>,
    /// Recording ids step-2 was asked for
    pub step2_calls: Mutex<Vec<Uuid>>,
    /// Final-asset verification results by recording id; absent means FAILURE
    pub final_assets: Mutex<HashMap<Uuid, RecordingStatus>>,
}

impl FakeMediaGateway {
    pub fn set_job_status(&self, job_name: &str, status: RecordingStatus) {
        self.job_statuses
            .lock()
            .unwrap()
            .insert(job_name.to_string(), status);
    }

    pub fn set_final_asset(&self, recording_id: Uuid, status: RecordingStatus) {
        self.final_assets
            .lock()
            .unwrap()
            .insert(recording_id, status);
    }

    pub fn push_live_event_snapshot(&self, events: Vec<LiveEvent>) {
        self.live_event_snapshots.lock().unwrap().push_back(events);
    }

    pub fn started_sessions(&self) -> Vec<Uuid> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaGateway for FakeMediaGateway {
    async fn start_live_event(&self, session: &CaptureSession) -> Result<()> {
        self.started.lock().unwrap().push(session.id);
        if self.fail_all_starts.load(std::sync::atomic::Ordering::SeqCst)
            || self.fail_start_for.lock().unwrap().contains(&session.id)
        {
            return Err(AppError::Gateway("live event refused".to_string()));
        }
        Ok(())
    }

    async fn get_live_event(&self, name: &str) -> Result<Option<LiveEvent>> {
        Ok(self.live_events.lock().unwrap().get(name).cloned())
    }

    async fn get_live_events(&self) -> Result<Vec<LiveEvent>> {
        if let Some(snapshot) = self.live_event_snapshots.lock().unwrap().pop_front() {
            return Ok(snapshot);
        }
        Ok(self.live_events.lock().unwrap().values().cloned().collect())
    }

    async fn has_job_completed(
        &self,
        _transform: EncodeTransform,
        job_name: &str,
    ) -> Result<RecordingStatus> {
        if self.erroring_jobs.lock().unwrap().contains(job_name) {
            return Err(AppError::Gateway(format!("job {job_name} unreachable")));
        }
        self.job_statuses
            .lock()
            .unwrap()
            .get(job_name)
            .copied()
            .ok_or_else(|| AppError::NotFound(format!("Job: {job_name}")))
    }

    async fn get_job_output_assets(
        &self,
        _transform: EncodeTransform,
        job_name: &str,
    ) -> Result<Vec<OutputAsset>> {
        Ok(self
            .job_outputs
            .lock()
            .unwrap()
            .get(job_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn trigger_processing_step1(
        &self,
        capture_session_id: Uuid,
        _recording_id: Uuid,
    ) -> Result<Option<String>> {
        Ok(self
            .step1_jobs
            .lock()
            .unwrap()
            .get(&capture_session_id)
            .cloned())
    }

    async fn trigger_processing_step2(
        &self,
        recording_id: Uuid,
        _force: bool,
    ) -> Result<Option<String>> {
        self.step2_calls.lock().unwrap().push(recording_id);
        Ok(self.step2_jobs.lock().unwrap().get(&recording_id).cloned())
    }

    async fn verify_final_asset_exists(&self, recording_id: Uuid) -> Result<RecordingStatus> {
        Ok(self
            .final_assets
            .lock()
            .unwrap()
            .get(&recording_id)
            .copied()
            .unwrap_or(RecordingStatus::Failure))
    }
}
