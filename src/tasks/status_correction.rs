/// Capture session status correction task
///
/// Sessions can be left in FAILURE by an earlier partial failure even
/// though their live event never received any content. This task inspects
/// the ingest container of each recently failed session: no section marker
/// means the session was never used, so its status is corrected to
/// NO_RECORDING through the normal stop path. Sessions under a case that
/// is closed or pending closure are left untouched.
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::db::{BookingRepository, CaseRepository};
use crate::error::Result;
use crate::models::{CaptureSession, CaseState, RecordingStatus};
use crate::services::CaptureSessionService;
use crate::storage::IngestStorage;

pub struct CaptureSessionStatusCorrectionTask {
    capture_sessions: Arc<CaptureSessionService>,
    bookings: Arc<dyn BookingRepository>,
    cases: Arc<dyn CaseRepository>,
    ingest_storage: Arc<dyn IngestStorage>,
    window_start: NaiveDate,
}

impl CaptureSessionStatusCorrectionTask {
    pub fn new(
        capture_sessions: Arc<CaptureSessionService>,
        bookings: Arc<dyn BookingRepository>,
        cases: Arc<dyn CaseRepository>,
        ingest_storage: Arc<dyn IngestStorage>,
        window_start: NaiveDate,
    ) -> Self {
        Self {
            capture_sessions,
            bookings,
            cases,
            ingest_storage,
            window_start,
        }
    }

    pub async fn run(&self) -> Result<()> {
        info!("Starting capture session status correction task");

        let from = self
            .window_start
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time")
            .and_utc();
        let failed = self
            .capture_sessions
            .find_failed_sessions_started_between(from, Utc::now())
            .await?;

        let mut corrected = 0usize;
        let mut errored = 0usize;
        for session in &failed {
            match self.correct_if_unused(session).await {
                Ok(true) => corrected += 1,
                Ok(false) => {}
                Err(err) => {
                    errored += 1;
                    error!(capture_session = %session.id, "Failed to correct status: {err}");
                }
            }
        }

        info!(
            checked = failed.len(),
            corrected, errored, "Correction task completed"
        );
        Ok(())
    }

    /// Returns whether the session was corrected
    async fn correct_if_unused(&self, session: &CaptureSession) -> Result<bool> {
        let Some(booking) = self.bookings.find_any(session.booking_id).await? else {
            warn!(capture_session = %session.id, "Session has no booking, skipping");
            return Ok(false);
        };

        // Recordings of closed cases are frozen; leave their sessions alone
        if let Some(case) = self.cases.find_any(booking.case_id).await? {
            if matches!(
                case.get_state(),
                CaseState::PendingClosure | CaseState::Closed
            ) {
                return Ok(false);
            }
        }

        // A section marker means the ingest received content and the
        // session genuinely failed mid-flight
        if self
            .ingest_storage
            .section_file_exist(&booking.id.to_string())
            .await?
        {
            return Ok(false);
        }

        self.capture_sessions
            .stop_capture_session(session.id, RecordingStatus::NoRecording, None)
            .await?;
        info!(capture_session = %session.id, "Corrected unused session to NO_RECORDING");
        Ok(true)
    }
}
