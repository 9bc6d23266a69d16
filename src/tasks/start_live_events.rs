/// Live event orchestrator
///
/// For every booking scheduled today that has no capture session yet:
/// create one, start a live ingest endpoint, and wait until the platform
/// reports a usable ingest address. Live events are started in fixed-size
/// batches so a single slow batch cannot hold up unrelated ones, and the
/// gateway is never hit with an unbounded burst of starts.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::{BookingRepository, CaptureSessionRepository};
use crate::error::Result;
use crate::media::{sanitised_live_event_id, MediaGateway};
use crate::models::{CreateCaptureSession, RecordingStatus};
use crate::services::CaptureSessionService;

pub struct StartLiveEventsTask {
    bookings: Arc<dyn BookingRepository>,
    sessions: Arc<dyn CaptureSessionRepository>,
    capture_sessions: Arc<CaptureSessionService>,
    media: Arc<dyn MediaGateway>,
    batch_size: usize,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl StartLiveEventsTask {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        sessions: Arc<dyn CaptureSessionRepository>,
        capture_sessions: Arc<CaptureSessionService>,
        media: Arc<dyn MediaGateway>,
        batch_size: usize,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            bookings,
            sessions,
            capture_sessions,
            media,
            batch_size: batch_size.max(1),
            poll_interval,
            cancel,
        }
    }

    pub async fn run(&self) -> Result<()> {
        info!("Running start live events task");

        let today = chrono::Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time")
            .and_utc();
        let tomorrow = today + chrono::Duration::days(1);

        let mut session_ids = Vec::new();
        for booking in self.bookings.find_scheduled_between(today, tomorrow).await? {
            if self.sessions.exists_live_by_booking(booking.id).await? {
                continue;
            }
            match self.init_capture_session(booking.id).await {
                Ok(id) => session_ids.push(id),
                Err(err) => {
                    // The booking is excluded from this run; the batch goes on
                    error!(booking = %booking.id, "Failed to create capture session: {err}");
                }
            }
        }

        for batch in session_ids.chunks(self.batch_size) {
            let waiting = self.start_batch(batch).await;
            self.await_batch(waiting).await;
        }

        info!(
            sessions = session_ids.len(),
            "Finished start live events task"
        );
        Ok(())
    }

    async fn init_capture_session(&self, booking_id: Uuid) -> Result<Uuid> {
        info!(booking = %booking_id, "Creating capture session");
        let dto = CreateCaptureSession::new(Uuid::new_v4(), booking_id);
        let id = dto.id;
        self.capture_sessions.upsert(dto).await?;
        Ok(id)
    }

    /// Start a live event per session; sessions whose start failed are
    /// marked FAILURE and excluded from the await phase
    async fn start_batch(&self, batch: &[Uuid]) -> HashMap<String, Uuid> {
        let mut waiting = HashMap::new();

        for &session_id in batch {
            match self.start_live_event(session_id).await {
                Ok(()) => {
                    waiting.insert(sanitised_live_event_id(session_id), session_id);
                }
                Err(err) => {
                    error!(capture_session = %session_id, "Failed to start live event: {err}");
                    self.fail_session(session_id).await;
                }
            }
        }

        waiting
    }

    async fn start_live_event(&self, session_id: Uuid) -> Result<()> {
        info!(capture_session = %session_id, "Starting live event");
        let session = self.capture_sessions.find_by_id(session_id).await?;
        self.media.start_live_event(&session).await?;
        self.capture_sessions
            .start_capture_session(session_id, RecordingStatus::Initialising, None)
            .await?;
        Ok(())
    }

    /// Poll until every session in the batch has an ingest address. The
    /// cancellation signal is only observed here, at the poll boundary,
    /// and converts whatever is still waiting to FAILURE.
    async fn await_batch(&self, mut waiting: HashMap<String, Uuid>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !waiting.is_empty() {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    warn!("Cancelled while awaiting ingest addresses");
                    self.fail_waiting(&waiting).await;
                    return;
                }
                _ = ticker.tick() => {
                    let events = match self.media.get_live_events().await {
                        Ok(events) => events,
                        Err(err) => {
                            error!("Failed to list live events: {err}");
                            self.fail_waiting(&waiting).await;
                            return;
                        }
                    };

                    let mut ready = Vec::new();
                    for event in &events {
                        if let Some(&session_id) = waiting.get(&event.name) {
                            if let Some(address) = event.ready_ingest_address() {
                                ready.push((event.name.clone(), session_id, address.to_string()));
                            }
                        }
                    }

                    for (event_name, session_id, address) in ready {
                        info!(capture_session = %session_id, "Ingest address found");
                        match self
                            .capture_sessions
                            .start_capture_session(
                                session_id,
                                RecordingStatus::Standby,
                                Some(&address),
                            )
                            .await
                        {
                            Ok(_) => {
                                waiting.remove(&event_name);
                            }
                            Err(err) => {
                                error!(capture_session = %session_id, "Failed to move session to STANDBY: {err}");
                                self.fail_session(session_id).await;
                                waiting.remove(&event_name);
                            }
                        }
                    }
                }
            }
        }
    }

    async fn fail_waiting(&self, waiting: &HashMap<String, Uuid>) {
        for &session_id in waiting.values() {
            self.fail_session(session_id).await;
        }
    }

    async fn fail_session(&self, session_id: Uuid) {
        if let Err(err) = self
            .capture_sessions
            .start_capture_session(session_id, RecordingStatus::Failure, None)
            .await
        {
            error!(capture_session = %session_id, "Failed to mark session FAILURE: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{LiveEvent, LiveEventState};
    use crate::security::RobotAccessPolicy;
    use crate::testing::{
        booking, capture_session_for, FakeMediaGateway, InMemoryBookingRepository,
        InMemoryCaptureSessionRepository, InMemoryRecordingRepository, InMemoryStore,
        StubFinalStorage,
    };
    use crate::models::{Booking, CaptureSession};

    struct Fixture {
        store: Arc<InMemoryStore>,
        media: Arc<FakeMediaGateway>,
        cancel: CancellationToken,
        task: StartLiveEventsTask,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::default());
        let media = Arc::new(FakeMediaGateway::default());
        let cancel = CancellationToken::new();
        let capture_sessions = Arc::new(CaptureSessionService::new(
            Arc::new(InMemoryCaptureSessionRepository(store.clone())),
            Arc::new(InMemoryBookingRepository(store.clone())),
            Arc::new(InMemoryRecordingRepository(store.clone())),
            Arc::new(StubFinalStorage::with_recording()),
            Arc::new(RobotAccessPolicy),
        ));
        let task = StartLiveEventsTask::new(
            Arc::new(InMemoryBookingRepository(store.clone())),
            Arc::new(InMemoryCaptureSessionRepository(store.clone())),
            capture_sessions,
            media.clone(),
            2,
            Duration::from_millis(1),
            cancel.clone(),
        );
        Fixture {
            store,
            media,
            cancel,
            task,
        }
    }

    fn todays_booking(f: &Fixture) -> Booking {
        let b = booking();
        f.store.insert_booking(b.clone());
        b
    }

    fn single_session(f: &Fixture, booking_id: Uuid) -> CaptureSession {
        let sessions = f.store.sessions_for_booking(booking_id);
        assert_eq!(sessions.len(), 1);
        sessions.into_iter().next().unwrap()
    }

    fn running_event(name: &str) -> LiveEvent {
        LiveEvent {
            name: name.to_string(),
            state: LiveEventState::Running,
            ingest_rtmp: Some("rtmp://ingest.test/live".to_string()),
        }
    }

    fn starting_event(name: &str) -> LiveEvent {
        LiveEvent {
            name: name.to_string(),
            state: LiveEventState::Starting,
            ingest_rtmp: None,
        }
    }

    #[tokio::test]
    async fn creates_session_and_polls_until_standby() {
        let f = fixture();
        let b = todays_booking(&f);

        // The live event name derives from a session id the task generates,
        // so a feeder publishes the running event once the start is observed
        let media = f.media.clone();
        let store = f.store.clone();
        let booking_id = b.id;
        let feeder = tokio::spawn(async move {
            for _ in 0..1000 {
                if let Some(session) = store.sessions_for_booking(booking_id).first() {
                    if !media.started_sessions().is_empty() {
                        let name = sanitised_live_event_id(session.id);
                        media
                            .live_events
                            .lock()
                            .unwrap()
                            .insert(name.clone(), running_event(&name));
                        return;
                    }
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            panic!("task never started a live event");
        });

        f.task.run().await.unwrap();
        feeder.await.unwrap();

        let session = single_session(&f, b.id);
        assert_eq!(session.get_status(), RecordingStatus::Standby);
        assert_eq!(
            session.ingest_address.as_deref(),
            Some("rtmp://ingest.test/live")
        );
        assert_eq!(f.media.started_sessions().len(), 1);
    }

    #[tokio::test]
    async fn booking_with_existing_session_is_skipped() {
        let f = fixture();
        let b = todays_booking(&f);
        f.store
            .insert_session(capture_session_for(b.id, RecordingStatus::Standby));

        f.task.run().await.unwrap();

        assert_eq!(f.store.sessions_for_booking(b.id).len(), 1);
        assert!(f.media.started_sessions().is_empty());
    }

    #[tokio::test]
    async fn failed_live_event_start_marks_session_failure() {
        let f = fixture();
        let b = todays_booking(&f);
        f.media
            .fail_all_starts
            .store(true, std::sync::atomic::Ordering::SeqCst);

        f.task.run().await.unwrap();

        let session = single_session(&f, b.id);
        assert_eq!(session.get_status(), RecordingStatus::Failure);
        assert_eq!(f.media.started_sessions().len(), 1);
    }

    #[tokio::test]
    async fn cancellation_fails_still_waiting_sessions() {
        let f = fixture();
        let b = todays_booking(&f);
        // Never produce a running event, so the await phase can only end
        // through cancellation
        f.cancel.cancel();

        f.task.run().await.unwrap();

        let session = single_session(&f, b.id);
        assert_eq!(session.get_status(), RecordingStatus::Failure);
    }

    #[tokio::test]
    async fn still_starting_event_keeps_session_waiting_until_running() {
        let f = fixture();
        let b = todays_booking(&f);

        let media = f.media.clone();
        let store = f.store.clone();
        let booking_id = b.id;
        let feeder = tokio::spawn(async move {
            for _ in 0..1000 {
                if let Some(session) = store.sessions_for_booking(booking_id).first() {
                    let name = sanitised_live_event_id(session.id);
                    media.push_live_event_snapshot(vec![starting_event(&name)]);
                    media.push_live_event_snapshot(vec![starting_event(&name)]);
                    media
                        .live_events
                        .lock()
                        .unwrap()
                        .insert(name.clone(), running_event(&name));
                    return;
                }
                tokio::time::sleep(Duration::from_micros(100)).await;
            }
        });

        f.task.run().await.unwrap();
        feeder.await.unwrap();

        let session = single_session(&f, b.id);
        assert_eq!(session.get_status(), RecordingStatus::Standby);
    }
}
