/// Capture Service - batch task runner
///
/// Each invocation runs exactly one orchestration task against the shared
/// database and gateways, cron-style.
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use capture_service::db::{
    BookingRepository, CaptureSessionRepository, CaseRepository, EncodeJobRepository,
    PgBookingRepository, PgCaptureSessionRepository, PgCaseRepository, PgEncodeJobRepository,
    PgRecordingRepository, RecordingRepository,
};
use capture_service::media::{MediaGateway, MediaKindClient};
use capture_service::security::{AccessPolicy, RobotAccessPolicy};
use capture_service::services::{
    CaptureSessionService, EncodeJobService, ProcessingService, RegistrationService,
};
use capture_service::storage::{AzureFinalStorage, AzureIngestStorage, FinalStorage, IngestStorage};
use capture_service::tasks::{
    CaptureSessionStatusCorrectionTask, ProcessCaptureSessionsTask, StartLiveEventsTask,
};
use capture_service::Config;

#[derive(Parser)]
#[command(name = "capture-service", about = "Capture session lifecycle tasks")]
struct Cli {
    #[command(subcommand)]
    task: Task,
}

#[derive(Subcommand)]
enum Task {
    /// Create capture sessions for today's bookings and start live events
    StartLiveEvents,
    /// Poll in-flight encode jobs, chain the transcode pipeline and apply
    /// the processing timeout
    ProcessCaptureSessions,
    /// Correct FAILURE sessions whose ingest never received content
    CorrectCaptureSessionStatuses,
    /// Move a session into PROCESSING and persist its first encode job
    StartProcessing { capture_session_id: Uuid },
    /// Synchronously register a finished session's recording
    Register { capture_session_id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let cases: Arc<dyn CaseRepository> = Arc::new(PgCaseRepository::new(pool.clone()));
    let bookings: Arc<dyn BookingRepository> = Arc::new(PgBookingRepository::new(pool.clone()));
    let sessions: Arc<dyn CaptureSessionRepository> =
        Arc::new(PgCaptureSessionRepository::new(pool.clone()));
    let recordings: Arc<dyn RecordingRepository> =
        Arc::new(PgRecordingRepository::new(pool.clone()));
    let encode_jobs_repo: Arc<dyn EncodeJobRepository> =
        Arc::new(PgEncodeJobRepository::new(pool.clone()));

    let ingest_storage: Arc<dyn IngestStorage> =
        Arc::new(AzureIngestStorage::new(config.ingest_storage.clone())?);
    let final_storage: Arc<dyn FinalStorage> =
        Arc::new(AzureFinalStorage::new(config.final_storage.clone())?);
    let media: Arc<dyn MediaGateway> = Arc::new(MediaKindClient::new(
        config.media_kind.clone(),
        ingest_storage.clone(),
        final_storage.clone(),
    )?);
    let policy: Arc<dyn AccessPolicy> = Arc::new(RobotAccessPolicy);

    let capture_sessions = Arc::new(CaptureSessionService::new(
        sessions.clone(),
        bookings.clone(),
        recordings.clone(),
        final_storage.clone(),
        policy.clone(),
    ));
    let encode_jobs = Arc::new(EncodeJobService::new(encode_jobs_repo, sessions.clone()));
    let processing = Arc::new(ProcessingService::new(
        capture_sessions.clone(),
        encode_jobs,
        media.clone(),
        ingest_storage.clone(),
        config.tasks.processing_timeout,
    ));

    match cli.task {
        Task::StartLiveEvents => {
            let cancel = CancellationToken::new();
            let cancel_on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel_on_signal.cancel();
                }
            });
            StartLiveEventsTask::new(
                bookings,
                sessions,
                capture_sessions,
                media,
                config.tasks.batch_size,
                config.tasks.poll_interval,
                cancel,
            )
            .run()
            .await?;
        }
        Task::ProcessCaptureSessions => {
            ProcessCaptureSessionsTask::new(processing).run().await?;
        }
        Task::CorrectCaptureSessionStatuses => {
            CaptureSessionStatusCorrectionTask::new(
                capture_sessions,
                bookings,
                cases,
                ingest_storage,
                config.tasks.correction_window_start,
            )
            .run()
            .await?;
        }
        Task::StartProcessing { capture_session_id } => {
            processing.start_processing(capture_session_id).await?;
        }
        Task::Register { capture_session_id } => {
            RegistrationService::new(capture_sessions, media, ingest_storage)
                .register(capture_session_id)
                .await?;
        }
    }

    Ok(())
}
