/// Encode job tracking task
///
/// Thin cron entry point around the processing service: one pass over all
/// in-flight encode jobs, then a summary.
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::services::ProcessingService;

pub struct ProcessCaptureSessionsTask {
    processing: Arc<ProcessingService>,
}

impl ProcessCaptureSessionsTask {
    pub fn new(processing: Arc<ProcessingService>) -> Self {
        Self { processing }
    }

    pub async fn run(&self) -> Result<()> {
        info!("Starting process capture sessions task");
        let summary = self.processing.process_all_capture_sessions().await?;
        info!(
            checked = summary.checked,
            timed_out = summary.timed_out,
            "Finished process capture sessions task"
        );
        Ok(())
    }
}
