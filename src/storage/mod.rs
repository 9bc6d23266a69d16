/// Blob storage gateway boundaries
///
/// Ingest storage receives the raw live feed; final storage holds the
/// playable recordings. Both are consumed through traits so the
/// orchestration layer never depends on a concrete storage account.
use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

pub mod azure;

pub use azure::{AzureFinalStorage, AzureIngestStorage};

#[async_trait]
pub trait IngestStorage: Send + Sync {
    async fn does_container_exist(&self, container_name: &str) -> Result<bool>;

    async fn does_blob_exist(&self, container_name: &str, blob_name: &str) -> Result<bool>;

    /// Whether the ingest wrote a completion "section" marker, i.e. the
    /// live event actually received segmented content
    async fn section_file_exist(&self, container_name: &str) -> Result<bool>;

    /// Flag the container for the storage lifecycle sweeper; contents are
    /// no longer needed once the final asset is in durable storage
    async fn mark_container_as_safe_to_delete(&self, container_name: &str) -> Result<()>;
}

#[async_trait]
pub trait FinalStorage: Send + Sync {
    async fn does_container_exist(&self, container_name: &str) -> Result<bool>;

    async fn does_blob_exist(&self, container_name: &str, blob_name: &str) -> Result<bool>;

    /// Name of the playable mp4 in the recording's container; NotFound when
    /// the container holds none
    async fn get_mp4_file_name(&self, container_name: &str) -> Result<String>;

    /// Duration in seconds read from the recording's manifest, when present
    async fn get_recording_duration(&self, recording_id: Uuid) -> Option<i64>;

    /// Time-limited read URL for a blob; NotFound when the blob is missing
    async fn generate_read_sas_url(&self, container_name: &str, blob_name: &str)
        -> Result<String>;
}
