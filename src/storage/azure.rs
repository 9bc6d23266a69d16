/// Azure Blob Storage adapters
///
/// Thin REST clients over the blob endpoints. The list API returns XML; blob
/// names are pulled out with a small scanner rather than a full XML parser,
/// since `<Name>` elements are the only thing consumed here.
use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use crate::storage::{FinalStorage, IngestStorage};

/// Blob names containing this fragment mark a completed ingest section
const SECTION_FILE_MARKER: &str = "section";

#[derive(Clone)]
struct BlobStoreClient {
    config: StorageConfig,
    http_client: reqwest::Client,
}

impl BlobStoreClient {
    fn new(config: StorageConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Gateway(format!("HTTP client error: {e}")))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn container_url(&self, container_name: &str, query: &str) -> String {
        format!(
            "{}/{}?{}&{}",
            self.config.endpoint.trim_end_matches('/'),
            container_name,
            query,
            self.config.sas_token
        )
    }

    fn blob_url(&self, container_name: &str, blob_name: &str) -> String {
        format!(
            "{}/{}/{}?{}",
            self.config.endpoint.trim_end_matches('/'),
            container_name,
            blob_name,
            self.config.sas_token
        )
    }

    async fn container_exists(&self, container_name: &str) -> Result<bool> {
        let response = self
            .http_client
            .get(self.container_url(container_name, "restype=container"))
            .send()
            .await?;

        Ok(response.status().is_success())
    }

    async fn blob_exists(&self, container_name: &str, blob_name: &str) -> Result<bool> {
        let response = self
            .http_client
            .head(self.blob_url(container_name, blob_name))
            .send()
            .await?;

        Ok(response.status().is_success())
    }

    async fn list_blob_names(&self, container_name: &str) -> Result<Vec<String>> {
        let response = self
            .http_client
            .get(self.container_url(container_name, "restype=container&comp=list"))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "Failed to list container {container_name}: {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        Ok(parse_blob_names(&body))
    }

    async fn fetch_blob_text(&self, container_name: &str, blob_name: &str) -> Result<String> {
        let response = self
            .http_client
            .get(self.blob_url(container_name, blob_name))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::NotFound(format!(
                "Blob {blob_name} in container {container_name}"
            )));
        }

        Ok(response.text().await?)
    }

    async fn set_safe_to_delete(&self, container_name: &str) -> Result<()> {
        let response = self
            .http_client
            .put(self.container_url(container_name, "restype=container&comp=metadata"))
            .header("x-ms-meta-safetodelete", "true")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "Failed to mark container {container_name} safe to delete: {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Extract `<Name>` element contents from a blob-list response
fn parse_blob_names(body: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find("<Name>") {
        rest = &rest[start + "<Name>".len()..];
        if let Some(end) = rest.find("</Name>") {
            names.push(rest[..end].to_string());
            rest = &rest[end + "</Name>".len()..];
        } else {
            break;
        }
    }
    names
}

/// Parse an ISO-8601 duration (`PT1H2M3.5S`) into whole seconds
fn parse_iso8601_duration(value: &str) -> Option<i64> {
    let rest = value.strip_prefix("PT")?;
    let mut total = 0f64;
    let mut number = String::new();
    for c in rest.chars() {
        match c {
            '0'..='9' | '.' => number.push(c),
            'H' => total += number.parse::<f64>().ok()? * 3600.0,
            'M' => total += number.parse::<f64>().ok()? * 60.0,
            'S' => total += number.parse::<f64>().ok()?,
            _ => return None,
        }
        if !c.is_ascii_digit() && c != '.' {
            number.clear();
        }
    }
    Some(total.round() as i64)
}

/// Pull `mediaPresentationDuration` out of a DASH manifest
fn parse_manifest_duration(manifest: &str) -> Option<i64> {
    let start = manifest.find("mediaPresentationDuration=\"")?
        + "mediaPresentationDuration=\"".len();
    let end = manifest[start..].find('"')? + start;
    parse_iso8601_duration(&manifest[start..end])
}

pub struct AzureIngestStorage {
    client: BlobStoreClient,
}

impl AzureIngestStorage {
    pub fn new(config: StorageConfig) -> Result<Self> {
        Ok(Self {
            client: BlobStoreClient::new(config)?,
        })
    }
}

#[async_trait]
impl IngestStorage for AzureIngestStorage {
    async fn does_container_exist(&self, container_name: &str) -> Result<bool> {
        self.client.container_exists(container_name).await
    }

    async fn does_blob_exist(&self, container_name: &str, blob_name: &str) -> Result<bool> {
        self.client.blob_exists(container_name, blob_name).await
    }

    async fn section_file_exist(&self, container_name: &str) -> Result<bool> {
        let names = self.client.list_blob_names(container_name).await?;
        Ok(names.iter().any(|name| name.contains(SECTION_FILE_MARKER)))
    }

    async fn mark_container_as_safe_to_delete(&self, container_name: &str) -> Result<()> {
        self.client.set_safe_to_delete(container_name).await
    }
}

pub struct AzureFinalStorage {
    client: BlobStoreClient,
}

impl AzureFinalStorage {
    pub fn new(config: StorageConfig) -> Result<Self> {
        Ok(Self {
            client: BlobStoreClient::new(config)?,
        })
    }
}

#[async_trait]
impl FinalStorage for AzureFinalStorage {
    async fn does_container_exist(&self, container_name: &str) -> Result<bool> {
        self.client.container_exists(container_name).await
    }

    async fn does_blob_exist(&self, container_name: &str, blob_name: &str) -> Result<bool> {
        self.client.blob_exists(container_name, blob_name).await
    }

    async fn get_mp4_file_name(&self, container_name: &str) -> Result<String> {
        let names = self.client.list_blob_names(container_name).await?;
        names
            .into_iter()
            .find(|name| name.ends_with(".mp4"))
            .ok_or_else(|| AppError::NotFound(format!("Mp4 file in container {container_name}")))
    }

    async fn get_recording_duration(&self, recording_id: Uuid) -> Option<i64> {
        let container_name = recording_id.to_string();

        let names = match self.client.list_blob_names(&container_name).await {
            Ok(names) => names,
            Err(err) => {
                warn!(recording_id = %recording_id, "Failed to list recording container: {err}");
                return None;
            }
        };

        let manifest_name = names.into_iter().find(|name| name.ends_with(".mpd"))?;
        match self
            .client
            .fetch_blob_text(&container_name, &manifest_name)
            .await
        {
            Ok(manifest) => parse_manifest_duration(&manifest),
            Err(err) => {
                warn!(recording_id = %recording_id, "Failed to read recording manifest: {err}");
                None
            }
        }
    }

    async fn generate_read_sas_url(
        &self,
        container_name: &str,
        blob_name: &str,
    ) -> Result<String> {
        if !self.client.blob_exists(container_name, blob_name).await? {
            return Err(AppError::NotFound(format!(
                "Blob in container {container_name}"
            )));
        }

        Ok(self.client.blob_url(container_name, blob_name))
    }
}
