/// MediaKind API client
///
/// REST adapter for the media-processing platform: live event control,
/// transcode job status and chaining, final asset verification.
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::MediaKindConfig;
use crate::error::{AppError, Result};
use crate::media::{
    job_state_to_status, sanitised_live_event_id, transform_name, LiveEvent, LiveEventState,
    MediaGateway, OutputAsset,
};
use crate::models::{CaptureSession, EncodeTransform, RecordingStatus};
use crate::storage::{FinalStorage, IngestStorage};

pub struct MediaKindClient {
    config: MediaKindConfig,
    http_client: reqwest::Client,
    ingest_storage: Arc<dyn IngestStorage>,
    final_storage: Arc<dyn FinalStorage>,
}

#[derive(Deserialize)]
struct MkListResponse<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Deserialize)]
struct MkLiveEvent {
    name: String,
    properties: MkLiveEventProperties,
}

#[derive(Deserialize)]
struct MkLiveEventProperties {
    #[serde(rename = "resourceState", default)]
    resource_state: String,
    #[serde(default)]
    input: Option<MkLiveEventInput>,
}

#[derive(Deserialize)]
struct MkLiveEventInput {
    #[serde(default = "Vec::new")]
    endpoints: Vec<MkInputEndpoint>,
}

#[derive(Deserialize)]
struct MkInputEndpoint {
    #[serde(default)]
    protocol: String,
    #[serde(default)]
    url: String,
}

#[derive(Deserialize)]
struct MkJob {
    properties: MkJobProperties,
}

#[derive(Deserialize)]
struct MkJobProperties {
    #[serde(default)]
    state: String,
    #[serde(default = "Vec::new")]
    outputs: Vec<MkJobOutput>,
}

#[derive(Deserialize)]
struct MkJobOutput {
    #[serde(rename = "assetName", default)]
    asset_name: String,
}

impl MediaKindClient {
    pub fn new(
        config: MediaKindConfig,
        ingest_storage: Arc<dyn IngestStorage>,
        final_storage: Arc<dyn FinalStorage>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Gateway(format!("HTTP client error: {e}")))?;

        Ok(Self {
            config,
            http_client,
            ingest_storage,
            final_storage,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/api/ams/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.subscription,
            path
        )
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .get(self.url(path))
            .header("x-mkio-token", &self.config.token)
            .send()
            .await?;

        Ok(response)
    }

    async fn put_json(&self, path: &str, body: serde_json::Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .put(self.url(path))
            .header("x-mkio-token", &self.config.token)
            .json(&body)
            .send()
            .await?;

        Ok(response)
    }

    async fn post(&self, path: &str) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(self.url(path))
            .header("x-mkio-token", &self.config.token)
            .send()
            .await?;

        Ok(response)
    }

    async fn get_job(&self, transform: EncodeTransform, job_name: &str) -> Result<Option<MkJob>> {
        let response = self
            .get(&format!(
                "transforms/{}/jobs/{}",
                transform_name(transform),
                job_name
            ))
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "Failed to get job {job_name}: {}",
                response.status()
            )));
        }

        Ok(Some(response.json::<MkJob>().await?))
    }

    /// Create a transcode job whose single input is the named asset
    async fn create_job(
        &self,
        transform: EncodeTransform,
        job_name: &str,
        input_asset: &str,
        output_asset: &str,
    ) -> Result<()> {
        let body = serde_json::json!({
            "properties": {
                "input": { "@odata.type": "#Microsoft.Media.JobInputAsset", "assetName": input_asset },
                "outputs": [{ "@odata.type": "#Microsoft.Media.JobOutputAsset", "assetName": output_asset }]
            }
        });

        let response = self
            .put_json(
                &format!("transforms/{}/jobs/{}", transform_name(transform), job_name),
                body,
            )
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "Failed to create {} job {job_name}: {}",
                transform_name(transform),
                response.status()
            )));
        }

        Ok(())
    }

    fn map_live_event(event: MkLiveEvent) -> LiveEvent {
        let ingest_rtmp = event
            .properties
            .input
            .iter()
            .flat_map(|input| input.endpoints.iter())
            .find(|endpoint| endpoint.protocol.eq_ignore_ascii_case("RTMP") && !endpoint.url.is_empty())
            .map(|endpoint| endpoint.url.clone());

        LiveEvent {
            name: event.name,
            state: LiveEventState::from_api(&event.properties.resource_state),
            ingest_rtmp,
        }
    }
}

#[async_trait]
impl MediaGateway for MediaKindClient {
    async fn start_live_event(&self, session: &CaptureSession) -> Result<()> {
        let name = sanitised_live_event_id(session.id);

        let body = serde_json::json!({
            "location": "uksouth",
            "properties": {
                "description": format!("Capture session for booking {}", session.booking_id),
                "input": { "streamingProtocol": "RTMP" },
                "encoding": { "encodingType": "PassthroughBasic" },
                "useStaticHostname": false
            }
        });

        let response = self.put_json(&format!("liveEvents/{name}"), body).await?;
        let status = response.status();
        if status == reqwest::StatusCode::CONFLICT {
            return Err(AppError::Conflict(format!(
                "Live event {name} already exists"
            )));
        }
        if !status.is_success() {
            return Err(AppError::Gateway(format!(
                "Failed to create live event {name}: {status}"
            )));
        }

        let response = self.post(&format!("liveEvents/{name}/start")).await?;
        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "Failed to start live event {name}: {}",
                response.status()
            )));
        }

        info!(live_event = %name, "Live event started");
        Ok(())
    }

    async fn get_live_event(&self, name: &str) -> Result<Option<LiveEvent>> {
        let response = self.get(&format!("liveEvents/{name}")).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "Failed to get live event {name}: {}",
                response.status()
            )));
        }

        let event = response.json::<MkLiveEvent>().await?;
        Ok(Some(Self::map_live_event(event)))
    }

    async fn get_live_events(&self) -> Result<Vec<LiveEvent>> {
        let response = self.get("liveEvents").await?;
        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "Failed to list live events: {}",
                response.status()
            )));
        }

        let list = response.json::<MkListResponse<MkLiveEvent>>().await?;
        Ok(list.value.into_iter().map(Self::map_live_event).collect())
    }

    async fn has_job_completed(
        &self,
        transform: EncodeTransform,
        job_name: &str,
    ) -> Result<RecordingStatus> {
        match self.get_job(transform, job_name).await? {
            Some(job) => Ok(job_state_to_status(&job.properties.state)),
            None => Err(AppError::NotFound(format!("Job: {job_name}"))),
        }
    }

    async fn get_job_output_assets(
        &self,
        transform: EncodeTransform,
        job_name: &str,
    ) -> Result<Vec<OutputAsset>> {
        let job = self
            .get_job(transform, job_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job: {job_name}")))?;

        Ok(job
            .properties
            .outputs
            .into_iter()
            .filter(|output| !output.asset_name.is_empty())
            .map(|output| OutputAsset {
                name: output.asset_name,
            })
            .collect())
    }

    async fn trigger_processing_step1(
        &self,
        capture_session_id: Uuid,
        recording_id: Uuid,
    ) -> Result<Option<String>> {
        let ingest_asset = sanitised_live_event_id(capture_session_id);

        // Nothing was pushed to the live event: no asset container to encode
        if !self
            .ingest_storage
            .does_container_exist(&ingest_asset)
            .await?
        {
            return Ok(None);
        }

        let job_name = format!("encode-ingest-{ingest_asset}");
        self.create_job(
            EncodeTransform::EncodeFromIngest,
            &job_name,
            &ingest_asset,
            &recording_id.to_string(),
        )
        .await?;

        Ok(Some(job_name))
    }

    async fn trigger_processing_step2(
        &self,
        recording_id: Uuid,
        force: bool,
    ) -> Result<Option<String>> {
        let container = recording_id.to_string();
        let mp4_blob = format!("{recording_id}.mp4");

        if !force
            && !self
                .ingest_storage
                .does_blob_exist(&container, &mp4_blob)
                .await?
        {
            return Ok(None);
        }

        let job_name = format!("encode-mp4-{}", sanitised_live_event_id(recording_id));
        self.create_job(
            EncodeTransform::EncodeFromMp4,
            &job_name,
            &container,
            &container,
        )
        .await?;

        Ok(Some(job_name))
    }

    async fn verify_final_asset_exists(&self, recording_id: Uuid) -> Result<RecordingStatus> {
        let container = recording_id.to_string();

        if !self.final_storage.does_container_exist(&container).await? {
            return Ok(RecordingStatus::Failure);
        }

        match self.final_storage.get_mp4_file_name(&container).await {
            Ok(_) => Ok(RecordingStatus::RecordingAvailable),
            Err(AppError::NotFound(_)) => Ok(RecordingStatus::Failure),
            Err(err) => Err(err),
        }
    }
}
