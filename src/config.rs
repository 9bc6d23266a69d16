/// Configuration management for capture-service
///
/// Loads configuration from environment variables with sensible defaults.
use chrono::NaiveDate;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub database: DatabaseConfig,
    pub media_kind: MediaKindConfig,
    pub ingest_storage: StorageConfig,
    pub final_storage: StorageConfig,
    pub tasks: TaskConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, Debug)]
pub struct MediaKindConfig {
    /// Base URL of the media-processing API
    pub endpoint: String,
    pub subscription: String,
    pub token: String,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Base URL of the blob storage account
    pub endpoint: String,
    pub sas_token: String,
}

#[derive(Clone, Debug)]
pub struct TaskConfig {
    /// Number of live events started per batch before awaiting ingest addresses
    pub batch_size: usize,
    /// Interval between live-event polls during the await phase
    pub poll_interval: Duration,
    /// Age after which an in-flight encode job is force-failed
    pub processing_timeout: chrono::Duration,
    /// Earliest session start date the status-correction task will consider
    pub correction_window_start: NaiveDate,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/capture".to_string()),
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
            },
            media_kind: MediaKindConfig {
                endpoint: std::env::var("MEDIA_KIND_ENDPOINT")
                    .unwrap_or_else(|_| "https://api.mk.io".to_string()),
                subscription: std::env::var("MEDIA_KIND_SUBSCRIPTION").unwrap_or_default(),
                token: std::env::var("MEDIA_KIND_TOKEN").unwrap_or_default(),
            },
            ingest_storage: StorageConfig {
                endpoint: std::env::var("INGEST_STORAGE_ENDPOINT").unwrap_or_default(),
                sas_token: std::env::var("INGEST_STORAGE_SAS").unwrap_or_default(),
            },
            final_storage: StorageConfig {
                endpoint: std::env::var("FINAL_STORAGE_ENDPOINT").unwrap_or_default(),
                sas_token: std::env::var("FINAL_STORAGE_SAS").unwrap_or_default(),
            },
            tasks: TaskConfig::from_env(),
        })
    }
}

impl TaskConfig {
    pub fn from_env() -> Self {
        Self {
            batch_size: env_parse("LIVE_EVENT_BATCH_SIZE", 4),
            poll_interval: Duration::from_millis(env_parse("LIVE_EVENT_POLL_INTERVAL_MS", 2000)),
            processing_timeout: chrono::Duration::hours(env_parse("PROCESSING_TIMEOUT_HOURS", 2)),
            correction_window_start: std::env::var("CORRECTION_WINDOW_START")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_correction_window_start),
        }
    }
}

fn default_correction_window_start() -> NaiveDate {
    // Date the misreporting fix shipped; sessions failed before it are suspect
    NaiveDate::from_ymd_opt(2025, 9, 28).unwrap()
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_defaults() {
        std::env::remove_var("LIVE_EVENT_BATCH_SIZE");
        std::env::remove_var("LIVE_EVENT_POLL_INTERVAL_MS");
        std::env::remove_var("PROCESSING_TIMEOUT_HOURS");
        let tasks = TaskConfig::from_env();
        assert_eq!(tasks.batch_size, 4);
        assert_eq!(tasks.poll_interval, Duration::from_secs(2));
        assert_eq!(tasks.processing_timeout, chrono::Duration::hours(2));
    }
}
