//! Harvest configuration.
//!
//! Loaded from an optional JSON file; every field has a default so a partial
//! file (or none at all) is valid. Durations are written in milliseconds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::source::{BackoffClass, TransientFetchError};

pub const DEFAULT_BASE_URL: &str = "https://mops.twse.com.tw";

#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level settings for one harvest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Portal origin, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// JSON file holding cached session cookies.
    #[serde(default = "default_cookie_cache")]
    pub cookie_cache: PathBuf,

    /// CSV output path. Overwritten on every run.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Per-request transport timeout (default: 20 seconds).
    #[serde(default = "default_request_timeout", with = "duration_ms")]
    pub request_timeout: Duration,

    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cookie_cache: default_cookie_cache(),
            output: default_output(),
            request_timeout: default_request_timeout(),
            retry: RetryPolicy::default(),
        }
    }
}

impl HarvestConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigFileError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Retry budget and delays applied per date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts per date, including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff after API-code and decode failures (default: 1.5-2.5 seconds)
    #[serde(default = "default_payload_backoff")]
    pub payload_backoff: DelayRange,

    /// Backoff after HTTP, timeout, and connection failures (default: 3-6 seconds)
    #[serde(default = "default_transport_backoff")]
    pub transport_backoff: DelayRange,

    /// Pause after every date, whatever the outcome (default: 500 ms)
    #[serde(default = "default_politeness_delay", with = "duration_ms")]
    pub politeness_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            payload_backoff: default_payload_backoff(),
            transport_backoff: default_transport_backoff(),
            politeness_delay: default_politeness_delay(),
        }
    }
}

impl RetryPolicy {
    /// Pick a randomised backoff for the given failure.
    pub fn backoff_for(&self, err: &TransientFetchError) -> Duration {
        match err.backoff_class() {
            BackoffClass::Payload => self.payload_backoff.sample(),
            BackoffClass::Transport => self.transport_backoff.sample(),
        }
    }
}

/// Inclusive range a random delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    #[serde(with = "duration_ms")]
    pub min: Duration,
    #[serde(with = "duration_ms")]
    pub max: Duration,
}

impl DelayRange {
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub const fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay)
    }

    /// Uniformly sample a delay. A reversed or empty range yields `min`.
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rand::thread_rng().gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_cookie_cache() -> PathBuf {
    PathBuf::from("mops_cookie.json")
}

fn default_output() -> PathBuf {
    PathBuf::from("convertible_bond_resolutions.csv")
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_payload_backoff() -> DelayRange {
    DelayRange::new(Duration::from_millis(1500), Duration::from_millis(2500))
}

fn default_transport_backoff() -> DelayRange {
    DelayRange::new(Duration::from_secs(3), Duration::from_secs(6))
}

fn default_politeness_delay() -> Duration {
    Duration::from_millis(500)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
