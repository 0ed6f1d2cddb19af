//! The per-day query seam and its failure taxonomy.

use async_trait::async_trait;
use mopswatch_core::{Announcement, DateKey};
use thiserror::Error;

use crate::session::Credentials;

/// A failed query attempt. Every variant is retryable.
///
/// The `Display` text is what ends up in the final error report when a date
/// exhausts its retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransientFetchError {
    #[error("API returned code {0}")]
    Api(i64),
    #[error("HTTP status {0}")]
    Http(u16),
    #[error("ReadTimeout")]
    ReadTimeout,
    #[error("ConnectTimeout")]
    ConnectTimeout,
    #[error("ConnectionError: {0}")]
    Connection(String),
    #[error("JSON decode error: {0}")]
    Decode(String),
    #[error("{0}")]
    Other(String),
}

/// Which backoff range applies after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffClass {
    /// The server answered but the payload was unusable.
    Payload,
    /// The request itself failed or was rejected.
    Transport,
}

impl TransientFetchError {
    pub fn backoff_class(&self) -> BackoffClass {
        match self {
            Self::Api(_) | Self::Decode(_) => BackoffClass::Payload,
            Self::Http(_)
            | Self::ReadTimeout
            | Self::ConnectTimeout
            | Self::Connection(_)
            | Self::Other(_) => BackoffClass::Transport,
        }
    }
}

/// Issues one day's query and returns the qualifying announcements.
#[async_trait]
pub trait DisclosureSource: Send + Sync {
    async fn query(
        &self,
        date: DateKey,
        credentials: &Credentials,
    ) -> Result<Vec<Announcement>, TransientFetchError>;
}
