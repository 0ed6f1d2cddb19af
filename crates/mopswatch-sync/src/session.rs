//! Session cookies for the disclosure API.
//!
//! The API only answers requests that carry the cookies a browser would get
//! from the portal's landing page. Cookies are cached in a flat JSON object
//! (`{"name": "value", ...}`) and reused across runs until the cache is
//! removed. No renewal is attempted when they go stale.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("cookie cache {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode cookies: {0}")]
    Encode(#[from] serde_json::Error),
    #[cfg(feature = "http")]
    #[error("session request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("portal returned {status} while opening a session")]
    Bootstrap { status: u16 },
}

/// Cookie name/value pairs sent with every query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(BTreeMap<String, String>);

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value for a `Cookie` request header: `a=1; b=2`.
    pub fn cookie_header(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Parse the leading `name=value` pair of a `Set-Cookie` header value.
    pub fn insert_set_cookie(&mut self, header: &str) -> bool {
        let pair = header.split(';').next().unwrap_or_default();
        match pair.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                self.insert(name.trim(), value.trim());
                true
            }
            _ => false,
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Credentials {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Source of session credentials, with a local cache in front of it.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Acquire fresh credentials from the portal.
    async fn fetch(&self) -> Result<Credentials, CredentialError>;

    /// Read cached credentials. Missing, unreadable, corrupt, or empty caches yield `None`.
    async fn load_cached(&self) -> Option<Credentials>;

    /// Persist credentials for later runs.
    async fn store(&self, credentials: &Credentials) -> Result<(), CredentialError>;

    /// Cached credentials if present, otherwise fetch and store fresh ones.
    async fn get_credentials(&self) -> Result<Credentials, CredentialError> {
        if let Some(cached) = self.load_cached().await {
            info!(cookies = cached.len(), "using cached session cookies");
            return Ok(cached);
        }
        let fresh = self.fetch().await?;
        self.store(&fresh).await?;
        info!(cookies = fresh.len(), "stored fresh session cookies");
        Ok(fresh)
    }
}

/// JSON file holding cached cookies.
#[derive(Debug, Clone)]
pub struct CookieCache {
    path: PathBuf,
}

impl CookieCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Option<Credentials> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cookie cache unreadable");
                return None;
            }
        };
        match serde_json::from_slice::<Credentials>(&bytes) {
            Ok(creds) if creds.is_empty() => {
                warn!(path = %self.path.display(), "cookie cache is empty");
                None
            }
            Ok(creds) => Some(creds),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cookie cache corrupt, ignoring");
                None
            }
        }
    }

    pub async fn store(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        let json = serde_json::to_vec_pretty(credentials)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| CredentialError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

#[cfg(feature = "http")]
pub use portal::PortalSession;

#[cfg(feature = "http")]
mod portal {
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::header::SET_COOKIE;
    use tracing::info;

    use super::{CookieCache, CredentialError, CredentialProvider, Credentials};
    use crate::http::USER_AGENT;

    /// Path of the page whose cookies unlock the API.
    pub const LANDING_PATH: &str = "/mops/web/t05st02";

    /// Opens a portal session with a plain GET and harvests its cookies.
    pub struct PortalSession {
        client: reqwest::Client,
        landing_url: String,
        cache: CookieCache,
    }

    impl PortalSession {
        pub fn new(
            base_url: &str,
            cache: CookieCache,
            timeout: Duration,
        ) -> Result<Self, CredentialError> {
            let client = reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(timeout)
                .build()?;
            Ok(Self {
                client,
                landing_url: format!("{}{}", base_url.trim_end_matches('/'), LANDING_PATH),
                cache,
            })
        }
    }

    #[async_trait]
    impl CredentialProvider for PortalSession {
        async fn fetch(&self) -> Result<Credentials, CredentialError> {
            info!(url = %self.landing_url, "opening portal session");
            let resp = self.client.get(&self.landing_url).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(CredentialError::Bootstrap {
                    status: status.as_u16(),
                });
            }
            let mut creds = Credentials::new();
            for value in resp.headers().get_all(SET_COOKIE) {
                if let Ok(s) = value.to_str() {
                    creds.insert_set_cookie(s);
                }
            }
            info!(cookies = creds.len(), "portal session opened");
            Ok(creds)
        }

        async fn load_cached(&self) -> Option<Credentials> {
            self.cache.load().await
        }

        async fn store(&self, credentials: &Credentials) -> Result<(), CredentialError> {
            self.cache.store(credentials).await
        }
    }
}
