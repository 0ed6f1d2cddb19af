//! Sync layer: MOPS API client, session cookies, retry controller, harvest loop.

pub mod config;
pub mod harvest;
pub mod retry;
pub mod session;
pub mod source;

#[cfg(feature = "http")]
pub mod http;

pub use config::{ConfigFileError, DelayRange, HarvestConfig, RetryPolicy};
pub use harvest::harvest;
pub use retry::{DateOutcome, RetryController};
pub use session::{CookieCache, CredentialError, CredentialProvider, Credentials};
pub use source::{BackoffClass, DisclosureSource, TransientFetchError};

#[cfg(feature = "http")]
pub use http::MopsClient;
#[cfg(feature = "http")]
pub use session::PortalSession;
