//! Bounded per-date retry with randomised backoff.
//!
//! Each date moves `Pending → Attempting → Succeeded | Exhausted`. A successful
//! response ends the date even when nothing qualified. Every failure is
//! retryable; after the last attempt the date is recorded as an
//! [`ErrorLogEntry`] carrying the last failure's message and the run moves on.

use std::future::Future;

use mopswatch_core::{Announcement, DateKey, ErrorLogEntry};
use tracing::{error, info, warn};

use crate::config::RetryPolicy;
use crate::source::TransientFetchError;

/// Terminal state of one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateOutcome {
    Succeeded {
        announcements: Vec<Announcement>,
        attempts: u32,
    },
    Exhausted {
        entry: ErrorLogEntry,
        attempts: u32,
    },
}

impl DateOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }
}

pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Drive `attempt` until it succeeds or the budget runs out.
    pub async fn run<F, Fut>(&self, date: DateKey, mut attempt: F) -> DateOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<Announcement>, TransientFetchError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match attempt().await {
                Ok(announcements) => {
                    if attempts > 1 {
                        info!(date = %date, attempts, "query succeeded after retry");
                    }
                    return DateOutcome::Succeeded {
                        announcements,
                        attempts,
                    };
                }
                Err(e) if attempts < max_attempts => {
                    let delay = self.policy.backoff_for(&e);
                    warn!(
                        date = %date,
                        error = %e,
                        attempt = attempts,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "query failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(date = %date, error = %e, attempts, "retries exhausted");
                    return DateOutcome::Exhausted {
                        entry: ErrorLogEntry::new(date, e.to_string()),
                        attempts,
                    };
                }
            }
        }
    }

    /// Politeness pause between dates.
    pub async fn pause(&self) {
        if !self.policy.politeness_delay.is_zero() {
            tokio::time::sleep(self.policy.politeness_delay).await;
        }
    }
}
