//! Run-scoped accumulation of per-date results.

use tracing::{debug, info};

use crate::announcement::{Announcement, ErrorLogEntry};
use crate::calendar::DateKey;
use crate::normalize::normalize;

/// Final output of a harvest run.
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    /// Normalised, sorted, deduplicated announcements.
    pub announcements: Vec<Announcement>,
    /// One entry per date that exhausted its retries.
    pub errors: Vec<ErrorLogEntry>,
    /// Number of dates that were attempted.
    pub dates_queried: usize,
    /// Qualifying rows collected before deduplication.
    pub raw_count: usize,
}

/// Collects announcements and failures in arrival order.
#[derive(Debug, Default)]
pub struct Aggregator {
    announcements: Vec<Announcement>,
    errors: Vec<ErrorLogEntry>,
    dates_seen: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the qualifying announcements found for one date.
    pub fn add(&mut self, date: DateKey, announcements: Vec<Announcement>) {
        let count = announcements.len();
        self.dates_seen += 1;
        self.announcements.extend(announcements);
        if count == 0 {
            info!(date = %date, "no qualifying announcements");
        } else {
            info!(date = %date, count, total = self.announcements.len(), "collected announcements");
        }
    }

    /// Record a date whose retries ran out.
    pub fn record_failure(&mut self, date: DateKey, entry: ErrorLogEntry) {
        self.dates_seen += 1;
        debug!(date = %date, message = %entry.message, "date failed");
        self.errors.push(entry);
    }

    /// Normalise the accumulated announcements and hand back the run result.
    pub fn finalize(self) -> RunResult {
        let raw_count = self.announcements.len();
        let announcements = normalize(self.announcements);
        info!(
            raw = raw_count,
            unique = announcements.len(),
            failed_dates = self.errors.len(),
            "aggregation finalised"
        );
        RunResult {
            announcements,
            errors: self.errors,
            dates_queried: self.dates_seen,
            raw_count,
        }
    }
}
