//! Date normalisation, ordering, and subject deduplication.
//!
//! Announcements with the same subject text are treated as one disclosure
//! event, even when an amended re-filing changes the date or company code.
//! The earliest-dated occurrence wins; on equal dates the first one seen wins.
//!
//! Dates that cannot be parsed are kept with their raw text and placed after
//! every dated announcement, in arrival order.

use std::collections::HashSet;

use tracing::warn;

use crate::announcement::{Announcement, DisclosureDate};
use crate::calendar::parse_locale_date;

/// Rewrite ROC dates to Gregorian, sort ascending, and drop duplicate subjects.
///
/// Idempotent: normalising an already-normalised sequence returns it unchanged.
pub fn normalize(announcements: Vec<Announcement>) -> Vec<Announcement> {
    let mut rows: Vec<Announcement> = announcements.into_iter().map(normalize_date).collect();

    // Stable sort keeps arrival order on equal keys. `None` sorts after every date.
    rows.sort_by_key(|a| match a.disclosure_date.gregorian() {
        Some(d) => (false, Some(d)),
        None => (true, None),
    });

    let mut seen = HashSet::new();
    rows.retain(|a| seen.insert(a.subject.clone()));
    rows
}

fn normalize_date(mut ann: Announcement) -> Announcement {
    if let DisclosureDate::Raw(raw) = &ann.disclosure_date {
        match parse_locale_date(raw) {
            Some(date) => ann.disclosure_date = DisclosureDate::Gregorian(date),
            None => warn!(
                date = %raw,
                company = %ann.company_code,
                "unparseable disclosure date, keeping row unordered"
            ),
        }
    }
    ann
}
