//! ROC (Minguo) calendar dates and query range enumeration.
//!
//! MOPS numbers years from 1912, so era year 113 is Gregorian 2024. Month and
//! day are shared with the Gregorian calendar, which means leap years follow
//! the Gregorian rule applied to `era_year + 1911`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::ConfigError;

/// Offset between ROC era years and Gregorian years.
pub const ROC_YEAR_OFFSET: i32 = 1911;

/// A calendar day expressed in the ROC calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey {
    pub era_year: i32,
    pub month: u32,
    pub day: u32,
}

impl DateKey {
    /// Build a key, rejecting days that do not exist in that month/year.
    pub fn new(era_year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(era_year.checked_add(ROC_YEAR_OFFSET)?, month, day)?;
        Some(Self {
            era_year,
            month,
            day,
        })
    }

    pub fn from_gregorian(date: NaiveDate) -> Self {
        Self {
            era_year: date.year() - ROC_YEAR_OFFSET,
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn to_gregorian(self) -> NaiveDate {
        // Keys are only constructed from valid dates.
        self.era_year
            .checked_add(ROC_YEAR_OFFSET)
            .and_then(|year| NaiveDate::from_ymd_opt(year, self.month, self.day))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Label used in progress logs and the error report, e.g. `113-05-10`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}-{:02}", self.era_year, self.month, self.day)
    }
}

/// Which dates a run should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMode {
    /// Only today.
    Single,
    /// From January 1st of a start era year through today.
    Range,
}

impl FromStr for RangeMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "today" => Ok(Self::Single),
            "range" | "from_year" | "from-year" => Ok(Self::Range),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for RangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("single"),
            Self::Range => f.write_str("range"),
        }
    }
}

/// Produce the ordered list of dates to query.
///
/// `today` is injected so the result is deterministic. For [`RangeMode::Range`]
/// every day from `(start_era_year, 1, 1)` through `today` inclusive is returned
/// in ascending order.
pub fn enumerate(
    mode: RangeMode,
    start_era_year: Option<i32>,
    today: NaiveDate,
) -> Result<Vec<DateKey>, ConfigError> {
    match mode {
        RangeMode::Single => Ok(vec![DateKey::from_gregorian(today)]),
        RangeMode::Range => {
            let start_year = start_era_year.ok_or(ConfigError::MissingStartYear)?;
            let today_era = today.year() - ROC_YEAR_OFFSET;
            if start_year < 1 {
                return Err(ConfigError::InvalidStartYear(start_year));
            }
            if start_year > today_era {
                return Err(ConfigError::StartYearInFuture {
                    start: start_year,
                    today: today_era,
                });
            }
            let first = NaiveDate::from_ymd_opt(start_year + ROC_YEAR_OFFSET, 1, 1)
                .ok_or(ConfigError::InvalidStartYear(start_year))?;

            Ok(first
                .iter_days()
                .take_while(|d| *d <= today)
                .map(DateKey::from_gregorian)
                .collect())
        }
    }
}

/// Parse a locale disclosure date (`113/05/10`, `-` also accepted) into a
/// Gregorian date.
pub fn parse_locale_date(s: &str) -> Option<NaiveDate> {
    let mut parts = s.trim().split(['/', '-']);
    let era_year: i32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let day: u32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    DateKey::new(era_year, month, day).map(DateKey::to_gregorian)
}
