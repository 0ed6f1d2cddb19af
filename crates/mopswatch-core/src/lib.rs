//! Core types for mopswatch: ROC calendar dates, announcements, normalisation, export.

pub mod aggregate;
pub mod announcement;
pub mod calendar;
mod error;
pub mod export;
pub mod normalize;

pub use aggregate::{Aggregator, RunResult};
pub use announcement::{Announcement, DisclosureDate, ErrorLogEntry, is_convertible_bond_resolution};
pub use calendar::{DateKey, RangeMode, enumerate};
pub use error::{ConfigError, ExportError};
pub use export::export_csv;
pub use normalize::normalize;
