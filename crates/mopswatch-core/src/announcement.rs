//! Material-information announcements and the convertible-bond subject filter.

use std::fmt;

use chrono::NaiveDate;

use crate::calendar::DateKey;

/// Subject marker for a board resolution to issue securities.
pub const BOARD_RESOLUTION_MARKER: &str = "董事會決議發行";

/// Subject marker for convertible corporate bonds.
pub const CONVERTIBLE_BOND_MARKER: &str = "轉換公司債";

/// Minimum number of positional fields in a response row.
pub const MIN_ROW_FIELDS: usize = 5;

/// Column headers for exported data, in row order.
pub const COLUMNS: [&str; 5] = [
    "disclosure_date",
    "disclosure_time",
    "company_code",
    "company_name",
    "subject",
];

/// Disclosure date of an announcement.
///
/// Rows arrive with the portal's ROC string (`113/05/10`). Normalisation turns
/// that into a Gregorian date; strings that cannot be parsed stay raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisclosureDate {
    Raw(String),
    Gregorian(NaiveDate),
}

impl DisclosureDate {
    /// Sort key. Raw dates have none.
    pub fn gregorian(&self) -> Option<NaiveDate> {
        match self {
            Self::Gregorian(d) => Some(*d),
            Self::Raw(_) => None,
        }
    }
}

impl fmt::Display for DisclosureDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(s) => f.write_str(s),
            Self::Gregorian(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// One disclosure announcement that passed the subject filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub disclosure_date: DisclosureDate,
    pub disclosure_time: String,
    pub company_code: String,
    pub company_name: String,
    pub subject: String,
}

impl Announcement {
    /// Build an announcement from positional row fields, if the row qualifies.
    ///
    /// Rows with fewer than [`MIN_ROW_FIELDS`] fields, or whose subject does not
    /// carry both markers, yield `None`.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Option<Self> {
        if fields.len() < MIN_ROW_FIELDS {
            return None;
        }
        let subject = fields[4].as_ref();
        if !is_convertible_bond_resolution(subject) {
            return None;
        }
        Some(Self {
            disclosure_date: DisclosureDate::Raw(fields[0].as_ref().to_string()),
            disclosure_time: fields[1].as_ref().to_string(),
            company_code: fields[2].as_ref().to_string(),
            company_name: fields[3].as_ref().to_string(),
            subject: subject.to_string(),
        })
    }

    /// Fields in [`COLUMNS`] order.
    pub fn to_record(&self) -> [String; 5] {
        [
            self.disclosure_date.to_string(),
            self.disclosure_time.clone(),
            self.company_code.clone(),
            self.company_name.clone(),
            self.subject.clone(),
        ]
    }
}

/// True when a subject announces a board resolution to issue convertible bonds.
pub fn is_convertible_bond_resolution(subject: &str) -> bool {
    subject.contains(BOARD_RESOLUTION_MARKER) && subject.contains(CONVERTIBLE_BOND_MARKER)
}

/// A date whose retry budget ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLogEntry {
    pub date_label: String,
    pub message: String,
}

impl ErrorLogEntry {
    pub fn new(date: DateKey, message: impl Into<String>) -> Self {
        Self {
            date_label: date.label(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUALIFYING: &str = "本公司董事會決議發行國內第三次無擔保轉換公司債";

    fn row(subject: &str) -> Vec<String> {
        vec![
            "113/05/10".into(),
            "17:30:01".into(),
            "2330".into(),
            "台積電".into(),
            subject.into(),
        ]
    }

    #[test]
    fn qualifying_row_is_kept() {
        let ann = Announcement::from_fields(&row(QUALIFYING)).unwrap();
        assert_eq!(ann.company_code, "2330");
        assert_eq!(ann.subject, QUALIFYING);
        assert_eq!(ann.disclosure_date, DisclosureDate::Raw("113/05/10".into()));
    }

    #[test]
    fn board_marker_without_bond_marker_is_discarded() {
        let subject = "本公司董事會決議發行新股";
        assert!(subject.contains(BOARD_RESOLUTION_MARKER));
        assert!(Announcement::from_fields(&row(subject)).is_none());
    }

    #[test]
    fn bond_marker_without_board_marker_is_discarded() {
        assert!(Announcement::from_fields(&row("公告本公司轉換公司債轉換價格調整")).is_none());
    }

    #[test]
    fn short_rows_are_discarded() {
        let fields = ["113/05/10", "17:30:01", "2330", QUALIFYING];
        assert!(Announcement::from_fields(&fields).is_none());
    }

    #[test]
    fn extra_fields_are_ignored() {
        let mut fields = row(QUALIFYING);
        fields.push("extra".into());
        fields.push("more".into());
        let ann = Announcement::from_fields(&fields).unwrap();
        assert_eq!(ann.to_record()[4], QUALIFYING);
    }

    #[test]
    fn record_uses_column_order() {
        let ann = Announcement::from_fields(&row(QUALIFYING)).unwrap();
        assert_eq!(
            ann.to_record(),
            [
                "113/05/10".to_string(),
                "17:30:01".to_string(),
                "2330".to_string(),
                "台積電".to_string(),
                QUALIFYING.to_string(),
            ]
        );
    }

    #[test]
    fn gregorian_date_displays_iso() {
        let date = DisclosureDate::Gregorian(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(date.to_string(), "2024-01-05");
        assert_eq!(date.gregorian(), NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(DisclosureDate::Raw("?".into()).gregorian(), None);
    }

    #[test]
    fn error_entry_uses_locale_label() {
        let entry = ErrorLogEntry::new(DateKey::new(113, 5, 1).unwrap(), "ReadTimeout");
        assert_eq!(entry.date_label, "113-05-01");
        assert_eq!(entry.message, "ReadTimeout");
    }
}
