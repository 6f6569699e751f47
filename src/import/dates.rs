//! Date parsing for spreadsheet cells

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How ambiguous slash dates such as `03/04/2026` are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateOrder {
    /// Day first (03/04/2026 is 3 April)
    #[default]
    Dmy,
    /// Month first (03/04/2026 is 4 March)
    Mdy,
}

impl std::str::FromStr for DateOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dmy" | "day-first" => Ok(DateOrder::Dmy),
            "mdy" | "month-first" => Ok(DateOrder::Mdy),
            _ => Err(format!("Unknown date order: '{}' (valid: dmy, mdy)", s)),
        }
    }
}

/// Formats accepted regardless of date order
const UNAMBIGUOUS_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%b-%Y", "%d %b %Y", "%d %B %Y"];

/// Parse a date cell.
///
/// Accepts ISO dates (optionally followed by a time part, as spreadsheets
/// export them), `YYYY/MM/DD`, `DD-Mon-YYYY`, `DD Mon YYYY` and slash or dot
/// dates read per `order`.
pub fn parse_date(raw: &str, order: DateOrder) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    // "2026-01-05T00:00:00" / "2026-01-05 00:00:00"
    let value = match value.find(['T', ' ']) {
        Some(idx) if idx == 10 && value.as_bytes()[4] == b'-' => &value[..idx],
        _ => value,
    };

    for fmt in UNAMBIGUOUS_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }

    let ordered: &[&str] = match order {
        DateOrder::Dmy => &["%d/%m/%Y", "%d.%m.%Y"],
        DateOrder::Mdy => &["%m/%d/%Y", "%m.%d.%Y"],
    };
    ordered
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Whole days from `start` to `end` (negative when `end` is earlier)
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Inclusive overlap in days between two closed date ranges
pub fn overlap_days(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> i64 {
    let start = a_start.max(b_start);
    let end = a_end.min(b_end);
    if start > end {
        0
    } else {
        days_between(start, end) + 1
    }
}
