//! Date handling for switch timestamps.
//!
//! Switch dumps mix several timestamp styles: errdump lines use
//! `2024/03/02-10:15:32` (optionally with a `:micros` suffix), the `date`
//! command prints `Tue Mar  2 10:15:32 UTC 2024`, and aggregated tables carry
//! ISO-like values. Anything that does not parse becomes `None`.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

const DATETIME_FORMATS: &[&str] = &[
    "%Y/%m/%d-%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%a %b %e %H:%M:%S %Y",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

static FRACTION: OnceLock<Regex> = OnceLock::new();
static ZONE_BEFORE_YEAR: OnceLock<Regex> = OnceLock::new();

fn fraction() -> &'static Regex {
    FRACTION.get_or_init(|| {
        Regex::new(r"(\d{2}:\d{2}:\d{2})[:.,]\d{1,9}").expect("invalid fraction regex")
    })
}

fn zone_before_year() -> &'static Regex {
    ZONE_BEFORE_YEAR.get_or_init(|| {
        Regex::new(r"(\d{2}:\d{2}:\d{2})\s+[A-Za-z]{2,5}\s+(\d{4})\s*$")
            .expect("invalid zone regex")
    })
}

/// Parse a switch timestamp into a naive local date-time.
///
/// Date-only values resolve to midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    let cleaned = fraction().replace(trimmed, "$1");
    let cleaned = zone_before_year().replace(&cleaned, "$1 $2");
    let cleaned = cleaned.trim();

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cleaned, fmt).ok())
        .or_else(|| parse_date(cleaned).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

/// Parse a date-only value.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// First calendar day still inside a window of `months` ending at `anchor`.
///
/// Month-end anchors clamp (Aug 31 minus 6 months is Feb 29 in a leap year).
pub fn window_start(anchor: NaiveDate, months: u32) -> Option<NaiveDate> {
    anchor.checked_sub_months(Months::new(months))
}

/// Calendar month bucket, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
