//! Lenient date/time parsing for donor values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::core::SqlValue;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Parse a donor value into a point in time.
///
/// `reference` supplies the missing parts: a bare time is placed on the
/// reference date, and `now`/`today` resolve against it. Four-digit integers
/// are years; other integers are unix timestamps. Returns `None` when the
/// value does not look like a date at all.
pub fn parse_datetime(value: &SqlValue, reference: NaiveDateTime) -> Option<NaiveDateTime> {
    match value {
        SqlValue::DateTime(dt) => Some(*dt),
        SqlValue::Date(d) => Some(d.and_time(NaiveTime::MIN)),
        SqlValue::Time(t) => Some(reference.date().and_time(*t)),
        SqlValue::Int(v) => from_integer(*v),
        SqlValue::UInt(v) => i64::try_from(*v).ok().and_then(from_integer),
        SqlValue::Text(s) => parse_text(s, reference),
        SqlValue::Bytes(b) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| parse_text(s, reference)),
        SqlValue::Null | SqlValue::Float(_) | SqlValue::Decimal(_) => None,
    }
}

fn from_integer(v: i64) -> Option<NaiveDateTime> {
    if (1000..=9999).contains(&v) {
        return year_start(v as i32);
    }
    DateTime::from_timestamp(v, 0).map(|dt| dt.naive_utc())
}

fn year_start(year: i32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, 1, 1).map(|d| d.and_time(NaiveTime::MIN))
}

fn parse_text(text: &str, reference: NaiveDateTime) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    match text.to_ascii_lowercase().as_str() {
        "now" => return Some(reference),
        "today" => return Some(reference.date().and_time(NaiveTime::MIN)),
        _ => {}
    }

    if text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse().ok().and_then(year_start);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .or_else(|| {
            TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
                .map(|t| reference.date().and_time(t))
        })
}
