//! Lenient accessors over raw Socrata rows.
//!
//! Socrata returns most scalar columns as JSON strings, so numeric readers
//! accept either representation. Malformed values read as `None`.

use chrono::{NaiveDate, NaiveDateTime};
use nycdata_model::Row;
use serde_json::Value;

/// Non-empty trimmed string value. Numbers are rendered as text.
#[must_use]
pub fn str_field<'a>(row: &'a Row, name: &str) -> Option<&'a str> {
    match row.get(name)? {
        Value::String(text) => Some(text.trim()).filter(|text| !text.is_empty()),
        _ => None,
    }
}

/// Owned text for string or numeric columns.
#[must_use]
pub fn text_field(row: &Row, name: &str) -> Option<String> {
    match row.get(name)? {
        Value::String(text) => Some(text.trim().to_string()).filter(|text| !text.is_empty()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[must_use]
pub fn f64_field(row: &Row, name: &str) -> Option<f64> {
    let value = match row.get(name)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

/// Non-negative whole number. Accepts `"12"`, `12`, and `"12.0"`.
#[must_use]
pub fn u64_field(row: &Row, name: &str) -> Option<u64> {
    match row.get(name)? {
        Value::Number(number) => number.as_u64().or_else(|| whole(number.as_f64()?)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<u64>().ok().or_else(|| whole(text.parse().ok()?))
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= 9.0e15)
        .then(|| value as u64)
}

/// Parses Socrata floating timestamps and plain dates.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    for format in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[must_use]
pub fn timestamp_field(row: &Row, name: &str) -> Option<NaiveDateTime> {
    str_field(row, name).and_then(parse_timestamp)
}

/// Calendar day of a timestamp column, as `YYYY-MM-DD`.
#[must_use]
pub fn day_field(row: &Row, name: &str) -> Option<String> {
    timestamp_field(row, name).map(|ts| ts.date().format("%Y-%m-%d").to_string())
}
