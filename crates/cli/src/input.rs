//! JSON documents to native values, with optional temporal detection.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use modelwrap_types::{NativeValue, Temporal};
use serde_json::Value as JsonValue;

/// Converts a parsed document. With `detect_dates`, strings that parse as
/// temporals become [`NativeValue::Temporal`]; everything else converts as
/// plain JSON (arrays to fixed arrays, objects to ordered mappings).
pub fn to_native(document: JsonValue, detect_dates: bool) -> NativeValue {
    if !detect_dates {
        return NativeValue::from(document);
    }
    match document {
        JsonValue::String(text) => match parse_temporal(&text) {
            Some(temporal) => NativeValue::Temporal(temporal),
            None => NativeValue::Text(text),
        },
        JsonValue::Array(items) => NativeValue::Array(items.into_iter().map(|item| to_native(item, true)).collect()),
        JsonValue::Object(entries) => {
            NativeValue::Mapping(entries.into_iter().map(|(key, item)| (key, to_native(item, true))).collect())
        }
        other => NativeValue::from(other),
    }
}

/// Recognizes, in order: RFC 3339 timestamps (offset required), ISO local
/// date-times, ISO dates and ISO times.
pub fn parse_temporal(text: &str) -> Option<Temporal> {
    let trimmed = text.trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(Temporal::Instant(timestamp.with_timezone(&Utc)));
    }
    if let Ok(value) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Temporal::DateTime(value));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(Temporal::Date(date));
    }
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f").ok().map(Temporal::Time)
}
