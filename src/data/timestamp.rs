//! Start-timestamp coercion.
//!
//! Every accepted form resolves to a UTC instant. Numbers are epoch seconds,
//! strings are ISO-8601 / RFC 3339, and naive values are taken as UTC.

use super::{DataError, DataResult};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// Any value accepted as a block start time.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampInput {
    EpochSeconds(f64),
    Text(String),
    Naive(NaiveDateTime),
    Utc(DateTime<Utc>),
    Fixed(DateTime<FixedOffset>),
}

impl TimestampInput {
    /// Resolve to a UTC instant.
    pub fn resolve(&self) -> DataResult<DateTime<Utc>> {
        match self {
            TimestampInput::EpochSeconds(secs) => from_epoch_seconds(*secs),
            TimestampInput::Text(text) => parse_iso(text),
            TimestampInput::Naive(naive) => Ok(naive.and_utc()),
            TimestampInput::Utc(dt) => Ok(*dt),
            TimestampInput::Fixed(dt) => Ok(dt.with_timezone(&Utc)),
        }
    }

    /// Interpret a JSON value. Only numbers and strings are accepted.
    pub fn from_json(value: &serde_json::Value) -> DataResult<Self> {
        match value {
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(TimestampInput::EpochSeconds)
                .ok_or_else(|| DataError::InvalidTimestamp {
                    value: n.to_string(),
                    reason: "not representable as f64".to_string(),
                }),
            serde_json::Value::String(s) => Ok(TimestampInput::Text(s.clone())),
            other => Err(DataError::UnsupportedTimestamp(json_kind(other).to_string())),
        }
    }
}

fn from_epoch_seconds(secs: f64) -> DataResult<DateTime<Utc>> {
    if !secs.is_finite() {
        return Err(DataError::InvalidTimestamp {
            value: secs.to_string(),
            reason: "epoch seconds must be finite".to_string(),
        });
    }
    let mut whole = secs.floor();
    let mut nanos = ((secs - whole) * 1e9).round();
    if nanos >= 1e9 {
        whole += 1.0;
        nanos -= 1e9;
    }
    DateTime::from_timestamp(whole as i64, nanos as u32).ok_or_else(|| {
        DataError::InvalidTimestamp {
            value: secs.to_string(),
            reason: "out of range".to_string(),
        }
    })
}

fn parse_iso(text: &str) -> DataResult<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(DataError::InvalidTimestamp {
        value: text.to_string(),
        reason: "not an ISO-8601 timestamp".to_string(),
    })
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl From<f64> for TimestampInput {
    fn from(v: f64) -> Self {
        TimestampInput::EpochSeconds(v)
    }
}

impl From<i64> for TimestampInput {
    fn from(v: i64) -> Self {
        TimestampInput::EpochSeconds(v as f64)
    }
}

impl From<&str> for TimestampInput {
    fn from(v: &str) -> Self {
        TimestampInput::Text(v.to_string())
    }
}

impl From<String> for TimestampInput {
    fn from(v: String) -> Self {
        TimestampInput::Text(v)
    }
}

impl From<NaiveDateTime> for TimestampInput {
    fn from(v: NaiveDateTime) -> Self {
        TimestampInput::Naive(v)
    }
}

impl From<DateTime<Utc>> for TimestampInput {
    fn from(v: DateTime<Utc>) -> Self {
        TimestampInput::Utc(v)
    }
}

impl From<DateTime<FixedOffset>> for TimestampInput {
    fn from(v: DateTime<FixedOffset>) -> Self {
        TimestampInput::Fixed(v)
    }
}
