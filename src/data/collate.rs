//! Conversion of raw source items into validated blocks.
//!
//! Accepted shapes:
//! - an already-typed [`TimeSeriesBlock`] (passed through);
//! - a JSON object with `values`, `sample_rate`, `start_timestamp`
//!   (or `timestamp`) and optional `metadata`;
//! - a JSON array `[values, sample_rate, start_timestamp, metadata?]`;
//! - [`BlockParts`], usually produced from a [`TimeSeriesLike`] value.

use super::metadata::Metadata;
use super::timestamp::json_kind;
use super::{DataError, DataResult, Samples, TimeSeriesBlock, TimestampInput};
use serde_json::Value;

/// A raw item as produced by a data source.
#[derive(Debug, Clone)]
pub enum RawSample {
    Block(TimeSeriesBlock),
    Json(Value),
    Parts(BlockParts),
}

/// Unvalidated block fields.
#[derive(Debug, Clone)]
pub struct BlockParts {
    pub values: Samples,
    pub sample_rate: f64,
    pub start_timestamp: TimestampInput,
    pub metadata: Metadata,
}

/// Implemented by domain types that carry block fields under their own names.
pub trait TimeSeriesLike {
    fn values(&self) -> Samples;
    fn sample_rate(&self) -> f64;
    fn start_timestamp(&self) -> TimestampInput;
    fn metadata(&self) -> Metadata {
        Metadata::new()
    }
}

impl RawSample {
    pub fn from_like<T: TimeSeriesLike + ?Sized>(item: &T) -> Self {
        RawSample::Parts(BlockParts {
            values: item.values(),
            sample_rate: item.sample_rate(),
            start_timestamp: item.start_timestamp(),
            metadata: item.metadata(),
        })
    }
}

impl From<TimeSeriesBlock> for RawSample {
    fn from(block: TimeSeriesBlock) -> Self {
        RawSample::Block(block)
    }
}

impl From<Value> for RawSample {
    fn from(value: Value) -> Self {
        RawSample::Json(value)
    }
}

impl From<BlockParts> for RawSample {
    fn from(parts: BlockParts) -> Self {
        RawSample::Parts(parts)
    }
}

/// Default collation function.
pub fn collate_block(raw: RawSample) -> DataResult<TimeSeriesBlock> {
    match raw {
        RawSample::Block(block) => Ok(block),
        RawSample::Parts(parts) => TimeSeriesBlock::with_metadata(
            parts.values,
            parts.sample_rate,
            parts.start_timestamp,
            parts.metadata,
        ),
        RawSample::Json(Value::Object(map)) => {
            let values = map.get("values").ok_or(DataError::MissingField("values"))?;
            let rate = map
                .get("sample_rate")
                .ok_or(DataError::MissingField("sample_rate"))?;
            let start = map
                .get("start_timestamp")
                .or_else(|| map.get("timestamp"))
                .ok_or(DataError::MissingField("start_timestamp"))?;
            from_json_fields(values, rate, start, map.get("metadata"))
        }
        RawSample::Json(Value::Array(items)) => match items.as_slice() {
            [values, rate, start] => from_json_fields(values, rate, start, None),
            [values, rate, start, metadata] => from_json_fields(values, rate, start, Some(metadata)),
            _ => Err(DataError::UnsupportedSample(format!(
                "sequence of length {}, expected 3 or 4",
                items.len()
            ))),
        },
        RawSample::Json(other) => Err(DataError::UnsupportedSample(json_kind(&other).to_string())),
    }
}

fn from_json_fields(
    values: &Value,
    rate: &Value,
    start: &Value,
    metadata: Option<&Value>,
) -> DataResult<TimeSeriesBlock> {
    let values = samples_from_json(values)?;
    let sample_rate = rate.as_f64().ok_or_else(|| DataError::InvalidField {
        field: "sample_rate",
        reason: format!("expected a number, got {}", json_kind(rate)),
    })?;
    let start = TimestampInput::from_json(start)?;
    let metadata = match metadata {
        None | Some(Value::Null) => Metadata::new(),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| DataError::InvalidField {
            field: "metadata",
            reason: e.to_string(),
        })?,
    };
    TimeSeriesBlock::with_metadata(values, sample_rate, start, metadata)
}

fn samples_from_json(value: &Value) -> DataResult<Samples> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(Samples::scalar)
            .ok_or_else(|| invalid_values("number out of range")),
        Value::Array(items) if items.iter().all(Value::is_array) && !items.is_empty() => {
            let frames = items
                .iter()
                .map(number_row)
                .collect::<DataResult<Vec<_>>>()?;
            Samples::from_frames(frames)
        }
        Value::Array(_) => Ok(Samples::from_vec(number_row(value)?)),
        other => Err(invalid_values(&format!("expected an array, got {}", json_kind(other)))),
    }
}

fn number_row(value: &Value) -> DataResult<Vec<f64>> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid_values("expected an array of numbers"))?;
    items
        .iter()
        .map(|v| v.as_f64().ok_or_else(|| invalid_values("expected an array of numbers")))
        .collect()
}

fn invalid_values(reason: &str) -> DataError {
    DataError::InvalidField {
        field: "values",
        reason: reason.to_string(),
    }
}
