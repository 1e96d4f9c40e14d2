//! The immutable time-series block.

use super::{DataError, DataResult, Metadata, Samples, TimestampInput};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Blocks are immutable, so the buffer and node outputs share them by reference count.
pub type SharedBlock = Arc<TimeSeriesBlock>;

/// A finite chunk of time-ordered samples.
///
/// Construction validates the array and sample rate and coerces the start
/// timestamp to UTC. Derived quantities are computed on demand, and every
/// derivation (`copy_with`, `with_annotations`) returns a new block.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesBlock {
    values: Samples,
    sample_rate: f64,
    start_timestamp: DateTime<Utc>,
    metadata: Metadata,
}

impl TimeSeriesBlock {
    /// Create a block with empty metadata.
    pub fn new(
        values: Samples,
        sample_rate: f64,
        start_timestamp: impl Into<TimestampInput>,
    ) -> DataResult<Self> {
        Self::with_metadata(values, sample_rate, start_timestamp, Metadata::new())
    }

    /// Create a block with metadata.
    pub fn with_metadata(
        values: Samples,
        sample_rate: f64,
        start_timestamp: impl Into<TimestampInput>,
        metadata: Metadata,
    ) -> DataResult<Self> {
        validate_values(&values)?;
        validate_sample_rate(sample_rate)?;
        let start_timestamp = start_timestamp.into().resolve()?;
        Ok(Self {
            values,
            sample_rate,
            start_timestamp,
            metadata,
        })
    }

    pub fn values(&self) -> &Samples {
        &self.values
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn start_timestamp(&self) -> DateTime<Utc> {
        self.start_timestamp
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Number of frames along the time axis.
    pub fn block_size(&self) -> usize {
        self.values.frames()
    }

    pub fn frame_width(&self) -> usize {
        self.values.frame_width()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.block_size() as f64 / self.sample_rate
    }

    /// Timestamp of the last frame.
    pub fn end_timestamp(&self) -> DateTime<Utc> {
        let last = self.block_size().saturating_sub(1) as f64;
        let nanos = (last / self.sample_rate * 1e9).round() as i64;
        self.start_timestamp + Duration::nanoseconds(nanos)
    }

    /// Frame offsets in seconds relative to the start timestamp.
    pub fn time_axis(&self) -> Vec<f64> {
        (0..self.block_size())
            .map(|i| i as f64 / self.sample_rate)
            .collect()
    }

    /// New block with optionally replaced values and/or metadata.
    ///
    /// Sample rate and start timestamp are carried over. Replacement values
    /// go through the same validation as construction.
    pub fn copy_with(
        &self,
        values: Option<Samples>,
        metadata: Option<Metadata>,
    ) -> DataResult<Self> {
        let values = match values {
            Some(values) => {
                validate_values(&values)?;
                values
            }
            None => self.values.clone(),
        };
        Ok(Self {
            values,
            sample_rate: self.sample_rate,
            start_timestamp: self.start_timestamp,
            metadata: metadata.unwrap_or_else(|| self.metadata.clone()),
        })
    }

    /// Copy of this block with `extra` merged over the existing metadata.
    pub fn with_annotations(&self, extra: Metadata) -> Self {
        let mut metadata = self.metadata.clone();
        metadata.extend(extra);
        Self {
            values: self.values.clone(),
            sample_rate: self.sample_rate,
            start_timestamp: self.start_timestamp,
            metadata,
        }
    }

    /// Metadata copy with `extra` merged in, for building derived blocks.
    pub fn annotated_metadata(&self, extra: Metadata) -> Metadata {
        let mut metadata = self.metadata.clone();
        metadata.extend(extra);
        metadata
    }
}

fn validate_values(values: &Samples) -> DataResult<()> {
    if values.rank() == 0 {
        return Err(DataError::ZeroDimensional);
    }
    if values.is_empty() {
        return Err(DataError::Empty);
    }
    Ok(())
}

/// Relative tolerance 1e-5, absolute 1e-8.
pub(crate) fn rates_match(expected: f64, actual: f64) -> bool {
    (actual - expected).abs() <= 1e-8 + 1e-5 * expected.abs()
}

fn validate_sample_rate(sample_rate: f64) -> DataResult<()> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(DataError::InvalidSampleRate(sample_rate))
    }
}
