//! Block data model.
//!
//! - [`TimeSeriesBlock`]: immutable chunk of samples with rate, start time, and metadata.
//! - [`KeyedBlockBuffer`]: per-block store of named series.
//! - [`collate_block`]: turns raw source items into validated blocks.
//! - [`merge_sensors`] / [`sensor_block`]: several sensor streams packed into one block.

pub mod block;
pub mod buffer;
pub mod collate;
pub mod metadata;
pub mod samples;
pub mod sensors;
pub mod timestamp;

pub use block::{SharedBlock, TimeSeriesBlock};
pub use buffer::{BufferError, KeyedBlockBuffer};
pub use collate::{collate_block, BlockParts, RawSample, TimeSeriesLike};
pub use metadata::{MetaValue, Metadata};
pub use samples::Samples;
pub use sensors::{merge_sensors, sensor_block, SENSORS_KEY};
pub use timestamp::TimestampInput;

use thiserror::Error;

/// Validation and coercion errors for block data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("values must have at least one dimension")]
    ZeroDimensional,

    #[error("values must not be empty")]
    Empty,

    #[error("shape {shape:?} holds {expected} values but {actual} were given")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("frame {frame} has {actual} channels, expected {expected}")]
    RaggedFrames {
        frame: usize,
        expected: usize,
        actual: usize,
    },

    #[error("sample_rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    #[error("unsupported timestamp type: {0}")]
    UnsupportedTimestamp(String),

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("unsupported raw sample: {0}")]
    UnsupportedSample(String),

    #[error("raw sample is missing field '{0}'")]
    MissingField(&'static str),

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("sensor '{0}' is not in the block's sensor layout")]
    UnknownSensor(String),

    #[error("sensor '{sensor}': {reason}")]
    SensorMismatch { sensor: String, reason: String },
}

pub type DataResult<T> = std::result::Result<T, DataError>;
