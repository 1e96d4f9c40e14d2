//! Data sources and the block loader.
//!
//! A [`DataSource`] yields raw items one at a time. A [`StreamDataLoader`]
//! wraps a source with a collation function and exposes it to the pipeline
//! as a [`BlockSource`].

mod json_lines;
mod loader;
mod memory;
mod multi_sensor;
mod synthetic;

pub use json_lines::JsonLinesSource;
pub use loader::{CollateFn, StreamDataLoader};
pub use memory::{IteratorSource, OnceSource, VecSource};
pub use multi_sensor::MultiSensorSource;
pub use synthetic::{SineConfig, SineSource};

use crate::data::{DataError, TimeSeriesBlock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("data source cannot be rewound")]
    Unsupported,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("invalid raw sample: {0}")]
    Data(#[from] DataError),
}

impl SourceError {
    /// True when only the current item is bad and the stream can continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SourceError::Data(_) | SourceError::Parse { .. })
    }
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Sequential supplier of raw items.
pub trait DataSource: Send {
    type Item;

    /// Next raw item, or `None` at end of stream.
    fn next_raw_block(&mut self) -> SourceResult<Option<Self::Item>>;

    /// Rewind to the first item. Sources that cannot rewind keep the default.
    fn reset(&mut self) -> SourceResult<()> {
        Err(SourceError::Unsupported)
    }
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    type Item = S::Item;

    fn next_raw_block(&mut self) -> SourceResult<Option<Self::Item>> {
        (**self).next_raw_block()
    }

    fn reset(&mut self) -> SourceResult<()> {
        (**self).reset()
    }
}

/// Supplier of validated blocks, as consumed by the pipeline.
pub trait BlockSource: Send {
    fn next_block(&mut self) -> SourceResult<Option<TimeSeriesBlock>>;

    fn reset(&mut self) -> SourceResult<()>;
}

impl<B: BlockSource + ?Sized> BlockSource for Box<B> {
    fn next_block(&mut self) -> SourceResult<Option<TimeSeriesBlock>> {
        (**self).next_block()
    }

    fn reset(&mut self) -> SourceResult<()> {
        (**self).reset()
    }
}
