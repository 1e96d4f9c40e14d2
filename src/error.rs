//! Error handling for blockflow-rs
//!
//! This module defines the crate-level error type and a Result alias used by
//! configuration loading and the binary. Pipeline, data, and source errors
//! keep their own types and convert into [`BlockflowError`] with `?`.

use crate::data::DataError;
use crate::pipeline::PipelineError;
use crate::source::SourceError;
use thiserror::Error;

/// Main error type for blockflow-rs operations
#[derive(Error, Debug)]
pub enum BlockflowError {
    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors raised while building or running a pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Block validation and collation errors
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Data source errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<BlockflowError>,
    },
}

impl BlockflowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        BlockflowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for blockflow-rs operations
pub type Result<T> = std::result::Result<T, BlockflowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<BlockflowError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
