//! Pipeline-specific error types.

use crate::data::{BufferError, DataError};
use crate::source::SourceError;
use thiserror::Error;

/// Errors returned by [`ProcessingNode::process`](crate::pipeline::ProcessingNode::process).
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("sample rate changed from {expected} Hz to {actual} Hz")]
    SampleRateMismatch { expected: f64, actual: f64 },

    #[error("frame width changed from {expected} to {actual}")]
    FrameWidthMismatch { expected: usize, actual: usize },

    #[error("required input '{0}' was not provided")]
    MissingInput(String),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl NodeError {
    /// Configuration-class failures stop the pipeline regardless of the error policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NodeError::SampleRateMismatch { .. }
                | NodeError::FrameWidthMismatch { .. }
                | NodeError::MissingInput(_)
        )
    }
}

pub type NodeResult<T> = std::result::Result<T, NodeError>;

/// Cause of a per-block failure that the error policy applies to.
#[derive(Error, Debug)]
pub enum BlockFailure {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Errors that can occur while building or running a pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration for node '{node}': {reason}")]
    InvalidNodeConfig { node: String, reason: String },

    #[error("Unresolved dependencies: missing keys {missing:?} (blocked nodes: {blocked:?})")]
    UnresolvedDependencies {
        missing: Vec<String>,
        blocked: Vec<String>,
    },

    #[error("Node '{node}' produced undeclared output '{key}'")]
    UndeclaredOutput { node: String, key: String },

    #[error("Node '{node}' is misconfigured (block {block_index}): {source}")]
    NodeConfiguration {
        block_index: usize,
        node: String,
        #[source]
        source: NodeError,
    },

    #[error("Block {block_index} failed in {}: {source}", .node.as_deref().unwrap_or("data source"))]
    Execution {
        block_index: usize,
        node: Option<String>,
        #[source]
        source: BlockFailure,
    },

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Pipeline halted after a failure; reset before processing again")]
    Halted,
}

impl PipelineError {
    pub(crate) fn invalid_config(node: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::InvalidNodeConfig {
            node: node.into(),
            reason: reason.into(),
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
