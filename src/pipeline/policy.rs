use serde::{Deserialize, Serialize};
use std::fmt;

/// What the pipeline does when a single block fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Report the failure and halt.
    #[default]
    Stop,
    /// Report the failure, drop the block and move on.
    Continue,
}

/// Lifecycle state of a [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PipelineState {
    #[default]
    Idle,
    Running,
    Exhausted,
    Failed,
}

impl PipelineState {
    /// True when `process_next` can still pull from the source.
    pub fn can_process(&self) -> bool {
        matches!(self, PipelineState::Idle | PipelineState::Running)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Idle => "idle",
            PipelineState::Running => "running",
            PipelineState::Exhausted => "exhausted",
            PipelineState::Failed => "failed",
        };
        f.write_str(s)
    }
}
