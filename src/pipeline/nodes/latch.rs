//! First-call capture of stream parameters for the accumulating nodes.

use crate::data::block::rates_match;
use crate::data::TimeSeriesBlock;
use crate::pipeline::error::{NodeError, NodeResult, PipelineError, PipelineResult};

/// Two-state latch: parameters are derived from the first block seen and
/// every later block must match them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Latch<T> {
    Unlatched,
    Latched(T),
}

impl<T: Copy> Latch<T> {
    pub(crate) fn get_or_latch(&mut self, init: impl FnOnce() -> T) -> T {
        match *self {
            Latch::Latched(value) => value,
            Latch::Unlatched => {
                let value = init();
                *self = Latch::Latched(value);
                value
            }
        }
    }

    pub(crate) fn is_latched(&self) -> bool {
        matches!(self, Latch::Latched(_))
    }
}

/// Sample rate and frame width a stream was latched with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StreamShape {
    pub sample_rate: f64,
    /// Never zero, since blocks reject arrays with no values.
    pub frame_width: usize,
}

impl StreamShape {
    pub(crate) fn of(block: &TimeSeriesBlock) -> Self {
        Self {
            sample_rate: block.sample_rate(),
            frame_width: block.frame_width(),
        }
    }

    /// Fails with a fatal error when `block` does not match the latched stream.
    pub(crate) fn check(&self, block: &TimeSeriesBlock) -> NodeResult<()> {
        if !rates_match(self.sample_rate, block.sample_rate()) {
            return Err(NodeError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: block.sample_rate(),
            });
        }
        if block.frame_width() != self.frame_width {
            return Err(NodeError::FrameWidthMismatch {
                expected: self.frame_width,
                actual: block.frame_width(),
            });
        }
        Ok(())
    }
}

/// Sample count for a duration, rounded, at least 1.
pub(crate) fn samples_for(seconds: f64, sample_rate: f64) -> usize {
    ((seconds * sample_rate).round() as usize).max(1)
}

/// Rejects non-positive or non-finite durations at construction.
pub(crate) fn positive_seconds(node: &str, field: &str, seconds: f64) -> PipelineResult<f64> {
    if seconds.is_finite() && seconds > 0.0 {
        Ok(seconds)
    } else {
        Err(PipelineError::invalid_config(
            node,
            format!("{field} must be positive and finite, got {seconds}"),
        ))
    }
}
