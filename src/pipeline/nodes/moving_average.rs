use super::single;
use crate::pipeline::error::{NodeResult, PipelineError, PipelineResult};
use crate::pipeline::node::{input, BlockMap, NodeSignature, ProcessingNode};
use std::sync::Arc;

/// Uniform moving average along the time axis, per channel.
///
/// Uses a "valid" convolution and left-pads the result with its first value,
/// so the output has the same length and start time as the input. Blocks
/// shorter than the window pass through unchanged.
#[derive(Debug, Clone)]
pub struct MovingAverageNode {
    sig: NodeSignature,
    window: usize,
}

impl MovingAverageNode {
    /// Output key defaults to `{input}_ma{window}`.
    pub fn new(input: impl Into<String>, window: usize) -> PipelineResult<Self> {
        if window == 0 {
            return Err(PipelineError::invalid_config(
                "MovingAverage",
                "window must be positive",
            ));
        }
        let input = input.into();
        let output = format!("{input}_ma{window}");
        Ok(Self {
            sig: NodeSignature::new("MovingAverage", vec![input], vec![output]),
            window,
        })
    }

    pub fn output(mut self, output: impl Into<String>) -> Self {
        self.sig.produces = vec![output.into()];
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.sig.name = name.into();
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl ProcessingNode for MovingAverageNode {
    fn name(&self) -> &str {
        self.sig.name()
    }

    fn requires(&self) -> &[String] {
        self.sig.requires()
    }

    fn produces(&self) -> &[String] {
        self.sig.produces()
    }

    fn process(&mut self, inputs: &BlockMap) -> NodeResult<BlockMap> {
        let block = input(inputs, self.sig.input())?;
        let frames = block.block_size();
        let w = self.window;
        if frames < w {
            return Ok(single(self.sig.output(), block.clone()));
        }

        let width = block.frame_width();
        let data = block.values().as_slice();
        let mut out = vec![0.0; data.len()];
        for c in 0..width {
            for j in 0..=frames - w {
                let sum: f64 = (j..j + w).map(|i| data[i * width + c]).sum();
                out[(j + w - 1) * width + c] = sum / w as f64;
            }
            let first = out[(w - 1) * width + c];
            for i in 0..w - 1 {
                out[i * width + c] = first;
            }
        }

        let values = block.values().with_frame_data(out)?;
        let smoothed = block.copy_with(Some(values), None)?;
        Ok(single(self.sig.output(), Arc::new(smoothed)))
    }
}
