use super::single;
use crate::data::{MetaValue, Metadata, Samples, TimeSeriesBlock};
use crate::pipeline::error::{NodeResult, PipelineError, PipelineResult};
use crate::pipeline::node::{input, BlockMap, NodeSignature, ProcessingNode};
use std::sync::Arc;

pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Combines several inputs into one thresholded decision per block.
///
/// The score is the mean of the per-input means. The output is a single
/// frame, 1.0 when the score exceeds the threshold and 0.0 otherwise, at a
/// rate of one decision per block of the first input. It carries the first
/// input's timestamp and metadata, annotated with `score`, `threshold`,
/// `triggered` and the per-input means under `input_means`.
#[derive(Debug, Clone)]
pub struct DecisionNode {
    sig: NodeSignature,
    threshold: f64,
}

impl DecisionNode {
    pub fn new<I, S>(inputs: I, output: impl Into<String>) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inputs: Vec<String> = inputs.into_iter().map(Into::into).collect();
        if inputs.is_empty() {
            return Err(PipelineError::invalid_config(
                "Decision",
                "at least one input key is required",
            ));
        }
        Ok(Self {
            sig: NodeSignature::new("Decision", inputs, vec![output.into()]),
            threshold: DEFAULT_THRESHOLD,
        })
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.sig.name = name.into();
        self
    }
}

impl ProcessingNode for DecisionNode {
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
        let mut means = Metadata::new();
        let mut total = 0.0;
        for key in self.sig.requires() {
            let values = input(inputs, key)?.values().as_slice();
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            total += mean;
            means.insert(key.clone(), MetaValue::from(mean));
        }
        let score = total / self.sig.requires().len() as f64;
        let triggered = score > self.threshold;

        let first = input(inputs, self.sig.input())?;
        let metadata = first.annotated_metadata(Metadata::from([
            ("score".to_string(), MetaValue::from(score)),
            ("threshold".to_string(), MetaValue::from(self.threshold)),
            ("triggered".to_string(), MetaValue::from(triggered)),
            ("input_means".to_string(), MetaValue::Map(means)),
        ]));
        let decision = TimeSeriesBlock::with_metadata(
            Samples::from_vec(vec![if triggered { 1.0 } else { 0.0 }]),
            1.0 / first.duration_seconds(),
            first.start_timestamp(),
            metadata,
        )?;
        Ok(single(self.sig.output(), Arc::new(decision)))
    }
}
