use super::single;
use crate::data::{MetaValue, Metadata};
use crate::pipeline::error::NodeResult;
use crate::pipeline::node::{input, BlockMap, NodeSignature, ProcessingNode};
use std::sync::Arc;

pub const DEFAULT_EPS: f64 = 1e-12;

/// Scales a block so its peak absolute value is 1.
///
/// Blocks whose peak is below `eps` pass through unchanged. Otherwise the
/// applied factor is recorded in the `scale` metadata entry.
#[derive(Debug, Clone)]
pub struct NormalizeNode {
    sig: NodeSignature,
    eps: f64,
}

impl NormalizeNode {
    /// Output key defaults to `{input}_norm`.
    pub fn new(input: impl Into<String>) -> Self {
        let input = input.into();
        let output = format!("{input}_norm");
        Self {
            sig: NodeSignature::new("NormalizeAmplitude", vec![input], vec![output]),
            eps: DEFAULT_EPS,
        }
    }

    pub fn output(mut self, output: impl Into<String>) -> Self {
        self.sig.produces = vec![output.into()];
        self
    }

    pub fn eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.sig.name = name.into();
        self
    }
}

impl ProcessingNode for NormalizeNode {
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
        let peak = block.values().peak_abs();
        if peak < self.eps {
            return Ok(single(self.sig.output(), block.clone()));
        }

        let values = block.values().map(|v| v / peak);
        let metadata = block.annotated_metadata(Metadata::from([(
            "scale".to_string(),
            MetaValue::from(1.0 / peak),
        )]));
        let normalized = block.copy_with(Some(values), Some(metadata))?;
        Ok(single(self.sig.output(), Arc::new(normalized)))
    }
}
