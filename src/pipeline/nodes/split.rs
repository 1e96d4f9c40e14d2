use crate::pipeline::error::{NodeResult, PipelineError, PipelineResult};
use crate::pipeline::node::{input, BlockMap, NodeSignature, ProcessingNode};

/// Publishes its input under several keys.
#[derive(Debug, Clone)]
pub struct SplitNode {
    sig: NodeSignature,
}

impl SplitNode {
    pub fn new<I, S>(input: impl Into<String>, outputs: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let outputs: Vec<String> = outputs.into_iter().map(Into::into).collect();
        if outputs.is_empty() {
            return Err(PipelineError::invalid_config(
                "Split",
                "at least one output key is required",
            ));
        }
        Ok(Self {
            sig: NodeSignature::new("Split", vec![input.into()], outputs),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.sig.name = name.into();
        self
    }
}

impl ProcessingNode for SplitNode {
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
        Ok(self
            .sig
            .produces()
            .iter()
            .map(|key| (key.clone(), block.clone()))
            .collect())
    }
}
