use super::single;
use crate::pipeline::error::NodeResult;
use crate::pipeline::node::{input, BlockMap, NodeSignature, ProcessingNode};

/// Re-publishes its input, optionally under another key.
#[derive(Debug, Clone)]
pub struct IdentityNode {
    sig: NodeSignature,
}

impl IdentityNode {
    pub fn new(input: impl Into<String>) -> Self {
        let input = input.into();
        Self {
            sig: NodeSignature::new("Identity", vec![input.clone()], vec![input]),
        }
    }

    /// Publish under `alias` instead of the input key.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.sig.produces = vec![alias.into()];
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.sig.name = name.into();
        self
    }
}

impl ProcessingNode for IdentityNode {
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
        Ok(single(self.sig.output(), block.clone()))
    }
}
