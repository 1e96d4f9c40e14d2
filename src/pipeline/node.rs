//! Node abstraction for the pipeline.
//!
//! Two-layer design:
//! - **`ProcessingNode` trait**: the contract every node satisfies, and the
//!   extension point for user-defined nodes.
//! - **`BuiltinNode` enum**: the nodes shipped with the crate, dispatched by
//!   match so the per-block loop avoids a vtable call for them.
//!
//! `AnyNode` wraps either variant so the pipeline can handle both uniformly.

use crate::data::SharedBlock;
use crate::pipeline::error::{NodeError, NodeResult};
use crate::pipeline::nodes::{
    ChunkRmsNode, DecisionNode, IdentityNode, MovingAverageNode, NormalizeNode, ScriptNode,
    SlidingWindowNode, SpectrumNode, SplitNode, SplitSensorsNode,
};
use std::collections::BTreeMap;

/// Named blocks passed into and returned from a node.
pub type BlockMap = BTreeMap<String, SharedBlock>;

/// A named transformation step with declared input and output keys.
///
/// `requires` and `produces` are fixed at construction. `process` may return
/// any subset of `produces`, including none when a stateful node is not ready.
pub trait ProcessingNode: Send {
    fn name(&self) -> &str;

    /// Keys that must be present before this node runs.
    fn requires(&self) -> &[String];

    /// Keys this node may write.
    fn produces(&self) -> &[String];

    /// Clear internal state. Called when the pipeline is built and on every reset.
    fn reset(&mut self) {}

    fn process(&mut self, inputs: &BlockMap) -> NodeResult<BlockMap>;
}

/// Look up a required input, failing with [`NodeError::MissingInput`].
pub fn input<'a>(inputs: &'a BlockMap, key: &str) -> NodeResult<&'a SharedBlock> {
    inputs
        .get(key)
        .ok_or_else(|| NodeError::MissingInput(key.to_string()))
}

/// Name and key declarations shared by the built-in nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSignature {
    pub(crate) name: String,
    pub(crate) requires: Vec<String>,
    pub(crate) produces: Vec<String>,
}

impl NodeSignature {
    pub fn new(name: impl Into<String>, requires: Vec<String>, produces: Vec<String>) -> Self {
        Self {
            name: name.into(),
            requires,
            produces,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    pub fn produces(&self) -> &[String] {
        &self.produces
    }

    /// First (and for most nodes only) output key.
    pub(crate) fn output(&self) -> &str {
        self.produces.first().map(String::as_str).unwrap_or_default()
    }

    /// First (and for most nodes only) input key.
    pub(crate) fn input(&self) -> &str {
        self.requires.first().map(String::as_str).unwrap_or_default()
    }
}

/// Enum dispatch for built-in nodes.
pub enum BuiltinNode {
    Identity(IdentityNode),
    Normalize(NormalizeNode),
    MovingAverage(MovingAverageNode),
    Split(SplitNode),
    SlidingWindow(SlidingWindowNode),
    ChunkRms(ChunkRmsNode),
    Spectrum(SpectrumNode),
    Script(ScriptNode),
    SplitSensors(SplitSensorsNode),
    Decision(DecisionNode),
}

impl ProcessingNode for BuiltinNode {
    fn name(&self) -> &str {
        match self {
            BuiltinNode::Identity(n) => n.name(),
            BuiltinNode::Normalize(n) => n.name(),
            BuiltinNode::MovingAverage(n) => n.name(),
            BuiltinNode::Split(n) => n.name(),
            BuiltinNode::SlidingWindow(n) => n.name(),
            BuiltinNode::ChunkRms(n) => n.name(),
            BuiltinNode::Spectrum(n) => n.name(),
            BuiltinNode::Script(n) => n.name(),
            BuiltinNode::SplitSensors(n) => n.name(),
            BuiltinNode::Decision(n) => n.name(),
        }
    }

    fn requires(&self) -> &[String] {
        match self {
            BuiltinNode::Identity(n) => n.requires(),
            BuiltinNode::Normalize(n) => n.requires(),
            BuiltinNode::MovingAverage(n) => n.requires(),
            BuiltinNode::Split(n) => n.requires(),
            BuiltinNode::SlidingWindow(n) => n.requires(),
            BuiltinNode::ChunkRms(n) => n.requires(),
            BuiltinNode::Spectrum(n) => n.requires(),
            BuiltinNode::Script(n) => n.requires(),
            BuiltinNode::SplitSensors(n) => n.requires(),
            BuiltinNode::Decision(n) => n.requires(),
        }
    }

    fn produces(&self) -> &[String] {
        match self {
            BuiltinNode::Identity(n) => n.produces(),
            BuiltinNode::Normalize(n) => n.produces(),
            BuiltinNode::MovingAverage(n) => n.produces(),
            BuiltinNode::Split(n) => n.produces(),
            BuiltinNode::SlidingWindow(n) => n.produces(),
            BuiltinNode::ChunkRms(n) => n.produces(),
            BuiltinNode::Spectrum(n) => n.produces(),
            BuiltinNode::Script(n) => n.produces(),
            BuiltinNode::SplitSensors(n) => n.produces(),
            BuiltinNode::Decision(n) => n.produces(),
        }
    }

    fn reset(&mut self) {
        match self {
            BuiltinNode::Identity(n) => n.reset(),
            BuiltinNode::Normalize(n) => n.reset(),
            BuiltinNode::MovingAverage(n) => n.reset(),
            BuiltinNode::Split(n) => n.reset(),
            BuiltinNode::SlidingWindow(n) => n.reset(),
            BuiltinNode::ChunkRms(n) => n.reset(),
            BuiltinNode::Spectrum(n) => n.reset(),
            BuiltinNode::Script(n) => n.reset(),
            BuiltinNode::SplitSensors(n) => n.reset(),
            BuiltinNode::Decision(n) => n.reset(),
        }
    }

    fn process(&mut self, inputs: &BlockMap) -> NodeResult<BlockMap> {
        match self {
            BuiltinNode::Identity(n) => n.process(inputs),
            BuiltinNode::Normalize(n) => n.process(inputs),
            BuiltinNode::MovingAverage(n) => n.process(inputs),
            BuiltinNode::Split(n) => n.process(inputs),
            BuiltinNode::SlidingWindow(n) => n.process(inputs),
            BuiltinNode::ChunkRms(n) => n.process(inputs),
            BuiltinNode::Spectrum(n) => n.process(inputs),
            BuiltinNode::Script(n) => n.process(inputs),
            BuiltinNode::SplitSensors(n) => n.process(inputs),
            BuiltinNode::Decision(n) => n.process(inputs),
        }
    }
}

/// Wrapper that holds either a built-in node (enum dispatch) or a plugin (trait object).
pub enum AnyNode {
    Builtin(BuiltinNode),
    Plugin(Box<dyn ProcessingNode>),
}

impl AnyNode {
    pub fn plugin(node: impl ProcessingNode + 'static) -> Self {
        AnyNode::Plugin(Box::new(node))
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, AnyNode::Builtin(_))
    }
}

impl ProcessingNode for AnyNode {
    fn name(&self) -> &str {
        match self {
            AnyNode::Builtin(n) => n.name(),
            AnyNode::Plugin(n) => n.name(),
        }
    }

    fn requires(&self) -> &[String] {
        match self {
            AnyNode::Builtin(n) => n.requires(),
            AnyNode::Plugin(n) => n.requires(),
        }
    }

    fn produces(&self) -> &[String] {
        match self {
            AnyNode::Builtin(n) => n.produces(),
            AnyNode::Plugin(n) => n.produces(),
        }
    }

    fn reset(&mut self) {
        match self {
            AnyNode::Builtin(n) => n.reset(),
            AnyNode::Plugin(n) => n.reset(),
        }
    }

    fn process(&mut self, inputs: &BlockMap) -> NodeResult<BlockMap> {
        match self {
            AnyNode::Builtin(n) => n.process(inputs),
            AnyNode::Plugin(n) => n.process(inputs),
        }
    }
}

impl std::fmt::Debug for AnyNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyNode")
            .field("name", &self.name())
            .field("builtin", &self.is_builtin())
            .field("requires", &self.requires())
            .field("produces", &self.produces())
            .finish()
    }
}

impl From<BuiltinNode> for AnyNode {
    fn from(node: BuiltinNode) -> Self {
        AnyNode::Builtin(node)
    }
}

impl From<Box<dyn ProcessingNode>> for AnyNode {
    fn from(node: Box<dyn ProcessingNode>) -> Self {
        AnyNode::Plugin(node)
    }
}

macro_rules! builtin_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for AnyNode {
                fn from(node: $ty) -> Self {
                    AnyNode::Builtin(BuiltinNode::$variant(node))
                }
            }
        )*
    };
}

builtin_from!(
    Identity(IdentityNode),
    Normalize(NormalizeNode),
    MovingAverage(MovingAverageNode),
    Split(SplitNode),
    SlidingWindow(SlidingWindowNode),
    ChunkRms(ChunkRmsNode),
    Spectrum(SpectrumNode),
    Script(ScriptNode),
    SplitSensors(SplitSensorsNode),
    Decision(DecisionNode),
);
