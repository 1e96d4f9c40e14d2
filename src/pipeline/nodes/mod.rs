//! Built-in node implementations.

mod chunk_rms;
mod decision;
mod identity;
mod latch;
mod moving_average;
mod normalize;
mod script;
mod sliding_window;
mod spectrum;
mod split;
mod split_sensors;

pub use chunk_rms::ChunkRmsNode;
pub use decision::DecisionNode;
pub use identity::IdentityNode;
pub use moving_average::MovingAverageNode;
pub use normalize::NormalizeNode;
pub use script::ScriptNode;
pub use sliding_window::SlidingWindowNode;
pub use spectrum::SpectrumNode;
pub use split::SplitNode;
pub use split_sensors::SplitSensorsNode;

use crate::data::SharedBlock;
use crate::pipeline::node::BlockMap;

/// Output map holding one block.
fn single(key: &str, block: SharedBlock) -> BlockMap {
    BlockMap::from([(key.to_string(), block)])
}
