//! Block-wise processing pipeline.
//!
//! Each block pulled from a source is seeded into a keyed buffer; nodes run in
//! dependency order, each reading the keys it requires and publishing the keys
//! it produces.
//!
//! # Architecture
//!
//! ```text
//! [BlockSource] ──► seed "raw" ──► [Split] ──► "a" ──► [Normalize] ──► "a_norm"
//!                                          └──► "b" ──► [ChunkRms]  ──► "rms"
//! ```
//!
//! # Design
//!
//! - **Enum dispatch for built-ins**: `BuiltinNode` avoids a vtable call per node.
//! - **Plugins**: any `ProcessingNode` can be boxed into `AnyNode::Plugin`.
//! - **Shared blocks**: outputs are `Arc`ed, so passthrough nodes never copy samples.
//! - **Order resolved once**: `DependencyResolver` runs at build time only.

pub mod error;
pub mod executor;
pub mod monitor;
pub mod node;
pub mod node_type;
pub mod nodes;
pub mod plan;
pub mod policy;
pub mod resolver;

pub use error::{BlockFailure, NodeError, NodeResult, PipelineError, PipelineResult};
pub use executor::{Pipeline, PipelineBuilder, PipelineRun, DEFAULT_INPUT_KEY};
pub use monitor::{
    BlockSummary, LoggingMonitor, MetricsHandle, MetricsMonitor, MonitorSet, NodeMetrics,
    NoopMonitor, PipelineMetrics, PipelineMonitor,
};
pub use node::{input, AnyNode, BlockMap, BuiltinNode, NodeSignature, ProcessingNode};
pub use node_type::{NodeKind, NodeSpec};
pub use plan::{ExecutionPlan, PlanStats};
pub use policy::{ErrorPolicy, PipelineState};
pub use resolver::DependencyResolver;
