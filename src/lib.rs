//! # blockflow-rs: Block-wise Time-Series Pipelines
//!
//! Streams of finite sample blocks are pushed through a graph of named
//! processing nodes. Nodes declare the keys they read and write; the pipeline
//! orders them once at build time and then runs them block by block.
//!
//! ## Architecture
//!
//! - **Data**: `TimeSeriesBlock` values (samples, rate, start time, metadata)
//!   and the per-block `KeyedBlockBuffer`
//! - **Sources**: `DataSource` implementations collated into blocks by a
//!   `StreamDataLoader`
//! - **Pipeline**: dependency resolution, the per-block executor, error
//!   policies and monitors
//! - **Nodes**: stateless transforms plus stateful windowing and chunk RMS,
//!   spectrum analysis (rustfft), Rhai expressions, and multi-sensor
//!   unpacking with threshold decisions
//! - **Config**: TOML/JSON pipeline descriptions
//!
//! ## Example
//!
//! ```no_run
//! use blockflow_rs::pipeline::nodes::{ChunkRmsNode, NormalizeNode};
//! use blockflow_rs::pipeline::PipelineBuilder;
//! use blockflow_rs::source::{SineConfig, SineSource, StreamDataLoader};
//!
//! fn main() -> blockflow_rs::Result<()> {
//!     let source = StreamDataLoader::new(SineSource::new(SineConfig::default()));
//!     let mut pipeline = PipelineBuilder::new()
//!         .input_key("raw")
//!         .output_keys(["raw_norm", "rms"])
//!         .add_node(NormalizeNode::new("raw"))
//!         .add_node(ChunkRmsNode::new("raw", "rms", 0.1)?)
//!         .build(source)?;
//!
//!     for result in pipeline.run(Some(5)) {
//!         let outputs = result?;
//!         println!("{:?}", outputs.keys().collect::<Vec<_>>());
//!     }
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod scripting;
pub mod source;

// Re-export commonly used types
pub use config::{PipelineConfig, SourceConfig};
pub use data::{KeyedBlockBuffer, MetaValue, Metadata, Samples, SharedBlock, TimeSeriesBlock};
pub use error::{BlockflowError, Result, ResultExt};
pub use pipeline::{
    BlockMap, ErrorPolicy, Pipeline, PipelineBuilder, PipelineError, PipelineMonitor,
    PipelineState, ProcessingNode,
};
pub use source::{BlockSource, DataSource, StreamDataLoader};
