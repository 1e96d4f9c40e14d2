//! blockflow - Pipeline Runner
//!
//! Runs a pipeline described by a TOML/JSON config file, or a built-in demo
//! over a synthetic sine source when no path is given.
//!
//! ```text
//! blockflow [CONFIG]
//! ```

use anyhow::Context;
use blockflow_rs::{
    config::{PipelineConfig, SourceConfig},
    pipeline::{
        nodes::{ChunkRmsNode, NormalizeNode, SlidingWindowNode, SplitNode},
        BlockMap, LoggingMonitor, MetricsMonitor, MonitorSet, PipelineBuilder,
    },
    source::SineConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,blockflow_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (builder, source, max_blocks) = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!("Loading pipeline from {}", path);
            let config = PipelineConfig::load(&path)
                .with_context(|| format!("loading config {path}"))?;
            let source = config
                .source
                .clone()
                .unwrap_or_else(|| SourceConfig::Sine(SineConfig::default()));
            (config.builder()?, source, config.max_blocks)
        }
        None => {
            tracing::info!("No config given, running the built-in demo");
            (demo_builder()?, SourceConfig::Sine(demo_source()), None)
        }
    };

    let metrics = MetricsMonitor::new();
    let handle = metrics.handle();
    let monitors = MonitorSet::new()
        .with(LoggingMonitor::new("blockflow"))
        .with(metrics);

    let mut pipeline = builder.monitor(monitors).build(source.open())?;
    tracing::info!("Execution order: {:?}", pipeline.execution_order());

    for (i, result) in pipeline.run(max_blocks).enumerate() {
        match result {
            Ok(outputs) => log_outputs(i, &outputs),
            Err(e) => {
                tracing::error!("Pipeline stopped: {}", e);
                break;
            }
        }
    }

    tracing::info!(
        "Finished in state '{}' after {} blocks",
        pipeline.state(),
        pipeline.blocks_processed()
    );
    println!("{}", handle.report());
    Ok(())
}

/// Split into two branches: normalized sliding windows, and chunk RMS.
fn demo_builder() -> anyhow::Result<PipelineBuilder> {
    Ok(PipelineBuilder::new()
        .input_key("raw")
        .output_keys(["window", "rms"])
        .add_node(SlidingWindowNode::new("a_norm", "window", 1.0, 0.5)?)
        .add_node(ChunkRmsNode::new("b", "rms", 0.1)?)
        .add_node(NormalizeNode::new("a"))
        .add_node(SplitNode::new("raw", ["a", "b"])?))
}

fn demo_source() -> SineConfig {
    SineConfig {
        frequency: 3.0,
        amplitude: 2.5,
        sample_rate: 100.0,
        block_size: 50,
        blocks: Some(8),
        ..Default::default()
    }
}

fn log_outputs(index: usize, outputs: &BlockMap) {
    for (key, block) in outputs {
        tracing::info!(
            "result {} '{}': {} frames @ {} Hz from {}",
            index,
            key,
            block.block_size(),
            block.sample_rate(),
            block.start_timestamp()
        );
    }
}
