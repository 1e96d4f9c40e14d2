//! Lifecycle callbacks for observing a running pipeline.
//!
//! Monitors only observe: every hook returns `()`, so a monitor cannot change
//! what the pipeline does next.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Summary passed to [`PipelineMonitor::on_block_end`] for a completed block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSummary {
    pub block_index: usize,
    /// Wall time spent running the nodes for this block
    pub duration: Duration,
    /// Keys returned to the caller
    pub output_keys: Vec<String>,
}

/// Observer of pipeline execution. All hooks default to no-ops.
pub trait PipelineMonitor: Send {
    fn on_block_start(&mut self, _block_index: usize) {}

    /// Called only for blocks that produced a result.
    fn on_block_end(&mut self, _summary: &BlockSummary) {}

    fn on_node_start(&mut self, _block_index: usize, _node: &str) {}

    fn on_node_end(&mut self, _block_index: usize, _node: &str, _elapsed: Duration) {}

    /// `node` is `None` when the failure came from the data source.
    fn on_error(&mut self, _block_index: usize, _node: Option<&str>, _error: &dyn Error) {}
}

/// Monitor that ignores everything. Used when none is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMonitor;

impl PipelineMonitor for NoopMonitor {}

impl<M: PipelineMonitor + ?Sized> PipelineMonitor for Box<M> {
    fn on_block_start(&mut self, block_index: usize) {
        (**self).on_block_start(block_index)
    }

    fn on_block_end(&mut self, summary: &BlockSummary) {
        (**self).on_block_end(summary)
    }

    fn on_node_start(&mut self, block_index: usize, node: &str) {
        (**self).on_node_start(block_index, node)
    }

    fn on_node_end(&mut self, block_index: usize, node: &str, elapsed: Duration) {
        (**self).on_node_end(block_index, node, elapsed)
    }

    fn on_error(&mut self, block_index: usize, node: Option<&str>, error: &dyn Error) {
        (**self).on_error(block_index, node, error)
    }
}

// ── Logging ──

/// Logs every lifecycle event through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingMonitor {
    prefix: String,
}

impl LoggingMonitor {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingMonitor {
    fn default() -> Self {
        Self::new("pipeline")
    }
}

impl PipelineMonitor for LoggingMonitor {
    fn on_block_start(&mut self, block_index: usize) {
        tracing::debug!("[{}] block {} started", self.prefix, block_index);
    }

    fn on_block_end(&mut self, summary: &BlockSummary) {
        tracing::info!(
            "[{}] block {} done in {:?}: {:?}",
            self.prefix,
            summary.block_index,
            summary.duration,
            summary.output_keys
        );
    }

    fn on_node_start(&mut self, block_index: usize, node: &str) {
        tracing::trace!("[{}] block {} -> {}", self.prefix, block_index, node);
    }

    fn on_node_end(&mut self, block_index: usize, node: &str, elapsed: Duration) {
        tracing::debug!(
            "[{}] block {} <- {} ({:?})",
            self.prefix,
            block_index,
            node,
            elapsed
        );
    }

    fn on_error(&mut self, block_index: usize, node: Option<&str>, error: &dyn Error) {
        tracing::warn!(
            "[{}] block {} failed in {}: {}",
            self.prefix,
            block_index,
            node.unwrap_or("data source"),
            error
        );
    }
}

// ── Metrics ──

/// Per-node counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMetrics {
    /// Completed invocations
    pub invocations: u64,
    /// Invocations that failed
    pub errors: u64,
    /// Total time spent in completed invocations
    pub total_time: Duration,
}

impl NodeMetrics {
    /// Average latency in microseconds over completed invocations.
    pub fn avg_time_us(&self) -> f64 {
        if self.invocations == 0 {
            0.0
        } else {
            self.total_time.as_nanos() as f64 / 1000.0 / self.invocations as f64
        }
    }
}

/// Aggregated pipeline counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineMetrics {
    /// Blocks that produced a result
    pub completed_blocks: u64,
    /// Blocks that failed anywhere
    pub failed_blocks: u64,
    /// Failures raised by the data source
    pub source_errors: u64,
    /// Total time over completed blocks
    pub total_block_time: Duration,
    pub nodes: BTreeMap<String, NodeMetrics>,
}

impl PipelineMetrics {
    pub fn avg_block_time_us(&self) -> f64 {
        if self.completed_blocks == 0 {
            0.0
        } else {
            self.total_block_time.as_nanos() as f64 / 1000.0 / self.completed_blocks as f64
        }
    }

    /// Human-readable summary.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Blocks: {} completed, {} failed ({} source errors), avg {:.1} us",
            self.completed_blocks,
            self.failed_blocks,
            self.source_errors,
            self.avg_block_time_us()
        );
        for (name, m) in &self.nodes {
            let _ = writeln!(
                out,
                "  {:<24} calls={:<6} errors={:<4} avg={:.1} us",
                name,
                m.invocations,
                m.errors,
                m.avg_time_us()
            );
        }
        out
    }
}

/// Read side of a [`MetricsMonitor`], valid after the monitor moves into a pipeline.
#[derive(Debug, Clone, Default)]
pub struct MetricsHandle {
    inner: Arc<Mutex<PipelineMetrics>>,
}

impl MetricsHandle {
    fn lock(&self) -> MutexGuard<'_, PipelineMetrics> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the current counters.
    pub fn snapshot(&self) -> PipelineMetrics {
        self.lock().clone()
    }

    pub fn report(&self) -> String {
        self.lock().report()
    }

    pub fn clear(&self) {
        *self.lock() = PipelineMetrics::default();
    }
}

/// Collects block and node counters into a shared [`MetricsHandle`].
#[derive(Debug, Default)]
pub struct MetricsMonitor {
    handle: MetricsHandle,
}

impl MetricsMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> MetricsHandle {
        self.handle.clone()
    }
}

impl PipelineMonitor for MetricsMonitor {
    fn on_block_end(&mut self, summary: &BlockSummary) {
        let mut m = self.handle.lock();
        m.completed_blocks += 1;
        m.total_block_time += summary.duration;
    }

    fn on_node_end(&mut self, _block_index: usize, node: &str, elapsed: Duration) {
        let mut m = self.handle.lock();
        let entry = m.nodes.entry(node.to_string()).or_default();
        entry.invocations += 1;
        entry.total_time += elapsed;
    }

    fn on_error(&mut self, _block_index: usize, node: Option<&str>, _error: &dyn Error) {
        let mut m = self.handle.lock();
        m.failed_blocks += 1;
        match node {
            Some(name) => m.nodes.entry(name.to_string()).or_default().errors += 1,
            None => m.source_errors += 1,
        }
    }
}

// ── Fan-out ──

/// Forwards every callback to each contained monitor in insertion order.
#[derive(Default)]
pub struct MonitorSet {
    monitors: Vec<Box<dyn PipelineMonitor>>,
}

impl MonitorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, monitor: impl PipelineMonitor + 'static) -> Self {
        self.push(monitor);
        self
    }

    pub fn push(&mut self, monitor: impl PipelineMonitor + 'static) {
        self.monitors.push(Box::new(monitor));
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl PipelineMonitor for MonitorSet {
    fn on_block_start(&mut self, block_index: usize) {
        for m in &mut self.monitors {
            m.on_block_start(block_index);
        }
    }

    fn on_block_end(&mut self, summary: &BlockSummary) {
        for m in &mut self.monitors {
            m.on_block_end(summary);
        }
    }

    fn on_node_start(&mut self, block_index: usize, node: &str) {
        for m in &mut self.monitors {
            m.on_node_start(block_index, node);
        }
    }

    fn on_node_end(&mut self, block_index: usize, node: &str, elapsed: Duration) {
        for m in &mut self.monitors {
            m.on_node_end(block_index, node, elapsed);
        }
    }

    fn on_error(&mut self, block_index: usize, node: Option<&str>, error: &dyn Error) {
        for m in &mut self.monitors {
            m.on_error(block_index, node, error);
        }
    }
}
