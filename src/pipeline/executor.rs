//! Pipeline executor: the builder and the per-block loop.
//!
//! Each call to [`Pipeline::process_next`]:
//! 1. Pull one block from the source and seed the buffer with it.
//! 2. Run the nodes in resolved order, feeding each its required keys.
//! 3. Check every returned key was declared and publish it to the buffer.
//! 4. Return the produced blocks, filtered by the output allow-list if any.

use crate::data::{KeyedBlockBuffer, SharedBlock, TimeSeriesBlock};
use crate::pipeline::error::{BlockFailure, PipelineError, PipelineResult};
use crate::pipeline::monitor::{BlockSummary, NoopMonitor, PipelineMonitor};
use crate::pipeline::node::{AnyNode, BlockMap, ProcessingNode};
use crate::pipeline::plan::ExecutionPlan;
use crate::pipeline::policy::{ErrorPolicy, PipelineState};
use crate::pipeline::resolver::DependencyResolver;
use crate::source::BlockSource;
use std::collections::BTreeSet;
use std::iter::FusedIterator;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_INPUT_KEY: &str = "input";

/// Collects nodes and options, then resolves them into a [`Pipeline`].
pub struct PipelineBuilder {
    input_key: String,
    output_keys: Option<Vec<String>>,
    error_policy: ErrorPolicy,
    monitor: Option<Box<dyn PipelineMonitor>>,
    nodes: Vec<AnyNode>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            input_key: DEFAULT_INPUT_KEY.to_string(),
            output_keys: None,
            error_policy: ErrorPolicy::default(),
            monitor: None,
            nodes: Vec::new(),
        }
    }

    /// Key under which each source block is seeded.
    pub fn input_key(mut self, key: impl Into<String>) -> Self {
        self.input_key = key.into();
        self
    }

    /// Restrict results to these keys. An empty list yields empty results.
    pub fn output_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn monitor(mut self, monitor: impl PipelineMonitor + 'static) -> Self {
        self.monitor = Some(Box::new(monitor));
        self
    }

    /// Register a node. Registration order breaks ties in the execution order.
    pub fn add_node(mut self, node: impl Into<AnyNode>) -> Self {
        self.nodes.push(node.into());
        self
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Resolve the execution order and attach `source`.
    ///
    /// # Errors
    /// `UnresolvedDependencies` when some node's inputs can never be produced.
    pub fn build(self, source: impl BlockSource + 'static) -> PipelineResult<Pipeline> {
        let mut nodes = self.nodes;
        let plan = DependencyResolver::resolve(&nodes, &self.input_key)?;

        for key in &plan.stats.duplicate_outputs {
            tracing::warn!("Key '{}' is produced by more than one node; the last writer wins", key);
        }
        if let Some(keys) = &self.output_keys {
            for key in keys.iter().filter(|k| !plan.available_keys.contains(*k)) {
                tracing::warn!("Output key '{}' is not produced by any node", key);
            }
        }

        for node in &mut nodes {
            node.reset();
        }

        tracing::info!(
            "Pipeline built: {} nodes resolved in {} passes ({} us), policy {:?}",
            plan.stats.total_nodes,
            plan.stats.passes,
            plan.stats.resolve_time_us,
            self.error_policy,
        );

        Ok(Pipeline {
            input_key: self.input_key,
            output_keys: self.output_keys,
            error_policy: self.error_policy,
            monitor: self.monitor.unwrap_or_else(|| Box::new(NoopMonitor)),
            nodes,
            plan,
            source: Box::new(source),
            buffer: KeyedBlockBuffer::new(),
            state: PipelineState::Idle,
            blocks_processed: 0,
        })
    }
}

/// Outcome of one failed block before the policy is applied.
enum Failure {
    /// Bad data for this block only; subject to the error policy.
    Block {
        node: Option<String>,
        source: BlockFailure,
    },
    /// Wiring or configuration problem; always halts.
    Fatal {
        node: Option<String>,
        error: PipelineError,
    },
}

/// A built pipeline bound to its data source.
pub struct Pipeline {
    input_key: String,
    output_keys: Option<Vec<String>>,
    error_policy: ErrorPolicy,
    monitor: Box<dyn PipelineMonitor>,
    /// Nodes in registration order; `plan.order` indexes into this.
    nodes: Vec<AnyNode>,
    plan: ExecutionPlan,
    source: Box<dyn BlockSource>,
    buffer: KeyedBlockBuffer,
    state: PipelineState,
    blocks_processed: usize,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    // ── Introspection ──

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn input_key(&self) -> &str {
        &self.input_key
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    /// Blocks pulled from the source since build or the last reset, failed ones included.
    pub fn blocks_processed(&self) -> usize {
        self.blocks_processed
    }

    /// Node names in execution order.
    pub fn execution_order(&self) -> Vec<&str> {
        self.plan
            .order
            .iter()
            .map(|&idx| self.nodes[idx].name())
            .collect()
    }

    /// Every key the pipeline can produce, the input key included.
    pub fn available_outputs(&self) -> &BTreeSet<String> {
        &self.plan.available_keys
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    // ── Lifecycle ──

    /// Rewind the source and clear all node state.
    ///
    /// # Errors
    /// Propagates the source's reset error (`Unsupported` for one-shot
    /// sources); the pipeline is left untouched in that case.
    pub fn reset(&mut self) -> PipelineResult<()> {
        self.source.reset()?;
        for node in &mut self.nodes {
            node.reset();
        }
        self.buffer.clear();
        self.blocks_processed = 0;
        self.state = PipelineState::Idle;
        tracing::info!("Pipeline reset");
        Ok(())
    }

    /// Lazily process up to `max_blocks` results (unbounded when `None`).
    ///
    /// The iterator ends at end of stream, or right after yielding an error.
    pub fn run(&mut self, max_blocks: Option<usize>) -> PipelineRun<'_> {
        PipelineRun {
            pipeline: self,
            remaining: max_blocks,
            done: false,
        }
    }

    // ── Block execution ──

    /// Process the next block.
    ///
    /// Returns `Ok(None)` at end of stream. Under [`ErrorPolicy::Continue`]
    /// failed blocks are skipped, so this only returns a result, the end of
    /// the stream, or a fatal error.
    ///
    /// # Errors
    /// `Halted` once the pipeline has failed, until [`reset`](Self::reset).
    pub fn process_next(&mut self) -> PipelineResult<Option<BlockMap>> {
        match self.state {
            PipelineState::Failed => return Err(PipelineError::Halted),
            PipelineState::Exhausted => return Ok(None),
            PipelineState::Idle => {
                tracing::info!("Pipeline started");
                self.state = PipelineState::Running;
            }
            PipelineState::Running => {}
        }

        loop {
            let block_index = self.blocks_processed;

            let block = match self.source.next_block() {
                Ok(Some(block)) => block,
                Ok(None) => {
                    self.state = PipelineState::Exhausted;
                    tracing::info!("Source exhausted after {} blocks", block_index);
                    return Ok(None);
                }
                Err(e) => {
                    self.blocks_processed += 1;
                    let failure = if e.is_recoverable() {
                        Failure::Block {
                            node: None,
                            source: e.into(),
                        }
                    } else {
                        Failure::Fatal {
                            node: None,
                            error: e.into(),
                        }
                    };
                    match self.handle_failure(block_index, failure) {
                        Some(err) => return Err(err),
                        None => continue,
                    }
                }
            };

            self.blocks_processed += 1;
            self.monitor.on_block_start(block_index);
            let started = Instant::now();

            match self.execute_block(block_index, block) {
                Ok(produced) => {
                    let result = self.select_outputs(produced);
                    let summary = BlockSummary {
                        block_index,
                        duration: started.elapsed(),
                        output_keys: result.keys().cloned().collect(),
                    };
                    tracing::debug!(
                        "Block {} processed in {:?}: {:?}",
                        block_index,
                        summary.duration,
                        summary.output_keys
                    );
                    self.monitor.on_block_end(&summary);
                    return Ok(Some(result));
                }
                Err(failure) => {
                    if let Some(err) = self.handle_failure(block_index, failure) {
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Run every node over one seeded block.
    fn execute_block(
        &mut self,
        block_index: usize,
        block: TimeSeriesBlock,
    ) -> Result<BlockMap, Failure> {
        let block: SharedBlock = Arc::new(block);
        self.buffer.clear();
        self.buffer.push(self.input_key.clone(), Arc::clone(&block));
        let mut produced = BlockMap::from([(self.input_key.clone(), block)]);

        for &idx in &self.plan.order {
            let node = &mut self.nodes[idx];

            let mut inputs = BlockMap::new();
            for key in node.requires() {
                let found = self.buffer.get(key).map_err(|e| Failure::Fatal {
                    node: Some(node.name().to_string()),
                    error: e.into(),
                })?;
                inputs.insert(key.clone(), Arc::clone(found));
            }

            self.monitor.on_node_start(block_index, node.name());
            let node_started = Instant::now();
            let outputs = match node.process(&inputs) {
                Ok(outputs) => outputs,
                Err(e) if e.is_fatal() => {
                    let name = node.name().to_string();
                    return Err(Failure::Fatal {
                        node: Some(name.clone()),
                        error: PipelineError::NodeConfiguration {
                            block_index,
                            node: name,
                            source: e,
                        },
                    });
                }
                Err(e) => {
                    return Err(Failure::Block {
                        node: Some(node.name().to_string()),
                        source: e.into(),
                    });
                }
            };
            self.monitor
                .on_node_end(block_index, node.name(), node_started.elapsed());

            for (key, value) in outputs {
                if !node.produces().contains(&key) {
                    let name = node.name().to_string();
                    return Err(Failure::Fatal {
                        node: Some(name.clone()),
                        error: PipelineError::UndeclaredOutput { node: name, key },
                    });
                }
                self.buffer.push(key.clone(), Arc::clone(&value));
                produced.insert(key, value);
            }
        }

        Ok(produced)
    }

    fn select_outputs(&self, mut produced: BlockMap) -> BlockMap {
        match &self.output_keys {
            None => produced,
            Some(keys) => keys
                .iter()
                .filter_map(|key| produced.remove_entry(key))
                .collect(),
        }
    }

    /// Apply the error policy. Returns the error to surface, or `None` to
    /// move on to the next block.
    fn handle_failure(&mut self, block_index: usize, failure: Failure) -> Option<PipelineError> {
        match failure {
            Failure::Fatal { node, error } => {
                self.monitor.on_error(block_index, node.as_deref(), &error);
                tracing::error!("Block {} failed fatally: {}", block_index, error);
                self.state = PipelineState::Failed;
                Some(error)
            }
            Failure::Block { node, source } => {
                self.monitor.on_error(block_index, node.as_deref(), &source);
                match self.error_policy {
                    ErrorPolicy::Continue => {
                        tracing::warn!(
                            "Skipping block {} after failure in {}: {}",
                            block_index,
                            node.as_deref().unwrap_or("data source"),
                            source
                        );
                        None
                    }
                    ErrorPolicy::Stop => {
                        let error = PipelineError::Execution {
                            block_index,
                            node,
                            source,
                        };
                        tracing::error!("{}", error);
                        self.state = PipelineState::Failed;
                        Some(error)
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("input_key", &self.input_key)
            .field("output_keys", &self.output_keys)
            .field("error_policy", &self.error_policy)
            .field(
                "nodes",
                &self.nodes.iter().map(|n| n.name()).collect::<Vec<_>>(),
            )
            .field("has_monitor", &self.monitor.is_some())
            .finish()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("input_key", &self.input_key)
            .field("output_keys", &self.output_keys)
            .field("error_policy", &self.error_policy)
            .field("execution_order", &self.execution_order())
            .field("state", &self.state)
            .field("blocks_processed", &self.blocks_processed)
            .finish()
    }
}

/// Lazy sequence of results returned by [`Pipeline::run`].
pub struct PipelineRun<'a> {
    pipeline: &'a mut Pipeline,
    remaining: Option<usize>,
    done: bool,
}

impl Iterator for PipelineRun<'_> {
    type Item = PipelineResult<BlockMap>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == Some(0) {
            return None;
        }
        match self.pipeline.process_next() {
            Ok(Some(result)) => {
                if let Some(n) = self.remaining.as_mut() {
                    *n -= 1;
                }
                Some(Ok(result))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for PipelineRun<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataError, RawSample, Samples};
    use crate::pipeline::error::{NodeError, NodeResult};
    use crate::pipeline::monitor::{MetricsMonitor, PipelineMonitor};
    use crate::pipeline::nodes::{IdentityNode, MovingAverageNode, NormalizeNode, SplitNode};
    use crate::source::{OnceSource, SourceError, StreamDataLoader, VecSource};

    fn block(values: Vec<f64>) -> RawSample {
        TimeSeriesBlock::new(Samples::from_vec(values), 10.0, 0.0)
            .unwrap()
            .into()
    }

    fn source(blocks: Vec<Vec<f64>>) -> StreamDataLoader<VecSource<RawSample>> {
        StreamDataLoader::new(VecSource::new(blocks.into_iter().map(block).collect()))
    }

    /// Fails on blocks whose first sample is negative.
    struct RejectNegative {
        requires: Vec<String>,
        produces: Vec<String>,
    }

    impl RejectNegative {
        fn new() -> Self {
            Self {
                requires: vec!["raw".into()],
                produces: vec!["checked".into()],
            }
        }
    }

    impl ProcessingNode for RejectNegative {
        fn name(&self) -> &str {
            "RejectNegative"
        }
        fn requires(&self) -> &[String] {
            &self.requires
        }
        fn produces(&self) -> &[String] {
            &self.produces
        }
        fn process(&mut self, inputs: &BlockMap) -> NodeResult<BlockMap> {
            let b = &inputs["raw"];
            if b.values().as_slice()[0] < 0.0 {
                return Err(NodeError::Data(DataError::Empty));
            }
            Ok(BlockMap::from([("checked".to_string(), Arc::clone(b))]))
        }
    }

    #[test]
    fn test_results_include_seed_without_allow_list() {
        let mut p = Pipeline::builder()
            .input_key("raw")
            .add_node(NormalizeNode::new("raw"))
            .build(source(vec![vec![1.0, -4.0]]))
            .unwrap();

        let result = p.process_next().unwrap().unwrap();
        let keys: Vec<&str> = result.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["raw", "raw_norm"]);
        assert_eq!(result["raw_norm"].values().as_slice(), &[0.25, -1.0]);
        assert!(p.process_next().unwrap().is_none());
        assert_eq!(p.state(), PipelineState::Exhausted);
        assert!(p.process_next().unwrap().is_none());
    }

    #[test]
    fn test_allow_list_filters_results() {
        let mut p = Pipeline::builder()
            .input_key("raw")
            .output_keys(["raw_norm_ma1", "never_produced"])
            .add_node(MovingAverageNode::new("raw_norm", 1).unwrap())
            .add_node(NormalizeNode::new("raw"))
            .build(source(vec![vec![2.0, 1.0]]))
            .unwrap();

        assert_eq!(p.execution_order(), vec!["NormalizeAmplitude", "MovingAverage"]);
        let result = p.process_next().unwrap().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result["raw_norm_ma1"].values().as_slice(), &[1.0, 0.5]);
    }

    #[test]
    fn test_available_outputs() {
        let p = Pipeline::builder()
            .input_key("raw")
            .add_node(SplitNode::new("raw", ["a", "b"]).unwrap())
            .add_node(IdentityNode::new("a").alias("c"))
            .build(source(vec![]))
            .unwrap();
        let keys: Vec<&str> = p.available_outputs().iter().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "c", "raw"]);
    }

    #[test]
    fn test_unresolved_fails_at_build() {
        let err = Pipeline::builder()
            .input_key("raw")
            .add_node(NormalizeNode::new("missing"))
            .build(source(vec![]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnresolvedDependencies { .. }));
    }

    #[test]
    fn test_stop_policy_halts() {
        let mut p = Pipeline::builder()
            .input_key("raw")
            .add_node(AnyNode::plugin(RejectNegative::new()))
            .build(source(vec![vec![1.0], vec![-1.0], vec![2.0]]))
            .unwrap();

        assert!(p.process_next().unwrap().is_some());
        match p.process_next().unwrap_err() {
            PipelineError::Execution {
                block_index, node, ..
            } => {
                assert_eq!(block_index, 1);
                assert_eq!(node.as_deref(), Some("RejectNegative"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(p.state(), PipelineState::Failed);
        assert!(matches!(p.process_next(), Err(PipelineError::Halted)));
    }

    #[test]
    fn test_continue_policy_skips() {
        let metrics = MetricsMonitor::new();
        let handle = metrics.handle();
        let mut p = Pipeline::builder()
            .input_key("raw")
            .error_policy(ErrorPolicy::Continue)
            .monitor(metrics)
            .add_node(AnyNode::plugin(RejectNegative::new()))
            .build(source(vec![vec![-1.0], vec![2.0], vec![-3.0]]))
            .unwrap();

        let results: Vec<_> = p.run(None).collect::<PipelineResult<_>>().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["checked"].values().as_slice(), &[2.0]);
        assert_eq!(p.blocks_processed(), 3);

        let m = handle.snapshot();
        assert_eq!(m.completed_blocks, 1);
        assert_eq!(m.failed_blocks, 2);
    }

    #[test]
    fn test_collation_failure_follows_policy() {
        let bad: RawSample = serde_json::json!({"values": [], "sample_rate": 1.0, "timestamp": 0}).into();
        let src = StreamDataLoader::new(VecSource::new(vec![bad, block(vec![1.0])]));
        let mut p = Pipeline::builder()
            .error_policy(ErrorPolicy::Stop)
            .build(src)
            .unwrap();

        match p.process_next().unwrap_err() {
            PipelineError::Execution {
                node: None,
                source: BlockFailure::Source(SourceError::Data(_)),
                ..
            } => {}
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_undeclared_output_is_fatal_under_continue() {
        struct Rogue(Vec<String>, Vec<String>);
        impl ProcessingNode for Rogue {
            fn name(&self) -> &str {
                "Rogue"
            }
            fn requires(&self) -> &[String] {
                &self.0
            }
            fn produces(&self) -> &[String] {
                &self.1
            }
            fn process(&mut self, inputs: &BlockMap) -> NodeResult<BlockMap> {
                Ok(BlockMap::from([("other".to_string(), Arc::clone(&inputs["input"]))]))
            }
        }

        let mut p = Pipeline::builder()
            .error_policy(ErrorPolicy::Continue)
            .add_node(AnyNode::plugin(Rogue(vec!["input".into()], vec!["declared".into()])))
            .build(source(vec![vec![1.0], vec![2.0]]))
            .unwrap();

        assert!(matches!(
            p.process_next(),
            Err(PipelineError::UndeclaredOutput { .. })
        ));
        assert_eq!(p.state(), PipelineState::Failed);
    }

    #[test]
    fn test_run_limits_and_stops_after_error() {
        let mut p = Pipeline::builder()
            .build(source(vec![vec![1.0], vec![2.0], vec![3.0]]))
            .unwrap();
        assert_eq!(p.run(Some(2)).count(), 2);
        assert_eq!(p.run(Some(0)).count(), 0);
        assert_eq!(p.run(None).count(), 1);

        let mut p = Pipeline::builder()
            .input_key("raw")
            .add_node(AnyNode::plugin(RejectNegative::new()))
            .build(source(vec![vec![-1.0], vec![1.0]]))
            .unwrap();
        let items: Vec<_> = p.run(None).collect();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[test]
    fn test_reset_replays_and_clears_failure() {
        let mut p = Pipeline::builder()
            .input_key("raw")
            .add_node(AnyNode::plugin(RejectNegative::new()))
            .build(source(vec![vec![1.0], vec![-1.0]]))
            .unwrap();

        let _ = p.run(None).count();
        assert_eq!(p.state(), PipelineState::Failed);
        p.reset().unwrap();
        assert_eq!(p.state(), PipelineState::Idle);
        assert_eq!(p.blocks_processed(), 0);
        assert!(p.process_next().unwrap().is_some());
    }

    #[test]
    fn test_reset_unsupported_source() {
        let items = vec![block(vec![1.0])].into_iter();
        let mut p = Pipeline::builder()
            .build(StreamDataLoader::new(OnceSource::new(items)))
            .unwrap();
        assert!(matches!(
            p.reset(),
            Err(PipelineError::Source(SourceError::Unsupported))
        ));
    }

    #[test]
    fn test_monitor_hook_order() {
        #[derive(Default)]
        struct Events(Arc<std::sync::Mutex<Vec<String>>>);
        impl PipelineMonitor for Events {
            fn on_block_start(&mut self, i: usize) {
                self.0.lock().unwrap().push(format!("start {i}"));
            }
            fn on_node_start(&mut self, _i: usize, node: &str) {
                self.0.lock().unwrap().push(format!("node {node}"));
            }
            fn on_block_end(&mut self, s: &BlockSummary) {
                self.0.lock().unwrap().push(format!("end {}", s.block_index));
            }
        }

        let events = Events::default();
        let log = Arc::clone(&events.0);
        let mut p = Pipeline::builder()
            .monitor(events)
            .add_node(NormalizeNode::new("input"))
            .build(source(vec![vec![1.0]]))
            .unwrap();
        p.process_next().unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["start 0", "node NormalizeAmplitude", "end 0"]
        );
    }

    #[test]
    fn test_builder_debug_lists_nodes() {
        let builder = Pipeline::builder()
            .input_key("raw")
            .add_node(NormalizeNode::new("raw"))
            .add_node(AnyNode::plugin(RejectNegative::new()));
        let text = format!("{builder:?}");
        assert!(text.contains("PipelineBuilder"));
        assert!(text.contains("\"raw\""));
        assert!(text.contains("[\"NormalizeAmplitude\", \"RejectNegative\"]"));
    }
}
