//! Mock construction helpers

use blockflow_rs::data::RawSample;
use blockflow_rs::pipeline::{
    BlockMap, BlockSummary, NodeError, NodeResult, PipelineMonitor, ProcessingNode,
};
use blockflow_rs::source::{DataSource, SourceResult};
use mockall::mock;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mock! {
    pub Source {}

    impl DataSource for Source {
        type Item = RawSample;

        fn next_raw_block(&mut self) -> SourceResult<Option<RawSample>>;
        fn reset(&mut self) -> SourceResult<()>;
    }
}

/// A lifecycle callback as seen by [`RecordingMonitor`].
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    BlockStart(usize),
    BlockEnd { block_index: usize, output_keys: Vec<String> },
    NodeStart(usize, String),
    NodeEnd(usize, String),
    Error { block_index: usize, node: Option<String>, message: String },
}

/// Monitor that records every callback into a shared list.
#[derive(Debug, Clone, Default)]
pub struct RecordingMonitor {
    events: Arc<Mutex<Vec<MonitorEvent>>>,
}

impl RecordingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: MonitorEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<MonitorEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<MonitorEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, MonitorEvent::Error { .. }))
            .collect()
    }

    pub fn completed_blocks(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                MonitorEvent::BlockEnd { block_index, .. } => Some(block_index),
                _ => None,
            })
            .collect()
    }
}

impl PipelineMonitor for RecordingMonitor {
    fn on_block_start(&mut self, block_index: usize) {
        self.record(MonitorEvent::BlockStart(block_index));
    }

    fn on_block_end(&mut self, summary: &BlockSummary) {
        self.record(MonitorEvent::BlockEnd {
            block_index: summary.block_index,
            output_keys: summary.output_keys.clone(),
        });
    }

    fn on_node_start(&mut self, block_index: usize, node: &str) {
        self.record(MonitorEvent::NodeStart(block_index, node.to_string()));
    }

    fn on_node_end(&mut self, block_index: usize, node: &str, _elapsed: Duration) {
        self.record(MonitorEvent::NodeEnd(block_index, node.to_string()));
    }

    fn on_error(&mut self, block_index: usize, node: Option<&str>, error: &dyn Error) {
        self.record(MonitorEvent::Error {
            block_index,
            node: node.map(str::to_string),
            message: error.to_string(),
        });
    }
}

/// Plugin node that passes its input through, failing on selected calls.
pub struct FailingNode {
    name: String,
    requires: Vec<String>,
    produces: Vec<String>,
    fail_on: Vec<usize>,
    always: bool,
    calls: usize,
}

impl FailingNode {
    /// Fails on every call whose zero-based index is in `fail_on`.
    pub fn new(input: &str, output: &str, fail_on: &[usize]) -> Self {
        Self {
            name: "Failing".to_string(),
            requires: vec![input.to_string()],
            produces: vec![output.to_string()],
            fail_on: fail_on.to_vec(),
            always: false,
            calls: 0,
        }
    }

    /// Fails on every call.
    pub fn always(input: &str, output: &str) -> Self {
        let mut node = Self::new(input, output, &[]);
        node.always = true;
        node
    }
}

impl ProcessingNode for FailingNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires(&self) -> &[String] {
        &self.requires
    }

    fn produces(&self) -> &[String] {
        &self.produces
    }

    fn reset(&mut self) {
        self.calls = 0;
    }

    fn process(&mut self, inputs: &BlockMap) -> NodeResult<BlockMap> {
        let call = self.calls;
        self.calls += 1;
        if self.always || self.fail_on.contains(&call) {
            return Err(NodeError::Failed(anyhow::anyhow!("injected failure on call {call}")));
        }
        let block = Arc::clone(&inputs[&self.requires[0]]);
        Ok(BlockMap::from([(self.produces[0].clone(), block)]))
    }
}
