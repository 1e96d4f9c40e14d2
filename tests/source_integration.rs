//! Integration tests for data sources feeding a pipeline
//!
//! Mocked sources cover the error classification:
//! - Parse and collation errors fail only the current block
//! - IO errors end the run regardless of policy
//! - Reset reaches the underlying source

mod common;

use blockflow_rs::data::{RawSample, Samples, TimeSeriesBlock};
use blockflow_rs::pipeline::nodes::{ChunkRmsNode, IdentityNode};
use blockflow_rs::pipeline::{BlockFailure, ErrorPolicy, PipelineBuilder, PipelineError, PipelineState};
use blockflow_rs::source::{
    IteratorSource, SineConfig, SineSource, SourceError, SourceResult, StreamDataLoader,
    VecSource,
};
use blockflow_rs::BlockMap;
use chrono::Duration;
use common::builders::BlockBuilder;
use common::mock_helpers::{MockSource, MonitorEvent, RecordingMonitor};
use common::{assert_float_eq, assert_samples_eq};
use std::collections::VecDeque;

fn io_error() -> SourceError {
    SourceError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "device unplugged"))
}

fn parse_error(line: usize) -> SourceError {
    SourceError::Parse {
        line,
        message: "expected value".to_string(),
    }
}

/// Mock yielding the given results in order, then end of stream.
/// Panics on drop unless pulled exactly `calls` times.
fn scripted_source(steps: Vec<Result<f64, SourceError>>, calls: usize) -> MockSource {
    let mut steps: VecDeque<SourceResult<Option<RawSample>>> = steps
        .into_iter()
        .map(|step| step.map(|v| Some(BlockBuilder::new(vec![v]).raw())))
        .collect();
    let mut source = MockSource::new();
    source
        .expect_next_raw_block()
        .times(calls)
        .returning(move || steps.pop_front().unwrap_or(Ok(None)));
    source
}

#[test]
fn test_parse_error_skipped_under_continue() {
    let source = scripted_source(vec![Ok(1.0), Err(parse_error(2)), Ok(2.0)], 4);
    let monitor = RecordingMonitor::new();
    let mut pipeline = PipelineBuilder::new()
        .error_policy(ErrorPolicy::Continue)
        .monitor(monitor.clone())
        .build(StreamDataLoader::new(source))
        .unwrap();

    let outputs: Vec<BlockMap> = pipeline.run(None).map(Result::unwrap).collect();
    assert_eq!(outputs.len(), 2);
    assert_samples_eq(outputs[1]["input"].values().as_slice(), &[2.0], 1e-12);

    assert_eq!(monitor.completed_blocks(), vec![0, 2]);
    match monitor.errors().as_slice() {
        [MonitorEvent::Error { block_index, node, message }] => {
            assert_eq!(*block_index, 1);
            assert_eq!(*node, None);
            assert!(message.contains("line 2"));
        }
        other => panic!("unexpected errors: {other:?}"),
    }
    assert_eq!(pipeline.blocks_processed(), 3);
    assert_eq!(pipeline.state(), PipelineState::Exhausted);
}

#[test]
fn test_parse_error_halts_under_stop() {
    let mut pipeline = PipelineBuilder::new()
        .build(StreamDataLoader::new(scripted_source(vec![Err(parse_error(7))], 1)))
        .unwrap();

    match pipeline.process_next().unwrap_err() {
        PipelineError::Execution {
            block_index: 0,
            node: None,
            source: BlockFailure::Source(SourceError::Parse { line: 7, .. }),
        } => {}
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(pipeline.state(), PipelineState::Failed);
}

#[test]
fn test_io_error_is_fatal_under_continue() {
    // pulled twice: the third item is never reached
    let source = scripted_source(vec![Ok(1.0), Err(io_error()), Ok(2.0)], 2);
    let monitor = RecordingMonitor::new();
    let mut pipeline = PipelineBuilder::new()
        .error_policy(ErrorPolicy::Continue)
        .monitor(monitor.clone())
        .build(StreamDataLoader::new(source))
        .unwrap();

    let results: Vec<_> = pipeline.run(None).collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(
        results[1],
        Err(PipelineError::Source(SourceError::Io(_)))
    ));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(monitor.errors().len(), 1);
    assert!(matches!(pipeline.process_next(), Err(PipelineError::Halted)));
}

#[test]
fn test_reset_reaches_source() {
    let mut source = MockSource::new();
    source.expect_next_raw_block().times(2).returning(|| Ok(None));
    source.expect_reset().times(1).returning(|| Ok(()));

    let mut pipeline = PipelineBuilder::new()
        .build(StreamDataLoader::new(source))
        .unwrap();

    assert_eq!(pipeline.run(None).count(), 0);
    assert_eq!(pipeline.state(), PipelineState::Exhausted);

    pipeline.reset().unwrap();
    assert_eq!(pipeline.state(), PipelineState::Idle);
    assert_eq!(pipeline.run(None).count(), 0);
}

#[test]
fn test_failed_reset_keeps_failed_state() {
    let mut source = MockSource::new();
    source.expect_next_raw_block().times(1).returning(|| Err(io_error()));
    source
        .expect_reset()
        .times(1)
        .returning(|| Err(SourceError::Unsupported));

    let mut pipeline = PipelineBuilder::new()
        .build(StreamDataLoader::new(source))
        .unwrap();

    assert!(pipeline.process_next().is_err());
    assert!(matches!(
        pipeline.reset(),
        Err(PipelineError::Source(SourceError::Unsupported))
    ));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(pipeline.blocks_processed(), 1);
}

#[test]
fn test_max_blocks_bounds_each_pass() {
    let loader = StreamDataLoader::new(SineSource::new(SineConfig {
        blocks: None,
        ..Default::default()
    }))
    .max_blocks(3);
    let mut pipeline = PipelineBuilder::new().build(loader).unwrap();

    assert_eq!(pipeline.run(None).count(), 3);
    assert_eq!(pipeline.state(), PipelineState::Exhausted);

    pipeline.reset().unwrap();
    assert_eq!(pipeline.run(None).count(), 3);
}

#[test]
fn test_sine_blocks_are_phase_continuous() {
    // one full period per block, so every chunk RMS is amplitude / sqrt(2)
    let source = SineSource::new(SineConfig {
        frequency: 5.0,
        amplitude: 2.0,
        sample_rate: 100.0,
        block_size: 20,
        blocks: Some(5),
        ..Default::default()
    });
    let mut pipeline = PipelineBuilder::new()
        .input_key("raw")
        .add_node(ChunkRmsNode::new("raw", "rms", 0.2).unwrap())
        .build(StreamDataLoader::new(source))
        .unwrap();

    let outputs: Vec<BlockMap> = pipeline.run(None).map(Result::unwrap).collect();
    assert_eq!(outputs.len(), 5);
    for out in &outputs {
        let rms = out["rms"].values().as_slice();
        assert_eq!(rms.len(), 1);
        assert_float_eq(rms[0], 2.0_f64.sqrt(), 1e-9);
        assert_eq!(out["raw"].metadata()["source"].as_str(), Some("sine"));
    }
    for pair in outputs.windows(2) {
        assert_eq!(
            pair[1]["raw"].start_timestamp() - pair[0]["raw"].start_timestamp(),
            Duration::milliseconds(200)
        );
    }
}

#[test]
fn test_iterator_source_replays_after_reset() {
    let source = IteratorSource::new(|| {
        (0..3).map(|i| {
            let value = f64::from(i);
            RawSample::from(serde_json::json!([[value], 1.0, i]))
        })
    });
    let mut pipeline = PipelineBuilder::new()
        .input_key("raw")
        .output_keys(["copy"])
        .add_node(IdentityNode::new("raw").alias("copy"))
        .build(StreamDataLoader::new(source))
        .unwrap();

    let first: Vec<f64> = pipeline
        .run(None)
        .map(|r| r.unwrap()["copy"].values().as_slice()[0])
        .collect();
    pipeline.reset().unwrap();
    let second: Vec<f64> = pipeline
        .run(None)
        .map(|r| r.unwrap()["copy"].values().as_slice()[0])
        .collect();

    assert_eq!(first, vec![0.0, 1.0, 2.0]);
    assert_eq!(first, second);
}

#[test]
fn test_custom_collation() {
    let loader = StreamDataLoader::with_collate(VecSource::new(vec![3usize, 5]), |n: usize| {
        TimeSeriesBlock::new(Samples::from_vec(vec![1.0; n]), 10.0, 0.0)
    });
    let mut pipeline = PipelineBuilder::new().build(loader).unwrap();

    let sizes: Vec<usize> = pipeline
        .run(None)
        .map(|r| r.unwrap()["input"].block_size())
        .collect();
    assert_eq!(sizes, vec![3, 5]);
}
