use super::latch::{positive_seconds, samples_for, Latch, StreamShape};
use super::single;
use crate::data::{MetaValue, Metadata, Samples, TimeSeriesBlock};
use crate::pipeline::error::{NodeResult, PipelineResult};
use crate::pipeline::node::{input, BlockMap, NodeSignature, ProcessingNode};
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ChunkParams {
    shape: StreamShape,
    chunk_samples: usize,
}

/// Root-mean-square of consecutive, non-overlapping chunks.
///
/// Every complete chunk in the queue is drained on each call, so the RMS
/// sequence does not depend on how the input stream was split into blocks.
/// The output rate is one value per chunk (`1 / chunk_seconds`).
#[derive(Debug, Clone)]
pub struct ChunkRmsNode {
    sig: NodeSignature,
    chunk_seconds: f64,
    latch: Latch<ChunkParams>,
    queue: VecDeque<f64>,
}

impl ChunkRmsNode {
    pub fn new(
        input: impl Into<String>,
        output: impl Into<String>,
        chunk_seconds: f64,
    ) -> PipelineResult<Self> {
        let chunk_seconds = positive_seconds("ChunkRms", "chunk_seconds", chunk_seconds)?;
        Ok(Self {
            sig: NodeSignature::new("ChunkRms", vec![input.into()], vec![output.into()]),
            chunk_seconds,
            latch: Latch::Unlatched,
            queue: VecDeque::new(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.sig.name = name.into();
        self
    }

    pub fn chunk_samples(&self) -> Option<usize> {
        match self.latch {
            Latch::Latched(p) => Some(p.chunk_samples),
            Latch::Unlatched => None,
        }
    }
}

impl ProcessingNode for ChunkRmsNode {
    fn name(&self) -> &str {
        self.sig.name()
    }

    fn requires(&self) -> &[String] {
        self.sig.requires()
    }

    fn produces(&self) -> &[String] {
        self.sig.produces()
    }

    fn reset(&mut self) {
        self.latch = Latch::Unlatched;
        self.queue.clear();
    }

    fn process(&mut self, inputs: &BlockMap) -> NodeResult<BlockMap> {
        let block = input(inputs, self.sig.input())?;

        let was_latched = self.latch.is_latched();
        let params = self.latch.get_or_latch(|| ChunkParams {
            shape: StreamShape::of(block),
            chunk_samples: samples_for(self.chunk_seconds, block.sample_rate()),
        });
        if was_latched {
            params.shape.check(block)?;
        }

        self.queue.extend(block.values().as_slice());

        let chunk_len = params.chunk_samples * params.shape.frame_width;
        let mut rms = Vec::new();
        while self.queue.len() >= chunk_len {
            let sum_sq: f64 = self.queue.drain(..chunk_len).map(|v| v * v).sum();
            rms.push((sum_sq / chunk_len as f64).sqrt());
        }
        if rms.is_empty() {
            return Ok(BlockMap::new());
        }

        let metadata = block.annotated_metadata(Metadata::from([
            ("chunk_seconds".to_string(), MetaValue::from(self.chunk_seconds)),
            ("chunk_count".to_string(), MetaValue::from(rms.len())),
        ]));
        let out = TimeSeriesBlock::with_metadata(
            Samples::from_vec(rms),
            1.0 / self.chunk_seconds,
            block.start_timestamp(),
            metadata,
        )?;
        Ok(single(self.sig.output(), Arc::new(out)))
    }
}
