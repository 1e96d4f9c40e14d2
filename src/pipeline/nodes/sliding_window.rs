use super::latch::{positive_seconds, samples_for, Latch, StreamShape};
use super::single;
use crate::data::{MetaValue, Metadata};
use crate::pipeline::error::{NodeResult, PipelineResult};
use crate::pipeline::node::{input, BlockMap, NodeSignature, ProcessingNode};
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
struct WindowParams {
    shape: StreamShape,
    window_samples: usize,
    hop_samples: usize,
}

/// Fixed-length overlapping windows accumulated across blocks.
///
/// Frames are queued until a full window is available; then one window is
/// emitted and the queue advances by the hop. At most one window is emitted
/// per call. Emitted blocks carry the triggering block's timestamp.
///
/// When the hop is longer than the queue, the frames the hop still owes are
/// dropped from the front of the following blocks, so consecutive windows
/// always start exactly one hop apart in the stream. `reset` clears that debt.
#[derive(Debug, Clone)]
pub struct SlidingWindowNode {
    sig: NodeSignature,
    window_seconds: f64,
    hop_seconds: f64,
    latch: Latch<WindowParams>,
    queue: VecDeque<f64>,
    /// Frames still to discard when a hop overran the queue.
    skip_frames: usize,
}

impl SlidingWindowNode {
    pub fn new(
        input: impl Into<String>,
        output: impl Into<String>,
        window_seconds: f64,
        hop_seconds: f64,
    ) -> PipelineResult<Self> {
        let window_seconds = positive_seconds("SlidingWindow", "window_seconds", window_seconds)?;
        let hop_seconds = positive_seconds("SlidingWindow", "hop_seconds", hop_seconds)?;
        Ok(Self {
            sig: NodeSignature::new("SlidingWindow", vec![input.into()], vec![output.into()]),
            window_seconds,
            hop_seconds,
            latch: Latch::Unlatched,
            queue: VecDeque::new(),
            skip_frames: 0,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.sig.name = name.into();
        self
    }

    /// Window length in frames, once latched.
    pub fn window_samples(&self) -> Option<usize> {
        match self.latch {
            Latch::Latched(p) => Some(p.window_samples),
            Latch::Unlatched => None,
        }
    }

    /// Frames currently queued.
    pub fn queued_frames(&self) -> usize {
        match self.latch {
            Latch::Latched(p) => self.queue.len() / p.shape.frame_width,
            Latch::Unlatched => 0,
        }
    }
}

impl ProcessingNode for SlidingWindowNode {
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
        self.skip_frames = 0;
    }

    fn process(&mut self, inputs: &BlockMap) -> NodeResult<BlockMap> {
        let block = input(inputs, self.sig.input())?;

        let was_latched = self.latch.is_latched();
        let params = self.latch.get_or_latch(|| WindowParams {
            shape: StreamShape::of(block),
            window_samples: samples_for(self.window_seconds, block.sample_rate()),
            hop_samples: samples_for(self.hop_seconds, block.sample_rate()),
        });
        if was_latched {
            params.shape.check(block)?;
        } else {
            tracing::debug!(
                "{}: latched {} Hz, window {} frames, hop {} frames",
                self.sig.name(),
                params.shape.sample_rate,
                params.window_samples,
                params.hop_samples
            );
        }

        let width = params.shape.frame_width;
        let skipped = self.skip_frames.min(block.block_size());
        self.skip_frames -= skipped;
        self.queue
            .extend(&block.values().as_slice()[skipped * width..]);

        let window_len = params.window_samples * width;
        if self.queue.len() < window_len {
            return Ok(BlockMap::new());
        }

        let window: Vec<f64> = self.queue.iter().take(window_len).copied().collect();
        let hop_len = params.hop_samples * width;
        let drained = hop_len.min(self.queue.len());
        self.queue.drain(..drained);
        self.skip_frames = (hop_len - drained) / width;

        let values = block.values().with_frame_data(window)?;
        let metadata = block.annotated_metadata(Metadata::from([
            ("window_seconds".to_string(), MetaValue::from(self.window_seconds)),
            ("hop_seconds".to_string(), MetaValue::from(self.hop_seconds)),
            ("window_samples".to_string(), MetaValue::from(params.window_samples)),
        ]));
        let windowed = block.copy_with(Some(values), Some(metadata))?;
        Ok(single(self.sig.output(), Arc::new(windowed)))
    }
}
