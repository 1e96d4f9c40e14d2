//! Test data builders for creating test objects

use blockflow_rs::data::{MetaValue, Metadata, RawSample, Samples, TimeSeriesBlock};
use chrono::{DateTime, Duration, Utc};

/// Builder for creating test blocks
pub struct BlockBuilder {
    values: Vec<f64>,
    channels: usize,
    sample_rate: f64,
    start: DateTime<Utc>,
    metadata: Metadata,
}

impl BlockBuilder {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            channels: 1,
            sample_rate: 10.0,
            start: DateTime::UNIX_EPOCH,
            metadata: Metadata::new(),
        }
    }

    /// `len` samples counting up from zero.
    pub fn ramp(len: usize) -> Self {
        Self::new((0..len).map(|i| i as f64).collect())
    }

    /// Interpret `values` as interleaved frames of `channels` values.
    pub fn channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn start_seconds(mut self, seconds: f64) -> Self {
        self.start = DateTime::UNIX_EPOCH + Duration::nanoseconds((seconds * 1e9).round() as i64);
        self
    }

    pub fn meta(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> TimeSeriesBlock {
        let samples = if self.channels == 1 {
            Samples::from_vec(self.values)
        } else {
            let frames = self.values.len() / self.channels;
            Samples::new(vec![frames, self.channels], self.values).expect("values must fill whole frames")
        };
        TimeSeriesBlock::with_metadata(samples, self.sample_rate, self.start, self.metadata)
            .expect("test block must be valid")
    }

    pub fn raw(self) -> RawSample {
        self.build().into()
    }
}

/// Consecutive single-channel blocks of `block_size` samples, with start
/// times continuing from one block to the next.
pub fn contiguous_blocks(values: &[f64], block_size: usize, sample_rate: f64) -> Vec<RawSample> {
    values
        .chunks(block_size)
        .enumerate()
        .map(|(i, chunk)| {
            BlockBuilder::new(chunk.to_vec())
                .sample_rate(sample_rate)
                .start_seconds((i * block_size) as f64 / sample_rate)
                .raw()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_builder() {
        let block = BlockBuilder::ramp(6)
            .channels(2)
            .sample_rate(2.0)
            .meta("sensor", "imu")
            .build();

        assert_eq!(block.block_size(), 3);
        assert_eq!(block.frame_width(), 2);
        assert_eq!(block.duration_seconds(), 1.5);
        assert_eq!(block.metadata()["sensor"].as_str(), Some("imu"));
    }
}
