use super::{DataSource, SourceResult};
use crate::data::{DataError, MetaValue, Metadata, RawSample, Samples, TimeSeriesBlock};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Sine generator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SineConfig {
    pub frequency: f64,
    pub amplitude: f64,
    pub sample_rate: f64,
    pub block_size: usize,
    /// `None` generates forever.
    pub blocks: Option<usize>,
    pub start: DateTime<Utc>,
}

impl Default for SineConfig {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            amplitude: 1.0,
            sample_rate: 100.0,
            block_size: 50,
            blocks: Some(10),
            start: DateTime::UNIX_EPOCH,
        }
    }
}

/// Phase-continuous sine wave split into fixed-size blocks.
pub struct SineSource {
    config: SineConfig,
    emitted: usize,
}

impl SineSource {
    pub fn new(config: SineConfig) -> Self {
        Self { config, emitted: 0 }
    }

    pub fn config(&self) -> &SineConfig {
        &self.config
    }

    fn block(&self, index: usize) -> Result<TimeSeriesBlock, DataError> {
        let cfg = &self.config;
        let first = index * cfg.block_size;
        let values: Vec<f64> = (first..first + cfg.block_size)
            .map(|n| cfg.amplitude * (2.0 * PI * cfg.frequency * n as f64 / cfg.sample_rate).sin())
            .collect();

        let offset_ns = (first as f64 / cfg.sample_rate * 1e9).round() as i64;
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), MetaValue::from("sine"));
        metadata.insert("block_index".into(), MetaValue::from(index));
        metadata.insert("frequency".into(), MetaValue::from(cfg.frequency));

        TimeSeriesBlock::with_metadata(
            Samples::from_vec(values),
            cfg.sample_rate,
            cfg.start + Duration::nanoseconds(offset_ns),
            metadata,
        )
    }
}

impl DataSource for SineSource {
    type Item = RawSample;

    fn next_raw_block(&mut self) -> SourceResult<Option<RawSample>> {
        if self.config.blocks.is_some_and(|max| self.emitted >= max) {
            return Ok(None);
        }
        let block = self.block(self.emitted)?;
        self.emitted += 1;
        Ok(Some(RawSample::Block(block)))
    }

    fn reset(&mut self) -> SourceResult<()> {
        self.emitted = 0;
        Ok(())
    }
}
