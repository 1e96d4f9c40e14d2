use super::single;
use crate::analysis::{SpectrumAnalyzer, SpectrumConfig};
use crate::data::{MetaValue, Metadata, Samples, TimeSeriesBlock};
use crate::pipeline::error::NodeResult;
use crate::pipeline::node::{input, BlockMap, NodeSignature, ProcessingNode};
use std::sync::Arc;

/// Magnitude spectrum of each block.
///
/// Channels are averaged per frame before the transform. The output axis is
/// frequency: bin `i` sits at `i / sample_rate` Hz of the output block, so
/// `time_axis()` on the result reads directly in Hz.
pub struct SpectrumNode {
    sig: NodeSignature,
    analyzer: SpectrumAnalyzer,
}

impl SpectrumNode {
    /// Output key defaults to `{input}_spectrum`.
    pub fn new(input: impl Into<String>, config: SpectrumConfig) -> Self {
        let input = input.into();
        let output = format!("{input}_spectrum");
        Self {
            sig: NodeSignature::new("Spectrum", vec![input], vec![output]),
            analyzer: SpectrumAnalyzer::new(config),
        }
    }

    pub fn output(mut self, output: impl Into<String>) -> Self {
        self.sig.produces = vec![output.into()];
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.sig.name = name.into();
        self
    }
}

impl ProcessingNode for SpectrumNode {
    fn name(&self) -> &str {
        self.sig.name()
    }

    fn requires(&self) -> &[String] {
        self.sig.requires()
    }

    fn produces(&self) -> &[String] {
        self.sig.produces()
    }

    fn process(&mut self, inputs: &BlockMap) -> NodeResult<BlockMap> {
        let block = input(inputs, self.sig.input())?;
        let mono: Vec<f64> = block
            .values()
            .iter_frames()
            .map(|frame| frame.iter().sum::<f64>() / frame.len() as f64)
            .collect();

        let spectrum = self.analyzer.compute(&mono, block.sample_rate());
        let mut extra = Metadata::from([
            (
                "frequency_resolution".to_string(),
                MetaValue::from(spectrum.frequency_resolution),
            ),
            (
                "window_function".to_string(),
                MetaValue::from(self.analyzer.config().window.display_name()),
            ),
        ]);
        if let Some((freq, _)) = spectrum.peak() {
            extra.insert("peak_frequency".to_string(), MetaValue::from(freq));
        }

        let out = TimeSeriesBlock::with_metadata(
            Samples::from_vec(spectrum.magnitudes),
            1.0 / spectrum.frequency_resolution,
            block.start_timestamp(),
            block.annotated_metadata(extra),
        )?;
        Ok(single(self.sig.output(), Arc::new(out)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::WindowFunction;
    use crate::data::SharedBlock;
    use std::f64::consts::PI;

    #[test]
    fn test_peak_frequency_annotated() {
        let values: Vec<f64> = (0..256)
            .map(|i| (2.0 * PI * 16.0 * i as f64 / 256.0).sin())
            .collect();
        let b: SharedBlock = Arc::new(TimeSeriesBlock::new(Samples::from_vec(values), 256.0, 0.0).unwrap());
        let mut node = SpectrumNode::new(
            "x",
            SpectrumConfig {
                window: WindowFunction::Rectangular,
                ..Default::default()
            },
        );

        let out = node.process(&BlockMap::from([("x".to_string(), b)])).unwrap();
        let spectrum = &out["x_spectrum"];
        assert_eq!(spectrum.block_size(), 129);
        assert_eq!(spectrum.metadata()["peak_frequency"].as_float(), Some(16.0));
        assert_eq!(spectrum.time_axis()[16], 16.0);
    }
}
