//! Magnitude spectrum of a block.
//!
//! Provides:
//! - window functions applied before the transform
//! - single-sided magnitude spectrum with optional DC removal and zero padding
//! - peak frequency lookup

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Window function applied before the FFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowFunction {
    /// No windowing
    Rectangular,
    /// Good general purpose
    #[default]
    Hann,
    /// Reduced side lobes
    Hamming,
    /// Very low side lobes
    Blackman,
    /// Accurate amplitude measurement
    FlatTop,
}

impl WindowFunction {
    pub fn display_name(&self) -> &'static str {
        match self {
            WindowFunction::Rectangular => "Rectangular",
            WindowFunction::Hann => "Hann",
            WindowFunction::Hamming => "Hamming",
            WindowFunction::Blackman => "Blackman",
            WindowFunction::FlatTop => "Flat-Top",
        }
    }

    pub fn all() -> &'static [WindowFunction] {
        &[
            WindowFunction::Rectangular,
            WindowFunction::Hann,
            WindowFunction::Hamming,
            WindowFunction::Blackman,
            WindowFunction::FlatTop,
        ]
    }

    /// Coefficient at position `i` of an `n`-point window.
    pub fn coefficient(&self, i: usize, n: usize) -> f64 {
        let x = 2.0 * PI * i as f64 / n as f64;
        match self {
            WindowFunction::Rectangular => 1.0,
            WindowFunction::Hann => 0.5 * (1.0 - x.cos()),
            WindowFunction::Hamming => 0.54 - 0.46 * x.cos(),
            // Exactly zero at the endpoints; clamp the rounding error.
            WindowFunction::Blackman => (0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()).max(0.0),
            WindowFunction::FlatTop => {
                0.21557895 - 0.41663158 * x.cos() + 0.277263158 * (2.0 * x).cos()
                    - 0.083578947 * (3.0 * x).cos()
                    + 0.006947368 * (4.0 * x).cos()
            }
        }
    }

    pub fn generate(&self, n: usize) -> Vec<f64> {
        (0..n).map(|i| self.coefficient(i, n)).collect()
    }
}

impl std::fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Spectrum settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    pub window: WindowFunction,
    /// Pad the input to the next power of two.
    pub zero_pad: bool,
    /// Subtract the mean before the transform.
    pub remove_dc: bool,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            window: WindowFunction::Hann,
            zero_pad: true,
            remove_dc: true,
        }
    }
}

/// Single-sided magnitude spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Bin centre frequencies (Hz)
    pub frequencies: Vec<f64>,
    /// Linear magnitudes
    pub magnitudes: Vec<f64>,
    /// Hz per bin
    pub frequency_resolution: f64,
    /// Samples before padding
    pub sample_count: usize,
}

impl Spectrum {
    /// Frequency and magnitude of the strongest bin.
    pub fn peak(&self) -> Option<(f64, f64)> {
        let (idx, &mag) = self
            .magnitudes
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))?;
        Some((self.frequencies[idx], mag))
    }

    pub fn dc_component(&self) -> f64 {
        self.magnitudes.first().copied().unwrap_or(0.0)
    }
}

/// Reusable FFT planner plus settings.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f64>,
    config: SpectrumConfig,
}

impl SpectrumAnalyzer {
    pub fn new(config: SpectrumConfig) -> Self {
        Self {
            planner: FftPlanner::new(),
            config,
        }
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    /// Spectrum of `samples` taken at `sample_rate` Hz.
    pub fn compute(&mut self, samples: &[f64], sample_rate: f64) -> Spectrum {
        let n = samples.len();
        if n == 0 {
            return Spectrum {
                frequencies: Vec::new(),
                magnitudes: Vec::new(),
                frequency_resolution: 0.0,
                sample_count: 0,
            };
        }

        let fft_size = if self.config.zero_pad {
            n.next_power_of_two()
        } else {
            n
        };

        let mean = if self.config.remove_dc {
            samples.iter().sum::<f64>() / n as f64
        } else {
            0.0
        };
        let window = self.config.window.generate(n);
        let mut buffer: Vec<Complex<f64>> = samples
            .iter()
            .zip(&window)
            .map(|(&s, &w)| Complex::new((s - mean) * w, 0.0))
            .collect();
        buffer.resize(fft_size, Complex::new(0.0, 0.0));

        self.planner.plan_fft_forward(fft_size).process(&mut buffer);

        let resolution = sample_rate / fft_size as f64;
        let bins = fft_size / 2 + 1;
        let frequencies = (0..bins).map(|i| i as f64 * resolution).collect();
        let magnitudes = buffer
            .iter()
            .take(bins)
            .enumerate()
            .map(|(i, c)| {
                let mag = c.norm() / fft_size as f64;
                // DC and Nyquist have no mirrored bin.
                if i == 0 || (fft_size % 2 == 0 && i == fft_size / 2) {
                    mag
                } else {
                    mag * 2.0
                }
            })
            .collect();

        Spectrum {
            frequencies,
            magnitudes,
            frequency_resolution: resolution,
            sample_count: n,
        }
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new(SpectrumConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_window_coefficients_in_range() {
        for window in WindowFunction::all() {
            let coeffs = window.generate(64);
            assert_eq!(coeffs.len(), 64);
            // Flat-top has small negative side lobes.
            assert!(coeffs.iter().all(|c| (-0.1..=1.5).contains(c)), "{window}");
        }
    }

    #[test]
    fn test_sine_peak() {
        let mut analyzer = SpectrumAnalyzer::default();
        let spectrum = analyzer.compute(&sine(50.0, 1000.0, 1000), 1000.0);
        let (freq, _) = spectrum.peak().unwrap();
        assert!((freq - 50.0).abs() < 2.0, "peak at {freq}");
        assert_eq!(spectrum.frequencies.len(), 513);
    }

    #[test]
    fn test_rectangular_bin_aligned_amplitude() {
        let mut analyzer = SpectrumAnalyzer::new(SpectrumConfig {
            window: WindowFunction::Rectangular,
            zero_pad: false,
            remove_dc: false,
        });
        let spectrum = analyzer.compute(&sine(8.0, 64.0, 64), 64.0);
        let (freq, mag) = spectrum.peak().unwrap();
        assert!((freq - 8.0).abs() < 1e-9);
        assert!((mag - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dc_removed() {
        let mut analyzer = SpectrumAnalyzer::default();
        let spectrum = analyzer.compute(&[5.0; 256], 100.0);
        assert!(spectrum.dc_component() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        let mut analyzer = SpectrumAnalyzer::default();
        assert!(analyzer.compute(&[], 10.0).peak().is_none());
    }

    #[test]
    fn test_window_serde_names() {
        let w: WindowFunction = serde_json::from_str("\"flat_top\"").unwrap();
        assert_eq!(w, WindowFunction::FlatTop);
    }
}
