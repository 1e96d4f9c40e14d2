//! Signal analysis helpers used by the frequency-domain nodes.

pub mod spectrum;

pub use spectrum::{Spectrum, SpectrumAnalyzer, SpectrumConfig, WindowFunction};
