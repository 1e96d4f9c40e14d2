//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use blockflow_rs::data::RawSample;
use blockflow_rs::source::{StreamDataLoader, VecSource};
use blockflow_rs::BlockMap;

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Assert two sample slices match element-wise
pub fn assert_samples_eq(actual: &[f64], expected: &[f64], epsilon: f64) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "length mismatch: {:?} vs {:?}",
        actual,
        expected
    );
    for (a, b) in actual.iter().zip(expected) {
        assert_float_eq(*a, *b, epsilon);
    }
}

/// Rewindable loader over in-memory raw samples
pub fn vec_loader(items: Vec<RawSample>) -> StreamDataLoader<VecSource<RawSample>> {
    StreamDataLoader::new(VecSource::new(items))
}

/// Sorted keys of a result mapping
pub fn keys(result: &BlockMap) -> Vec<&str> {
    result.keys().map(String::as_str).collect()
}
