//! Dense sample arrays.
//!
//! Values are stored row-major. The first axis is time; every remaining axis
//! is flattened into the frame width, so a `[frames, channels]` array and a
//! `[frames, a, b]` array are handled the same way by the nodes.

use super::{DataError, DataResult};

/// Dense `f64` array with an explicit shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Samples {
    data: Vec<f64>,
    shape: Vec<usize>,
}

impl Samples {
    /// Create an array from a shape and row-major data.
    ///
    /// Fails when the element count implied by `shape` disagrees with `data`.
    /// A rank-0 shape (`[]`) is accepted here; blocks reject it.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> DataResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(DataError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, shape })
    }

    /// One-dimensional array.
    pub fn from_vec(data: Vec<f64>) -> Self {
        let shape = vec![data.len()];
        Self { data, shape }
    }

    /// Two-dimensional `[frames, channels]` array from per-frame rows.
    pub fn from_frames(frames: Vec<Vec<f64>>) -> DataResult<Self> {
        let width = frames.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(frames.len() * width);
        for (frame, row) in frames.iter().enumerate() {
            if row.len() != width {
                return Err(DataError::RaggedFrames {
                    frame,
                    expected: width,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data,
            shape: vec![frames.len(), width],
        })
    }

    /// Zero-dimensional array holding a single value.
    pub fn scalar(value: f64) -> Self {
        Self {
            data: vec![value],
            shape: Vec::new(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of time steps (length of the first axis).
    pub fn frames(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Number of values per time step.
    pub fn frame_width(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Values of one time step.
    pub fn frame(&self, index: usize) -> Option<&[f64]> {
        let width = self.frame_width();
        let start = index.checked_mul(width)?;
        self.data.get(start..start + width)
    }

    /// Iterate over time steps.
    pub fn iter_frames(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.frame_width().max(1))
    }

    /// Values of one channel across all frames.
    pub fn channel(&self, channel: usize) -> Vec<f64> {
        let width = self.frame_width();
        if channel >= width {
            return Vec::new();
        }
        self.data.iter().skip(channel).step_by(width).copied().collect()
    }

    /// Largest absolute value, ignoring NaN. Zero for an empty array.
    pub fn peak_abs(&self) -> f64 {
        self.data.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }

    /// Apply `f` to every value, keeping the shape.
    pub fn map(&self, f: impl FnMut(f64) -> f64) -> Self {
        Self {
            data: self.data.iter().copied().map(f).collect(),
            shape: self.shape.clone(),
        }
    }

    /// Build an array with the same trailing axes and a new frame count.
    ///
    /// `data.len()` must be a multiple of the frame width.
    pub fn with_frame_data(&self, data: Vec<f64>) -> DataResult<Self> {
        let width = self.frame_width();
        let mut shape = self.shape.clone();
        if shape.is_empty() {
            shape.push(0);
        }
        shape[0] = if width == 0 { 0 } else { data.len() / width };
        Self::new(shape, data)
    }
}

impl From<Vec<f64>> for Samples {
    fn from(data: Vec<f64>) -> Self {
        Self::from_vec(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_frames_shape() {
        let s = Samples::from_frames(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(s.shape(), &[3, 2]);
        assert_eq!(s.frames(), 3);
        assert_eq!(s.frame_width(), 2);
        assert_eq!(s.frame(1), Some(&[3.0, 4.0][..]));
        assert_eq!(s.channel(1), vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_ragged_frames_rejected() {
        let err = Samples::from_frames(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, DataError::RaggedFrames { frame: 1, .. }));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = Samples::new(vec![2, 3], vec![0.0; 5]).unwrap_err();
        assert!(matches!(err, DataError::ShapeMismatch { expected: 6, actual: 5, .. }));
    }

    #[test]
    fn test_higher_rank_flattens_into_frame_width() {
        let s = Samples::new(vec![2, 2, 3], (0..12).map(f64::from).collect()).unwrap();
        assert_eq!(s.frames(), 2);
        assert_eq!(s.frame_width(), 6);
        assert_eq!(s.iter_frames().count(), 2);
    }

    #[test]
    fn test_with_frame_data_keeps_trailing_axes() {
        let s = Samples::from_frames(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let t = s.with_frame_data(vec![0.0; 6]).unwrap();
        assert_eq!(t.shape(), &[3, 2]);
    }

    #[test]
    fn test_peak_abs() {
        let s = Samples::from_vec(vec![0.5, -3.0, 2.0]);
        assert_eq!(s.peak_abs(), 3.0);
    }

    #[test]
    fn test_scalar_is_rank_zero() {
        let s = Samples::scalar(4.2);
        assert_eq!(s.rank(), 0);
        assert_eq!(s.frames(), 0);
    }
}
