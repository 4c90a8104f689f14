//! Windowing of raw series into fixed-length supervised examples

use ndarray::Array2;

use crate::error::{Error, Result};

/// Right-trim non-finite values from a series.
///
/// Only the trailing edge is trimmed; interior non-finite entries are left in
/// place for the corruption/placeholder pipeline downstream.
pub fn trim_trailing_non_finite(series: &[f32]) -> &[f32] {
    let end = series
        .iter()
        .rposition(|v| v.is_finite())
        .map_or(0, |i| i + 1);
    &series[..end]
}

/// Slice a 1-D series into overlapping stride-1 windows of `window_len`.
///
/// A series shorter than `window_len` yields a zero-row array rather than an
/// error; callers decide whether an empty result is fatal.
pub fn sliding_windows(series: &[f32], window_len: usize) -> Result<Array2<f32>> {
    if window_len == 0 {
        return Err(Error::data("window length must be positive"));
    }
    let rows = series.len().saturating_sub(window_len - 1);
    let mut flat = Vec::with_capacity(rows * window_len);
    for start in 0..rows {
        flat.extend_from_slice(&series[start..start + window_len]);
    }
    Array2::from_shape_vec((rows, window_len), flat)
        .map_err(|e| Error::data(format!("window reshape failed: {e}")))
}
