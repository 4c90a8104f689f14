//! Batch preparation for one training step
//!
//! Pure transform over in-memory arrays: trim, window, subsample, corrupt,
//! substitute the placeholder, and reshape to the rank the models expect.

use candle_core::{Device, Tensor};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::index;

use crate::config::TrainingConfig;
use crate::data::corruption::{BernoulliMasking, CorruptionPolicy};
use crate::data::windowing::{sliding_windows, trim_trailing_non_finite};
use crate::error::{Error, Result};

/// Clean/corrupted batch pair fed to one gradient step.
///
/// Both tensors have shape `(n, window_len, 1)` with identical `n`, and the
/// corrupted tensor contains only finite values.
pub struct PreparedBatch {
    /// The unmodified windows sampled from the series
    pub clean: Tensor,
    /// The same windows after corruption and placeholder substitution
    pub corrupted: Tensor,
}

/// Turns one raw series into model-ready batches
pub struct BatchBuilder {
    window_len: usize,
    batch_size: usize,
    placeholder: f32,
    policy: Box<dyn CorruptionPolicy>,
    device: Device,
}

impl BatchBuilder {
    /// Build from a run configuration with the stock corruption policy
    pub fn from_config(config: &TrainingConfig, device: &Device) -> Result<Self> {
        Ok(Self {
            window_len: config.window_len,
            batch_size: config.batch_size,
            placeholder: config.placeholder_value,
            policy: Box::new(BernoulliMasking::from_config(&config.corruption)?),
            device: device.clone(),
        })
    }

    /// Swap in a different corruption policy
    pub fn with_policy(mut self, policy: Box<dyn CorruptionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Prepare the clean/corrupted pair for one step.
    ///
    /// Non-finite entries left by the corruption policy are replaced with the
    /// configured placeholder before the batch reaches a model.
    pub fn prepare(&self, series: &[f32], rng: &mut StdRng) -> Result<PreparedBatch> {
        let sample = self.sample_windows(series, rng)?;
        let mut corrupted = self.policy.corrupt(&sample, rng)?;
        if corrupted.dim() != sample.dim() {
            return Err(Error::data(format!(
                "corruption policy changed batch shape: {:?} -> {:?}",
                sample.dim(),
                corrupted.dim()
            )));
        }
        let placeholder = self.placeholder;
        corrupted.mapv_inplace(|v| if v.is_finite() { v } else { placeholder });
        Ok(PreparedBatch {
            clean: self.to_model_input(sample)?,
            corrupted: self.to_model_input(corrupted)?,
        })
    }

    /// Window and subsample a series without corrupting it.
    ///
    /// Used for the independent real examples shown to a discriminator.
    pub fn real_example(&self, series: &[f32], rng: &mut StdRng) -> Result<Tensor> {
        let sample = self.sample_windows(series, rng)?;
        self.to_model_input(sample)
    }

    /// Uniform subsample without replacement of up to `batch_size` windows
    fn sample_windows(&self, series: &[f32], rng: &mut StdRng) -> Result<Array2<f32>> {
        let trimmed = trim_trailing_non_finite(series);
        let windows = sliding_windows(trimmed, self.window_len)?;
        let rows = windows.nrows();
        if rows == 0 {
            return Err(Error::data(format!(
                "series of length {} yields no windows of length {}",
                trimmed.len(),
                self.window_len
            )));
        }
        let take = rows.min(self.batch_size);
        let picked = index::sample(rng, rows, take).into_vec();
        Ok(windows.select(Axis(0), &picked))
    }

    /// Append the trailing singleton dimension the models expect
    fn to_model_input(&self, batch: Array2<f32>) -> Result<Tensor> {
        let (rows, cols) = batch.dim();
        let flat = batch.into_raw_vec();
        Ok(Tensor::from_vec(flat, (rows, cols, 1), &self.device)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn builder(window_len: usize, batch_size: usize) -> BatchBuilder {
        let mut config = TrainingConfig::default();
        config.window_len = window_len;
        config.batch_size = batch_size;
        config.corruption.missing_prob = 0.4;
        BatchBuilder::from_config(&config, &Device::Cpu).unwrap()
    }

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|v| v as f32 * 0.01).collect()
    }

    #[test]
    fn corrupted_batch_is_finite_after_substitution() {
        let builder = builder(24, 16);
        let mut rng = StdRng::seed_from_u64(3);
        let prepared = builder.prepare(&ramp(200), &mut rng).unwrap();
        let values: Vec<f32> = prepared.corrupted.flatten_all().unwrap().to_vec1().unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn batches_share_row_count_and_have_trailing_dim() {
        let builder = builder(24, 16);
        let mut rng = StdRng::seed_from_u64(3);
        let prepared = builder.prepare(&ramp(200), &mut rng).unwrap();
        assert_eq!(prepared.clean.dims(), prepared.corrupted.dims());
        assert_eq!(prepared.clean.dims(), &[16, 24, 1]);
    }

    #[test]
    fn subsample_is_capped_by_available_windows() {
        // 30-long series, window 24 -> 7 windows, fewer than the batch size
        let builder = builder(24, 16);
        let mut rng = StdRng::seed_from_u64(3);
        let prepared = builder.prepare(&ramp(30), &mut rng).unwrap();
        assert_eq!(prepared.clean.dims(), &[7, 24, 1]);
    }

    #[test]
    fn trailing_nans_do_not_reach_the_clean_batch() {
        let builder = builder(4, 8);
        let mut series = ramp(20);
        series.extend([f32::NAN, f32::NAN]);
        let mut rng = StdRng::seed_from_u64(3);
        let prepared = builder.prepare(&series, &mut rng).unwrap();
        let values: Vec<f32> = prepared.clean.flatten_all().unwrap().to_vec1().unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn too_short_series_is_fatal() {
        let builder = builder(24, 16);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(builder.prepare(&ramp(10), &mut rng).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn row_count_never_exceeds_windows_or_batch_size(
            len in 24usize..300,
            batch_size in 1usize..48,
        ) {
            let builder = builder(24, batch_size);
            let mut rng = StdRng::seed_from_u64(9);
            let prepared = builder.prepare(&ramp(len), &mut rng).unwrap();
            let rows = prepared.clean.dims()[0];
            prop_assert!(rows <= len - 24 + 1);
            prop_assert!(rows <= batch_size);
            let values: Vec<f32> =
                prepared.corrupted.flatten_all().unwrap().to_vec1().unwrap();
            prop_assert!(values.iter().all(|v| v.is_finite()));
        }
    }
}
