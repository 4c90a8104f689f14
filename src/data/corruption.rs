//! Corruption policy seam
//!
//! The deterioration process that marks entries of a clean batch as missing is
//! a collaborator of the training loops, not part of them. Trainers go through
//! the [`CorruptionPolicy`] trait; [`BernoulliMasking`] is the stock policy.

use ndarray::Array2;
use rand::RngCore;
use rand_distr::{Bernoulli, Distribution};

use crate::config::CorruptionConfig;
use crate::error::{Error, Result};

/// Maps a clean batch to a same-shape batch with some entries marked missing.
///
/// Missing entries are encoded as `f32::NAN`; the placeholder substitution
/// happens later, in batch preparation.
pub trait CorruptionPolicy: Send + Sync {
    /// Corrupt a copy of `batch`
    fn corrupt(&self, batch: &Array2<f32>, rng: &mut dyn RngCore) -> Result<Array2<f32>>;
}

/// Marks each entry missing independently with a fixed probability
pub struct BernoulliMasking {
    mask: Bernoulli,
}

impl BernoulliMasking {
    /// Create a masking policy with the given per-entry missing probability
    pub fn new(missing_prob: f64) -> Result<Self> {
        let mask = Bernoulli::new(missing_prob)
            .map_err(|_| Error::config(format!("invalid missing probability: {missing_prob}")))?;
        Ok(Self { mask })
    }

    /// Build the policy from the corruption section of a run configuration
    pub fn from_config(config: &CorruptionConfig) -> Result<Self> {
        Self::new(config.missing_prob)
    }
}

impl CorruptionPolicy for BernoulliMasking {
    fn corrupt(&self, batch: &Array2<f32>, rng: &mut dyn RngCore) -> Result<Array2<f32>> {
        let mut corrupted = batch.clone();
        for entry in corrupted.iter_mut() {
            if self.mask.sample(rng) {
                *entry = f32::NAN;
            }
        }
        Ok(corrupted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_batch() -> Array2<f32> {
        Array2::from_shape_fn((8, 12), |(i, j)| (i * 12 + j) as f32)
    }

    #[test]
    fn shape_is_preserved() {
        let batch = sample_batch();
        let mut rng = StdRng::seed_from_u64(7);
        let corrupted = BernoulliMasking::new(0.3)
            .unwrap()
            .corrupt(&batch, &mut rng)
            .unwrap();
        assert_eq!(corrupted.dim(), batch.dim());
    }

    #[test]
    fn zero_probability_leaves_batch_untouched() {
        let batch = sample_batch();
        let mut rng = StdRng::seed_from_u64(7);
        let corrupted = BernoulliMasking::new(0.0)
            .unwrap()
            .corrupt(&batch, &mut rng)
            .unwrap();
        assert_eq!(corrupted, batch);
    }

    #[test]
    fn unit_probability_masks_everything() {
        let batch = sample_batch();
        let mut rng = StdRng::seed_from_u64(7);
        let corrupted = BernoulliMasking::new(1.0)
            .unwrap()
            .corrupt(&batch, &mut rng)
            .unwrap();
        assert!(corrupted.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rejects_probability_above_one() {
        assert!(BernoulliMasking::new(1.5).is_err());
    }
}
