//! Discriminator labeling strategies
//!
//! The two adversarial loops do not label the same way: the pure GAN draws
//! noisy targets near the class poles to soften discriminator confidence,
//! while the partial-adversarial loop sticks to hard 0/1 targets. Both are
//! kept as distinct, named strategies.

use candle_core::Tensor;

use crate::error::Result;

/// How discriminator targets are produced for a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPolicy {
    /// Real targets uniform in [0.8, 1.0), fake targets uniform in [0.0, 0.2)
    Noisy,
    /// Real targets all ones, fake targets all zeros
    Hard,
}

impl LabelPolicy {
    /// Targets for examples the discriminator should score as real
    pub fn real_targets(&self, like: &Tensor) -> Result<Tensor> {
        match self {
            Self::Noisy => Ok(Tensor::rand(0.8f32, 1.0f32, like.dims(), like.device())?),
            Self::Hard => Ok(like.ones_like()?),
        }
    }

    /// Targets for examples the discriminator should score as fake
    pub fn fake_targets(&self, like: &Tensor) -> Result<Tensor> {
        match self {
            Self::Noisy => Ok(Tensor::rand(0.0f32, 0.2f32, like.dims(), like.device())?),
            Self::Hard => Ok(like.zeros_like()?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn logits() -> Tensor {
        Tensor::zeros((32, 1), candle_core::DType::F32, &Device::Cpu).unwrap()
    }

    #[test]
    fn noisy_targets_stay_near_the_class_poles() {
        let like = logits();
        for _ in 0..50 {
            let reals: Vec<f32> = LabelPolicy::Noisy
                .real_targets(&like)
                .unwrap()
                .flatten_all()
                .unwrap()
                .to_vec1()
                .unwrap();
            assert!(reals.iter().all(|v| (0.8..=1.0).contains(v)));

            let fakes: Vec<f32> = LabelPolicy::Noisy
                .fake_targets(&like)
                .unwrap()
                .flatten_all()
                .unwrap()
                .to_vec1()
                .unwrap();
            assert!(fakes.iter().all(|v| (0.0..=0.2).contains(v)));
        }
    }

    #[test]
    fn hard_targets_are_exact() {
        let like = logits();
        let reals: Vec<f32> = LabelPolicy::Hard
            .real_targets(&like)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        assert!(reals.iter().all(|v| *v == 1.0));

        let fakes: Vec<f32> = LabelPolicy::Hard
            .fake_targets(&like)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        assert!(fakes.iter().all(|v| *v == 0.0));
    }
}
