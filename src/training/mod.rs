//! Training loops for sequence imputation models
//!
//! Three loops share the same skeleton (iterate the training file list once
//! per epoch, take one gradient step per file, report periodically) and
//! differ in what they optimize:
//!
//! - [`VanillaTrainer`]: one autoencoder, mean absolute error;
//! - [`GanTrainer`]: generator vs. discriminator, noisy discriminator labels;
//! - [`PartialGanTrainer`]: generator loss blends reconstruction and
//!   adversarial terms, hard discriminator labels.
//!
//! Trainers are plain stateful objects owning their networks and optimizers,
//! with one public method per training step.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tsimpute::{TrainingConfig, VanillaTrainer};
//! use candle_core::Device;
//!
//! let config = TrainingConfig::from_file("train.yaml")?;
//! let mut trainer = VanillaTrainer::new(config, model, &Device::Cpu)?;
//! let report = trainer.train()?;
//! println!("saved {:?}", report.artifacts);
//! ```

pub mod gan;
pub mod labels;
pub mod loss;
pub mod partial;
pub mod report;
pub mod vanilla;

#[cfg(test)]
pub mod tests;

pub use gan::{AdversarialLosses, GanTrainer};
pub use labels::LabelPolicy;
pub use partial::PartialGanTrainer;
pub use report::RunReport;
pub use vanilla::VanillaTrainer;

use rand::rngs::StdRng;
use rand::Rng;

use crate::error::{Error, Result};

/// Pick a training file other than the one at `exclude`, uniformly.
///
/// The adversarial loops show the discriminator a real example drawn from a
/// different series than the one being imputed.
pub(crate) fn choose_other<'a>(
    files: &'a [String],
    exclude: usize,
    rng: &mut StdRng,
) -> Result<&'a str> {
    if files.len() < 2 {
        return Err(Error::data(
            "adversarial training needs at least two training files",
        ));
    }
    let mut pick = rng.random_range(0..files.len() - 1);
    if pick >= exclude {
        pick += 1;
    }
    Ok(&files[pick])
}

#[cfg(test)]
mod choose_other_tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn never_returns_the_excluded_file() {
        let files: Vec<String> = (0..5).map(|i| format!("s{i}")).collect();
        let mut rng = StdRng::seed_from_u64(1);
        for exclude in 0..files.len() {
            for _ in 0..50 {
                let picked = choose_other(&files, exclude, &mut rng).unwrap();
                assert_ne!(picked, files[exclude]);
            }
        }
    }

    #[test]
    fn single_file_is_an_error() {
        let files = vec!["only".to_string()];
        let mut rng = StdRng::seed_from_u64(1);
        assert!(choose_other(&files, 0, &mut rng).is_err());
    }
}
