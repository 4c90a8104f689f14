//! Partially adversarial training loop
//!
//! Same structure as the pure GAN loop, but the generator's loss is a convex
//! combination of its plain reconstruction loss and the adversarial loss. The
//! magnitudes of the two terms differ considerably, so the balance is set by
//! the configured blend weight. The discriminator here uses hard 0/1 targets,
//! not the noisy labels of the pure GAN loop.

use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::SeedableRng;
use tracing::info;

use crate::config::TrainingConfig;
use crate::data::{BatchBuilder, PreparedBatch, SeriesStore};
use crate::error::{Error, Result};
use crate::model::TrainableModel;
use crate::training::gan::AdversarialLosses;
use crate::training::labels::LabelPolicy;
use crate::training::report::RunReport;
use crate::training::{choose_other, loss};

/// Convex combination of the two generator loss terms
pub(crate) fn blend(weight: f64, reconstruction: &Tensor, adversarial: &Tensor) -> Result<Tensor> {
    Ok(((reconstruction * weight)? + (adversarial * (1.0 - weight))?)?)
}

/// Trainer for the partially adversarial variant
pub struct PartialGanTrainer<G: TrainableModel, D: TrainableModel> {
    config: TrainingConfig,
    generator: G,
    discriminator: D,
    generator_opt: AdamW,
    discriminator_opt: AdamW,
    labels: LabelPolicy,
    batch: BatchBuilder,
    train_store: SeriesStore,
    val_store: SeriesStore,
    rng: StdRng,
}

impl<G: TrainableModel, D: TrainableModel> PartialGanTrainer<G, D> {
    /// Create a trainer owning both networks and one optimizer per network
    pub fn new(config: TrainingConfig, generator: G, discriminator: D, device: &Device) -> Result<Self> {
        config.validate()?;
        let params = ParamsAdamW {
            lr: config.learning_rate,
            ..Default::default()
        };
        let generator_opt = AdamW::new(generator.trainable_vars(), params.clone())?;
        let discriminator_opt = AdamW::new(discriminator.trainable_vars(), params)?;
        let batch = BatchBuilder::from_config(&config, device)?;
        let train_store = SeriesStore::new(&config.data.train_dir, device);
        let val_store = SeriesStore::new(&config.data.val_dir, device);
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            generator,
            discriminator,
            generator_opt,
            discriminator_opt,
            labels: LabelPolicy::Hard,
            batch,
            train_store,
            val_store,
            rng,
        })
    }

    /// Run the configured number of epochs, then persist the generator and,
    /// when configured, the discriminator.
    pub fn train(&mut self) -> Result<RunReport> {
        let started_at = Utc::now();
        let mut files = self.train_store.list()?;
        if files.is_empty() {
            return Err(Error::data(format!(
                "no training series in {}",
                self.train_store.dir().display()
            )));
        }
        let val_files = self.val_store.list()?;

        info!(
            "partially adversarial training of {} on {} series files for {} epochs (blend weight {})",
            self.config.model_name,
            files.len(),
            self.config.epochs,
            self.config.loss_weight
        );

        let mut global_steps = 0;
        let mut reports_emitted = 0;
        let mut final_train_loss = None;
        let mut final_validation_loss = None;

        for epoch in 0..self.config.epochs {
            if self.config.shuffle {
                files.shuffle(&mut self.rng);
            }
            for iteration in 0..files.len() {
                let step_start = Instant::now();
                let series = self.train_store.load(&files[iteration])?;
                let prepared = self.batch.prepare(&series, &mut self.rng)?;

                let other = choose_other(&files, iteration, &mut self.rng)?.to_string();
                let real_series = self.train_store.load(&other)?;
                let real_example = self.batch.real_example(&real_series, &mut self.rng)?;

                let losses = self.train_step(&prepared, &real_example)?;
                final_train_loss = Some(losses.generator as f64);

                if iteration % self.config.report_every == 0 {
                    let validation_loss = self.report(
                        epoch,
                        iteration,
                        losses,
                        &prepared,
                        &real_example,
                        &val_files,
                        step_start,
                    )?;
                    final_validation_loss = Some(validation_loss as f64);
                    reports_emitted += 1;
                }
                global_steps += 1;
            }
        }

        info!("training complete");

        std::fs::create_dir_all(self.config.saved_models_dir())?;
        let generator_path = self.config.model_path();
        self.generator.save(&generator_path)?;
        info!("generator saved to {}", generator_path.display());

        let mut artifacts = vec![generator_path];
        if self.config.save_discriminator {
            let discriminator_path = self.config.discriminator_path();
            self.discriminator.save(&discriminator_path)?;
            info!("discriminator saved to {}", discriminator_path.display());
            artifacts.push(discriminator_path);
        }

        Ok(RunReport {
            model_name: self.config.model_name.clone(),
            started_at,
            epochs_completed: self.config.epochs,
            global_steps,
            reports_emitted,
            final_train_loss,
            final_validation_loss,
            artifacts,
        })
    }

    /// One joint step with the blended generator loss.
    ///
    /// `loss_weight` = 1 degenerates to pure reconstruction training and 0 to
    /// the pure adversarial objective.
    pub fn train_step(
        &mut self,
        batch: &PreparedBatch,
        real_example: &Tensor,
    ) -> Result<AdversarialLosses> {
        let imputation = self.generator.forward(&batch.corrupted)?;
        let fake_logits = self.discriminator.forward(&imputation)?;
        let real_logits = self.discriminator.forward(real_example)?;

        let reconstruction_loss = loss::mae(&batch.clean, &imputation)?;
        let adversarial_loss = loss::bce_with_logits(&fake_logits.ones_like()?, &fake_logits)?;
        let generator_loss = blend(self.config.loss_weight, &reconstruction_loss, &adversarial_loss)?;

        let discriminator_loss = (loss::bce_with_logits(
            &self.labels.fake_targets(&fake_logits)?,
            &fake_logits,
        )? + loss::bce_with_logits(&self.labels.real_targets(&real_logits)?, &real_logits)?)?;

        self.generator_opt.backward_step(&generator_loss)?;
        self.discriminator_opt.backward_step(&discriminator_loss)?;

        Ok(AdversarialLosses {
            generator: generator_loss.to_scalar::<f32>()?,
            discriminator: discriminator_loss.to_scalar::<f32>()?,
        })
    }

    /// Emit the periodic progress lines; returns the validation loss
    #[allow(clippy::too_many_arguments)]
    fn report(
        &mut self,
        epoch: usize,
        iteration: usize,
        losses: AdversarialLosses,
        prepared: &PreparedBatch,
        real_example: &Tensor,
        val_files: &[String],
        step_start: Instant,
    ) -> Result<f32> {
        let imputation = self.generator.forward(&prepared.corrupted)?;
        let real_logits = self.discriminator.forward(real_example)?;
        let fake_logits = self.discriminator.forward(&imputation)?;

        let accuracy_reals = loss::binary_accuracy(&real_logits.ones_like()?, &real_logits)?;
        let accuracy_fakes = loss::binary_accuracy(&fake_logits.zeros_like()?, &fake_logits)?;
        let train_loss = loss::mae(&prepared.clean, &imputation)?.to_scalar::<f32>()?;
        let validation_loss = self.validation_loss(val_files)?;

        info!(
            "{}.{}  generator loss {:.6}  discriminator loss {:.6}  discriminator accuracy (reals, fakes) ({:.3}, {:.3})  {:.3}s",
            epoch,
            iteration,
            losses.generator,
            losses.discriminator,
            accuracy_reals,
            accuracy_fakes,
            step_start.elapsed().as_secs_f64()
        );
        info!(
            "    imputation loss {:.6}  validation loss {:.6}",
            train_loss, validation_loss
        );
        Ok(validation_loss)
    }

    /// Generator reconstruction loss on one random validation file
    fn validation_loss(&mut self, val_files: &[String]) -> Result<f32> {
        let name = val_files.choose(&mut self.rng).ok_or_else(|| {
            Error::data(format!(
                "no validation series in {}",
                self.val_store.dir().display()
            ))
        })?;
        let series = self.val_store.load(name)?;
        let prepared = self.batch.prepare(&series, &mut self.rng)?;
        let imputation = self.generator.forward(&prepared.corrupted)?;
        Ok(loss::mae(&prepared.clean, &imputation)?.to_scalar::<f32>()?)
    }

    /// The label policy used for discriminator targets
    pub fn labels(&self) -> LabelPolicy {
        self.labels
    }

    /// Consume the trainer and return both trained networks
    pub fn into_models(self) -> (G, D) {
        (self.generator, self.discriminator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use candle_core::Device;

    fn scalar(value: f32) -> Tensor {
        Tensor::new(value, &Device::Cpu).unwrap()
    }

    #[test]
    fn blend_degenerates_at_the_extremes() {
        let reconstruction = scalar(0.3);
        let adversarial = scalar(0.7);

        let pure_reconstruction = blend(1.0, &reconstruction, &adversarial)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert_relative_eq!(pure_reconstruction, 0.3, epsilon = 1e-6);

        let pure_adversarial = blend(0.0, &reconstruction, &adversarial)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert_relative_eq!(pure_adversarial, 0.7, epsilon = 1e-6);

        let even = blend(0.5, &reconstruction, &adversarial)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert_relative_eq!(even, 0.5, epsilon = 1e-6);
    }
}
