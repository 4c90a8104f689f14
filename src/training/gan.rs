//! Pure GAN training loop
//!
//! The generator imputes from corrupted trends rather than from pure noise,
//! so its output carries both a random and an epistemic component. The
//! discriminator scores the generator's output against an unmodified real
//! example drawn from a different series, and is trained with noisy labels
//! near the class poles.

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
use crate::training::labels::LabelPolicy;
use crate::training::report::RunReport;
use crate::training::{choose_other, loss};

/// Per-step losses of the two adversarial networks
#[derive(Debug, Clone, Copy)]
pub struct AdversarialLosses {
    /// Generator loss
    pub generator: f32,
    /// Discriminator loss
    pub discriminator: f32,
}

/// Trainer for the pure adversarial variant
pub struct GanTrainer<G: TrainableModel, D: TrainableModel> {
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

impl<G: TrainableModel, D: TrainableModel> GanTrainer<G, D> {
    /// Create a trainer owning both networks and one optimizer per network.
    ///
    /// The two parameter sets must be disjoint; each optimizer only ever
    /// updates its own network's variables.
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
            labels: LabelPolicy::Noisy,
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
            "adversarial training of {} on {} series files for {} epochs",
            self.config.model_name,
            files.len(),
            self.config.epochs
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

    /// One joint step: forward both networks once, then apply two independent
    /// gradient updates against their own losses.
    pub fn train_step(
        &mut self,
        batch: &PreparedBatch,
        real_example: &Tensor,
    ) -> Result<AdversarialLosses> {
        let imputation = self.generator.forward(&batch.corrupted)?;
        let fake_logits = self.discriminator.forward(&imputation)?;
        let real_logits = self.discriminator.forward(real_example)?;

        // The generator is rewarded when fakes score as real
        let generator_loss = loss::bce_with_logits(&fake_logits.ones_like()?, &fake_logits)?;
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
            "    training loss {:.6}  validation loss {:.6}",
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
