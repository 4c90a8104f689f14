//! Vanilla seq2seq training loop
//!
//! One autoencoder, one optimizer, mean absolute error between the clean
//! batch and its reconstruction from corrupted input.

use std::time::Instant;

use candle_core::Device;
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
use crate::training::loss;
use crate::training::report::RunReport;

/// Trainer for the plain sequence-to-sequence autoencoder
pub struct VanillaTrainer<M: TrainableModel> {
    config: TrainingConfig,
    model: M,
    optimizer: AdamW,
    batch: BatchBuilder,
    train_store: SeriesStore,
    val_store: SeriesStore,
    rng: StdRng,
}

impl<M: TrainableModel> VanillaTrainer<M> {
    /// Create a trainer owning `model` and a fresh optimizer over its variables
    pub fn new(config: TrainingConfig, model: M, device: &Device) -> Result<Self> {
        config.validate()?;
        let params = ParamsAdamW {
            lr: config.learning_rate,
            ..Default::default()
        };
        let optimizer = AdamW::new(model.trainable_vars(), params)?;
        let batch = BatchBuilder::from_config(&config, device)?;
        let train_store = SeriesStore::new(&config.data.train_dir, device);
        let val_store = SeriesStore::new(&config.data.val_dir, device);
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            model,
            optimizer,
            batch,
            train_store,
            val_store,
            rng,
        })
    }

    /// Run the configured number of epochs and persist the model.
    ///
    /// One file is one gradient step. Any load or shape failure aborts the
    /// run; there is no retry or skip.
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
            "training {} on {} series files for {} epochs",
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
                let train_loss = self.train_step(&prepared)?;
                final_train_loss = Some(train_loss as f64);

                if iteration % self.config.report_every == 0 {
                    let validation_loss = self.validation_loss(&val_files)?;
                    final_validation_loss = Some(validation_loss as f64);
                    reports_emitted += 1;
                    info!(
                        "{}.{}  training loss {:.6}  validation loss {:.6}  {:.3}s",
                        epoch,
                        iteration,
                        train_loss,
                        validation_loss,
                        step_start.elapsed().as_secs_f64()
                    );
                }
                global_steps += 1;
            }
        }

        info!("training complete");

        let path = self.config.model_path();
        std::fs::create_dir_all(self.config.saved_models_dir())?;
        self.model.save(&path)?;
        info!("model saved to {}", path.display());

        Ok(RunReport {
            model_name: self.config.model_name.clone(),
            started_at,
            epochs_completed: self.config.epochs,
            global_steps,
            reports_emitted,
            final_train_loss,
            final_validation_loss,
            artifacts: vec![path],
        })
    }

    /// One gradient step: minimize `mae(clean, model(corrupted))`
    pub fn train_step(&mut self, batch: &PreparedBatch) -> Result<f32> {
        let reconstruction = self.model.forward(&batch.corrupted)?;
        let loss = loss::mae(&batch.clean, &reconstruction)?;
        self.optimizer.backward_step(&loss)?;
        Ok(loss.to_scalar::<f32>()?)
    }

    /// Loss on one randomly drawn validation file; no parameter update
    fn validation_loss(&mut self, val_files: &[String]) -> Result<f32> {
        let name = val_files.choose(&mut self.rng).ok_or_else(|| {
            Error::data(format!(
                "no validation series in {}",
                self.val_store.dir().display()
            ))
        })?;
        let series = self.val_store.load(name)?;
        let prepared = self.batch.prepare(&series, &mut self.rng)?;
        let reconstruction = self.model.forward(&prepared.corrupted)?;
        Ok(loss::mae(&prepared.clean, &reconstruction)?.to_scalar::<f32>()?)
    }

    /// The model being trained
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Consume the trainer and return the trained model
    pub fn into_model(self) -> M {
        self.model
    }
}
