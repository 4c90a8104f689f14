//! tsimpute: training orchestration for sequence imputation models
//!
//! This crate trains models that reconstruct missing values in time series:
//! a plain seq2seq autoencoder, a pure GAN, and a partially adversarial
//! hybrid. It is orchestration glue over the candle framework's automatic
//! differentiation and optimizers; model architectures are supplied by the
//! caller through the [`TrainableModel`] seam.

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod training;

// Re-exports
pub use config::{CorruptionConfig, DataConfig, TrainingConfig};
pub use data::{BatchBuilder, BernoulliMasking, CorruptionPolicy, PreparedBatch, SeriesStore};
pub use error::{Error, Result};
pub use model::TrainableModel;
pub use training::{
    AdversarialLosses, GanTrainer, LabelPolicy, PartialGanTrainer, RunReport, VanillaTrainer,
};
