//! Configuration structures for imputation training runs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration for a training run.
///
/// Every recognized option is an explicit typed field. The record is built
/// once (from a file or from [`Default`]) and stays immutable for the whole
/// run; trainers take it by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Learning rate shared by every optimizer in the run
    pub learning_rate: f64,
    /// Maximum number of windows sampled from one series per step
    pub batch_size: usize,
    /// Fixed length of one supervised window
    pub window_len: usize,
    /// Number of passes over the training file list
    pub epochs: usize,
    /// Shuffle the training file list at the start of each epoch
    pub shuffle: bool,
    /// Sentinel substituted for missing entries before a batch reaches a model
    pub placeholder_value: f32,
    /// Name used for persisted model artifacts
    pub model_name: String,
    /// Also persist the discriminator at the end of adversarial runs
    pub save_discriminator: bool,
    /// Convex blend weight for the partial-adversarial generator loss, in [0, 1]
    pub loss_weight: f64,
    /// Emit a progress report every this many steps
    pub report_every: usize,
    /// Seed for all run-level randomness
    pub seed: u64,
    /// Corruption policy options
    pub corruption: CorruptionConfig,
    /// Dataset locations
    pub data: DataConfig,
}

/// Options for the synthetic corruption applied to clean batches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorruptionConfig {
    /// Probability that any single entry is marked missing
    pub missing_prob: f64,
}

/// Dataset and artifact locations.
///
/// All paths are explicit; nothing is resolved against the process working
/// directory at call sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory of per-series training files
    pub train_dir: PathBuf,
    /// Directory of per-series validation files
    pub val_dir: PathBuf,
    /// Base directory for persisted models
    pub output_dir: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-4,
            batch_size: 64,
            window_len: 24,
            epochs: 1,
            shuffle: true,
            placeholder_value: 0.0,
            model_name: "seq2seq".to_string(),
            save_discriminator: false,
            loss_weight: 0.7,
            report_every: 100,
            seed: 0,
            corruption: CorruptionConfig::default(),
            data: DataConfig::default(),
        }
    }
}

impl Default for CorruptionConfig {
    fn default() -> Self {
        Self { missing_prob: 0.2 }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            train_dir: PathBuf::from("data_processed/training"),
            val_dir: PathBuf::from("data_processed/validation"),
            output_dir: PathBuf::from("."),
        }
    }
}

impl TrainingConfig {
    /// Load configuration from a JSON or YAML file, selected by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => {
                return Err(Error::config(format!(
                    "unsupported config extension: {}",
                    path.display()
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.learning_rate <= 0.0 {
            return Err(Error::config("learning rate must be > 0"));
        }
        if self.batch_size == 0 {
            return Err(Error::config("batch size must be > 0"));
        }
        if self.window_len == 0 {
            return Err(Error::config("window length must be > 0"));
        }
        if self.epochs == 0 {
            return Err(Error::config("epoch count must be > 0"));
        }
        if self.report_every == 0 {
            return Err(Error::config("report cadence must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.loss_weight) {
            return Err(Error::config("loss blend weight must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.corruption.missing_prob) {
            return Err(Error::config("missing probability must be in [0, 1]"));
        }
        if !self.placeholder_value.is_finite() {
            return Err(Error::config("placeholder value must be finite"));
        }
        if self.model_name.is_empty() {
            return Err(Error::config("model name must not be empty"));
        }
        Ok(())
    }

    /// Directory under which model artifacts are written
    pub fn saved_models_dir(&self) -> PathBuf {
        self.data.output_dir.join("saved_models")
    }

    /// Path of the persisted model (the generator, for adversarial runs)
    pub fn model_path(&self) -> PathBuf {
        self.saved_models_dir()
            .join(format!("{}.safetensors", self.model_name))
    }

    /// Path of the optionally persisted discriminator
    pub fn discriminator_path(&self) -> PathBuf {
        self.saved_models_dir()
            .join(format!("{}_discriminator.safetensors", self.model_name))
    }
}
