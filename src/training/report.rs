//! End-of-run summary

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a completed training run produced.
///
/// Progress during the run goes to the console; this record is what the
/// caller gets back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Configured model name
    pub model_name: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Epochs completed
    pub epochs_completed: usize,
    /// Gradient steps taken across all epochs
    pub global_steps: usize,
    /// Progress reports emitted
    pub reports_emitted: usize,
    /// Training loss of the last step, if any step ran
    pub final_train_loss: Option<f64>,
    /// Validation loss of the last report, if any report fired
    pub final_validation_loss: Option<f64>,
    /// Paths of the persisted model files
    pub artifacts: Vec<PathBuf>,
}
