//! Data access and batch preparation
//!
//! Series files are produced upstream and read-only here. This module turns
//! one raw series into the pair of clean/corrupted batches a training step
//! consumes, and owns the corruption seam.

pub mod batch;
pub mod corruption;
pub mod store;
pub mod windowing;

pub use batch::{BatchBuilder, PreparedBatch};
pub use corruption::{BernoulliMasking, CorruptionPolicy};
pub use store::SeriesStore;
pub use windowing::{sliding_windows, trim_trailing_non_finite};
