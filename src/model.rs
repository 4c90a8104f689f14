//! Model seam for upstream-constructed networks
//!
//! Architectures are defined outside this crate. Trainers only need three
//! things from a network: a forward pass, the list of trainable parameters
//! for its optimizer, and a persistence operation.

use std::path::Path;

use candle_core::{Tensor, Var};

use crate::error::Result;

/// A trainable network as seen by the training loops.
///
/// Generators map a rank-3 batch `(n, window_len, 1)` to a reconstruction of
/// the same shape; discriminators map the same input to one logit per example.
/// The parameter sets of the networks handed to one trainer must be disjoint:
/// each optimizer mutates only its own network's variables.
pub trait TrainableModel {
    /// Run the network on one batch
    fn forward(&self, input: &Tensor) -> candle_core::Result<Tensor>;

    /// The variables mutated by this network's optimizer
    fn trainable_vars(&self) -> Vec<Var>;

    /// Persist the network weights to `path` (safetensors)
    fn save(&self, path: &Path) -> Result<()>;
}
