//! Loss functions and reporting metrics
//!
//! Written directly over candle tensor ops. The cross-entropy works on raw
//! logits for both networks; nothing here applies a sigmoid before the loss.

use candle_core::Tensor;

use crate::error::Result;

/// Mean absolute error between a target batch and a prediction
pub fn mae(target: &Tensor, prediction: &Tensor) -> Result<Tensor> {
    Ok((target - prediction)?.abs()?.mean_all()?)
}

/// Binary cross-entropy on logits, mean-reduced.
///
/// Stable formulation `max(x, 0) - x*z + ln(1 + exp(-|x|))`; targets may be
/// soft (the noisy-label policy feeds values strictly inside (0, 1)).
pub fn bce_with_logits(targets: &Tensor, logits: &Tensor) -> Result<Tensor> {
    let max_part = logits.relu()?;
    let prod = (logits * targets)?;
    let log_part = logits.abs()?.neg()?.exp()?.affine(1.0, 1.0)?.log()?;
    let loss = ((max_part - prod)? + log_part)?;
    Ok(loss.mean_all()?)
}

/// Fraction of examples whose thresholded score agrees with a hard target.
///
/// A logit of at least zero counts as a "real" guess. Reporting only; never
/// differentiated through.
pub fn binary_accuracy(targets: &Tensor, logits: &Tensor) -> Result<f32> {
    let guesses = logits.ge(0.0)?.to_dtype(candle_core::DType::F32)?;
    let hits = guesses.eq(targets)?.to_dtype(candle_core::DType::F32)?;
    Ok(hits.mean_all()?.to_scalar::<f32>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use candle_core::Device;

    fn tensor(values: &[f32]) -> Tensor {
        Tensor::from_slice(values, (values.len(), 1), &Device::Cpu).unwrap()
    }

    #[test]
    fn mae_matches_hand_computation() {
        let target = tensor(&[1.0, 2.0, 3.0, 4.0]);
        let prediction = tensor(&[1.5, 2.0, 2.0, 5.0]);
        let loss = mae(&target, &prediction).unwrap().to_scalar::<f32>().unwrap();
        assert_relative_eq!(loss, (0.5 + 0.0 + 1.0 + 1.0) / 4.0, epsilon = 1e-6);
    }

    #[test]
    fn bce_matches_naive_formulation() {
        let logits = tensor(&[-2.0, -0.5, 0.0, 0.5, 2.0]);
        let targets = tensor(&[0.0, 1.0, 0.9, 0.1, 1.0]);
        let loss = bce_with_logits(&targets, &logits)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();

        let naive: f32 = logits
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap()
            .iter()
            .zip(targets.flatten_all().unwrap().to_vec1::<f32>().unwrap())
            .map(|(x, z)| {
                let p = 1.0 / (1.0 + (-x).exp());
                -(z * p.ln() + (1.0 - z) * (1.0 - p).ln())
            })
            .sum::<f32>()
            / 5.0;
        assert_relative_eq!(loss, naive, epsilon = 1e-5);
    }

    #[test]
    fn bce_is_finite_for_large_logits() {
        let logits = tensor(&[80.0, -80.0]);
        let targets = tensor(&[1.0, 0.0]);
        let loss = bce_with_logits(&targets, &logits)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(loss.is_finite());
        assert!(loss < 1e-3);
    }

    #[test]
    fn accuracy_thresholds_logits_at_zero() {
        let logits = tensor(&[3.0, -1.0, 0.5, -0.5]);
        let targets = tensor(&[1.0, 1.0, 0.0, 0.0]);
        let accuracy = binary_accuracy(&targets, &logits).unwrap();
        assert_relative_eq!(accuracy, 0.5, epsilon = 1e-6);
    }
}
