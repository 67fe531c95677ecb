// BSD 3-Clause License
//
// Copyright (c) 2025, BlackPortal ○
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this
//    list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice,
//    this list of conditions and the following disclaimer in the documentation
//    and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its
//    contributors may be used to endorse or promote products derived from
//    this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
// AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
// IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE
// FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
// DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER
// CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY,
// OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use ndarray::Array1;

use crate::errors::LossError;

/// Probabilities are clipped to `[EPSILON, 1 - EPSILON]` before taking logs so a
/// confident wrong prediction costs a large but finite loss.
pub const EPSILON: f64 = 1e-15;

pub trait LossFunction {
    fn calculate(&self, predictions: &Array1<f64>, actuals: &Array1<f64>)
    -> Result<f64, LossError>;
}

/// Mean negative log-likelihood of the true class ("log-loss").
///
/// `predictions` are probabilities of the positive class and `actuals` are
/// `0.0`/`1.0` labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLoss;

impl LossFunction for LogLoss {
    fn calculate(
        &self,
        predictions: &Array1<f64>,
        actuals: &Array1<f64>,
    ) -> Result<f64, LossError> {
        if predictions.is_empty() || actuals.is_empty() {
            return Err(LossError::EmptyInput);
        }

        if predictions.len() != actuals.len() {
            return Err(LossError::DimensionMismatch {
                expected: predictions.len(),
                actual: actuals.len(),
            });
        }

        if predictions.iter().any(|&v| !v.is_finite()) || actuals.iter().any(|&v| !v.is_finite()) {
            return Err(LossError::InvalidNumericValue);
        }

        if predictions.iter().any(|&p| !(0.0..=1.0).contains(&p)) {
            return Err(LossError::InvalidPredictionRange);
        }

        if actuals.iter().any(|&y| y != 0.0 && y != 1.0) {
            return Err(LossError::InvalidActualValue);
        }

        let clipped_preds = predictions.mapv(|x| x.clamp(EPSILON, 1.0 - EPSILON));
        let log_loss = actuals
            .iter()
            .zip(clipped_preds.iter())
            .map(|(&y, &p)| -y * p.ln() - (1.0 - y) * (1.0 - p).ln())
            .sum::<f64>()
            / actuals.len() as f64;
        Ok(log_loss)
    }
}

/// Log-loss of [`LogLoss`] over `predictions` and `actuals`.
pub fn log_loss(predictions: &Array1<f64>, actuals: &Array1<f64>) -> Result<f64, LossError> {
    LogLoss.calculate(predictions, actuals)
}

/// Expected log-loss of a constant predictor that always outputs `prevalence`
/// when scored on data whose positive share is `prevalence`:
/// `-(p ln p + (1 - p) ln(1 - p))`.
pub fn baseline_log_loss(prevalence: f64) -> f64 {
    let p = prevalence.clamp(EPSILON, 1.0 - EPSILON);
    -(p * p.ln() + (1.0 - p) * (1.0 - p).ln())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, array};

    #[test]
    fn test_log_loss_empty_input() {
        let predictions = Array1::zeros(0);
        let actuals = array![0.0];
        let result = LogLoss.calculate(&predictions, &actuals);
        assert!(matches!(result, Err(LossError::EmptyInput)));
    }

    #[test]
    fn test_log_loss_dimension_mismatch() {
        let predictions = array![0.1, 0.9];
        let actuals = array![0.0, 1.0, 0.0];
        let result = LogLoss.calculate(&predictions, &actuals);
        assert!(matches!(result, Err(LossError::DimensionMismatch { expected: 2, actual: 3 })));
    }

    #[test]
    fn test_log_loss_invalid_numeric_value() {
        let predictions = array![0.1, f64::NAN];
        let actuals = array![0.0, 1.0];
        let result = LogLoss.calculate(&predictions, &actuals);
        assert!(matches!(result, Err(LossError::InvalidNumericValue)));
    }

    #[test]
    fn test_log_loss_invalid_prediction_range() {
        let predictions = array![0.1, 1.1];
        let actuals = array![0.0, 1.0];
        let result = LogLoss.calculate(&predictions, &actuals);
        assert!(matches!(result, Err(LossError::InvalidPredictionRange)));
    }

    #[test]
    fn test_log_loss_invalid_actual_value() {
        let predictions = array![0.1, 0.9];
        let actuals = array![0.0, 2.0];
        let result = LogLoss.calculate(&predictions, &actuals);
        assert!(matches!(result, Err(LossError::InvalidActualValue)));
    }

    #[test]
    fn test_log_loss_known_value() {
        let predictions = array![0.1, 0.9, 0.8, 0.3];
        let actuals = array![0.0, 1.0, 1.0, 0.0];
        let expected = -(0.9_f64.ln() + 0.9_f64.ln() + 0.8_f64.ln() + 0.7_f64.ln()) / 4.0;
        let loss = log_loss(&predictions, &actuals).unwrap();
        assert!((loss - expected).abs() < 1e-12);
    }

    #[test]
    fn test_log_loss_is_finite_for_certain_mistakes() {
        let predictions = array![0.0, 1.0];
        let actuals = array![1.0, 0.0];
        let loss = log_loss(&predictions, &actuals).unwrap();
        assert!(loss.is_finite());
        assert!(loss > 30.0);
    }

    #[test]
    fn test_perfect_predictions_near_zero() {
        let predictions = array![0.0, 1.0, 1.0];
        let actuals = array![0.0, 1.0, 1.0];
        assert!(log_loss(&predictions, &actuals).unwrap() < 1e-12);
    }

    #[test]
    fn test_baseline_log_loss_matches_constant_predictor() {
        let baseline = baseline_log_loss(0.15);
        assert!((baseline - 0.4227).abs() < 1e-3, "got {}", baseline);

        let actuals: Array1<f64> = (0..100).map(|i| if i < 15 { 1.0 } else { 0.0 }).collect();
        let predictions = Array1::from_elem(100, 0.15);
        let loss = log_loss(&predictions, &actuals).unwrap();
        assert!((loss - baseline).abs() < 1e-12);
    }
}
