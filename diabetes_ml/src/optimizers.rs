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

use ndarray::{Array1, Array2};

use crate::errors::OptimizerError;

pub trait Optimizer {
    fn compute_gradients(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        weights: &Array1<f64>,
        bias: f64,
    ) -> Result<(Array1<f64>, f64), OptimizerError>;
}

/// Full-batch gradient of the mean log-loss of a logistic model, with an
/// optional ridge (L2) penalty `l2 / 2 * ||w||^2` on the weights. The bias is
/// never penalised.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogisticGradientDescent {
    pub l2: f64,
}

impl LogisticGradientDescent {
    pub fn with_l2(l2: f64) -> Self {
        LogisticGradientDescent { l2 }
    }
}

impl Optimizer for LogisticGradientDescent {
    fn compute_gradients(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        weights: &Array1<f64>,
        bias: f64,
    ) -> Result<(Array1<f64>, f64), OptimizerError> {
        if x.is_empty() || y.is_empty() {
            return Err(OptimizerError::EmptyInput);
        }

        if x.shape()[1] != weights.len() {
            return Err(OptimizerError::DimensionMismatch {
                expected: x.shape()[1],
                actual: weights.len(),
            });
        }

        if x.shape()[0] != y.len() {
            return Err(OptimizerError::DimensionMismatch {
                expected: x.shape()[0],
                actual: y.len(),
            });
        }

        if weights.iter().any(|&v| !v.is_finite()) || !bias.is_finite() {
            return Err(OptimizerError::InvalidNumericValue);
        }

        let linear_output = x.dot(weights) + bias;
        let predictions = linear_output.mapv(sigmoid);
        let errors = &predictions - y;
        let grad_weights = x.t().dot(&errors) / x.shape()[0] as f64 + weights * self.l2;
        let grad_bias = errors.mean().ok_or(OptimizerError::NumericalInstability)?;

        if !grad_weights.iter().all(|&v| v.is_finite()) || !grad_bias.is_finite() {
            return Err(OptimizerError::NumericalInstability);
        }

        Ok((grad_weights, grad_bias))
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_at_zero_weights() {
        let x = array![[1.0], [-1.0]];
        let y = array![1.0, 0.0];
        let (grad_w, grad_b) = LogisticGradientDescent::default()
            .compute_gradients(&x, &y, &array![0.0], 0.0)
            .unwrap();
        // errors are [-0.5, 0.5]
        assert!((grad_w[0] + 0.5).abs() < 1e-12);
        assert!(grad_b.abs() < 1e-12);
    }

    #[test]
    fn test_l2_penalty_adds_weight_term() {
        let x = array![[1.0], [-1.0]];
        let y = array![1.0, 0.0];
        let w = array![0.0];
        let plain = LogisticGradientDescent::default().compute_gradients(&x, &y, &w, 0.0).unwrap();
        let w = array![2.0];
        let plain_at_2 =
            LogisticGradientDescent::default().compute_gradients(&x, &y, &w, 0.0).unwrap();
        let ridge = LogisticGradientDescent::with_l2(0.5).compute_gradients(&x, &y, &w, 0.0).unwrap();
        assert!((ridge.0[0] - (plain_at_2.0[0] + 1.0)).abs() < 1e-12);
        assert!((ridge.1 - plain_at_2.1).abs() < 1e-12);
        assert!(plain.0[0] < 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let x = array![[1.0, 2.0]];
        let y = array![1.0];
        let result = LogisticGradientDescent::default().compute_gradients(&x, &y, &array![0.0], 0.0);
        assert!(matches!(
            result,
            Err(OptimizerError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_empty_input() {
        let x: Array2<f64> = Array2::zeros((0, 1));
        let y: Array1<f64> = Array1::zeros(0);
        let result = LogisticGradientDescent::default().compute_gradients(&x, &y, &array![0.0], 0.0);
        assert!(matches!(result, Err(OptimizerError::EmptyInput)));
    }
}
