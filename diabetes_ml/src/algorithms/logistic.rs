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

use log::debug;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::{Classifier, validate_prediction_input, validate_training_data};
use crate::errors::{LossError, ModelError};
use crate::losses::{LogLoss, LossFunction};
use crate::optimizers::{LogisticGradientDescent, Optimizer, sigmoid};
use crate::scalers::StandardScaler;

pub struct LogisticRegressionBuilder {
    l2: f64,
    learning_rate: f64,
    max_epochs: usize,
    tolerance: f64,
    normalize: bool,
}

impl LogisticRegressionBuilder {
    /// Ridge penalty on the weights. `0.0` fits a plain (unregularised) model.
    pub fn l2(mut self, l2: f64) -> Self {
        self.l2 = l2;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }

    /// Stop early once every gradient component is below this magnitude.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn build(self) -> LogisticRegression {
        LogisticRegression {
            weights: Array1::zeros(0),
            bias: 0.0,
            l2: self.l2,
            learning_rate: self.learning_rate,
            max_epochs: self.max_epochs,
            tolerance: self.tolerance,
            normalize: self.normalize,
            x_scaler: StandardScaler::new(),
            fitted: false,
        }
    }
}

/// Logistic regression fitted by full-batch gradient descent on standardised
/// features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    weights: Array1<f64>,
    bias: f64,
    l2: f64,
    learning_rate: f64,
    max_epochs: usize,
    tolerance: f64,
    normalize: bool,
    x_scaler: StandardScaler,
    fitted: bool,
}

impl LogisticRegression {
    pub fn new() -> LogisticRegressionBuilder {
        LogisticRegressionBuilder {
            l2: 0.0,
            learning_rate: 0.5,
            max_epochs: 1000,
            tolerance: 1e-6,
            normalize: true,
        }
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn calculate_loss(
        &self,
        predictions: &Array1<f64>,
        actuals: &Array1<f64>,
    ) -> Result<f64, LossError> {
        LogLoss.calculate(predictions, actuals)
    }

    #[inline(always)]
    fn predict_linear(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.weights) + self.bias
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        validate_training_data(x, y)?;
        if !(self.learning_rate > 0.0) || !(self.l2 >= 0.0) {
            return Err(ModelError::InvalidParameter(format!(
                "learning rate must be positive and l2 non-negative (got {}, {})",
                self.learning_rate, self.l2
            )));
        }

        let x_scaled = if self.normalize { self.x_scaler.fit_transform(x)? } else { x.clone() };
        let optimizer = LogisticGradientDescent::with_l2(self.l2);
        self.weights = Array1::zeros(x_scaled.ncols());
        self.bias = 0.0;

        let mut epochs_run = 0;
        for _ in 0..self.max_epochs {
            let (grad_weights, grad_bias) =
                optimizer.compute_gradients(&x_scaled, y, &self.weights, self.bias)?;

            self.weights -= &(&grad_weights * self.learning_rate);
            self.bias -= grad_bias * self.learning_rate;
            epochs_run += 1;

            let max_grad = grad_weights.iter().fold(grad_bias.abs(), |acc, g| acc.max(g.abs()));
            if max_grad < self.tolerance {
                break;
            }
        }
        debug!("Logistic regression (l2={}) converged after {} epochs", self.l2, epochs_run);

        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        if !self.fitted {
            return Err(ModelError::NotFitted);
        }
        validate_prediction_input(x, self.weights.len())?;
        let x_scaled = if self.normalize { self.x_scaler.transform(x)? } else { x.clone() };
        Ok(self.predict_linear(&x_scaled).mapv(sigmoid))
    }
}
