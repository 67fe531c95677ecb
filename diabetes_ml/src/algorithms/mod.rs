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

//! Binary classifiers that output the probability of the positive class.

pub mod forest;
pub mod logistic;
pub mod tree;

pub use forest::RandomForest;
pub use logistic::LogisticRegression;
pub use tree::{DecisionTreeClassifier, Impurity};

use ndarray::{Array1, Array2};

use crate::errors::ModelError;

/// Uniform fit / predict-probability interface over every model family.
pub trait Classifier {
    /// Fits the model on a design matrix and `0.0`/`1.0` labels.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError>;

    /// Probability of the positive class for every row of `x`.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError>;
}

pub(crate) fn validate_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
    if x.is_empty() || y.is_empty() {
        return Err(ModelError::EmptyInput);
    }
    if x.nrows() != y.len() {
        return Err(ModelError::DimensionMismatch { expected: x.nrows(), actual: y.len() });
    }
    if y.iter().any(|&v| v != 0.0 && v != 1.0) {
        return Err(ModelError::InvalidLabels);
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::InvalidParameter("feature matrix contains non-finite values".into()));
    }
    Ok(())
}

pub(crate) fn validate_prediction_input(x: &Array2<f64>, n_features: usize) -> Result<(), ModelError> {
    if x.ncols() != n_features {
        return Err(ModelError::DimensionMismatch { expected: n_features, actual: x.ncols() });
    }
    Ok(())
}
