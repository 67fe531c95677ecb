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
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::tree::{DecisionTreeClassifier, Impurity};
use super::{Classifier, validate_prediction_input, validate_training_data};
use crate::errors::ModelError;

pub struct RandomForestBuilder {
    n_trees: usize,
    max_features: usize,
    max_depth: usize,
    min_samples_split: usize,
    min_samples_leaf: usize,
    impurity: Impurity,
    seed: u64,
}

impl RandomForestBuilder {
    pub fn n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    /// Features tried at each split (`mtry`).
    pub fn max_features(mut self, max_features: usize) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    pub fn min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn impurity(mut self, impurity: Impurity) -> Self {
        self.impurity = impurity;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> RandomForest {
        RandomForest {
            n_trees: self.n_trees,
            max_features: self.max_features,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            impurity: self.impurity,
            seed: self.seed,
            n_features: 0,
            trees: Vec::new(),
        }
    }
}

/// Bagged ensemble of unpruned trees with per-split feature subsampling.
///
/// The predicted probability is the mean of the trees' leaf probabilities,
/// which keeps predictions away from hard 0/1 votes and so keeps log-loss
/// finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_trees: usize,
    max_features: usize,
    max_depth: usize,
    min_samples_split: usize,
    min_samples_leaf: usize,
    impurity: Impurity,
    seed: u64,
    n_features: usize,
    trees: Vec<DecisionTreeClassifier>,
}

impl RandomForest {
    pub fn new() -> RandomForestBuilder {
        RandomForestBuilder {
            n_trees: 50,
            max_features: 2,
            max_depth: 10,
            min_samples_split: 20,
            min_samples_leaf: 7,
            impurity: Impurity::Gini,
            seed: 0,
        }
    }

    pub fn trees(&self) -> &[DecisionTreeClassifier] {
        &self.trees
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        validate_training_data(x, y)?;
        if self.n_trees == 0 {
            return Err(ModelError::InvalidParameter("forest needs at least one tree".into()));
        }
        if self.max_features == 0 || self.max_features > x.ncols() {
            return Err(ModelError::InvalidParameter(format!(
                "max_features must lie in 1..={}, got {}",
                x.ncols(),
                self.max_features
            )));
        }

        let n_samples = x.nrows();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut trees = Vec::with_capacity(self.n_trees);
        for _ in 0..self.n_trees {
            let bootstrap: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
            let mut tree = DecisionTreeClassifier::new()
                .max_depth(self.max_depth)
                .min_samples_split(self.min_samples_split)
                .min_samples_leaf(self.min_samples_leaf)
                .cp(0.0)
                .impurity(self.impurity)
                .max_features(Some(self.max_features))
                .seed(rng.gen())
                .build();
            tree.fit_indices(x, y, bootstrap)?;
            trees.push(tree);
        }
        debug!("Random forest (mtry={}) grew {} trees", self.max_features, trees.len());

        self.n_features = x.ncols();
        self.trees = trees;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        validate_prediction_input(x, self.n_features)?;

        let mut total = Array1::zeros(x.nrows());
        for tree in &self.trees {
            total += &tree.predict_proba(x)?;
        }
        Ok(total / self.trees.len() as f64)
    }
}
