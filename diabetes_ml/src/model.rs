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

//! The closed set of model families compared by the selection pipeline.

use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::algorithms::{Classifier, DecisionTreeClassifier, LogisticRegression, RandomForest};
use crate::encoding::{FeatureRecord, FeatureSet};
use crate::errors::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Logistic,
    Tree,
    Forest,
}

impl ModelFamily {
    /// Families in comparison order. Ties on held-out loss keep the earlier one.
    pub const ALL: [ModelFamily; 3] = [ModelFamily::Logistic, ModelFamily::Tree, ModelFamily::Forest];

    pub fn name(self) -> &'static str {
        match self {
            ModelFamily::Logistic => "logistic",
            ModelFamily::Tree => "tree",
            ModelFamily::Forest => "forest",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One candidate setting: a family plus its feature set and hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum ModelSpec {
    Logistic {
        feature_set: FeatureSet,
        l2: f64,
        max_epochs: usize,
    },
    Tree {
        cp: f64,
        max_depth: usize,
        min_samples_split: usize,
    },
    Forest {
        mtry: usize,
        n_trees: usize,
        max_depth: usize,
        min_samples_split: usize,
    },
}

impl ModelSpec {
    pub fn family(&self) -> ModelFamily {
        match self {
            ModelSpec::Logistic { .. } => ModelFamily::Logistic,
            ModelSpec::Tree { .. } => ModelFamily::Tree,
            ModelSpec::Forest { .. } => ModelFamily::Forest,
        }
    }

    /// Design-matrix layout the model is fitted on. Trees split on the raw
    /// main effects.
    pub fn feature_set(&self) -> FeatureSet {
        match self {
            ModelSpec::Logistic { feature_set, .. } => *feature_set,
            ModelSpec::Tree { .. } | ModelSpec::Forest { .. } => FeatureSet::MainEffects,
        }
    }

    /// Fits a fresh model of this spec. `seed` drives any randomness in the
    /// family (forest bootstraps and feature subsampling).
    pub fn fit(
        &self,
        records: &[FeatureRecord],
        targets: &Array1<f64>,
        seed: u64,
    ) -> Result<FittedModel, ModelError> {
        let feature_set = self.feature_set();
        let x = feature_set.design_matrix(records);

        let fitted = match *self {
            ModelSpec::Logistic { l2, max_epochs, .. } => {
                let mut model = LogisticRegression::new().l2(l2).max_epochs(max_epochs).build();
                model.fit(&x, targets)?;
                FittedModel::Logistic { feature_set, model }
            }
            ModelSpec::Tree { cp, max_depth, min_samples_split } => {
                let mut model = DecisionTreeClassifier::new()
                    .cp(cp)
                    .max_depth(max_depth)
                    .min_samples_split(min_samples_split)
                    .seed(seed)
                    .build();
                model.fit(&x, targets)?;
                FittedModel::Tree { model }
            }
            ModelSpec::Forest { mtry, n_trees, max_depth, min_samples_split } => {
                let mut model = RandomForest::new()
                    .max_features(mtry)
                    .n_trees(n_trees)
                    .max_depth(max_depth)
                    .min_samples_split(min_samples_split)
                    .seed(seed)
                    .build();
                model.fit(&x, targets)?;
                FittedModel::Forest { model }
            }
        };
        Ok(fitted)
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSpec::Logistic { feature_set, l2, .. } if *l2 == 0.0 => {
                write!(f, "logistic({}, plain)", feature_set)
            }
            ModelSpec::Logistic { feature_set, l2, .. } => {
                write!(f, "logistic({}, l2={})", feature_set, l2)
            }
            ModelSpec::Tree { cp, .. } => write!(f, "tree(cp={})", cp),
            ModelSpec::Forest { mtry, n_trees, .. } => {
                write!(f, "forest(mtry={}, trees={})", mtry, n_trees)
            }
        }
    }
}

/// A fitted model together with the design-matrix layout it expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum FittedModel {
    Logistic { feature_set: FeatureSet, model: LogisticRegression },
    Tree { model: DecisionTreeClassifier },
    Forest { model: RandomForest },
}

impl FittedModel {
    pub fn family(&self) -> ModelFamily {
        match self {
            FittedModel::Logistic { .. } => ModelFamily::Logistic,
            FittedModel::Tree { .. } => ModelFamily::Tree,
            FittedModel::Forest { .. } => ModelFamily::Forest,
        }
    }

    pub fn feature_set(&self) -> FeatureSet {
        match self {
            FittedModel::Logistic { feature_set, .. } => *feature_set,
            FittedModel::Tree { .. } | FittedModel::Forest { .. } => FeatureSet::MainEffects,
        }
    }

    /// The same tree pruned at `cp`. Only tree models can be pruned.
    pub fn pruned(&self, cp: f64) -> Result<FittedModel, ModelError> {
        match self {
            FittedModel::Tree { model } => Ok(FittedModel::Tree { model: model.pruned(cp)? }),
            other => Err(ModelError::InvalidParameter(format!(
                "{} models cannot be pruned",
                other.family()
            ))),
        }
    }

    /// P(diabetes = Yes) for every record. Fails rather than returning a value
    /// outside `[0, 1]`.
    pub fn predict_proba(&self, records: &[FeatureRecord]) -> Result<Array1<f64>, ModelError> {
        let x = self.feature_set().design_matrix(records);
        let probabilities = match self {
            FittedModel::Logistic { model, .. } => model.predict_proba(&x)?,
            FittedModel::Tree { model } => model.predict_proba(&x)?,
            FittedModel::Forest { model } => model.predict_proba(&x)?,
        };
        if let Some(&bad) = probabilities.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(ModelError::InvalidProbability(bad));
        }
        Ok(probabilities)
    }

    pub fn predict_one(&self, record: &FeatureRecord) -> Result<f64, ModelError> {
        let probabilities = self.predict_proba(std::slice::from_ref(record))?;
        probabilities.first().copied().ok_or(ModelError::EmptyInput)
    }
}
