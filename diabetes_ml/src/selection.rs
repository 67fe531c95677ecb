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

//! Cross-validated model selection.
//!
//! The training partition is scored by stratified k-fold cross-validation for
//! every candidate of every family. Each family's best candidate is refitted
//! on the whole training partition and scored once on the held-out partition;
//! the lowest held-out log-loss wins.

use log::{debug, info, warn};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::data::{Dataset, StratifiedKFold, stratified_split};
use crate::encoding::FeatureSet;
use crate::errors::SelectionError;
use crate::losses::log_loss;
use crate::model::{FittedModel, ModelFamily, ModelSpec};
use crate::summary::DatasetSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticGrid {
    pub feature_sets: Vec<FeatureSet>,
    pub l2: Vec<f64>,
    pub max_epochs: usize,
}

impl Default for LogisticGrid {
    fn default() -> Self {
        LogisticGrid {
            feature_sets: FeatureSet::ALL.to_vec(),
            l2: vec![0.0, 0.001, 0.01, 0.1],
            max_epochs: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeGrid {
    pub cp: Vec<f64>,
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for TreeGrid {
    fn default() -> Self {
        TreeGrid { cp: vec![0.0001, 0.0005, 0.001, 0.005, 0.01], max_depth: 10, min_samples_split: 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestGrid {
    pub mtry: Vec<usize>,
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for ForestGrid {
    fn default() -> Self {
        ForestGrid { mtry: vec![1, 2, 3, 4], n_trees: 50, max_depth: 10, min_samples_split: 20 }
    }
}

/// Everything that determines a selection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub seed: u64,
    pub train_ratio: f64,
    pub folds: usize,
    pub logistic: LogisticGrid,
    pub tree: TreeGrid,
    pub forest: ForestGrid,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        SelectionConfig {
            seed: 2024,
            train_ratio: 0.7,
            folds: 5,
            logistic: LogisticGrid::default(),
            tree: TreeGrid::default(),
            forest: ForestGrid::default(),
        }
    }
}

impl SelectionConfig {
    /// Candidates of one family in grid order. For logistic regression the
    /// feature set varies slowest.
    pub fn candidates(&self, family: ModelFamily) -> Vec<ModelSpec> {
        match family {
            ModelFamily::Logistic => self
                .logistic
                .feature_sets
                .iter()
                .flat_map(move |&feature_set| {
                    self.logistic.l2.iter().map(move |&l2| ModelSpec::Logistic {
                        feature_set,
                        l2,
                        max_epochs: self.logistic.max_epochs,
                    })
                })
                .collect(),
            ModelFamily::Tree => self
                .tree
                .cp
                .iter()
                .map(|&cp| ModelSpec::Tree {
                    cp,
                    max_depth: self.tree.max_depth,
                    min_samples_split: self.tree.min_samples_split,
                })
                .collect(),
            ModelFamily::Forest => self
                .forest
                .mtry
                .iter()
                .map(|&mtry| ModelSpec::Forest {
                    mtry,
                    n_trees: self.forest.n_trees,
                    max_depth: self.forest.max_depth,
                    min_samples_split: self.forest.min_samples_split,
                })
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<(), SelectionError> {
        if self.logistic.l2.iter().any(|&l2| !(l2 >= 0.0)) {
            return Err(SelectionError::InvalidConfig("l2 penalties must be non-negative".into()));
        }
        if self.logistic.max_epochs == 0 {
            return Err(SelectionError::InvalidConfig("max_epochs must be at least 1".into()));
        }
        if self.tree.cp.iter().any(|&cp| !(cp >= 0.0)) {
            return Err(SelectionError::InvalidConfig("cp values must be non-negative".into()));
        }
        let n_main = FeatureSet::MainEffects.n_columns();
        if self.forest.mtry.iter().any(|&m| m == 0 || m > n_main) {
            return Err(SelectionError::InvalidConfig(format!(
                "mtry values must lie in 1..={}",
                n_main
            )));
        }
        if self.forest.n_trees == 0 {
            return Err(SelectionError::InvalidConfig("n_trees must be at least 1".into()));
        }
        for family in ModelFamily::ALL {
            if self.candidates(family).is_empty() {
                return Err(SelectionError::EmptyGrid(family.name()));
            }
        }
        Ok(())
    }
}

/// Cross-validation score of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvResult {
    pub spec: ModelSpec,
    pub fold_losses: Vec<f64>,
    pub mean_log_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyResult {
    pub family: ModelFamily,
    pub candidates: Vec<CvResult>,
    pub winner: CvResult,
    pub test_log_loss: f64,
}

/// Everything learned during a selection run, serialisable as the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    pub summary: DatasetSummary,
    pub seed: u64,
    pub folds: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub families: Vec<FamilyResult>,
    pub baseline_test_log_loss: f64,
    pub selected_family: ModelFamily,
    pub selected_spec: ModelSpec,
    pub selected_cv_log_loss: f64,
    pub selected_test_log_loss: f64,
}

pub struct SelectionOutcome {
    pub report: SelectionReport,
    pub model: FittedModel,
}

fn score(
    spec: &ModelSpec,
    model: &FittedModel,
    data: &Dataset,
) -> Result<f64, SelectionError> {
    let predictions = model
        .predict_proba(&data.features())
        .map_err(|source| SelectionError::Model { spec: spec.to_string(), source })?;
    log_loss(&predictions, &data.targets())
        .map_err(|source| SelectionError::Loss { spec: spec.to_string(), source })
}

fn fit(spec: &ModelSpec, data: &Dataset, seed: u64) -> Result<FittedModel, SelectionError> {
    spec.fit(&data.features(), &data.targets(), seed)
        .map_err(|source| SelectionError::Model { spec: spec.to_string(), source })
}

/// Mean log-loss of `spec` over the folds of `train`.
pub fn cross_validate(
    spec: &ModelSpec,
    train: &Dataset,
    folds: &StratifiedKFold,
    seed: u64,
) -> Result<CvResult, SelectionError> {
    let mut fold_losses = Vec::with_capacity(folds.k());
    for (fit_idx, validation_idx) in folds.splits() {
        let model = fit(spec, &train.subset(&fit_idx), seed)?;
        fold_losses.push(score(spec, &model, &train.subset(&validation_idx))?);
    }
    Ok(cv_result(*spec, fold_losses))
}

fn cv_result(spec: ModelSpec, fold_losses: Vec<f64>) -> CvResult {
    let mean_log_loss = fold_losses.iter().sum::<f64>() / fold_losses.len() as f64;
    debug!("{}: mean CV log-loss {:.5}", spec, mean_log_loss);
    CvResult { spec, fold_losses, mean_log_loss }
}

/// Cross-validates tree candidates that differ only in `cp` by growing one
/// unpruned tree per fold and pruning it at each candidate's `cp`. Scores are
/// identical to [`cross_validate`] on each spec. Other candidate lists fall
/// back to it.
pub fn cross_validate_tree_path(
    specs: &[ModelSpec],
    train: &Dataset,
    folds: &StratifiedKFold,
    seed: u64,
) -> Result<Vec<CvResult>, SelectionError> {
    let shared = match specs.first() {
        Some(&ModelSpec::Tree { max_depth, min_samples_split, .. })
            if specs.iter().all(|spec| {
                matches!(*spec, ModelSpec::Tree { max_depth: d, min_samples_split: m, .. }
                    if d == max_depth && m == min_samples_split)
            }) =>
        {
            ModelSpec::Tree { cp: 0.0, max_depth, min_samples_split }
        }
        _ => return specs.iter().map(|spec| cross_validate(spec, train, folds, seed)).collect(),
    };

    let mut fold_losses = vec![Vec::with_capacity(folds.k()); specs.len()];
    for (fit_idx, validation_idx) in folds.splits() {
        let grown = fit(&shared, &train.subset(&fit_idx), seed)?;
        let validation = train.subset(&validation_idx);
        for (spec, losses) in specs.iter().zip(fold_losses.iter_mut()) {
            let ModelSpec::Tree { cp, .. } = *spec else { continue };
            let model = grown
                .pruned(cp)
                .map_err(|source| SelectionError::Model { spec: spec.to_string(), source })?;
            losses.push(score(spec, &model, &validation)?);
        }
    }
    Ok(specs.iter().zip(fold_losses).map(|(spec, losses)| cv_result(*spec, losses)).collect())
}

/// Index of the minimum. Ties keep the earliest entry.
fn argmin(values: impl IntoIterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.into_iter().enumerate() {
        if best.map_or(true, |(_, b)| v < b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

/// Runs the full selection and returns the winning model fitted on the
/// training partition.
pub fn select_model(
    dataset: &Dataset,
    config: &SelectionConfig,
) -> Result<SelectionOutcome, SelectionError> {
    config.validate()?;
    let summary = DatasetSummary::from_dataset(dataset);
    summary.log();

    let split = stratified_split(dataset, config.train_ratio, config.seed)?;
    let train = dataset.subset(&split.train);
    let test = dataset.subset(&split.test);
    let folds = StratifiedKFold::new(&train, config.folds, config.seed)?;
    info!(
        "Training on {} records, holding out {}, {}-fold cross-validation",
        train.len(),
        test.len(),
        folds.k()
    );

    let mut families = Vec::with_capacity(ModelFamily::ALL.len());
    let mut finalists = Vec::with_capacity(ModelFamily::ALL.len());
    for family in ModelFamily::ALL {
        let specs = config.candidates(family);
        let candidates = match family {
            ModelFamily::Tree => cross_validate_tree_path(&specs, &train, &folds, config.seed)?,
            _ => specs
                .iter()
                .map(|spec| cross_validate(spec, &train, &folds, config.seed))
                .collect::<Result<Vec<_>, _>>()?,
        };
        let best = argmin(candidates.iter().map(|c| c.mean_log_loss))
            .ok_or(SelectionError::EmptyGrid(family.name()))?;
        let winner = candidates[best].clone();

        let model = fit(&winner.spec, &train, config.seed)?;
        let test_log_loss = score(&winner.spec, &model, &test)?;
        info!(
            "Best {} candidate: {} (CV log-loss {:.5}, test log-loss {:.5})",
            family, winner.spec, winner.mean_log_loss, test_log_loss
        );

        families.push(FamilyResult { family, candidates, winner, test_log_loss });
        finalists.push(model);
    }

    let prevalence = train.prevalence();
    let baseline_test_log_loss = log_loss(&Array1::from_elem(test.len(), prevalence), &test.targets())
        .map_err(|source| SelectionError::Loss { spec: "base rate".to_string(), source })?;
    info!("Base-rate baseline (p={:.4}) test log-loss {:.5}", prevalence, baseline_test_log_loss);

    let selected = argmin(families.iter().map(|f| f.test_log_loss))
        .ok_or(SelectionError::EmptyGrid("any"))?;
    let chosen = &families[selected];
    if chosen.test_log_loss >= baseline_test_log_loss {
        warn!(
            "Selected {} model does not beat the base-rate baseline ({:.5} >= {:.5})",
            chosen.family, chosen.test_log_loss, baseline_test_log_loss
        );
    }
    info!("Selected {} ({})", chosen.family, chosen.winner.spec);

    let report = SelectionReport {
        summary,
        seed: config.seed,
        folds: folds.k(),
        train_rows: train.len(),
        test_rows: test.len(),
        selected_family: chosen.family,
        selected_spec: chosen.winner.spec,
        selected_cv_log_loss: chosen.winner.mean_log_loss,
        selected_test_log_loss: chosen.test_log_loss,
        baseline_test_log_loss,
        families,
    };
    let model = finalists.swap_remove(selected);
    Ok(SelectionOutcome { report, model })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SurveyRecord;
    use crate::encoding::{Diabetes, FeatureRecord, Sex, YesNo};

    /// Deterministic synthetic survey where risk rises with BMI and high blood
    /// pressure.
    fn synthetic(n: usize) -> Dataset {
        let records = (0..n)
            .map(|i| {
                let bmi = 18.0 + ((i * 37) % 250) as f64 / 10.0;
                let high_bp = if (i * 7) % 3 == 0 { YesNo::Yes } else { YesNo::No };
                let phys_activity = if (i * 11) % 4 == 0 { YesNo::No } else { YesNo::Yes };
                let sex = if (i * 13) % 2 == 0 { Sex::Male } else { Sex::Female };
                let score = (bmi - 30.0) / 4.0 + if high_bp == YesNo::Yes { 1.5 } else { -1.0 };
                let jitter = ((i * 2654435761) % 1000) as f64 / 1000.0;
                let positive = 1.0 / (1.0 + (-score).exp()) > jitter;
                SurveyRecord {
                    diabetes: if positive { Diabetes::Yes } else { Diabetes::No },
                    features: FeatureRecord { bmi, phys_activity, high_bp, sex },
                }
            })
            .collect();
        Dataset::new(records)
    }

    fn small_config() -> SelectionConfig {
        SelectionConfig {
            seed: 11,
            train_ratio: 0.7,
            folds: 3,
            logistic: LogisticGrid {
                feature_sets: vec![FeatureSet::MainEffects, FeatureSet::Quadratic],
                l2: vec![0.0, 0.1],
                max_epochs: 200,
            },
            tree: TreeGrid { cp: vec![0.001, 0.01], max_depth: 5, min_samples_split: 20 },
            forest: ForestGrid { mtry: vec![1, 2], n_trees: 5, max_depth: 5, min_samples_split: 20 },
        }
    }

    #[test]
    fn test_candidates_follow_grid_order() {
        let config = SelectionConfig::default();
        let logistic = config.candidates(ModelFamily::Logistic);
        assert_eq!(logistic.len(), 12);
        assert_eq!(
            logistic[1],
            ModelSpec::Logistic { feature_set: FeatureSet::MainEffects, l2: 0.001, max_epochs: 1000 }
        );
        assert_eq!(config.candidates(ModelFamily::Tree).len(), 5);
        assert_eq!(config.candidates(ModelFamily::Forest).len(), 4);
    }

    #[test]
    fn test_argmin_keeps_first_tie() {
        assert_eq!(argmin([0.5, 0.3, 0.3, 0.4]), Some(1));
        assert_eq!(argmin(Vec::<f64>::new()), None);
    }

    #[test]
    fn test_validate_rejects_bad_grids() {
        let mut config = SelectionConfig::default();
        config.tree.cp.clear();
        assert!(matches!(config.validate(), Err(SelectionError::EmptyGrid("tree"))));

        let mut config = SelectionConfig::default();
        config.forest.mtry = vec![5];
        assert!(matches!(config.validate(), Err(SelectionError::InvalidConfig(_))));

        let mut config = SelectionConfig::default();
        config.logistic.l2 = vec![-0.1];
        assert!(matches!(config.validate(), Err(SelectionError::InvalidConfig(_))));
    }

    #[test]
    fn test_cross_validate_reports_every_fold() {
        let data = synthetic(300);
        let folds = StratifiedKFold::new(&data, 4, 1).unwrap();
        let spec = ModelSpec::Tree { cp: 0.01, max_depth: 4, min_samples_split: 20 };
        let result = cross_validate(&spec, &data, &folds, 1).unwrap();
        assert_eq!(result.fold_losses.len(), 4);
        let mean = result.fold_losses.iter().sum::<f64>() / 4.0;
        assert!((result.mean_log_loss - mean).abs() < 1e-12);
    }

    #[test]
    fn test_selection_picks_lowest_test_loss() {
        let data = synthetic(400);
        let outcome = select_model(&data, &small_config()).unwrap();
        let report = &outcome.report;

        assert_eq!(report.families.len(), 3);
        assert_eq!(report.train_rows + report.test_rows, 400);
        let min = report.families.iter().map(|f| f.test_log_loss).fold(f64::INFINITY, f64::min);
        assert_eq!(report.selected_test_log_loss, min);
        assert_eq!(outcome.model.family(), report.selected_family);
        for family in &report.families {
            let best = family.candidates.iter().map(|c| c.mean_log_loss).fold(f64::INFINITY, f64::min);
            assert_eq!(family.winner.mean_log_loss, best);
        }
    }

    #[test]
    fn test_tree_path_matches_per_candidate_cv() {
        let data = synthetic(300);
        let config = small_config();
        let folds = StratifiedKFold::new(&data, config.folds, config.seed).unwrap();
        let specs = config.candidates(ModelFamily::Tree);

        let path = cross_validate_tree_path(&specs, &data, &folds, config.seed).unwrap();
        let direct: Vec<CvResult> =
            specs.iter().map(|spec| cross_validate(spec, &data, &folds, config.seed).unwrap()).collect();
        assert_eq!(path, direct);

        // Mixed families take the per-candidate route
        let mixed = [specs[0], config.candidates(ModelFamily::Logistic)[0]];
        let results = cross_validate_tree_path(&mixed, &data, &folds, config.seed).unwrap();
        assert_eq!(results[0], direct[0]);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let data = synthetic(300);
        let a = select_model(&data, &small_config()).unwrap();
        let b = select_model(&data, &small_config()).unwrap();
        assert_eq!(a.report.selected_family, b.report.selected_family);
        assert_eq!(a.report.selected_test_log_loss, b.report.selected_test_log_loss);
        assert_eq!(a.model, b.model);
    }

    #[test]
    fn test_selection_beats_base_rate_on_signal() {
        let data = synthetic(400);
        let outcome = select_model(&data, &small_config()).unwrap();
        assert!(outcome.report.selected_test_log_loss < outcome.report.baseline_test_log_loss);
    }
}
