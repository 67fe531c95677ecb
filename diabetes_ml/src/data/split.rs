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

//! Deterministic, outcome-stratified partitioning.
//!
//! Both the train/test split and the cross-validation folds shuffle each outcome
//! class separately with a seeded [`StdRng`], so class balance is preserved and
//! the same seed always yields the same partition.

use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::data::Dataset;
use crate::encoding::Level;
use crate::errors::SelectionError;

/// Row indices of the two partitions, each in ascending (file) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn shuffled_classes(dataset: &Dataset, rng: &mut StdRng) -> [Vec<usize>; 2] {
    let mut classes: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (i, record) in dataset.records().iter().enumerate() {
        classes[record.diabetes.index()].push(i);
    }
    for class in classes.iter_mut() {
        class.shuffle(rng);
    }
    classes
}

/// Splits `dataset` so that `train_ratio` of every outcome class lands in the
/// training partition.
pub fn stratified_split(
    dataset: &Dataset,
    train_ratio: f64,
    seed: u64,
) -> Result<TrainTestSplit, SelectionError> {
    if !(train_ratio > 0.0 && train_ratio < 1.0) {
        return Err(SelectionError::InvalidConfig(format!(
            "train ratio must lie strictly between 0 and 1, got {}",
            train_ratio
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity((dataset.len() as f64 * train_ratio) as usize + 2);
    let mut test = Vec::new();
    for class in shuffled_classes(dataset, &mut rng) {
        let n_train = (class.len() as f64 * train_ratio).round() as usize;
        train.extend_from_slice(&class[..n_train]);
        test.extend_from_slice(&class[n_train..]);
    }

    if train.is_empty() || test.is_empty() {
        return Err(SelectionError::InsufficientData(format!(
            "{} records cannot be split into non-empty train and test partitions",
            dataset.len()
        )));
    }

    train.sort_unstable();
    test.sort_unstable();
    debug!("Stratified split: {} train / {} test", train.len(), test.len());
    Ok(TrainTestSplit { train, test })
}

/// Stratified k-fold assignment over a dataset.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_records: usize,
    folds: Vec<Vec<usize>>,
}

impl StratifiedKFold {
    /// Deals each shuffled class round-robin into `k` folds. The deal position
    /// carries over between classes so fold sizes differ by at most one.
    pub fn new(dataset: &Dataset, k: usize, seed: u64) -> Result<Self, SelectionError> {
        if k < 2 {
            return Err(SelectionError::InvalidConfig(format!(
                "cross-validation needs at least 2 folds, got {}",
                k
            )));
        }
        if dataset.len() < k {
            return Err(SelectionError::InsufficientData(format!(
                "{} records cannot fill {} folds",
                dataset.len(),
                k
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut folds = vec![Vec::new(); k];
        let mut position = 0_usize;
        for class in shuffled_classes(dataset, &mut rng) {
            for idx in class {
                folds[position % k].push(idx);
                position += 1;
            }
        }
        for fold in folds.iter_mut() {
            fold.sort_unstable();
        }

        Ok(StratifiedKFold { n_records: dataset.len(), folds })
    }

    pub fn k(&self) -> usize {
        self.folds.len()
    }

    pub fn validation_fold(&self, fold: usize) -> &[usize] {
        &self.folds[fold]
    }

    /// Yields `(train, validation)` index sets, one pair per fold.
    pub fn splits(&self) -> impl Iterator<Item = (Vec<usize>, Vec<usize>)> + '_ {
        (0..self.k()).map(move |fold| {
            let mut in_fold = vec![false; self.n_records];
            for &idx in &self.folds[fold] {
                in_fold[idx] = true;
            }
            let train: Vec<usize> = (0..self.n_records).filter(|&i| !in_fold[i]).collect();
            (train, self.folds[fold].clone())
        })
    }
}
