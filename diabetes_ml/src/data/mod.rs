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

pub mod csv;
pub mod split;

pub use self::csv::SurveyCsvLoader;
pub use self::split::{StratifiedKFold, TrainTestSplit, stratified_split};

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::encoding::{Diabetes, FeatureRecord};

/// One respondent: the outcome and the four predictors used by the models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurveyRecord {
    pub diabetes: Diabetes,
    pub features: FeatureRecord,
}

/// An ordered, immutable collection of survey records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<SurveyRecord>,
}

impl Dataset {
    pub fn new(records: Vec<SurveyRecord>) -> Self {
        Dataset { records }
    }

    pub fn records(&self) -> &[SurveyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn features(&self) -> Vec<FeatureRecord> {
        self.records.iter().map(|r| r.features).collect()
    }

    /// Outcome as `0.0`/`1.0`, positive class `1.0`.
    pub fn targets(&self) -> Array1<f64> {
        self.records.iter().map(|r| r.diabetes.target()).collect()
    }

    /// Returns the records at `indices`, in the order given.
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset { records: indices.iter().map(|&i| self.records[i]).collect() }
    }

    pub fn positives(&self) -> usize {
        self.records.iter().filter(|r| r.diabetes == Diabetes::POSITIVE).count()
    }

    /// Share of records in the positive class, `0.0` for an empty dataset.
    pub fn prevalence(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        self.positives() as f64 / self.records.len() as f64
    }
}

/// A trait for loading a survey dataset from a file.
///
/// Implementors read the file at `path` and return the decoded [`Dataset`], or
/// their own error type describing why the file could not be used.
pub trait DataLoader {
    fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Dataset, Self::Error>;

    type Error: std::error::Error + 'static;
}

/// Loads a dataset using the given [`DataLoader`] implementation.
pub fn load_data<T: DataLoader, P: AsRef<std::path::Path>>(path: P) -> Result<Dataset, T::Error> {
    T::load(path)
}
