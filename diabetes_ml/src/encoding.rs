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

//! Categorical encoding shared by the training pipeline and the scoring service.
//!
//! Every categorical field has a fixed, ordered set of levels. The first level is
//! the reference level and the second one is encoded as an indicator column, so
//! a record always maps to the same design-matrix row regardless of which process
//! builds it. The outcome levels are ordered negative first and the positive class
//! is [`Diabetes::Yes`]; probabilities reported anywhere in this crate are for
//! that class.
//!
//! [`EncodingScheme`] is the serialisable description of all of the above. It is
//! written into every model artifact and compared against
//! [`EncodingScheme::current`] when an artifact is loaded.

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::errors::EncodingError;

/// The dataset fields the models know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldName {
    Diabetes,
    Bmi,
    PhysActivity,
    HighBp,
    Sex,
}

impl FieldName {
    /// Column header in the survey CSV.
    pub fn column(self) -> &'static str {
        match self {
            FieldName::Diabetes => "Diabetes_binary",
            FieldName::Bmi => "BMI",
            FieldName::PhysActivity => "PhysActivity",
            FieldName::HighBp => "HighBP",
            FieldName::Sex => "Sex",
        }
    }

    /// Query parameter name on the `/pred` route.
    pub fn query_param(self) -> &'static str {
        match self {
            FieldName::Diabetes => "diabetes",
            FieldName::Bmi => "bmi",
            FieldName::PhysActivity => "physActivity",
            FieldName::HighBp => "highBP",
            FieldName::Sex => "sex",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A two-level categorical value stored as `0`/`1` in the survey file.
pub trait Level: Sized + Copy {
    /// Level labels in factor order. Index 0 is the reference level.
    const LEVELS: [&'static str; 2];

    fn index(self) -> usize;

    fn from_index(index: usize) -> Option<Self>;

    fn label(self) -> &'static str {
        Self::LEVELS[self.index()]
    }

    /// Indicator value used in the design matrix (reference level is `0.0`).
    fn indicator(self) -> f64 {
        self.index() as f64
    }

    /// Decodes a raw survey code. Only exact `0` and `1` are accepted.
    fn from_code(field: FieldName, code: f64) -> Result<Self, EncodingError> {
        let index = if code == 0.0 {
            0
        } else if code == 1.0 {
            1
        } else {
            return Err(EncodingError::UnknownCode { field, code });
        };
        Self::from_index(index).ok_or(EncodingError::UnknownCode { field, code })
    }

    /// Parses a level label. Surrounding whitespace is ignored and matching is
    /// ASCII case-insensitive, so `" yes"` and `"YES"` both decode to `Yes`.
    fn parse_label(field: FieldName, value: &str) -> Result<Self, EncodingError> {
        let trimmed = value.trim();
        Self::LEVELS
            .iter()
            .position(|level| level.eq_ignore_ascii_case(trimmed))
            .and_then(Self::from_index)
            .ok_or_else(|| EncodingError::UnknownLevel {
                field,
                value: value.to_string(),
                allowed: Self::LEVELS.join(", "),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YesNo {
    No,
    Yes,
}

impl Level for YesNo {
    const LEVELS: [&'static str; 2] = ["No", "Yes"];

    fn index(self) -> usize {
        match self {
            YesNo::No => 0,
            YesNo::Yes => 1,
        }
    }

    fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(YesNo::No),
            1 => Some(YesNo::Yes),
            _ => None,
        }
    }
}

/// Respondent sex. The survey codes female as `0` and male as `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Female,
    Male,
}

impl Level for Sex {
    const LEVELS: [&'static str; 2] = ["Female", "Male"];

    fn index(self) -> usize {
        match self {
            Sex::Female => 0,
            Sex::Male => 1,
        }
    }

    fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Sex::Female),
            1 => Some(Sex::Male),
            _ => None,
        }
    }
}

/// Outcome label. `No` is the first level and `Yes` the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Diabetes {
    No,
    Yes,
}

impl Diabetes {
    pub const POSITIVE: Diabetes = Diabetes::Yes;

    /// Numeric target used for fitting and log-loss: `1.0` for the positive class.
    pub fn target(self) -> f64 {
        if self == Self::POSITIVE {
            1.0
        } else {
            0.0
        }
    }
}

impl Level for Diabetes {
    const LEVELS: [&'static str; 2] = ["No", "Yes"];

    fn index(self) -> usize {
        match self {
            Diabetes::No => 0,
            Diabetes::Yes => 1,
        }
    }

    fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Diabetes::No),
            1 => Some(Diabetes::Yes),
            _ => None,
        }
    }
}

/// The predictors of one respondent, already decoded into typed levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub bmi: f64,
    pub phys_activity: YesNo,
    pub high_bp: YesNo,
    pub sex: Sex,
}

/// The predictor formulas the pipeline compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureSet {
    /// `BMI + PhysActivity + HighBP + Sex`
    MainEffects,
    /// Main effects plus `BMI:HighBP` and `PhysActivity:Sex`.
    Interactions,
    /// Main effects plus `I(BMI^2)`.
    Quadratic,
}

impl FeatureSet {
    pub const ALL: [FeatureSet; 3] =
        [FeatureSet::MainEffects, FeatureSet::Interactions, FeatureSet::Quadratic];

    pub fn column_names(self) -> Vec<&'static str> {
        let mut names = vec!["BMI", "PhysActivityYes", "HighBPYes", "SexMale"];
        match self {
            FeatureSet::MainEffects => {}
            FeatureSet::Interactions => {
                names.extend(["BMI:HighBPYes", "PhysActivityYes:SexMale"]);
            }
            FeatureSet::Quadratic => names.push("I(BMI^2)"),
        }
        names
    }

    pub fn n_columns(self) -> usize {
        match self {
            FeatureSet::MainEffects => 4,
            FeatureSet::Interactions => 6,
            FeatureSet::Quadratic => 5,
        }
    }

    pub fn design_row(self, record: &FeatureRecord) -> Vec<f64> {
        let phys = record.phys_activity.indicator();
        let high_bp = record.high_bp.indicator();
        let male = record.sex.indicator();

        let mut row = vec![record.bmi, phys, high_bp, male];
        match self {
            FeatureSet::MainEffects => {}
            FeatureSet::Interactions => row.extend([record.bmi * high_bp, phys * male]),
            FeatureSet::Quadratic => row.push(record.bmi * record.bmi),
        }
        row
    }

    /// Builds the `(n_records, n_columns)` design matrix.
    pub fn design_matrix(self, records: &[FeatureRecord]) -> Array2<f64> {
        let mut matrix = Array2::zeros((records.len(), self.n_columns()));
        for (mut row, record) in matrix.rows_mut().into_iter().zip(records) {
            for (cell, value) in row.iter_mut().zip(self.design_row(record)) {
                *cell = value;
            }
        }
        matrix
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureSet::MainEffects => "main-effects",
            FeatureSet::Interactions => "interactions",
            FeatureSet::Quadratic => "quadratic",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldEncoding {
    Numeric { name: String },
    Categorical { name: String, levels: Vec<String> },
}

impl FieldEncoding {
    fn categorical<L: Level>(field: FieldName) -> Self {
        FieldEncoding::Categorical {
            name: field.column().to_string(),
            levels: L::LEVELS.iter().map(|level| level.to_string()).collect(),
        }
    }

    fn name(&self) -> &str {
        match self {
            FieldEncoding::Numeric { name } | FieldEncoding::Categorical { name, .. } => name,
        }
    }

    fn levels(&self) -> Vec<String> {
        match self {
            FieldEncoding::Numeric { .. } => Vec::new(),
            FieldEncoding::Categorical { levels, .. } => levels.clone(),
        }
    }
}

/// Serialisable description of how records are encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingScheme {
    pub outcome: FieldEncoding,
    pub positive_level: String,
    pub predictors: Vec<FieldEncoding>,
}

impl EncodingScheme {
    /// The encoding compiled into this crate.
    pub fn current() -> Self {
        EncodingScheme {
            outcome: FieldEncoding::categorical::<Diabetes>(FieldName::Diabetes),
            positive_level: Diabetes::POSITIVE.label().to_string(),
            predictors: vec![
                FieldEncoding::Numeric { name: FieldName::Bmi.column().to_string() },
                FieldEncoding::categorical::<YesNo>(FieldName::PhysActivity),
                FieldEncoding::categorical::<YesNo>(FieldName::HighBp),
                FieldEncoding::categorical::<Sex>(FieldName::Sex),
            ],
        }
    }

    /// Checks that `found` (typically read from an artifact) encodes records
    /// exactly like `self`.
    pub fn ensure_compatible(&self, found: &EncodingScheme) -> Result<(), EncodingError> {
        if self.outcome != found.outcome {
            return Err(mismatch(&self.outcome, &found.outcome));
        }
        if self.positive_level != found.positive_level {
            return Err(EncodingError::SchemeMismatch {
                field: "positive level".to_string(),
                expected: vec![self.positive_level.clone()],
                found: vec![found.positive_level.clone()],
            });
        }
        if self.predictors.len() != found.predictors.len() {
            return Err(EncodingError::SchemeMismatch {
                field: "predictors".to_string(),
                expected: self.predictors.iter().map(|p| p.name().to_string()).collect(),
                found: found.predictors.iter().map(|p| p.name().to_string()).collect(),
            });
        }
        for (expected, found) in self.predictors.iter().zip(&found.predictors) {
            if expected != found {
                return Err(mismatch(expected, found));
            }
        }
        Ok(())
    }
}

fn mismatch(expected: &FieldEncoding, found: &FieldEncoding) -> EncodingError {
    EncodingError::SchemeMismatch {
        field: expected.name().to_string(),
        expected: expected.levels(),
        found: found.levels(),
    }
}
