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

use thiserror::Error;

use crate::encoding::FieldName;

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("Failed to open file: {0}")]
    FileOpen(#[from] std::io::Error),

    #[error("CSV file is empty")]
    EmptyFile,

    #[error("CSV header is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("Inconsistent column count: row {row} has {actual} columns, expected {expected}")]
    InconsistentColumns { row: usize, actual: usize, expected: usize },

    #[error("Invalid numeric value '{value}' in column '{column}' at row {row}: {source}")]
    InvalidNumeric {
        value: String,
        column: &'static str,
        row: usize,
        source: std::num::ParseFloatError,
    },

    #[error("BMI must be a positive finite number, got '{value}' in column '{column}' at row {row}")]
    InvalidBmi { value: String, column: &'static str, row: usize },

    #[error("Invalid value in column '{column}' at row {row}: {source}")]
    InvalidLevel { column: &'static str, row: usize, source: EncodingError },

    #[error("No usable rows remain after dropping incomplete records")]
    NoRecords,

    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("{field} code {code} is not a recognised level code (expected 0 or 1)")]
    UnknownCode { field: FieldName, code: f64 },

    #[error("'{value}' is not a valid {field} level (expected one of: {allowed})")]
    UnknownLevel { field: FieldName, value: String, allowed: String },

    #[error("Encoding scheme mismatch for {field}: artifact has {found:?}, expected {expected:?}")]
    SchemeMismatch { field: String, expected: Vec<String>, found: Vec<String> },
}

#[derive(Error, Debug, PartialEq)]
pub enum LossError {
    #[error("Input arrays must not be empty")]
    EmptyInput,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Input contains NaN or infinite values")]
    InvalidNumericValue,

    #[error("Predicted probabilities must lie in [0, 1]")]
    InvalidPredictionRange,

    #[error("Actual labels must be 0 or 1")]
    InvalidActualValue,
}

#[derive(Error, Debug, PartialEq)]
pub enum OptimizerError {
    #[error("Input arrays must not be empty")]
    EmptyInput,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Input contains NaN or infinite values")]
    InvalidNumericValue,

    #[error("Gradient became non-finite during optimisation")]
    NumericalInstability,
}

#[derive(Error, Debug, PartialEq)]
pub enum ScalerError {
    #[error("Input must not be empty")]
    EmptyInput,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Scaler has not been fitted")]
    NotFitted,
}

#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    #[error("Model has not been fitted")]
    NotFitted,

    #[error("Training data must not be empty")]
    EmptyInput,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Labels must be 0 or 1")]
    InvalidLabels,

    #[error("Invalid hyperparameter: {0}")]
    InvalidParameter(String),

    #[error("Model produced an invalid probability {0}")]
    InvalidProbability(f64),

    #[error("Scaler error: {0}")]
    Scaler(#[from] ScalerError),

    #[error("Optimizer error: {0}")]
    Optimizer(#[from] OptimizerError),
}

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("Invalid selection configuration: {0}")]
    InvalidConfig(String),

    #[error("Partition is too small: {0}")]
    InsufficientData(String),

    #[error("No candidates configured for the {0} family")]
    EmptyGrid(&'static str),

    #[error("Model error while evaluating {spec}: {source}")]
    Model { spec: String, source: ModelError },

    #[error("Loss error while evaluating {spec}: {source}")]
    Loss { spec: String, source: LossError },
}

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to access artifact file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported artifact format version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Artifact encoding is incompatible: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("Invalid bmi '{0}': expected a finite number greater than zero")]
    InvalidBmi(String),

    #[error("Invalid {parameter}: {source}")]
    InvalidCategory { parameter: &'static str, source: EncodingError },
}
