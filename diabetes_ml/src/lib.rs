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

//! Diabetes risk modelling on the BRFSS diabetes health indicators survey.
//!
//! The crate holds everything shared by the offline selection pipeline and the
//! scoring service: CSV loading, the categorical encoding, the three classifier
//! families, cross-validated selection, and the model artifact.

pub mod algorithms;
pub mod artifact;
pub mod data;
pub mod encoding;
pub mod errors;
pub mod losses;
pub mod model;
pub mod optimizers;
pub mod scalers;
pub mod scoring;
pub mod selection;
pub mod summary;

pub use artifact::{DEFAULT_ARTIFACT_PATH, ModelArtifact};
pub use data::{DataLoader, Dataset, SurveyCsvLoader, SurveyRecord, load_data};
pub use encoding::{EncodingScheme, FeatureRecord, FeatureSet};
pub use model::{FittedModel, ModelFamily, ModelSpec};
pub use scoring::{FeatureDefaults, PredictionQuery, Scorer};
pub use selection::{SelectionConfig, SelectionOutcome, SelectionReport, select_model};
