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

//! Scoring service for the selected diabetes risk model.
//!
//! Startup loads the model artifact and the survey dataset once. After that
//! every request only reads the shared [`AppState`].

pub mod api;
pub mod config;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::routing::get;
use log::info;

use diabetes_ml::{FeatureDefaults, ModelArtifact, Scorer, SurveyCsvLoader, load_data};

pub use api::{AppState, InfoResponse, PredictionResponse, info_handler, predict_handler};
pub use config::ServerConfig;

/// Loads the artifact and the dataset named in `config`.
///
/// Fails if the artifact's encoding does not match this build or the dataset
/// cannot be read.
pub fn build_app_state(config: &ServerConfig) -> anyhow::Result<Arc<AppState>> {
    let artifact = ModelArtifact::load(&config.artifact_path)
        .with_context(|| format!("Failed to load model from {}", config.artifact_path.display()))?;

    let dataset = load_data::<SurveyCsvLoader, _>(&config.dataset_path)
        .with_context(|| format!("Failed to load dataset {}", config.dataset_path.display()))?;
    let defaults = FeatureDefaults::from_dataset(&dataset)?;
    info!(
        "Request defaults: bmi={:.3} physActivity={:?} highBP={:?} sex={:?}",
        defaults.bmi, defaults.phys_activity, defaults.high_bp, defaults.sex
    );

    Ok(Arc::new(AppState {
        scorer: Scorer::new(artifact.model, defaults),
        info: InfoResponse { author: config.author.clone(), site: config.site.clone() },
    }))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/pred", get(predict_handler))
        .route("/info", get(info_handler))
        .with_state(state)
}
