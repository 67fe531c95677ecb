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

//! HTTP handlers for the scoring service.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use diabetes_ml::errors::{ModelError, RequestError};
use diabetes_ml::{PredictionQuery, Scorer};

/// Immutable state shared by every request.
pub struct AppState {
    pub scorer: Scorer,
    pub info: InfoResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoResponse {
    pub author: String,
    pub site: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prob_diabetes: f64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),

    #[error("Malformed query string: {0}")]
    MalformedQuery(String),

    #[error("Prediction failed: {0}")]
    Model(#[from] ModelError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) | ApiError::MalformedQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::MalformedQuery(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        } else {
            debug!("Rejected request: {}", self);
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// `GET /pred`: probability of diabetes for the given (or default) predictors.
pub async fn predict_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PredictionQuery>, QueryRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Query(query) = query?;
    let record = state.scorer.resolve(&query)?;
    let prob_diabetes = state.scorer.predict(&record)?;
    Ok(Json(PredictionResponse { prob_diabetes }))
}

/// `GET /info`
pub async fn info_handler(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(state.info.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diabetes_ml::encoding::FieldName;
    use diabetes_ml::errors::EncodingError;

    #[test]
    fn test_request_errors_are_bad_request() {
        let err = ApiError::from(RequestError::InvalidBmi("x".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ApiError::from(RequestError::InvalidCategory {
            parameter: "sex",
            source: EncodingError::UnknownLevel {
                field: FieldName::Sex,
                value: "X".into(),
                allowed: "Female, Male".into(),
            },
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("Invalid sex"));
    }

    #[test]
    fn test_model_errors_are_internal() {
        let err = ApiError::from(ModelError::InvalidProbability(1.5));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
