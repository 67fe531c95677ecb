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

//! On-disk form of the selected model.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::encoding::EncodingScheme;
use crate::errors::ArtifactError;
use crate::model::{FittedModel, ModelFamily, ModelSpec};

pub const FORMAT_VERSION: u32 = 1;

pub const DEFAULT_ARTIFACT_PATH: &str = "models/diabetes_model.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub format_version: u32,
    pub family: ModelFamily,
    pub spec: ModelSpec,
    pub cv_log_loss: f64,
    pub test_log_loss: f64,
    pub training_rows: usize,
    /// RFC 3339, UTC.
    pub trained_at: String,
}

/// The fitted model plus what a reader needs to trust it: the encoding it was
/// trained under and how it scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ArtifactMetadata,
    pub encoding: EncodingScheme,
    pub model: FittedModel,
}

impl ModelArtifact {
    pub fn new(
        spec: ModelSpec,
        model: FittedModel,
        cv_log_loss: f64,
        test_log_loss: f64,
        training_rows: usize,
    ) -> Result<Self, ArtifactError> {
        let trained_at = OffsetDateTime::now_utc().format(&Rfc3339)?;
        Ok(ModelArtifact {
            metadata: ArtifactMetadata {
                format_version: FORMAT_VERSION,
                family: model.family(),
                spec,
                cv_log_loss,
                test_log_loss,
                training_rows,
                trained_at,
            },
            encoding: EncodingScheme::current(),
            model,
        })
    }

    /// Writes the artifact as pretty JSON, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        info!("Saved {} model artifact to {}", self.metadata.family, path.display());
        Ok(())
    }

    /// Reads an artifact and rejects it unless its format version and encoding
    /// match this build.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let artifact: ModelArtifact = serde_json::from_reader(reader)?;

        if artifact.metadata.format_version != FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                found: artifact.metadata.format_version,
                expected: FORMAT_VERSION,
            });
        }
        EncodingScheme::current().ensure_compatible(&artifact.encoding)?;

        info!(
            "Loaded {} model ({}) trained at {}",
            artifact.metadata.family, artifact.metadata.spec, artifact.metadata.trained_at
        );
        Ok(artifact)
    }
}
