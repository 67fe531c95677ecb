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

//! TOML configuration for the scoring service.

use std::path::{Path, PathBuf};

use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};

use diabetes_ml::DEFAULT_ARTIFACT_PATH;

pub const CONFIG_ENV: &str = "DIABETES_SERVER_CONFIG";
pub const LISTEN_ADDR_ENV: &str = "DIABETES_LISTEN_ADDR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub artifact_path: PathBuf,
    /// Dataset the request defaults are computed from.
    pub dataset_path: PathBuf,
    pub author: String,
    pub site: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_addr: "0.0.0.0:8000".to_string(),
            artifact_path: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            dataset_path: PathBuf::from("data/diabetes_binary_health_indicators_BRFSS2015.csv"),
            author: "BRFSS diabetes risk model".to_string(),
            site: "https://www.cdc.gov/brfss/annual_data/annual_2015.html".to_string(),
        }
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Failed to parse config {}", path.display()))
}

/// Resolves the configuration.
///
/// Checks (in order):
/// 1. `path`, normally the first CLI argument
/// 2. the `DIABETES_SERVER_CONFIG` environment variable
/// 3. defaults
///
/// `DIABETES_LISTEN_ADDR`, when set, replaces the listen address afterwards.
pub fn resolve_config(path: Option<PathBuf>) -> anyhow::Result<ServerConfig> {
    let path = path.or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));
    let mut config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            load_config(&path)?
        }
        None => {
            info!("No config file specified, using defaults");
            ServerConfig::default()
        }
    };
    if let Ok(addr) = std::env::var(LISTEN_ADDR_ENV) {
        config.listen_addr = addr;
    }
    Ok(config)
}
