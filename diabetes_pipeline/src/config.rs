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

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use diabetes_ml::{DEFAULT_ARTIFACT_PATH, SelectionConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Select and persist the best diabetes risk model")]
pub struct Cli {
    /// Path to the diabetes health indicators CSV
    #[arg(value_name = "CSV")]
    pub dataset: PathBuf,

    /// Where the selected model is written
    #[arg(short, long, default_value = DEFAULT_ARTIFACT_PATH)]
    pub output: PathBuf,

    /// Also write the full selection report as JSON
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// TOML file with candidate grids and split settings
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Seed for the split, the folds and the forest bootstraps
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of cross-validation folds
    #[arg(long)]
    pub folds: Option<usize>,

    /// Share of each outcome class used for training
    #[arg(long)]
    pub train_ratio: Option<f64>,

    /// Trees per forest candidate
    #[arg(long)]
    pub trees: Option<usize>,

    /// Increase output verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

pub fn read_config_file(path: &Path) -> Result<SelectionConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
}

/// Starts from the config file (or defaults) and applies command-line
/// overrides on top.
pub fn selection_config(cli: &Cli) -> Result<SelectionConfig> {
    let mut config = match &cli.config {
        Some(path) => read_config_file(path)?,
        None => SelectionConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(folds) = cli.folds {
        config.folds = folds;
    }
    if let Some(train_ratio) = cli.train_ratio {
        config.train_ratio = train_ratio;
    }
    if let Some(trees) = cli.trees {
        config.forest.n_trees = trees;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diabetes_ml::FeatureSet;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("diabetes_pipeline").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_without_config() {
        let cli = parse(&["data.csv"]);
        assert_eq!(cli.output, PathBuf::from(DEFAULT_ARTIFACT_PATH));
        assert_eq!(selection_config(&cli).unwrap(), SelectionConfig::default());
    }

    #[test]
    fn test_config_file_then_cli_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "seed = 7\nfolds = 3\n\n[logistic]\nfeature_sets = [\"MainEffects\"]\nl2 = [0.0]\n\n[forest]\nmtry = [2]\n"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = parse(&["data.csv", "--config", &path, "--seed", "99", "--trees", "10"]);
        let config = selection_config(&cli).unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.folds, 3);
        assert_eq!(config.train_ratio, 0.7);
        assert_eq!(config.logistic.feature_sets, vec![FeatureSet::MainEffects]);
        assert_eq!(config.logistic.max_epochs, 1000);
        assert_eq!(config.forest.mtry, vec![2]);
        assert_eq!(config.forest.n_trees, 10);
        assert_eq!(config.tree.cp.len(), 5);
    }

    #[test]
    fn test_bad_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "folds = \"five\"\n").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let cli = parse(&["data.csv", "--config", &path]);
        assert!(selection_config(&cli).is_err());
    }
}
