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

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use diabetes_ml::{ModelArtifact, SelectionReport, SurveyCsvLoader, load_data, select_model};

use crate::config::{Cli, selection_config};

mod config;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = selection_config(&cli)?;
    let dataset = load_data::<SurveyCsvLoader, _>(&cli.dataset)
        .with_context(|| format!("failed to load dataset {}", cli.dataset.display()))?;

    let outcome = select_model(&dataset, &config).context("model selection failed")?;
    let report = &outcome.report;

    let artifact = ModelArtifact::new(
        report.selected_spec,
        outcome.model,
        report.selected_cv_log_loss,
        report.selected_test_log_loss,
        report.train_rows,
    )?;
    artifact
        .save(&cli.output)
        .with_context(|| format!("failed to write model to {}", cli.output.display()))?;

    if let Some(path) = &cli.report {
        write_report(report, path)?;
        info!("Wrote selection report to {}", path.display());
    }

    print_summary(report);
    Ok(())
}

fn write_report(report: &SelectionReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush().with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn print_summary(report: &SelectionReport) {
    println!("{:<8} {:<36} {:>10} {:>10}", "family", "best candidate", "cv", "test");
    for family in &report.families {
        println!(
            "{:<8} {:<36} {:>10.5} {:>10.5}",
            family.family.to_string(),
            family.winner.spec.to_string(),
            family.winner.mean_log_loss,
            family.test_log_loss
        );
    }
    println!("{:<8} {:<36} {:>10} {:>10.5}", "baseline", "base rate", "-", report.baseline_test_log_loss);
    println!("Selected: {} ({})", report.selected_family, report.selected_spec);
}

/// Level forced by `-v` flags; `None` leaves filtering to `RUST_LOG`.
fn verbosity_filter(verbosity: u8) -> Option<LevelFilter> {
    match verbosity {
        0 => None,
        1 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    }
}

fn init_logging(verbosity: u8) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = verbosity_filter(verbosity) {
        builder.filter_level(level);
    }
    builder.try_init().map_err(|err| err.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_filter_defers_to_env_without_flags() {
        assert_eq!(verbosity_filter(0), None);
        assert_eq!(verbosity_filter(1), Some(LevelFilter::Debug));
        assert_eq!(verbosity_filter(3), Some(LevelFilter::Trace));
    }

    fn small_report() -> SelectionReport {
        use diabetes_ml::encoding::{Diabetes, FeatureRecord, Sex, YesNo};
        use diabetes_ml::{Dataset, SelectionConfig, SurveyRecord};

        let records = (0..120)
            .map(|i| {
                let bmi = 20.0 + (i % 20) as f64;
                let high_bp = if i % 3 == 0 { YesNo::Yes } else { YesNo::No };
                let positive = bmi > 32.0 || i % 11 == 0;
                SurveyRecord {
                    diabetes: if positive { Diabetes::Yes } else { Diabetes::No },
                    features: FeatureRecord {
                        bmi,
                        phys_activity: if i % 4 == 0 { YesNo::No } else { YesNo::Yes },
                        high_bp,
                        sex: if i % 2 == 0 { Sex::Male } else { Sex::Female },
                    },
                }
            })
            .collect();
        let mut config = SelectionConfig::default();
        config.folds = 2;
        config.logistic.l2 = vec![0.0];
        config.logistic.max_epochs = 50;
        config.tree.cp = vec![0.01];
        config.forest.mtry = vec![1];
        config.forest.n_trees = 2;
        select_model(&Dataset::new(records), &config).unwrap().report
    }

    #[test]
    fn test_write_report_round_trips() {
        let report = small_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("selection.json");
        write_report(&report, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["train_rows"], report.train_rows);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_report_reports_write_failure() {
        let report = small_report();
        assert!(write_report(&report, Path::new("/dev/full")).is_err());
    }
}
