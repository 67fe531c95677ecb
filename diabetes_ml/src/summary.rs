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

use log::info;
use serde::{Deserialize, Serialize};

use crate::data::{Dataset, SurveyRecord};
use crate::encoding::{Diabetes, FieldName, Level, Sex, YesNo};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmiByOutcome {
    pub outcome: Diabetes,
    pub n_records: usize,
    pub mean: f64,
    pub std: f64,
}

/// Outcome prevalence among records holding one level of a predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelPrevalence {
    pub field: FieldName,
    pub level: String,
    pub n_records: usize,
    pub prevalence: f64,
}

/// Descriptive statistics logged before modelling and kept in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub n_records: usize,
    pub n_positive: usize,
    pub prevalence: f64,
    pub bmi: Vec<BmiByOutcome>,
    pub levels: Vec<LevelPrevalence>,
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

fn level_prevalence<L: Level + PartialEq>(
    dataset: &Dataset,
    field: FieldName,
    get: impl Fn(&SurveyRecord) -> L,
) -> Vec<LevelPrevalence> {
    (0..L::LEVELS.len())
        .filter_map(L::from_index)
        .map(|level| {
            let matching: Vec<&SurveyRecord> =
                dataset.records().iter().filter(|r| get(*r) == level).collect();
            let positives = matching.iter().filter(|r| r.diabetes == Diabetes::POSITIVE).count();
            LevelPrevalence {
                field,
                level: level.label().to_string(),
                n_records: matching.len(),
                prevalence: if matching.is_empty() {
                    0.0
                } else {
                    positives as f64 / matching.len() as f64
                },
            }
        })
        .collect()
}

impl DatasetSummary {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let bmi = [Diabetes::No, Diabetes::Yes]
            .into_iter()
            .map(|outcome| {
                let values: Vec<f64> = dataset
                    .records()
                    .iter()
                    .filter(|r| r.diabetes == outcome)
                    .map(|r| r.features.bmi)
                    .collect();
                let (mean, std) = mean_std(&values);
                BmiByOutcome { outcome, n_records: values.len(), mean, std }
            })
            .collect();

        let mut levels = level_prevalence::<YesNo>(dataset, FieldName::PhysActivity, |r| {
            r.features.phys_activity
        });
        levels.extend(level_prevalence::<YesNo>(dataset, FieldName::HighBp, |r| r.features.high_bp));
        levels.extend(level_prevalence::<Sex>(dataset, FieldName::Sex, |r| r.features.sex));

        DatasetSummary {
            n_records: dataset.len(),
            n_positive: dataset.positives(),
            prevalence: dataset.prevalence(),
            bmi,
            levels,
        }
    }

    pub fn log(&self) {
        info!(
            "Dataset: {} records, {} positive ({:.2}%)",
            self.n_records,
            self.n_positive,
            self.prevalence * 100.0
        );
        for group in &self.bmi {
            info!(
                "  BMI | diabetes={:?}: n={} mean={:.2} sd={:.2}",
                group.outcome, group.n_records, group.mean, group.std
            );
        }
        for level in &self.levels {
            info!(
                "  {}={}: n={} prevalence={:.2}%",
                level.field,
                level.level,
                level.n_records,
                level.prevalence * 100.0
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::FeatureRecord;

    fn record(diabetes: Diabetes, bmi: f64, high_bp: YesNo) -> SurveyRecord {
        SurveyRecord {
            diabetes,
            features: FeatureRecord { bmi, phys_activity: YesNo::Yes, high_bp, sex: Sex::Female },
        }
    }

    #[test]
    fn test_summary_counts_and_bmi() {
        let dataset = Dataset::new(vec![
            record(Diabetes::No, 20.0, YesNo::No),
            record(Diabetes::No, 24.0, YesNo::No),
            record(Diabetes::Yes, 30.0, YesNo::Yes),
            record(Diabetes::Yes, 34.0, YesNo::No),
        ]);
        let summary = DatasetSummary::from_dataset(&dataset);

        assert_eq!(summary.n_records, 4);
        assert_eq!(summary.n_positive, 2);
        assert_eq!(summary.prevalence, 0.5);
        assert_eq!(summary.bmi[0].mean, 22.0);
        assert_eq!(summary.bmi[1].mean, 32.0);
        assert!((summary.bmi[1].std - 8.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_summary_level_prevalence() {
        let dataset = Dataset::new(vec![
            record(Diabetes::No, 20.0, YesNo::No),
            record(Diabetes::No, 24.0, YesNo::No),
            record(Diabetes::Yes, 30.0, YesNo::Yes),
            record(Diabetes::Yes, 34.0, YesNo::No),
        ]);
        let summary = DatasetSummary::from_dataset(&dataset);

        let high_bp_yes = summary
            .levels
            .iter()
            .find(|l| l.field == FieldName::HighBp && l.level == "Yes")
            .unwrap();
        assert_eq!(high_bp_yes.n_records, 1);
        assert_eq!(high_bp_yes.prevalence, 1.0);

        let male = summary.levels.iter().find(|l| l.field == FieldName::Sex && l.level == "Male").unwrap();
        assert_eq!(male.n_records, 0);
        assert_eq!(male.prevalence, 0.0);
        assert_eq!(summary.levels.len(), 6);
    }
}
