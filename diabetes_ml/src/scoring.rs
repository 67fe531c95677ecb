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

//! Turning a (possibly partial) prediction request into a probability.

use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::encoding::{FeatureRecord, FieldName, Level, Sex, YesNo};
use crate::errors::{ModelError, RequestError};
use crate::model::FittedModel;

/// Values used for predictors a request leaves out: mean BMI and the most
/// frequent level of each categorical field, taken from the full dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureDefaults {
    pub bmi: f64,
    pub phys_activity: YesNo,
    pub high_bp: YesNo,
    pub sex: Sex,
}

/// Most frequent level. Ties go to the reference level.
fn mode<L: Level>(values: impl Iterator<Item = L>) -> Option<L> {
    let mut counts = [0_usize; 2];
    for value in values {
        counts[value.index()] += 1;
    }
    L::from_index(if counts[1] > counts[0] { 1 } else { 0 })
}

impl FeatureDefaults {
    pub fn from_dataset(dataset: &Dataset) -> Result<Self, ModelError> {
        if dataset.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        let records = dataset.records();
        let bmi = records.iter().map(|r| r.features.bmi).sum::<f64>() / records.len() as f64;
        Ok(FeatureDefaults {
            bmi,
            phys_activity: mode(records.iter().map(|r| r.features.phys_activity))
                .ok_or(ModelError::EmptyInput)?,
            high_bp: mode(records.iter().map(|r| r.features.high_bp)).ok_or(ModelError::EmptyInput)?,
            sex: mode(records.iter().map(|r| r.features.sex)).ok_or(ModelError::EmptyInput)?,
        })
    }

    pub fn record(&self) -> FeatureRecord {
        FeatureRecord {
            bmi: self.bmi,
            phys_activity: self.phys_activity,
            high_bp: self.high_bp,
            sex: self.sex,
        }
    }
}

/// Raw `/pred` query. Every field is optional; values stay strings until
/// [`PredictionQuery::resolve`] validates them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PredictionQuery {
    pub bmi: Option<String>,
    #[serde(rename = "physActivity")]
    pub phys_activity: Option<String>,
    #[serde(rename = "highBP")]
    pub high_bp: Option<String>,
    pub sex: Option<String>,
}

fn parse_bmi(value: &str) -> Result<f64, RequestError> {
    match value.trim().parse::<f64>() {
        Ok(bmi) if bmi.is_finite() && bmi > 0.0 => Ok(bmi),
        _ => Err(RequestError::InvalidBmi(value.to_string())),
    }
}

fn parse_category<L: Level>(field: FieldName, value: Option<&str>, default: L) -> Result<L, RequestError> {
    match value {
        None => Ok(default),
        Some(raw) => L::parse_label(field, raw)
            .map_err(|source| RequestError::InvalidCategory { parameter: field.query_param(), source }),
    }
}

impl PredictionQuery {
    /// Fills omitted values from `defaults`. A parameter that is present but
    /// empty is invalid rather than omitted.
    pub fn resolve(&self, defaults: &FeatureDefaults) -> Result<FeatureRecord, RequestError> {
        let bmi = match self.bmi.as_deref() {
            Some(raw) => parse_bmi(raw)?,
            None => defaults.bmi,
        };
        Ok(FeatureRecord {
            bmi,
            phys_activity: parse_category(
                FieldName::PhysActivity,
                self.phys_activity.as_deref(),
                defaults.phys_activity,
            )?,
            high_bp: parse_category(FieldName::HighBp, self.high_bp.as_deref(), defaults.high_bp)?,
            sex: parse_category(FieldName::Sex, self.sex.as_deref(), defaults.sex)?,
        })
    }
}

/// The loaded model together with its request defaults.
#[derive(Debug, Clone)]
pub struct Scorer {
    model: FittedModel,
    defaults: FeatureDefaults,
}

impl Scorer {
    pub fn new(model: FittedModel, defaults: FeatureDefaults) -> Self {
        Scorer { model, defaults }
    }

    pub fn defaults(&self) -> &FeatureDefaults {
        &self.defaults
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    pub fn resolve(&self, query: &PredictionQuery) -> Result<FeatureRecord, RequestError> {
        query.resolve(&self.defaults)
    }

    /// P(diabetes = Yes) for one fully specified record.
    pub fn predict(&self, record: &FeatureRecord) -> Result<f64, ModelError> {
        self.model.predict_one(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SurveyRecord;
    use crate::encoding::{Diabetes, FeatureSet};
    use crate::errors::EncodingError;
    use crate::model::ModelSpec;

    fn survey(n: usize) -> Dataset {
        Dataset::new(
            (0..n)
                .map(|i| SurveyRecord {
                    diabetes: if i % 4 == 0 { Diabetes::Yes } else { Diabetes::No },
                    features: FeatureRecord {
                        bmi: 20.0 + (i % 10) as f64,
                        phys_activity: if i % 3 == 0 { YesNo::No } else { YesNo::Yes },
                        high_bp: if i % 4 == 0 { YesNo::Yes } else { YesNo::No },
                        sex: if i % 2 == 0 { Sex::Male } else { Sex::Female },
                    },
                })
                .collect(),
        )
    }

    fn defaults() -> FeatureDefaults {
        FeatureDefaults { bmi: 28.5, phys_activity: YesNo::Yes, high_bp: YesNo::No, sex: Sex::Female }
    }

    fn query(bmi: Option<&str>, phys: Option<&str>, high_bp: Option<&str>, sex: Option<&str>) -> PredictionQuery {
        PredictionQuery {
            bmi: bmi.map(String::from),
            phys_activity: phys.map(String::from),
            high_bp: high_bp.map(String::from),
            sex: sex.map(String::from),
        }
    }

    #[test]
    fn test_defaults_from_dataset() {
        let defaults = FeatureDefaults::from_dataset(&survey(20)).unwrap();
        assert!((defaults.bmi - 24.5).abs() < 1e-12);
        assert_eq!(defaults.phys_activity, YesNo::Yes);
        assert_eq!(defaults.high_bp, YesNo::No);
        // 10 male and 10 female: the tie goes to the reference level.
        assert_eq!(defaults.sex, Sex::Female);
    }

    #[test]
    fn test_defaults_empty_dataset() {
        assert!(matches!(
            FeatureDefaults::from_dataset(&Dataset::default()),
            Err(ModelError::EmptyInput)
        ));
    }

    #[test]
    fn test_resolve_empty_query_uses_defaults() {
        let record = PredictionQuery::default().resolve(&defaults()).unwrap();
        assert_eq!(record, defaults().record());
    }

    #[test]
    fn test_resolve_normalises_categories() {
        let record =
            query(Some(" 31.2 "), Some("no"), Some(" YES "), Some("male")).resolve(&defaults()).unwrap();
        assert_eq!(record.bmi, 31.2);
        assert_eq!(record.phys_activity, YesNo::No);
        assert_eq!(record.high_bp, YesNo::Yes);
        assert_eq!(record.sex, Sex::Male);
    }

    #[test]
    fn test_resolve_rejects_bad_bmi() {
        for bad in ["abc", "", "-3", "0", "NaN", "inf"] {
            let result = query(Some(bad), None, None, None).resolve(&defaults());
            assert_eq!(result, Err(RequestError::InvalidBmi(bad.to_string())), "{:?}", bad);
        }
    }

    #[test]
    fn test_resolve_rejects_unknown_level() {
        let err = query(None, None, None, Some("X")).resolve(&defaults()).unwrap_err();
        assert!(matches!(
            err,
            RequestError::InvalidCategory {
                parameter: "sex",
                source: EncodingError::UnknownLevel { .. }
            }
        ));
        assert!(err.to_string().contains("Female, Male"));
    }

    #[test]
    fn test_resolve_rejects_empty_category() {
        let result = query(None, None, Some(""), None).resolve(&defaults());
        assert!(matches!(result, Err(RequestError::InvalidCategory { parameter: "highBP", .. })));
    }

    #[test]
    fn test_scorer_matches_pipeline_prediction() {
        let data = survey(80);
        let spec = ModelSpec::Logistic { feature_set: FeatureSet::Interactions, l2: 0.0, max_epochs: 300 };
        let model = spec.fit(&data.features(), &data.targets(), 0).unwrap();
        let batch = model.predict_proba(&data.features()).unwrap();

        let scorer = Scorer::new(model, FeatureDefaults::from_dataset(&data).unwrap());
        let known = data.records()[6].features;
        let request = query(
            Some(&known.bmi.to_string()),
            Some(known.phys_activity.label()),
            Some(known.high_bp.label()),
            Some(known.sex.label()),
        );
        let record = scorer.resolve(&request).unwrap();
        assert_eq!(record, known);
        assert_eq!(scorer.predict(&record).unwrap(), batch[6]);
    }

    #[test]
    fn test_scorer_default_prediction_is_stable() {
        let data = survey(40);
        let spec = ModelSpec::Tree { cp: 0.01, max_depth: 4, min_samples_split: 10 };
        let model = spec.fit(&data.features(), &data.targets(), 0).unwrap();
        let scorer = Scorer::new(model, FeatureDefaults::from_dataset(&data).unwrap());

        let record = scorer.resolve(&PredictionQuery::default()).unwrap();
        let first = scorer.predict(&record).unwrap();
        let second = scorer.predict(&record).unwrap();
        assert_eq!(first, second);
        assert!((0.0..=1.0).contains(&first));
    }
}
