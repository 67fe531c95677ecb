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

use std::fs::File;
use std::path::Path;

use log::{debug, info, warn};

use crate::data::{DataLoader, Dataset, SurveyRecord};
use crate::encoding::{Diabetes, FeatureRecord, FieldName, Level, Sex, YesNo};
use crate::errors::CsvError;

/// Loads the BRFSS diabetes health indicators CSV.
///
/// The file must have a header row. Required columns are located by name, so
/// column order does not matter and unrelated indicator columns are ignored.
/// Rows where any required field is empty are dropped and counted.
pub struct SurveyCsvLoader;

const REQUIRED: [FieldName; 5] =
    [FieldName::Diabetes, FieldName::Bmi, FieldName::PhysActivity, FieldName::HighBp, FieldName::Sex];

struct ColumnIndex {
    diabetes: usize,
    bmi: usize,
    phys_activity: usize,
    high_bp: usize,
    sex: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, CsvError> {
        let position = |field: FieldName| {
            headers
                .iter()
                .position(|h| h.trim() == field.column())
                .ok_or(CsvError::MissingColumn(field.column()))
        };
        Ok(ColumnIndex {
            diabetes: position(FieldName::Diabetes)?,
            bmi: position(FieldName::Bmi)?,
            phys_activity: position(FieldName::PhysActivity)?,
            high_bp: position(FieldName::HighBp)?,
            sex: position(FieldName::Sex)?,
        })
    }

    fn of(&self, field: FieldName) -> usize {
        match field {
            FieldName::Diabetes => self.diabetes,
            FieldName::Bmi => self.bmi,
            FieldName::PhysActivity => self.phys_activity,
            FieldName::HighBp => self.high_bp,
            FieldName::Sex => self.sex,
        }
    }
}

fn parse_number(value: &str, field: FieldName, row: usize) -> Result<f64, CsvError> {
    value.trim().parse::<f64>().map_err(|e| CsvError::InvalidNumeric {
        value: value.to_string(),
        column: field.column(),
        row,
        source: e,
    })
}

fn parse_bmi(value: &str, row: usize) -> Result<f64, CsvError> {
    let bmi = parse_number(value, FieldName::Bmi, row)?;
    if !bmi.is_finite() || bmi <= 0.0 {
        return Err(CsvError::InvalidBmi { value: value.to_string(), column: FieldName::Bmi.column(), row });
    }
    Ok(bmi)
}

fn parse_level<L: Level>(value: &str, field: FieldName, row: usize) -> Result<L, CsvError> {
    let code = parse_number(value, field, row)?;
    L::from_code(field, code).map_err(|e| CsvError::InvalidLevel {
        column: field.column(),
        row,
        source: e,
    })
}

fn load_survey_csv<P: AsRef<Path>>(path: P) -> Result<Dataset, CsvError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_reader(file);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(CsvError::EmptyFile);
    }
    let columns = ColumnIndex::from_headers(&headers)?;
    let expected = headers.len();
    debug!("Located required columns in {} header fields", expected);

    let mut records = Vec::new();
    let mut dropped = 0_usize;
    for (i, result) in rdr.records().enumerate() {
        let row = i + 1;
        let record = result?;
        if record.len() != expected {
            return Err(CsvError::InconsistentColumns { row, actual: record.len(), expected });
        }

        let field = |name: FieldName| record.get(columns.of(name)).unwrap_or("");
        if REQUIRED.iter().any(|&name| field(name).trim().is_empty()) {
            dropped += 1;
            continue;
        }

        let features = FeatureRecord {
            bmi: parse_bmi(field(FieldName::Bmi), row)?,
            phys_activity: parse_level::<YesNo>(
                field(FieldName::PhysActivity),
                FieldName::PhysActivity,
                row,
            )?,
            high_bp: parse_level::<YesNo>(field(FieldName::HighBp), FieldName::HighBp, row)?,
            sex: parse_level::<Sex>(field(FieldName::Sex), FieldName::Sex, row)?,
        };
        let diabetes = parse_level::<Diabetes>(field(FieldName::Diabetes), FieldName::Diabetes, row)?;
        records.push(SurveyRecord { diabetes, features });
    }

    if records.is_empty() {
        return Err(if dropped == 0 { CsvError::EmptyFile } else { CsvError::NoRecords });
    }
    if dropped > 0 {
        warn!("Dropped {} rows with missing required fields", dropped);
    }
    info!("Loaded {} survey records from {}", records.len(), path.display());

    Ok(Dataset::new(records))
}

impl DataLoader for SurveyCsvLoader {
    type Error = CsvError;

    fn load<P: AsRef<Path>>(path: P) -> Result<Dataset, Self::Error> {
        load_survey_csv(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::load_data;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes()).expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    const HEADER: &str = "Diabetes_binary,HighBP,HighChol,BMI,PhysActivity,Sex,Age\n";

    #[test]
    fn test_load_full_header() {
        let csv_content = format!(
            "{}0.0,1.0,1.0,40.0,0.0,0.0,9.0\n1.0,0.0,0.0,25.0,1.0,1.0,7.0\n",
            HEADER
        );
        let temp_file = create_temp_csv(&csv_content);

        let dataset =
            load_data::<SurveyCsvLoader, _>(temp_file.path()).expect("Failed to load CSV");

        assert_eq!(dataset.len(), 2);
        let first = dataset.records()[0];
        assert_eq!(first.diabetes, Diabetes::No);
        assert_eq!(first.features.bmi, 40.0);
        assert_eq!(first.features.high_bp, YesNo::Yes);
        assert_eq!(first.features.phys_activity, YesNo::No);
        assert_eq!(first.features.sex, Sex::Female);

        let second = dataset.records()[1];
        assert_eq!(second.diabetes, Diabetes::Yes);
        assert_eq!(second.features.sex, Sex::Male);
        assert_eq!(dataset.targets().to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_load_integer_codes_and_reordered_columns() {
        let csv_content = "Sex,BMI,HighBP,PhysActivity,Diabetes_binary\n1,31,1,0,1\n";
        let temp_file = create_temp_csv(csv_content);

        let dataset =
            load_data::<SurveyCsvLoader, _>(temp_file.path()).expect("Failed to load CSV");
        let record = dataset.records()[0];
        assert_eq!(record.diabetes, Diabetes::Yes);
        assert_eq!(record.features.bmi, 31.0);
        assert_eq!(record.features.sex, Sex::Male);
    }

    #[test]
    fn test_drops_rows_with_missing_fields() {
        let csv_content = format!(
            "{}0.0,1.0,1.0,,0.0,0.0,9.0\n1.0,0.0,0.0,25.0,1.0,1.0,7.0\n",
            HEADER
        );
        let temp_file = create_temp_csv(&csv_content);

        let dataset =
            load_data::<SurveyCsvLoader, _>(temp_file.path()).expect("Failed to load CSV");
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records()[0].features.bmi, 25.0);
    }

    #[test]
    fn test_all_rows_incomplete() {
        let csv_content = format!("{}0.0,1.0,1.0,,0.0,0.0,9.0\n", HEADER);
        let temp_file = create_temp_csv(&csv_content);

        let result = load_data::<SurveyCsvLoader, _>(temp_file.path());
        assert!(matches!(result, Err(CsvError::NoRecords)));
    }

    #[test]
    fn test_load_missing_column() {
        let csv_content = "Diabetes_binary,BMI,PhysActivity,Sex\n0,20,1,0\n";
        let temp_file = create_temp_csv(csv_content);

        let result = load_data::<SurveyCsvLoader, _>(temp_file.path());
        assert!(matches!(result, Err(CsvError::MissingColumn("HighBP"))));
    }

    #[test]
    fn test_load_invalid_numeric() {
        let csv_content = format!("{}0.0,1.0,1.0,heavy,0.0,0.0,9.0\n", HEADER);
        let temp_file = create_temp_csv(&csv_content);

        let result = load_data::<SurveyCsvLoader, _>(temp_file.path());
        assert!(matches!(
            result,
            Err(CsvError::InvalidNumeric { ref value, column: "BMI", row: 1, .. }) if value == "heavy"
        ));
    }

    #[test]
    fn test_load_rejects_non_finite_and_non_positive_bmi() {
        for (bmi, row) in [("NaN", 2), ("inf", 2), ("-5", 2), ("0", 2)] {
            let csv_content =
                format!("{}0.0,1.0,1.0,30.0,0.0,0.0,9.0\n0.0,1.0,1.0,{},0.0,0.0,9.0\n", HEADER, bmi);
            let temp_file = create_temp_csv(&csv_content);

            let result = load_data::<SurveyCsvLoader, _>(temp_file.path());
            assert!(
                matches!(
                    result,
                    Err(CsvError::InvalidBmi { ref value, column: "BMI", row: r }) if value == bmi && r == row
                ),
                "{}: {:?}",
                bmi,
                result.map(|d| d.len())
            );
        }
    }

    #[test]
    fn test_load_invalid_binary_code() {
        let csv_content = format!("{}0.0,2.0,1.0,30.0,0.0,0.0,9.0\n", HEADER);
        let temp_file = create_temp_csv(&csv_content);

        let result = load_data::<SurveyCsvLoader, _>(temp_file.path());
        assert!(matches!(result, Err(CsvError::InvalidLevel { column: "HighBP", row: 1, .. })));
    }

    #[test]
    fn test_load_inconsistent_columns() {
        let csv_content = format!("{}0.0,1.0,1.0,30.0,0.0,0.0\n", HEADER);
        let temp_file = create_temp_csv(&csv_content);

        let result = load_data::<SurveyCsvLoader, _>(temp_file.path());
        assert!(matches!(
            result,
            Err(CsvError::InconsistentColumns { row: 1, actual: 6, expected: 7 })
        ));
    }

    #[test]
    fn test_load_header_only() {
        let temp_file = create_temp_csv(HEADER);

        let result = load_data::<SurveyCsvLoader, _>(temp_file.path());
        assert!(matches!(result, Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_load_empty_file() {
        let temp_file = create_temp_csv("");

        let result = load_data::<SurveyCsvLoader, _>(temp_file.path());
        assert!(matches!(result, Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_data::<SurveyCsvLoader, _>("nonexistent.csv");
        assert!(matches!(result, Err(CsvError::FileOpen(_))));
    }
}
