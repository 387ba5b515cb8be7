//! CSV dataset loading
//!
//! The header names are the contract: every raw column must be present,
//! extra columns are ignored and derived columns (a precomputed `bmi` or
//! `acwr`, for example) are always recomputed. Each row is derived once at
//! load time so later views never meet an undefined ratio.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::columns::Column;
use crate::error::{DataError, Result};
use crate::features::{derive, DerivedFeatures};
use crate::models::AthleteRecord;
use crate::schema::FeatureVector;

/// Options controlling how strictly rows are accepted
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Drop rows that fail decoding or derivation instead of aborting
    pub skip_invalid_rows: bool,
}

/// Records and their derived features, immutable once loaded
#[derive(Debug, Clone)]
pub struct Dataset {
    source: Option<PathBuf>,
    records: Vec<AthleteRecord>,
    derived: Vec<DerivedFeatures>,
    skipped_rows: usize,
}

impl Dataset {
    /// Load and derive a CSV dataset
    pub fn load(path: &Path, options: LoadOptions) -> Result<Self> {
        if !path.exists() {
            return Err(DataError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let unreadable = |err: csv::Error| DataError::Unreadable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_path(path)
            .map_err(unreadable)?;

        let headers = normalize_headers(reader.headers().map_err(unreadable)?);
        check_required_columns(&headers)?;
        reader.set_headers(headers);

        let mut records = Vec::new();
        let mut derived = Vec::new();
        let mut skipped_rows = 0;

        for (index, row) in reader.deserialize::<AthleteRecord>().enumerate() {
            // Header is line 1
            let line = index + 2;
            let outcome = row
                .map_err(|err| DataError::InvalidRow {
                    row: line,
                    reason: err.to_string(),
                })
                .and_then(|record| accept_row(line, record));

            match outcome {
                Ok((record, features)) => {
                    records.push(record);
                    derived.push(features);
                }
                Err(err) if options.skip_invalid_rows => {
                    warn!(line, error = %err, "Skipping invalid dataset row");
                    skipped_rows += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }

        if records.is_empty() {
            return Err(DataError::Empty {
                path: path.to_path_buf(),
            }
            .into());
        }

        info!(
            path = %path.display(),
            rows = records.len(),
            skipped = skipped_rows,
            "Dataset loaded"
        );

        Ok(Self {
            source: Some(path.to_path_buf()),
            records,
            derived,
            skipped_rows,
        })
    }

    /// Build a dataset from in-memory records, deriving each one.
    ///
    /// Rows are numbered from 1 in errors.
    pub fn from_records(records: Vec<AthleteRecord>) -> Result<Self> {
        let mut derived = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let (_, features) = accept_row(index + 1, record.clone())?;
            derived.push(features);
        }
        debug!(rows = records.len(), "Dataset built from records");

        Ok(Self {
            source: None,
            records,
            derived,
            skipped_rows: 0,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn records(&self) -> &[AthleteRecord] {
        &self.records
    }

    pub fn derived(&self) -> &[DerivedFeatures] {
        &self.derived
    }

    /// Record/derived pairs in file order
    pub fn rows(&self) -> impl Iterator<Item = (&AthleteRecord, &DerivedFeatures)> + '_ {
        self.records.iter().zip(self.derived.iter())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows dropped because `skip_invalid_rows` was set
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Values of one column, skipping rows where it is absent
    pub fn column_values(&self, column: Column) -> Vec<f64> {
        self.rows()
            .filter_map(|(record, derived)| column.value(record, derived))
            .collect()
    }

    /// Feature vectors and labels for training or evaluation.
    ///
    /// Every row must carry the `injury_risk` label; rows are numbered from 1.
    pub fn labeled_vectors(&self) -> Result<(Vec<FeatureVector>, Vec<u8>)> {
        let mut vectors = Vec::with_capacity(self.len());
        let mut labels = Vec::with_capacity(self.len());
        for (index, (record, derived)) in self.rows().enumerate() {
            let label = record
                .injury_risk
                .ok_or(DataError::MissingLabel { row: index + 1 })?;
            vectors.push(FeatureVector::from_record(record, derived));
            labels.push(u8::from(label == 1));
        }
        Ok((vectors, labels))
    }
}

fn normalize_headers(headers: &StringRecord) -> StringRecord {
    headers
        .iter()
        .map(|name| name.trim().to_lowercase().replace([' ', '-'], "_"))
        .collect()
}

fn check_required_columns(headers: &StringRecord) -> std::result::Result<(), DataError> {
    let present: HashSet<&str> = headers.iter().collect();
    match Column::required_raw().find(|column| !present.contains(column.name())) {
        Some(column) => Err(DataError::MissingColumn {
            column: column.name().to_string(),
        }),
        None => Ok(()),
    }
}

fn accept_row(
    row: usize,
    record: AthleteRecord,
) -> std::result::Result<(AthleteRecord, DerivedFeatures), DataError> {
    let features = derive(&record).map_err(|source| DataError::Derivation { row, source })?;
    let vector = FeatureVector::from_record(&record, &features);
    if let Some((name, value)) = vector.named().find(|(_, value)| !value.is_finite()) {
        return Err(DataError::InvalidRow {
            row,
            reason: format!("{} is not a finite number ({})", name, value),
        });
    }
    if let Some(label) = record.injury_risk.filter(|&label| label > 1) {
        return Err(DataError::InvalidRow {
            row,
            reason: format!("injury_risk must be 0 or 1, got {}", label),
        });
    }
    Ok((record, features))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FeatureError, RiskError};
    use crate::summary::DatasetSummarizer;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "age,height_cm,weight_kg,bmi,weekly_training_load,acute_load,chronic_load,acwr,\
match_minutes_last_7_days,sprint_count,total_distance_km,resting_heart_rate,\
avg_training_heart_rate,heart_rate_variability,vo2_max,sleep_hours_avg,sleep_quality_score,\
fatigue_score,muscle_soreness,perceived_exertion,previous_injury_count,days_since_last_injury,\
injury_severity_score,injury_risk";

    const ROW_OK: &str =
        "25,175,72,23.51,1200,900,1000,0.9,180,120,10.5,58,145,45,54,7.2,80,65,55,6,1,120,2,0";
    const ROW_INJURED: &str =
        "31,182,80,24.15,1600,1400,1000,1.4,270,150,12.0,52,160,30,50,5.5,40,85,80,9,4,20,4,1";
    const ROW_ZERO_CHRONIC: &str =
        "22,170,65,22.49,900,900,0,0,90,80,8.0,60,140,50,55,8.0,85,40,30,5,0,500,0,0";

    fn write_csv(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_dataset() {
        let file = write_csv(&[HEADER, ROW_OK, ROW_INJURED]);
        let dataset = Dataset::load(file.path(), LoadOptions::default()).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.skipped_rows(), 0);
        assert_eq!(dataset.records()[1].injury_risk, Some(1));
        assert!((dataset.derived()[1].acwr - 1.4).abs() < 1e-12);
        assert_eq!(dataset.column_values(Column::FatigueScore), vec![65.0, 85.0]);
    }

    #[test]
    fn test_missing_file() {
        let err = Dataset::load(Path::new("/no/such/athletes.csv"), LoadOptions::default())
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_column_is_reported() {
        let header = HEADER.replace("chronic_load,", "");
        let row = "25,175,72,23.51,1200,900,0.9,180,120,10.5,58,145,45,54,7.2,80,65,55,6,1,120,2,0";
        let file = write_csv(&[&header, row]);

        match Dataset::load(file.path(), LoadOptions::default()) {
            Err(RiskError::Data(DataError::MissingColumn { column })) => {
                assert_eq!(column, "chronic_load")
            }
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn test_header_names_are_normalized() {
        let header = HEADER.replace("fatigue_score", "Fatigue Score");
        let file = write_csv(&[&header, ROW_OK]);
        let dataset = Dataset::load(file.path(), LoadOptions::default()).unwrap();
        assert_eq!(dataset.records()[0].fatigue_score, 65.0);
    }

    #[test]
    fn test_undefined_ratio_row() {
        let file = write_csv(&[HEADER, ROW_OK, ROW_ZERO_CHRONIC]);

        match Dataset::load(file.path(), LoadOptions::default()) {
            Err(RiskError::Data(DataError::Derivation { row, source })) => {
                assert_eq!(row, 3);
                assert_eq!(
                    source,
                    FeatureError::UndefinedRatio {
                        ratio: "acwr",
                        denominator: "chronic_load"
                    }
                );
            }
            other => panic!("expected an undefined ratio, got {:?}", other),
        }

        let lenient = LoadOptions {
            skip_invalid_rows: true,
        };
        let dataset = Dataset::load(file.path(), lenient).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.skipped_rows(), 1);
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let file = write_csv(&[HEADER]);
        let err = Dataset::load(file.path(), LoadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            RiskError::Data(DataError::Empty { .. })
        ));
    }

    #[test]
    fn test_labeled_vectors_need_labels() {
        let mut unlabeled = crate::models::fixtures::reference_athlete();
        unlabeled.injury_risk = None;
        let dataset = Dataset::from_records(vec![unlabeled]).unwrap();
        assert!(dataset.labeled_vectors().is_err());

        let dataset =
            Dataset::from_records(vec![crate::models::fixtures::reference_athlete()]).unwrap();
        let (vectors, labels) = dataset.labeled_vectors().unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(labels, vec![0]);
    }

    #[test]
    fn test_in_memory_rows_are_numbered_from_one() {
        let healthy = crate::models::fixtures::reference_athlete();
        let mut broken = healthy.clone();
        broken.chronic_load = 0.0;

        match Dataset::from_records(vec![healthy.clone(), broken]) {
            Err(RiskError::Data(DataError::Derivation { row, .. })) => assert_eq!(row, 2),
            other => panic!("expected an undefined ratio, got {:?}", other),
        }

        let mut unlabeled = healthy.clone();
        unlabeled.injury_risk = None;
        let dataset = Dataset::from_records(vec![healthy, unlabeled]).unwrap();
        match dataset.labeled_vectors() {
            Err(RiskError::Data(DataError::MissingLabel { row })) => assert_eq!(row, 2),
            other => panic!("expected a missing label, got {:?}", other),
        }
    }

    #[test]
    fn test_label_out_of_range_is_invalid_row() {
        let row = ROW_OK.replace(",2,0", ",2,3");
        let file = write_csv(&[HEADER, ROW_OK, &row]);

        match Dataset::load(file.path(), LoadOptions::default()) {
            Err(RiskError::Data(DataError::InvalidRow { row, reason })) => {
                assert_eq!(row, 3);
                assert!(reason.contains("injury_risk"));
            }
            other => panic!("expected invalid row, got {:?}", other),
        }
    }

    #[test]
    fn test_float_formatted_labels_load() {
        let row = ROW_INJURED.replace(",4,1", ",4,1.0");
        let file = write_csv(&[HEADER, ROW_OK, &row]);
        let dataset = Dataset::load(file.path(), LoadOptions::default()).unwrap();
        assert_eq!(dataset.records()[1].injury_risk, Some(1));
    }

    #[test]
    fn test_unlabeled_file_still_summarizes() {
        let header = HEADER.replace(",injury_risk", "");
        let row = ROW_OK.trim_end_matches(",0");
        let file = write_csv(&[&header, row]);

        let dataset = Dataset::load(file.path(), LoadOptions::default()).unwrap();
        assert_eq!(dataset.records()[0].injury_risk, None);

        let summary = DatasetSummarizer::new(&dataset).summarize().unwrap();
        assert_eq!(summary.total_records, 1);
        assert_eq!(summary.avg_weekly_load, 1200.0);
        assert_eq!(summary.injury_rate_pct, None);
    }
}
