//! Aggregate statistics over a set of athlete records
//!
//! Every aggregate fails with [`SummaryError::NoData`] when there is nothing
//! to aggregate, instead of returning NaN.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

use crate::columns::Column;
use crate::dataset::Dataset;
use crate::error::SummaryError;

/// Headline numbers shown for a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_records: usize,
    pub avg_weekly_load: f64,
    pub avg_fatigue_score: f64,
    /// Share of injured rows in percent, `None` when no row is labeled
    pub injury_rate_pct: Option<f64>,
    pub avg_sleep_debt: f64,
}

/// Descriptive statistics for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, `None` with fewer than two values
    pub std_dev: Option<f64>,
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

/// Mean of a column for injured and uninjured rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSplit {
    pub column: String,
    pub injured_mean: Option<f64>,
    pub injured_count: usize,
    pub uninjured_mean: Option<f64>,
    pub uninjured_count: usize,
}

/// Arithmetic mean, `NoData` for an empty slice
pub fn mean(values: &[f64], what: &str) -> Result<f64, SummaryError> {
    if values.is_empty() {
        return Err(SummaryError::NoData {
            what: what.to_string(),
        });
    }
    Ok(values.iter().mean())
}

/// Summarizer over a loaded dataset
pub struct DatasetSummarizer<'a> {
    dataset: &'a Dataset,
}

impl<'a> DatasetSummarizer<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset }
    }

    pub fn count(&self) -> usize {
        self.dataset.len()
    }

    /// Mean of any numeric column, raw or derived
    pub fn column_mean(&self, column: Column) -> Result<f64, SummaryError> {
        mean(&self.dataset.column_values(column), column.name())
    }

    /// Positive label rate in percent, over labeled rows only
    pub fn injury_rate_pct(&self) -> Result<f64, SummaryError> {
        Ok(self.column_mean(Column::InjuryRisk)? * 100.0)
    }

    pub fn column_stats(&self, column: Column) -> Result<ColumnStats, SummaryError> {
        let values = self.dataset.column_values(column);
        let mean = mean(&values, column.name())?;
        let std_dev = if values.len() > 1 {
            Some(values.iter().std_dev())
        } else {
            None
        };
        let min = Statistics::min(values.iter());
        let max = Statistics::max(values.iter());
        let count = values.len();
        let median = Data::new(values).median();

        Ok(ColumnStats {
            column: column.name().to_string(),
            count,
            mean,
            std_dev,
            min,
            median,
            max,
        })
    }

    /// Column mean split by the injury label; unlabeled rows are ignored
    pub fn by_label(&self, column: Column) -> Result<LabelSplit, SummaryError> {
        let mut injured = Vec::new();
        let mut uninjured = Vec::new();
        for (record, derived) in self.dataset.rows() {
            let (Some(label), Some(value)) = (record.is_injured(), column.value(record, derived))
            else {
                continue;
            };
            if label {
                injured.push(value);
            } else {
                uninjured.push(value);
            }
        }

        if injured.is_empty() && uninjured.is_empty() {
            return Err(SummaryError::NoData {
                what: format!("{} by injury label", column.name()),
            });
        }

        Ok(LabelSplit {
            column: column.name().to_string(),
            injured_mean: mean(&injured, column.name()).ok(),
            injured_count: injured.len(),
            uninjured_mean: mean(&uninjured, column.name()).ok(),
            uninjured_count: uninjured.len(),
        })
    }

    /// Headline KPIs. The label is optional here, so an unlabeled dataset
    /// still summarizes without an injury rate.
    pub fn summarize(&self) -> Result<DatasetSummary, SummaryError> {
        if self.dataset.is_empty() {
            return Err(SummaryError::NoData {
                what: "dataset summary".to_string(),
            });
        }

        Ok(DatasetSummary {
            total_records: self.count(),
            avg_weekly_load: self.column_mean(Column::WeeklyTrainingLoad)?,
            avg_fatigue_score: self.column_mean(Column::FatigueScore)?,
            injury_rate_pct: self.injury_rate_pct().ok(),
            avg_sleep_debt: self.column_mean(Column::SleepDebt)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::reference_athlete;
    use crate::models::AthleteRecord;

    fn athlete(fatigue: f64, sleep: f64, label: Option<u8>) -> AthleteRecord {
        AthleteRecord {
            fatigue_score: fatigue,
            sleep_hours_avg: sleep,
            injury_risk: label,
            ..reference_athlete()
        }
    }

    fn sample() -> Dataset {
        Dataset::from_records(vec![
            athlete(40.0, 8.5, Some(0)),
            athlete(60.0, 7.0, Some(0)),
            athlete(80.0, 6.0, Some(1)),
            athlete(90.0, 5.0, Some(1)),
        ])
        .unwrap()
    }

    #[test]
    fn test_summary() {
        let dataset = sample();
        let summary = DatasetSummarizer::new(&dataset).summarize().unwrap();

        assert_eq!(summary.total_records, 4);
        assert_eq!(summary.avg_weekly_load, 1200.0);
        assert_eq!(summary.avg_fatigue_score, 67.5);
        assert_eq!(summary.injury_rate_pct, Some(50.0));
        // debts: 0, 1, 2, 3
        assert_eq!(summary.avg_sleep_debt, 1.5);
    }

    #[test]
    fn test_mean_of_empty_set_is_no_data() {
        assert_eq!(
            mean(&[], "fatigue_score"),
            Err(SummaryError::NoData {
                what: "fatigue_score".to_string()
            })
        );
    }

    #[test]
    fn test_injury_rate_without_labels() {
        let dataset = Dataset::from_records(vec![athlete(50.0, 7.0, None)]).unwrap();
        let summarizer = DatasetSummarizer::new(&dataset);
        assert!(matches!(
            summarizer.injury_rate_pct(),
            Err(SummaryError::NoData { .. })
        ));
        assert_eq!(summarizer.column_mean(Column::FatigueScore), Ok(50.0));

        let summary = summarizer.summarize().unwrap();
        assert_eq!(summary.total_records, 1);
        assert_eq!(summary.avg_fatigue_score, 50.0);
        assert_eq!(summary.injury_rate_pct, None);
    }

    #[test]
    fn test_column_stats() {
        let dataset = sample();
        let stats = DatasetSummarizer::new(&dataset)
            .column_stats(Column::FatigueScore)
            .unwrap();

        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 67.5);
        assert_eq!(stats.min, 40.0);
        assert_eq!(stats.max, 90.0);
        assert_eq!(stats.median, 70.0);
        assert!(stats.std_dev.unwrap() > 0.0);
    }

    #[test]
    fn test_single_value_has_no_std_dev() {
        let dataset = Dataset::from_records(vec![athlete(50.0, 7.0, Some(0))]).unwrap();
        let stats = DatasetSummarizer::new(&dataset)
            .column_stats(Column::SleepDebt)
            .unwrap();
        assert_eq!(stats.std_dev, None);
    }

    #[test]
    fn test_by_label() {
        let dataset = sample();
        let split = DatasetSummarizer::new(&dataset)
            .by_label(Column::FatigueScore)
            .unwrap();

        assert_eq!(split.injured_count, 2);
        assert_eq!(split.injured_mean, Some(85.0));
        assert_eq!(split.uninjured_mean, Some(50.0));
    }
}
