//! Named numeric columns
//!
//! One table of column names shared by the dataset header check, summary
//! lookups, the feature export and the model schema, so a column is spelled
//! exactly once.

use std::fmt;
use std::str::FromStr;

use crate::error::SummaryError;
use crate::features::{round_to, DerivedFeatures};
use crate::models::AthleteRecord;

/// Where a column's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Read from the dataset
    Raw,
    /// Computed by the feature deriver
    Derived,
    /// Ground-truth label
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Age,
    HeightCm,
    WeightKg,
    Bmi,
    WeeklyTrainingLoad,
    AcuteLoad,
    ChronicLoad,
    Acwr,
    MatchMinutesLast7Days,
    SprintCount,
    TotalDistanceKm,
    DistancePerSprint,
    RestingHeartRate,
    AvgTrainingHeartRate,
    HeartRateVariability,
    Vo2Max,
    CardioStrain,
    SleepHoursAvg,
    SleepQualityScore,
    FatigueScore,
    MuscleSoreness,
    PerceivedExertion,
    SleepDebt,
    RecoveryIndex,
    RecoveryStressRatio,
    PreviousInjuryCount,
    DaysSinceLastInjury,
    InjurySeverityScore,
    InjuryHistoryRisk,
    LoadFatigueIndex,
    InjuryRisk,
}

impl Column {
    /// Every column, grouped the way the dataset is documented
    pub const ALL: [Column; 31] = [
        Column::Age,
        Column::HeightCm,
        Column::WeightKg,
        Column::Bmi,
        Column::WeeklyTrainingLoad,
        Column::AcuteLoad,
        Column::ChronicLoad,
        Column::Acwr,
        Column::MatchMinutesLast7Days,
        Column::SprintCount,
        Column::TotalDistanceKm,
        Column::DistancePerSprint,
        Column::RestingHeartRate,
        Column::AvgTrainingHeartRate,
        Column::HeartRateVariability,
        Column::Vo2Max,
        Column::CardioStrain,
        Column::SleepHoursAvg,
        Column::SleepQualityScore,
        Column::FatigueScore,
        Column::MuscleSoreness,
        Column::PerceivedExertion,
        Column::SleepDebt,
        Column::RecoveryIndex,
        Column::RecoveryStressRatio,
        Column::PreviousInjuryCount,
        Column::DaysSinceLastInjury,
        Column::InjurySeverityScore,
        Column::InjuryHistoryRisk,
        Column::LoadFatigueIndex,
        Column::InjuryRisk,
    ];

    /// CSV header name
    pub fn name(&self) -> &'static str {
        match self {
            Column::Age => "age",
            Column::HeightCm => "height_cm",
            Column::WeightKg => "weight_kg",
            Column::Bmi => "bmi",
            Column::WeeklyTrainingLoad => "weekly_training_load",
            Column::AcuteLoad => "acute_load",
            Column::ChronicLoad => "chronic_load",
            Column::Acwr => "acwr",
            Column::MatchMinutesLast7Days => "match_minutes_last_7_days",
            Column::SprintCount => "sprint_count",
            Column::TotalDistanceKm => "total_distance_km",
            Column::DistancePerSprint => "distance_per_sprint",
            Column::RestingHeartRate => "resting_heart_rate",
            Column::AvgTrainingHeartRate => "avg_training_heart_rate",
            Column::HeartRateVariability => "heart_rate_variability",
            Column::Vo2Max => "vo2_max",
            Column::CardioStrain => "cardio_strain",
            Column::SleepHoursAvg => "sleep_hours_avg",
            Column::SleepQualityScore => "sleep_quality_score",
            Column::FatigueScore => "fatigue_score",
            Column::MuscleSoreness => "muscle_soreness",
            Column::PerceivedExertion => "perceived_exertion",
            Column::SleepDebt => "sleep_debt",
            Column::RecoveryIndex => "recovery_index",
            Column::RecoveryStressRatio => "recovery_stress_ratio",
            Column::PreviousInjuryCount => "previous_injury_count",
            Column::DaysSinceLastInjury => "days_since_last_injury",
            Column::InjurySeverityScore => "injury_severity_score",
            Column::InjuryHistoryRisk => "injury_history_risk",
            Column::LoadFatigueIndex => "load_fatigue_index",
            Column::InjuryRisk => "injury_risk",
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Bmi
            | Column::Acwr
            | Column::DistancePerSprint
            | Column::CardioStrain
            | Column::SleepDebt
            | Column::RecoveryIndex
            | Column::RecoveryStressRatio
            | Column::InjuryHistoryRisk
            | Column::LoadFatigueIndex => ColumnKind::Derived,
            Column::InjuryRisk => ColumnKind::Label,
            _ => ColumnKind::Raw,
        }
    }

    /// Raw columns the dataset header must contain
    pub fn required_raw() -> impl Iterator<Item = Column> {
        Self::ALL
            .into_iter()
            .filter(|column| column.kind() == ColumnKind::Raw)
    }

    /// Decimal places used when the value is shown to a person
    pub fn display_precision(&self) -> u32 {
        match self {
            Column::Bmi | Column::Acwr | Column::CardioStrain | Column::RecoveryIndex => 2,
            Column::SleepDebt => 2,
            Column::DistancePerSprint
            | Column::RecoveryStressRatio
            | Column::InjuryHistoryRisk => 3,
            _ => 1,
        }
    }

    /// Value of this column for a record and its derived features.
    ///
    /// `None` only for the optional weekly load (and the index built from it)
    /// and for the label on unlabeled rows.
    pub fn value(&self, record: &AthleteRecord, derived: &DerivedFeatures) -> Option<f64> {
        let value = match self {
            Column::Age => record.age as f64,
            Column::HeightCm => record.height_cm,
            Column::WeightKg => record.weight_kg,
            Column::Bmi => derived.bmi,
            Column::WeeklyTrainingLoad => return record.weekly_training_load,
            Column::AcuteLoad => record.acute_load,
            Column::ChronicLoad => record.chronic_load,
            Column::Acwr => derived.acwr,
            Column::MatchMinutesLast7Days => record.match_minutes_last_7_days as f64,
            Column::SprintCount => record.sprint_count as f64,
            Column::TotalDistanceKm => record.total_distance_km,
            Column::DistancePerSprint => derived.distance_per_sprint,
            Column::RestingHeartRate => record.resting_heart_rate,
            Column::AvgTrainingHeartRate => record.avg_training_heart_rate,
            Column::HeartRateVariability => record.heart_rate_variability,
            Column::Vo2Max => record.vo2_max,
            Column::CardioStrain => derived.cardio_strain,
            Column::SleepHoursAvg => record.sleep_hours_avg,
            Column::SleepQualityScore => record.sleep_quality_score,
            Column::FatigueScore => record.fatigue_score,
            Column::MuscleSoreness => record.muscle_soreness,
            Column::PerceivedExertion => record.perceived_exertion as f64,
            Column::SleepDebt => derived.sleep_debt,
            Column::RecoveryIndex => derived.recovery_index,
            Column::RecoveryStressRatio => derived.recovery_stress_ratio,
            Column::PreviousInjuryCount => record.previous_injury_count as f64,
            Column::DaysSinceLastInjury => record.days_since_last_injury as f64,
            Column::InjurySeverityScore => record.injury_severity_score as f64,
            Column::InjuryHistoryRisk => derived.injury_history_risk,
            Column::LoadFatigueIndex => return derived.load_fatigue_index,
            Column::InjuryRisk => return record.injury_risk.map(f64::from),
        };
        Some(value)
    }

    /// Format a value at this column's display precision
    pub fn format_value(&self, value: f64) -> String {
        let places = self.display_precision();
        format!("{:.*}", places as usize, round_to(value, places))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        Column::ALL
            .into_iter()
            .find(|column| column.name() == normalized)
            .ok_or_else(|| SummaryError::UnknownColumn {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::derive;
    use crate::models::fixtures::reference_athlete;

    #[test]
    fn test_column_names_round_trip() {
        for column in Column::ALL {
            assert_eq!(column.name().parse::<Column>().unwrap(), column);
        }
        assert_eq!("Fatigue Score".parse::<Column>().unwrap(), Column::FatigueScore);
        assert!("fatigue".parse::<Column>().is_err());
    }

    #[test]
    fn test_required_raw_columns() {
        let required: Vec<&str> = Column::required_raw().map(|c| c.name()).collect();
        assert_eq!(required.len(), 21);
        assert!(required.contains(&"weekly_training_load"));
        assert!(required.contains(&"chronic_load"));
        assert!(!required.contains(&"bmi"));
        assert!(!required.contains(&"injury_risk"));
    }

    #[test]
    fn test_column_values() {
        let record = reference_athlete();
        let derived = derive(&record).unwrap();

        assert_eq!(Column::Age.value(&record, &derived), Some(25.0));
        assert_eq!(Column::Bmi.value(&record, &derived), Some(derived.bmi));
        assert_eq!(Column::InjuryRisk.value(&record, &derived), Some(0.0));
        assert_eq!(Column::LoadFatigueIndex.value(&record, &derived), Some(78_000.0));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(Column::DistancePerSprint.format_value(10.5 / 120.0), "0.088");
        assert_eq!(Column::Acwr.format_value(0.9), "0.90");
        assert_eq!(Column::FatigueScore.format_value(65.0), "65.0");
    }
}
