//! Engineered ratio features
//!
//! Derivation is plain arithmetic on a single [`AthleteRecord`]: no I/O, no
//! hidden state, so deriving the same record twice gives bit-identical
//! values. Denominators that the sports-science formulas leave unguarded
//! (`chronic_load`, `resting_heart_rate`, `height_cm`) are checked and
//! reported as [`FeatureError::UndefinedRatio`] instead of producing
//! infinities or NaN.
//!
//! Values are kept at full precision. Rounding is a presentation concern and
//! only happens through [`round_to`] / [`DerivedFeatures::rounded`].

use serde::{Deserialize, Serialize};

use crate::error::FeatureError;
use crate::models::AthleteRecord;

/// Hours of sleep below which a night counts as sleep debt
pub const SLEEP_TARGET_HOURS: f64 = 8.0;

/// Derived ratios for one record, unrounded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedFeatures {
    /// Body mass index
    pub bmi: f64,

    /// Acute:chronic workload ratio
    pub acwr: f64,

    /// Kilometers covered per sprint
    pub distance_per_sprint: f64,

    /// Training HR relative to resting HR
    pub cardio_strain: f64,

    /// Hours short of the nightly sleep target
    pub sleep_debt: f64,

    /// Combined sleep and HRV recovery indicator
    pub recovery_index: f64,

    /// Fatigue relative to sleep quality and HRV
    pub recovery_stress_ratio: f64,

    /// Injury count weighted by severity and recency
    pub injury_history_risk: f64,

    /// Weekly load multiplied by fatigue
    pub load_fatigue_index: Option<f64>,
}

/// Derive all engineered features for a record
pub fn derive(record: &AthleteRecord) -> Result<DerivedFeatures, FeatureError> {
    let height_m = record.height_cm / 100.0;
    let bmi = checked_ratio("bmi", "height_cm", record.weight_kg, height_m * height_m)?;

    let acwr = checked_ratio("acwr", "chronic_load", record.acute_load, record.chronic_load)?;

    let sprints = record.sprint_count.max(1) as f64;
    let distance_per_sprint = record.total_distance_km / sprints;

    let cardio_strain = checked_ratio(
        "cardio_strain",
        "resting_heart_rate",
        record.avg_training_heart_rate,
        record.resting_heart_rate,
    )?;

    let sleep_debt = (SLEEP_TARGET_HOURS - record.sleep_hours_avg).max(0.0);

    let recovery_index = (record.sleep_quality_score
        + record.heart_rate_variability
        + record.sleep_hours_avg * 10.0)
        / 3.0;

    let recovery_stress_ratio = checked_ratio(
        "recovery_stress_ratio",
        "sleep_quality_score + heart_rate_variability + 1",
        record.fatigue_score,
        record.sleep_quality_score + record.heart_rate_variability + 1.0,
    )?;

    let injury_history_risk = (record.previous_injury_count as f64
        * record.injury_severity_score as f64)
        / (record.days_since_last_injury as f64 + 1.0);

    let load_fatigue_index = record
        .weekly_training_load
        .map(|load| load * record.fatigue_score);

    Ok(DerivedFeatures {
        bmi,
        acwr,
        distance_per_sprint,
        cardio_strain,
        sleep_debt,
        recovery_index,
        recovery_stress_ratio,
        injury_history_risk,
        load_fatigue_index,
    })
}

/// Derive features for a batch of records, failing on the first bad record
pub fn derive_all(records: &[AthleteRecord]) -> Result<Vec<DerivedFeatures>, FeatureError> {
    records.iter().map(derive).collect()
}

fn checked_ratio(
    ratio: &'static str,
    denominator: &'static str,
    numerator: f64,
    divisor: f64,
) -> Result<f64, FeatureError> {
    let value = numerator / divisor;
    if divisor <= 0.0 || !value.is_finite() {
        return Err(FeatureError::UndefinedRatio { ratio, denominator });
    }
    Ok(value)
}

/// Round half away from zero to `places` decimals.
///
/// Works on the scaled value rather than on the binary expansion, so
/// `round_to(10.5 / 120.0, 3)` is `0.088` as an athlete would expect.
pub fn round_to(value: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (value * scale).round() / scale
}

impl DerivedFeatures {
    /// Copy rounded for display (2 decimals for BMI, ACWR, cardio strain and
    /// recovery index; 3 for distance per sprint and the remaining ratios).
    pub fn rounded(&self) -> DerivedFeatures {
        DerivedFeatures {
            bmi: round_to(self.bmi, 2),
            acwr: round_to(self.acwr, 2),
            distance_per_sprint: round_to(self.distance_per_sprint, 3),
            cardio_strain: round_to(self.cardio_strain, 2),
            sleep_debt: round_to(self.sleep_debt, 2),
            recovery_index: round_to(self.recovery_index, 2),
            recovery_stress_ratio: round_to(self.recovery_stress_ratio, 3),
            injury_history_risk: round_to(self.injury_history_risk, 3),
            load_fatigue_index: self.load_fatigue_index.map(|v| round_to(v, 1)),
        }
    }
}
