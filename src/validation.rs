use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::error::InputError;
use crate::models::AthleteRecord;

/// Declared range for one interactive input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputRange {
    pub field: &'static str,
    pub min: f64,
    pub max: f64,
}

impl InputRange {
    const fn new(field: &'static str, min: f64, max: f64) -> Self {
        Self { field, min, max }
    }

    pub fn bounds(&self) -> RangeInclusive<f64> {
        self.min..=self.max
    }

    /// Reject values outside the range; never clamps
    pub fn check(&self, value: f64) -> Result<(), InputError> {
        if !value.is_finite() {
            return Err(InputError::NotFinite {
                field: self.field.to_string(),
            });
        }
        if !self.bounds().contains(&value) {
            return Err(InputError::OutOfRange {
                field: self.field.to_string(),
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

pub const AGE: InputRange = InputRange::new("age", 16.0, 45.0);
pub const HEIGHT_CM: InputRange = InputRange::new("height_cm", 150.0, 210.0);
pub const WEIGHT_KG: InputRange = InputRange::new("weight_kg", 45.0, 120.0);
pub const ACUTE_LOAD: InputRange = InputRange::new("acute_load", 100.0, 2000.0);
pub const CHRONIC_LOAD: InputRange = InputRange::new("chronic_load", 100.0, 2000.0);
pub const MATCH_MINUTES: InputRange = InputRange::new("match_minutes_last_7_days", 0.0, 540.0);
pub const SPRINT_COUNT: InputRange = InputRange::new("sprint_count", 0.0, 400.0);
pub const TOTAL_DISTANCE_KM: InputRange = InputRange::new("total_distance_km", 1.0, 30.0);
pub const RESTING_HR: InputRange = InputRange::new("resting_heart_rate", 40.0, 90.0);
pub const AVG_TRAINING_HR: InputRange = InputRange::new("avg_training_heart_rate", 90.0, 190.0);
pub const HRV: InputRange = InputRange::new("heart_rate_variability", 10.0, 120.0);
pub const VO2_MAX: InputRange = InputRange::new("vo2_max", 30.0, 75.0);
pub const SLEEP_HOURS: InputRange = InputRange::new("sleep_hours_avg", 3.0, 10.0);
pub const SLEEP_QUALITY: InputRange = InputRange::new("sleep_quality_score", 0.0, 100.0);
pub const FATIGUE: InputRange = InputRange::new("fatigue_score", 0.0, 100.0);
pub const MUSCLE_SORENESS: InputRange = InputRange::new("muscle_soreness", 0.0, 100.0);
pub const PERCEIVED_EXERTION: InputRange = InputRange::new("perceived_exertion", 1.0, 10.0);
pub const PREVIOUS_INJURIES: InputRange = InputRange::new("previous_injury_count", 0.0, 10.0);
pub const DAYS_SINCE_INJURY: InputRange = InputRange::new("days_since_last_injury", 0.0, 2000.0);
pub const INJURY_SEVERITY: InputRange = InputRange::new("injury_severity_score", 0.0, 5.0);

/// Values entered for a single live prediction.
///
/// Defaults are the values the assessment form starts with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteInput {
    pub age: u8,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub acute_load: f64,
    pub chronic_load: f64,
    pub match_minutes_last_7_days: u32,
    pub sprint_count: u32,
    pub total_distance_km: f64,
    pub resting_heart_rate: f64,
    pub avg_training_heart_rate: f64,
    pub heart_rate_variability: f64,
    pub vo2_max: f64,
    pub sleep_hours_avg: f64,
    pub sleep_quality_score: f64,
    pub fatigue_score: f64,
    pub muscle_soreness: f64,
    pub perceived_exertion: u8,
    pub previous_injury_count: u32,
    pub days_since_last_injury: u32,
    pub injury_severity_score: u8,
}

impl Default for AthleteInput {
    fn default() -> Self {
        Self {
            age: 25,
            height_cm: 175.0,
            weight_kg: 72.0,
            acute_load: 900.0,
            chronic_load: 1000.0,
            match_minutes_last_7_days: 180,
            sprint_count: 120,
            total_distance_km: 10.5,
            resting_heart_rate: 58.0,
            avg_training_heart_rate: 145.0,
            heart_rate_variability: 45.0,
            vo2_max: 54.0,
            sleep_hours_avg: 7.2,
            sleep_quality_score: 80.0,
            fatigue_score: 65.0,
            muscle_soreness: 55.0,
            perceived_exertion: 6,
            previous_injury_count: 1,
            days_since_last_injury: 120,
            injury_severity_score: 2,
        }
    }
}

impl AthleteInput {
    /// Check every field against its declared range, first violation wins
    pub fn validate(&self) -> Result<(), InputError> {
        let checks: [(InputRange, f64); 20] = [
            (AGE, self.age as f64),
            (HEIGHT_CM, self.height_cm),
            (WEIGHT_KG, self.weight_kg),
            (ACUTE_LOAD, self.acute_load),
            (CHRONIC_LOAD, self.chronic_load),
            (MATCH_MINUTES, self.match_minutes_last_7_days as f64),
            (SPRINT_COUNT, self.sprint_count as f64),
            (TOTAL_DISTANCE_KM, self.total_distance_km),
            (RESTING_HR, self.resting_heart_rate),
            (AVG_TRAINING_HR, self.avg_training_heart_rate),
            (HRV, self.heart_rate_variability),
            (VO2_MAX, self.vo2_max),
            (SLEEP_HOURS, self.sleep_hours_avg),
            (SLEEP_QUALITY, self.sleep_quality_score),
            (FATIGUE, self.fatigue_score),
            (MUSCLE_SORENESS, self.muscle_soreness),
            (PERCEIVED_EXERTION, self.perceived_exertion as f64),
            (PREVIOUS_INJURIES, self.previous_injury_count as f64),
            (DAYS_SINCE_INJURY, self.days_since_last_injury as f64),
            (INJURY_SEVERITY, self.injury_severity_score as f64),
        ];

        for (range, value) in checks {
            range.check(value)?;
        }
        Ok(())
    }

    /// Validate and convert into an unlabeled record
    pub fn into_record(self) -> Result<AthleteRecord, InputError> {
        self.validate()?;
        Ok(AthleteRecord {
            age: self.age,
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            weekly_training_load: None,
            acute_load: self.acute_load,
            chronic_load: self.chronic_load,
            match_minutes_last_7_days: self.match_minutes_last_7_days,
            sprint_count: self.sprint_count,
            total_distance_km: self.total_distance_km,
            resting_heart_rate: self.resting_heart_rate,
            avg_training_heart_rate: self.avg_training_heart_rate,
            heart_rate_variability: self.heart_rate_variability,
            vo2_max: self.vo2_max,
            sleep_hours_avg: self.sleep_hours_avg,
            sleep_quality_score: self.sleep_quality_score,
            fatigue_score: self.fatigue_score,
            muscle_soreness: self.muscle_soreness,
            perceived_exertion: self.perceived_exertion,
            previous_injury_count: self.previous_injury_count,
            days_since_last_injury: self.days_since_last_injury,
            injury_severity_score: self.injury_severity_score,
            injury_risk: None,
        })
    }
}
