use serde::{Deserialize, Deserializer, Serialize};

/// One athlete-session row of observational data.
///
/// Records are values: once read from the dataset (or built from validated
/// input) they are never mutated, and derived ratios are computed on demand
/// by [`crate::features::derive`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteRecord {
    /// Age in whole years
    #[serde(deserialize_with = "whole_number")]
    pub age: u8,

    /// Height in centimeters
    pub height_cm: f64,

    /// Weight in kilograms
    pub weight_kg: f64,

    /// Weekly training load (absent for live predictions)
    #[serde(default)]
    pub weekly_training_load: Option<f64>,

    /// Acute load over the last 7 days
    pub acute_load: f64,

    /// Chronic load, 28-day average
    pub chronic_load: f64,

    /// Match minutes played in the last 7 days
    #[serde(deserialize_with = "whole_number")]
    pub match_minutes_last_7_days: u32,

    /// Number of sprints
    #[serde(deserialize_with = "whole_number")]
    pub sprint_count: u32,

    /// Total distance covered in kilometers
    pub total_distance_km: f64,

    /// Resting heart rate in beats per minute
    pub resting_heart_rate: f64,

    /// Average heart rate during training
    pub avg_training_heart_rate: f64,

    /// Heart rate variability (ms)
    pub heart_rate_variability: f64,

    /// VO2 max (ml/kg/min)
    pub vo2_max: f64,

    /// Average nightly sleep in hours
    pub sleep_hours_avg: f64,

    /// Sleep quality, 0-100
    pub sleep_quality_score: f64,

    /// Fatigue, 0-100
    pub fatigue_score: f64,

    /// Muscle soreness, 0-100
    pub muscle_soreness: f64,

    /// Rate of perceived exertion, 1-10
    #[serde(deserialize_with = "whole_number")]
    pub perceived_exertion: u8,

    /// Number of previous injuries
    #[serde(deserialize_with = "whole_number")]
    pub previous_injury_count: u32,

    /// Days since the last injury
    #[serde(deserialize_with = "whole_number")]
    pub days_since_last_injury: u32,

    /// Severity of the last injury, 0-5
    #[serde(deserialize_with = "whole_number")]
    pub injury_severity_score: u8,

    /// Historical ground truth (1 = injured), training/eval data only
    #[serde(default, deserialize_with = "optional_whole_number")]
    pub injury_risk: Option<u8>,
}

impl AthleteRecord {
    /// Label as a boolean, if present
    pub fn is_injured(&self) -> Option<bool> {
        self.injury_risk.map(|label| label == 1)
    }
}

/// Accept integers written either as `25` or as `25.0`.
///
/// Dataset exports from dataframe tools frequently widen integer columns to
/// floats; a fractional or negative value is still rejected.
fn whole_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    to_whole(f64::deserialize(deserializer)?)
}

/// [`whole_number`] for columns that may be left blank
fn optional_whole_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    Option::<f64>::deserialize(deserializer)?
        .map(to_whole)
        .transpose()
}

fn to_whole<T, E>(value: f64) -> Result<T, E>
where
    T: TryFrom<u64>,
    E: serde::de::Error,
{
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(E::custom(format!(
            "expected a non-negative whole number, got {}",
            value
        )));
    }
    T::try_from(value as u64).map_err(|_| E::custom(format!("{} is out of range", value)))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::AthleteRecord;

    /// The default athlete of the prediction form
    pub fn reference_athlete() -> AthleteRecord {
        AthleteRecord {
            age: 25,
            height_cm: 175.0,
            weight_kg: 72.0,
            weekly_training_load: Some(1200.0),
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
            injury_risk: Some(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "age,height_cm,weight_kg,weekly_training_load,acute_load,chronic_load,\
match_minutes_last_7_days,sprint_count,total_distance_km,resting_heart_rate,\
avg_training_heart_rate,heart_rate_variability,vo2_max,sleep_hours_avg,sleep_quality_score,\
fatigue_score,muscle_soreness,perceived_exertion,previous_injury_count,days_since_last_injury,\
injury_severity_score,injury_risk";

    fn parse(row: &str) -> Result<AthleteRecord, csv::Error> {
        let data = format!("{}\n{}\n", HEADER, row);
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        reader.deserialize().next().expect("one row")
    }

    #[test]
    fn test_float_formatted_integers_are_accepted() {
        let record = parse(
            "25.0,175,72,1200,900,1000,180.0,120,10.5,58,145,45,54,7.2,80,65,55,6,1,120,2,1",
        )
        .unwrap();
        assert_eq!(record.age, 25);
        assert_eq!(record.match_minutes_last_7_days, 180);
        assert_eq!(record.is_injured(), Some(true));
    }

    #[test]
    fn test_fractional_count_is_rejected() {
        let result = parse(
            "25,175,72,1200,900,1000,180,120.5,10.5,58,145,45,54,7.2,80,65,55,6,1,120,2,0",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_optional_fields() {
        let record =
            parse("25,175,72,,900,1000,180,120,10.5,58,145,45,54,7.2,80,65,55,6,1,120,2,")
                .unwrap();
        assert_eq!(record.weekly_training_load, None);
        assert_eq!(record.injury_risk, None);
    }

    #[test]
    fn test_float_formatted_label() {
        let injured =
            parse("25,175,72,1200,900,1000,180,120,10.5,58,145,45,54,7.2,80,65,55,6,1,120,2,1.0")
                .unwrap();
        assert_eq!(injured.injury_risk, Some(1));

        let healthy =
            parse("25,175,72,1200,900,1000,180,120,10.5,58,145,45,54,7.2,80,65,55,6,1,120,2,0.0")
                .unwrap();
        assert_eq!(healthy.injury_risk, Some(0));

        let unlabeled =
            parse("25,175,72,1200,900,1000,180,120,10.5,58,145,45,54,7.2,80,65,55,6,1,120,2,")
                .unwrap();
        assert_eq!(unlabeled.injury_risk, None);

        let fractional =
            parse("25,175,72,1200,900,1000,180,120,10.5,58,145,45,54,7.2,80,65,55,6,1,120,2,0.5");
        assert!(fractional.is_err());
    }
}
