//! Model input schema
//!
//! The classifier consumes 21 numbers and nothing in a plain vector says
//! which number is which. The schema names them, carries a version tag and a
//! SHA-256 fingerprint of the ordered names, and is embedded in every model
//! artifact. Loading an artifact whose schema differs from [`FeatureSchema::current`]
//! fails instead of silently scoring shuffled inputs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

use crate::columns::Column;
use crate::error::{ModelError, RiskError};
use crate::features::DerivedFeatures;
use crate::models::AthleteRecord;

/// Schema revision written into model artifacts
pub const SCHEMA_VERSION: &str = "athlete-injury/v1";

/// Number of model inputs
pub const FEATURE_COUNT: usize = 21;

/// Model inputs in trained order
pub const MODEL_FEATURES: [Column; FEATURE_COUNT] = [
    Column::Age,
    Column::HeightCm,
    Column::WeightKg,
    Column::Bmi,
    Column::AcuteLoad,
    Column::Acwr,
    Column::MatchMinutesLast7Days,
    Column::SprintCount,
    Column::TotalDistanceKm,
    Column::RestingHeartRate,
    Column::AvgTrainingHeartRate,
    Column::HeartRateVariability,
    Column::Vo2Max,
    Column::SleepHoursAvg,
    Column::SleepQualityScore,
    Column::FatigueScore,
    Column::MuscleSoreness,
    Column::PerceivedExertion,
    Column::PreviousInjuryCount,
    Column::DaysSinceLastInjury,
    Column::InjurySeverityScore,
];

/// Named, versioned feature order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: String,
    pub features: Vec<String>,
    pub fingerprint: String,
}

impl FeatureSchema {
    /// Schema this build produces vectors for
    pub fn current() -> &'static FeatureSchema {
        static CURRENT: OnceLock<FeatureSchema> = OnceLock::new();
        CURRENT.get_or_init(|| {
            let features: Vec<String> = MODEL_FEATURES
                .iter()
                .map(|column| column.name().to_string())
                .collect();
            FeatureSchema {
                version: SCHEMA_VERSION.to_string(),
                fingerprint: Self::fingerprint_of(SCHEMA_VERSION, &features),
                features,
            }
        })
    }

    /// Hex SHA-256 over the version and the ordered names
    pub fn fingerprint_of(version: &str, features: &[String]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(version.as_bytes());
        for name in features {
            hasher.update([0u8]);
            hasher.update(name.as_bytes());
        }
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect()
    }

    /// Check that `other` (typically read from an artifact) is this schema
    pub fn verify(&self, other: &FeatureSchema) -> Result<(), ModelError> {
        if other.version != self.version {
            return Err(ModelError::SchemaVersionMismatch {
                expected: self.version.clone(),
                found: other.version.clone(),
            });
        }

        if other.features.len() != self.features.len() {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.features.len(),
                actual: other.features.len(),
            });
        }

        if let Some((position, (expected, found))) = self
            .features
            .iter()
            .zip(other.features.iter())
            .enumerate()
            .find(|(_, (expected, found))| expected != found)
        {
            return Err(ModelError::OrderMismatch {
                position,
                expected: expected.clone(),
                found: found.clone(),
            });
        }

        if Self::fingerprint_of(&other.version, &other.features) != other.fingerprint {
            return Err(ModelError::Corrupted {
                reason: "schema fingerprint does not match its feature list".to_string(),
            });
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Model input in [`MODEL_FEATURES`] order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Build the vector from a record and its (unrounded) derived features
    pub fn from_record(record: &AthleteRecord, derived: &DerivedFeatures) -> Self {
        let mut values = [0.0; FEATURE_COUNT];
        for (slot, column) in values.iter_mut().zip(MODEL_FEATURES.iter()) {
            // Every model feature is a required raw column or a non-optional ratio
            *slot = column.value(record, derived).unwrap_or(f64::NAN);
        }
        Self { values }
    }

    /// Wrap raw values, checking their count
    pub fn from_values(values: &[f64]) -> Result<Self, RiskError> {
        let values: [f64; FEATURE_COUNT] =
            values
                .try_into()
                .map_err(|_| ModelError::FeatureCountMismatch {
                    expected: FEATURE_COUNT,
                    actual: values.len(),
                })?;
        Ok(Self { values })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value by feature name
    pub fn get(&self, name: &str) -> Option<f64> {
        MODEL_FEATURES
            .iter()
            .position(|column| column.name() == name)
            .map(|index| self.values[index])
    }

    /// Name/value pairs in order, for logging and JSON output
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        MODEL_FEATURES
            .iter()
            .map(|column| column.name())
            .zip(self.values.iter().copied())
    }
}
