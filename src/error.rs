//! Unified error hierarchy for athlete-risk
//!
//! Groups failures into the four classes the tool cares about: missing or
//! unreadable startup data, rejected user input, undefined derived ratios and
//! model/schema disagreements. Only the first class is fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all athlete-risk operations
#[derive(Debug, Error)]
pub enum RiskError {
    /// Dataset loading errors
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Interactive input rejected by range validation
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    /// Feature derivation errors
    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    /// Model artifact, schema and inference errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Dataset summary errors
    #[error("Summary error: {0}")]
    Summary(#[from] SummaryError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Dataset file errors
#[derive(Debug, Error)]
pub enum DataError {
    /// Dataset file not found at specified path
    #[error("Dataset not found: {path}")]
    FileNotFound { path: PathBuf },

    /// CSV could not be read or a row could not be decoded
    #[error("Unreadable dataset {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// A required column is absent from the header
    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    /// A row could not be decoded or failed value checks
    #[error("Invalid row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    /// A row has an undefined derived ratio
    #[error("Invalid row {row}: {source}")]
    Derivation {
        row: usize,
        #[source]
        source: FeatureError,
    },

    /// Dataset contains no usable rows
    #[error("Dataset is empty: {path}")]
    Empty { path: PathBuf },

    /// Training or evaluation needs the injury label on every row
    #[error("Row {row} has no injury_risk label")]
    MissingLabel { row: usize },
}

/// Input validation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    /// Value outside its declared range
    #[error("{field}={value} is outside the allowed range [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// NaN or infinite value
    #[error("{field} must be a finite number")]
    NotFinite { field: String },
}

/// Feature derivation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeatureError {
    /// Unguarded denominator is zero, or the ratio is not finite
    #[error("{ratio} is undefined: {denominator} must be greater than zero")]
    UndefinedRatio {
        ratio: &'static str,
        denominator: &'static str,
    },
}

/// Model artifact and inference errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// Artifact not found at specified path
    #[error("Model artifact not found: {path}")]
    ArtifactNotFound { path: PathBuf },

    /// Artifact is not valid JSON or references impossible nodes
    #[error("Corrupted model artifact: {reason}")]
    Corrupted { reason: String },

    /// Artifact written by an unknown format revision
    #[error("Unsupported model format version: {version}")]
    UnsupportedFormat { version: u32 },

    /// Artifact trained against another schema revision
    #[error("Schema version mismatch: model uses {found}, expected {expected}")]
    SchemaVersionMismatch { expected: String, found: String },

    /// Feature order differs from the trained order
    #[error("Feature order mismatch at position {position}: expected {expected}, found {found}")]
    OrderMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    /// Vector or schema length differs from the trained length
    #[error("Feature count mismatch: expected {expected}, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    /// Classifier produced a value outside [0, 1]
    #[error("Classifier returned an invalid probability: {value}")]
    InvalidProbability { value: f64 },

    /// Training could not proceed
    #[error("Training failed: {reason}")]
    Training { reason: String },
}

/// Summary statistics errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SummaryError {
    /// Nothing to aggregate
    #[error("No data available for {what}")]
    NoData { what: String },

    /// Unknown column name
    #[error("Unknown column: {name}")]
    UnknownColumn { name: String },
}

/// Result type alias for athlete-risk operations
pub type Result<T> = std::result::Result<T, RiskError>;

impl RiskError {
    /// Startup failures that should abort the process
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RiskError::Data(DataError::FileNotFound { .. })
                | RiskError::Data(DataError::Unreadable { .. })
                | RiskError::Data(DataError::Empty { .. })
                | RiskError::Model(ModelError::ArtifactNotFound { .. })
                | RiskError::Model(ModelError::Corrupted { .. })
                | RiskError::Io(_)
                | RiskError::Configuration(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        if self.is_fatal() {
            return ErrorSeverity::Critical;
        }
        match self {
            RiskError::Input(_) => ErrorSeverity::Warning,
            RiskError::Feature(_) => ErrorSeverity::Warning,
            RiskError::Summary(SummaryError::NoData { .. }) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            RiskError::Data(DataError::FileNotFound { path }) => {
                format!("Could not find the athlete dataset: {}", path.display())
            }
            RiskError::Model(ModelError::ArtifactNotFound { path }) => {
                format!(
                    "No trained model at {}. Run `athlete-risk train` first.",
                    path.display()
                )
            }
            RiskError::Model(ModelError::OrderMismatch { .. })
            | RiskError::Model(ModelError::SchemaVersionMismatch { .. })
            | RiskError::Model(ModelError::FeatureCountMismatch { .. }) => {
                format!("The model was trained on different features and must be retrained: {}", self)
            }
            RiskError::Input(err) => format!("Please correct the input: {}", err),
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Startup cannot continue
    Critical,
    /// Request failed, process continues
    Error,
    /// Request rejected because of caller data
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = RiskError::Data(DataError::FileNotFound {
            path: PathBuf::from("/data/athletes.csv"),
        });
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.is_fatal());

        let err = RiskError::Feature(FeatureError::UndefinedRatio {
            ratio: "acwr",
            denominator: "chronic_load",
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_order_mismatch_is_recoverable() {
        let err = RiskError::Model(ModelError::OrderMismatch {
            position: 3,
            expected: "bmi".to_string(),
            found: "acwr".to_string(),
        });
        assert!(!err.is_fatal());
        assert_eq!(err.severity(), ErrorSeverity::Error);
        assert!(err.user_message().contains("retrained"));
    }

    #[test]
    fn test_user_messages() {
        let err = RiskError::Model(ModelError::ArtifactNotFound {
            path: PathBuf::from("models/injury_risk_model.json"),
        });
        assert!(err.user_message().contains("athlete-risk train"));

        let err = RiskError::Input(InputError::OutOfRange {
            field: "age".to_string(),
            value: 60.0,
            min: 16.0,
            max: 45.0,
        });
        assert!(err.user_message().contains("age=60"));
    }
}
