// Library interface for athlete-risk
// The binary and the integration tests both go through these modules

pub mod classifier;
pub mod columns;
pub mod config;
pub mod context;
pub mod dataset;
pub mod error;
pub mod export;
pub mod features;
pub mod logging;
pub mod models;
pub mod risk;
pub mod schema;
pub mod summary;
pub mod training;
pub mod validation;

// Re-export commonly used types for convenience
pub use classifier::{
    load_classifier, GbmParams, GradientBoostedModel, ModelMetrics, RiskClassifier,
    SharedClassifier,
};
pub use columns::Column;
pub use config::AppConfig;
pub use context::{AppContext, BatchEvaluation, Predictor, RiskAssessment};
pub use dataset::{Dataset, LoadOptions};
pub use error::{
    DataError, ErrorSeverity, FeatureError, InputError, ModelError, Result, RiskError,
    SummaryError,
};
pub use features::{derive, derive_all, round_to, DerivedFeatures};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::AthleteRecord;
pub use risk::RiskBand;
pub use schema::{FeatureSchema, FeatureVector, FEATURE_COUNT, SCHEMA_VERSION};
pub use summary::{ColumnStats, DatasetSummarizer, DatasetSummary, LabelSplit};
pub use training::{SplitConfig, Trainer, TrainingConfig};
pub use validation::AthleteInput;
