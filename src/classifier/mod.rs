use std::path::Path;
use std::sync::Arc;

use crate::error::{ModelError, Result};
use crate::schema::{FeatureSchema, FeatureVector};

pub mod gbm;

pub use gbm::{GbmParams, GradientBoostedModel, ModelMetrics, RegressionTree, TreeNode};

/// Trained binary classifier scoring a [`FeatureVector`]
pub trait RiskClassifier: Send + Sync {
    /// Feature order the classifier was trained on
    fn schema(&self) -> &FeatureSchema;

    /// Probability of the positive ("injury") class, in [0, 1]
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64>;
}

/// Shared read-only classifier handle
pub type SharedClassifier = Arc<dyn RiskClassifier>;

/// Load the model artifact once at startup
pub fn load_classifier(path: &Path) -> Result<SharedClassifier> {
    let model = GradientBoostedModel::load(path)?;
    Ok(Arc::new(model))
}

/// Reject NaN and values outside [0, 1]
pub(crate) fn checked_probability(value: f64) -> Result<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ModelError::InvalidProbability { value }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_probability() {
        assert_eq!(checked_probability(0.0).unwrap(), 0.0);
        assert_eq!(checked_probability(1.0).unwrap(), 1.0);
        assert!(checked_probability(1.01).is_err());
        assert!(checked_probability(f64::NAN).is_err());
    }

    #[test]
    fn test_missing_artifact_is_fatal() {
        let err = load_classifier(Path::new("/no/such/model.json"))
            .err()
            .expect("missing artifact must fail");
        assert!(err.is_fatal());
    }
}
