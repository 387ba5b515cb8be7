//! Read-only handles built once at startup
//!
//! [`AppContext`] owns the loaded dataset and classifier behind `Arc`s. Every
//! request borrows them; nothing is reloaded or mutated after startup.

use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::classifier::{load_classifier, ModelMetrics, SharedClassifier};
use crate::config::AppConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::features::{derive, DerivedFeatures};
use crate::models::AthleteRecord;
use crate::risk::RiskBand;
use crate::schema::FeatureVector;
use crate::summary::DatasetSummarizer;
use crate::training;
use crate::validation::AthleteInput;

/// Outcome of one prediction
#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    /// Positive-class probability in [0, 1]
    pub probability: f64,
    /// `probability * 100`, unrounded
    pub percent: f64,
    pub band: RiskBand,
    /// The scored record, as validated
    pub record: AthleteRecord,
    pub derived: DerivedFeatures,
    #[serde(skip)]
    pub vector: FeatureVector,
}

/// Scores single athletes against the shared classifier
#[derive(Clone)]
pub struct Predictor {
    classifier: SharedClassifier,
}

impl Predictor {
    pub fn new(classifier: SharedClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &SharedClassifier {
        &self.classifier
    }

    /// Validate form input, then derive, vectorize, score and band it
    pub fn assess(&self, input: &AthleteInput) -> Result<RiskAssessment> {
        let record = input.clone().into_record()?;
        self.assess_record(&record)
    }

    /// Score a record that is already known to be in range
    pub fn assess_record(&self, record: &AthleteRecord) -> Result<RiskAssessment> {
        let derived = derive(record)?;
        let vector = FeatureVector::from_record(record, &derived);
        let probability = self.classifier.predict_probability(&vector)?;
        let percent = probability * 100.0;
        let band = RiskBand::from_percent(percent);

        debug!(probability, band = %band, "Athlete assessed");
        Ok(RiskAssessment {
            probability,
            percent,
            band,
            record: record.clone(),
            derived,
            vector,
        })
    }
}

/// Band counts and held-out style metrics over a whole labeled dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEvaluation {
    pub rows: usize,
    pub low: usize,
    pub moderate: usize,
    pub high: usize,
    pub metrics: ModelMetrics,
}

impl BatchEvaluation {
    pub fn count(&self, band: RiskBand) -> usize {
        match band {
            RiskBand::Low => self.low,
            RiskBand::Moderate => self.moderate,
            RiskBand::High => self.high,
        }
    }
}

/// Dataset and classifier shared by every command
#[derive(Clone)]
pub struct AppContext {
    dataset: Arc<Dataset>,
    predictor: Predictor,
}

impl AppContext {
    pub fn new(dataset: Arc<Dataset>, classifier: SharedClassifier) -> Self {
        Self {
            dataset,
            predictor: Predictor::new(classifier),
        }
    }

    /// Load the dataset and model named in the config; both must be present
    pub fn startup(config: &AppConfig) -> Result<Self> {
        let dataset = Dataset::load(&config.paths.dataset, config.data.load_options())?;
        let classifier = load_classifier(&config.paths.model)?;
        info!(
            rows = dataset.len(),
            schema = %classifier.schema().version,
            "Application context ready"
        );
        Ok(Self::new(Arc::new(dataset), classifier))
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    pub fn summarizer(&self) -> DatasetSummarizer<'_> {
        DatasetSummarizer::new(&self.dataset)
    }

    /// Score every labeled row in parallel and compare against the labels
    pub fn evaluate(&self) -> Result<BatchEvaluation> {
        let (vectors, labels) = self.dataset.labeled_vectors()?;
        let classifier = self.predictor.classifier();

        let probabilities = vectors
            .par_iter()
            .map(|vector| classifier.predict_probability(vector))
            .collect::<Result<Vec<f64>>>()?;

        let (mut low, mut moderate, mut high) = (0, 0, 0);
        for &probability in &probabilities {
            match RiskBand::from_probability(probability) {
                RiskBand::Low => low += 1,
                RiskBand::Moderate => moderate += 1,
                RiskBand::High => high += 1,
            }
        }

        let metrics = ModelMetrics {
            roc_auc: training::metrics::roc_auc(&labels, &probabilities),
            log_loss: training::metrics::log_loss(&labels, &probabilities),
            accuracy: training::metrics::accuracy(&labels, &probabilities, 0.5),
            train_rows: 0,
            test_rows: labels.len(),
            positive_rate: labels.iter().filter(|&&label| label == 1).count() as f64
                / labels.len().max(1) as f64,
        };

        info!(rows = labels.len(), roc_auc = ?metrics.roc_auc, "Batch evaluation complete");
        Ok(BatchEvaluation {
            rows: labels.len(),
            low,
            moderate,
            high,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::RiskClassifier;
    use crate::error::{InputError, RiskError};
    use crate::models::fixtures::reference_athlete;
    use crate::schema::FeatureSchema;

    /// Returns a fixed probability, or fatigue / 100 when none is set
    struct StubClassifier {
        probability: Option<f64>,
    }

    impl RiskClassifier for StubClassifier {
        fn schema(&self) -> &FeatureSchema {
            FeatureSchema::current()
        }

        fn predict_probability(&self, features: &FeatureVector) -> Result<f64> {
            Ok(self
                .probability
                .unwrap_or_else(|| features.get("fatigue_score").unwrap_or(0.0) / 100.0))
        }
    }

    fn predictor(probability: f64) -> Predictor {
        Predictor::new(Arc::new(StubClassifier {
            probability: Some(probability),
        }))
    }

    #[test]
    fn test_probability_bands() {
        let input = AthleteInput::default();
        assert_eq!(predictor(0.25).assess(&input).unwrap().band, RiskBand::Low);
        assert_eq!(
            predictor(0.45).assess(&input).unwrap().band,
            RiskBand::Moderate
        );
        assert_eq!(predictor(0.75).assess(&input).unwrap().band, RiskBand::High);
    }

    #[test]
    fn test_assessment_carries_derived_features() {
        let assessment = predictor(0.3).assess(&AthleteInput::default()).unwrap();
        assert_eq!(assessment.derived.rounded().bmi, 23.51);
        assert_eq!(assessment.derived.load_fatigue_index, None);
        assert_eq!(assessment.vector.get("acute_load"), Some(900.0));
        assert_eq!(assessment.band, RiskBand::Moderate);
    }

    #[test]
    fn test_invalid_input_is_rejected_before_scoring() {
        let input = AthleteInput {
            chronic_load: 0.0,
            ..AthleteInput::default()
        };
        let err = predictor(0.5).assess(&input).unwrap_err();
        assert!(matches!(
            err,
            RiskError::Input(InputError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_batch_evaluation() {
        let records = [(20.0, 0), (40.0, 0), (70.0, 1), (90.0, 1)]
            .into_iter()
            .map(|(fatigue, label)| AthleteRecord {
                fatigue_score: fatigue,
                injury_risk: Some(label),
                ..reference_athlete()
            })
            .collect();
        let dataset = Arc::new(Dataset::from_records(records).unwrap());
        let context = AppContext::new(
            dataset,
            Arc::new(StubClassifier { probability: None }),
        );

        let evaluation = context.evaluate().unwrap();
        assert_eq!(evaluation.rows, 4);
        assert_eq!(evaluation.count(RiskBand::Low), 1);
        assert_eq!(evaluation.count(RiskBand::Moderate), 1);
        assert_eq!(evaluation.count(RiskBand::High), 2);
        assert_eq!(evaluation.metrics.roc_auc, Some(1.0));
        assert_eq!(evaluation.metrics.accuracy, 100.0);
    }
}
