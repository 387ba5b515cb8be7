//! Model fitting: stratified split, boosting rounds and held-out evaluation

use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classifier::gbm::{logit, sigmoid};
use crate::classifier::{GbmParams, GradientBoostedModel, ModelMetrics, RiskClassifier};
use crate::dataset::Dataset;
use crate::error::{ModelError, Result};
use crate::schema::{FeatureVector, FEATURE_COUNT};

pub mod metrics;
pub mod split;
mod tree;

pub use split::{stratified_split, SplitConfig, TrainTestSplit};

use tree::TreeBuilder;

/// Hessians are floored here so confident rows keep a usable Newton step
const MIN_HESSIAN: f64 = 1e-16;

/// Training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Draw a progress bar on stderr while boosting
    pub show_progress: bool,
    pub split: SplitConfig,
    pub params: GbmParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            show_progress: true,
            split: SplitConfig::default(),
            params: GbmParams::default(),
        }
    }
}

/// Gradient-boosting trainer for the injury classifier
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Split the labeled dataset, fit on the training side and score the held-out side
    pub fn train(&self, dataset: &Dataset) -> Result<GradientBoostedModel> {
        self.config.params.validate()?;
        let (vectors, labels) = dataset.labeled_vectors()?;

        let mut rng = StdRng::seed_from_u64(self.config.split.seed);
        let split = stratified_split(&labels, &self.config.split, &mut rng)?;
        info!(
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            seed = self.config.split.seed,
            "Stratified split ready"
        );

        let pick = |rows: &[usize]| -> (Vec<FeatureVector>, Vec<u8>) {
            rows.iter()
                .map(|&row| (vectors[row].clone(), labels[row]))
                .unzip()
        };
        let (train_x, train_y) = pick(&split.train);
        let (test_x, test_y) = pick(&split.test);

        let mut model = self.fit(&train_x, &train_y, &mut rng)?;
        let mut metrics = evaluate(&model, &test_x, &test_y)?;
        metrics.train_rows = train_y.len();
        metrics.positive_rate = positive_rate(&train_y);

        info!(
            roc_auc = ?metrics.roc_auc,
            log_loss = metrics.log_loss,
            accuracy = metrics.accuracy,
            "Held-out evaluation complete"
        );
        model.metrics = Some(metrics);
        Ok(model)
    }

    /// Fit a model on every given row
    pub fn fit(
        &self,
        vectors: &[FeatureVector],
        labels: &[u8],
        rng: &mut StdRng,
    ) -> Result<GradientBoostedModel> {
        let params = &self.config.params;
        params.validate()?;
        if vectors.is_empty() || vectors.len() != labels.len() {
            return Err(ModelError::Training {
                reason: format!(
                    "need matching, non-empty features and labels ({} rows, {} labels)",
                    vectors.len(),
                    labels.len()
                ),
            }
            .into());
        }

        let n_rows = vectors.len();
        let columns: Vec<Vec<f64>> = (0..FEATURE_COUNT)
            .map(|feature| vectors.iter().map(|v| v.as_slice()[feature]).collect())
            .collect();
        let targets: Vec<f64> = labels.iter().map(|&label| f64::from(label)).collect();

        let base_score = logit(positive_rate(labels));
        let mut margins = vec![base_score; n_rows];
        let mut trees = Vec::with_capacity(params.n_estimators);

        let rows_per_tree = sample_size(n_rows, params.subsample);
        let features_per_tree = sample_size(FEATURE_COUNT, params.colsample_bytree);

        let progress = self.progress_bar(params.n_estimators as u64);

        for round in 0..params.n_estimators {
            let (gradients, hessians): (Vec<f64>, Vec<f64>) = margins
                .iter()
                .zip(targets.iter())
                .map(|(&margin, &y)| {
                    let p = sigmoid(margin);
                    (p - y, (p * (1.0 - p)).max(MIN_HESSIAN))
                })
                .unzip();

            let mut rows = index::sample(rng, n_rows, rows_per_tree).into_vec();
            rows.sort_unstable();
            let mut features = index::sample(rng, FEATURE_COUNT, features_per_tree).into_vec();
            features.sort_unstable();

            let builder = TreeBuilder {
                columns: &columns,
                gradients: &gradients,
                hessians: &hessians,
                params,
                features: &features,
            };
            let tree = builder.build(&rows);

            for (margin, vector) in margins.iter_mut().zip(vectors.iter()) {
                *margin += tree.predict(vector.as_slice());
            }
            trees.push(tree);

            if (round + 1) % 50 == 0 {
                let probabilities: Vec<f64> = margins.iter().map(|&m| sigmoid(m)).collect();
                debug!(
                    round = round + 1,
                    train_log_loss = metrics::log_loss(labels, &probabilities),
                    "Boosting progress"
                );
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!(
            trees = trees.len(),
            rows = n_rows,
            base_score,
            "Gradient boosting finished"
        );
        Ok(GradientBoostedModel::new(base_score, trees, params.clone()))
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} trees ({eta})")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar
    }
}

/// Score a classifier against labeled rows
pub fn evaluate(
    classifier: &dyn RiskClassifier,
    vectors: &[FeatureVector],
    labels: &[u8],
) -> Result<ModelMetrics> {
    let probabilities = vectors
        .iter()
        .map(|vector| classifier.predict_probability(vector))
        .collect::<Result<Vec<f64>>>()?;

    Ok(ModelMetrics {
        roc_auc: metrics::roc_auc(labels, &probabilities),
        log_loss: metrics::log_loss(labels, &probabilities),
        accuracy: metrics::accuracy(labels, &probabilities, 0.5),
        train_rows: 0,
        test_rows: labels.len(),
        positive_rate: positive_rate(labels),
    })
}

fn positive_rate(labels: &[u8]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    labels.iter().filter(|&&label| label == 1).count() as f64 / labels.len() as f64
}

fn sample_size(total: usize, fraction: f64) -> usize {
    ((total as f64 * fraction).round() as usize).clamp(1, total)
}
