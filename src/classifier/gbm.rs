//! Gradient-boosted tree ensemble
//!
//! Binary classifier stored as a JSON artifact: a base log-odds score plus a
//! list of regression trees whose leaf values are already shrunk by the
//! learning rate. The positive-class probability is
//! `sigmoid(base_score + sum of leaf values)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

use super::{checked_probability, RiskClassifier};
use crate::error::{ModelError, Result};
use crate::schema::{FeatureSchema, FeatureVector};

/// Artifact layout revision
pub const FORMAT_VERSION: u32 = 1;

/// Boosting hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbmParams {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Shrinkage applied to every leaf
    pub learning_rate: f64,
    /// Fraction of rows sampled per tree
    pub subsample: f64,
    /// Fraction of features sampled per tree
    pub colsample_bytree: f64,
    /// Minimum hessian sum in a child
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// Minimum gain required to split
    pub gamma: f64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            max_depth: 5,
            learning_rate: 0.05,
            subsample: 0.8,
            colsample_bytree: 0.8,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            gamma: 0.0,
        }
    }
}

impl GbmParams {
    pub fn validate(&self) -> std::result::Result<(), ModelError> {
        let invalid = |reason: String| Err(ModelError::Training { reason });
        if self.n_estimators == 0 {
            return invalid("n_estimators must be at least 1".to_string());
        }
        if self.max_depth == 0 {
            return invalid("max_depth must be at least 1".to_string());
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return invalid(format!("learning_rate must be in (0, 1], got {}", self.learning_rate));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return invalid(format!("subsample must be in (0, 1], got {}", self.subsample));
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return invalid(format!(
                "colsample_bytree must be in (0, 1], got {}",
                self.colsample_bytree
            ));
        }
        if self.reg_lambda < 0.0 || self.min_child_weight < 0.0 || self.gamma < 0.0 {
            return invalid("regularization terms must be non-negative".to_string());
        }
        Ok(())
    }
}

/// Held-out evaluation stored alongside the trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub roc_auc: Option<f64>,
    pub log_loss: f64,
    /// Accuracy at a 0.5 threshold, in percent
    pub accuracy: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Positive label share of the training split
    pub positive_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TreeNode {
    /// `x[feature] < threshold` goes left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Regression tree stored as a flat node list, root first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Tree consisting of a single leaf
    pub fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![TreeNode::Leaf { value }],
        }
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Longest root-to-leaf path, in splits
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], index: usize) -> usize {
            match &nodes[index] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
            }
        }
        walk(&self.nodes, 0)
    }

    /// Structural checks so `predict` cannot index out of bounds or loop.
    ///
    /// Children are always stored after their parent.
    fn validate(&self, n_features: usize) -> std::result::Result<(), ModelError> {
        let corrupted = |reason: String| Err(ModelError::Corrupted { reason });
        if self.nodes.is_empty() {
            return corrupted("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { value } if !value.is_finite() => {
                    return corrupted(format!("leaf {} has a non-finite value", index));
                }
                TreeNode::Leaf { .. } => {}
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return corrupted(format!(
                            "node {} splits on feature {} of {}",
                            index, feature, n_features
                        ));
                    }
                    if !threshold.is_finite() {
                        return corrupted(format!("node {} has a non-finite threshold", index));
                    }
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return corrupted(format!(
                                "node {} points to invalid child {}",
                                index, child
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Trained gradient-boosted classifier artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedModel {
    pub format_version: u32,
    pub schema: FeatureSchema,
    /// Initial log-odds
    pub base_score: f64,
    pub trees: Vec<RegressionTree>,
    pub params: GbmParams,
    pub metrics: Option<ModelMetrics>,
    pub trained_at: DateTime<Utc>,
}

impl GradientBoostedModel {
    /// Model for the current schema
    pub fn new(base_score: f64, trees: Vec<RegressionTree>, params: GbmParams) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            schema: FeatureSchema::current().clone(),
            base_score,
            trees,
            params,
            metrics: None,
            trained_at: Utc::now(),
        }
    }

    /// Read and verify an artifact
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ModelError::ArtifactNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        let json = fs::read_to_string(path)?;
        let model = Self::from_json(&json)?;

        info!(
            path = %path.display(),
            trees = model.trees.len(),
            schema = %model.schema.version,
            roc_auc = ?model.metrics.as_ref().and_then(|m| m.roc_auc),
            "Model artifact loaded"
        );
        Ok(model)
    }

    /// Parse and verify an artifact held in memory
    pub fn from_json(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json).map_err(|err| ModelError::Corrupted {
            reason: err.to_string(),
        })?;
        model.verify()?;
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| {
            ModelError::Corrupted {
                reason: err.to_string(),
            }
            .into()
        })
    }

    /// Write the artifact, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), trees = self.trees.len(), "Model artifact written");
        Ok(())
    }

    /// Format, schema and tree structure checks
    pub fn verify(&self) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(ModelError::UnsupportedFormat {
                version: self.format_version,
            }
            .into());
        }
        FeatureSchema::current().verify(&self.schema)?;
        if !self.base_score.is_finite() {
            return Err(ModelError::Corrupted {
                reason: "base score is not finite".to_string(),
            }
            .into());
        }
        for tree in &self.trees {
            tree.validate(self.schema.len())?;
        }
        Ok(())
    }

    /// Raw log-odds for one row
    pub fn margin(&self, features: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|tree| tree.predict(features)).sum::<f64>()
    }

    /// Positive-class probability for one row of raw values
    pub fn probability(&self, features: &[f64]) -> f64 {
        sigmoid(self.margin(features))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of splits per feature, most used first
    pub fn feature_importance(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for tree in &self.trees {
            for node in &tree.nodes {
                if let TreeNode::Split { feature, .. } = node {
                    *counts.entry(*feature).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(feature, count)| (self.schema.features[feature].clone(), count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }
}

impl RiskClassifier for GradientBoostedModel {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn predict_probability(&self, features: &FeatureVector) -> Result<f64> {
        if features.len() != self.schema.len() {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.schema.len(),
                actual: features.len(),
            }
            .into());
        }
        checked_probability(self.probability(features.as_slice()))
    }
}

pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

/// Inverse of [`sigmoid`], clamped away from 0 and 1
pub fn logit(probability: f64) -> f64 {
    let p = probability.clamp(1e-6, 1.0 - 1e-6);
    (p / (1.0 - p)).ln()
}
