//! Trained model and predictor traits

use super::config::Hyperparameters;
use super::labels::ClassLabels;
use super::random_forest::RandomForest;
use crate::error::{ChurnError, Result};
use crate::preprocessing::FeatureSchema;
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// A fitted classifier over encoded feature matrices
pub trait Predictor: Send + Sync {
    /// Class index per row
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>>;

    /// Class probabilities per row
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Width of the matrices this predictor accepts
    fn n_features(&self) -> usize;

    /// Capability check for predictors that can rank their inputs
    fn as_importance_ranked(&self) -> Option<&dyn ImportanceRanked> {
        None
    }
}

/// Predictors exposing per-feature importance scores
pub trait ImportanceRanked {
    /// One non-negative score per feature column, summing to 1 when any split was made
    fn feature_importances(&self) -> Array1<f64>;
}

impl Predictor for RandomForest {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        RandomForest::predict(self, x)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        RandomForest::predict_proba(self, x)
    }

    fn n_features(&self) -> usize {
        RandomForest::n_features(self)
    }

    fn as_importance_ranked(&self) -> Option<&dyn ImportanceRanked> {
        Some(self)
    }
}

impl ImportanceRanked for RandomForest {
    fn feature_importances(&self) -> Array1<f64> {
        RandomForest::feature_importances(self)
            .cloned()
            .unwrap_or_else(|| Array1::zeros(self.n_features()))
    }
}

/// Serializable predictor variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedPredictor {
    RandomForest(RandomForest),
}

impl TrainedPredictor {
    pub fn as_predictor(&self) -> &dyn Predictor {
        match self {
            TrainedPredictor::RandomForest(forest) => forest,
        }
    }

    pub fn n_classes(&self) -> usize {
        match self {
            TrainedPredictor::RandomForest(forest) => forest.n_classes(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            TrainedPredictor::RandomForest(forest) => forest.validate(),
        }
    }
}

/// Model metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_id: String,
    pub version: u64,
    pub trained_at: DateTime<Utc>,
    pub n_samples: usize,
    pub n_features: usize,
    pub n_classes: usize,
}

/// A trained predictor bundled with everything needed to use it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnModel {
    pub predictor: TrainedPredictor,
    pub schema: FeatureSchema,
    pub hyperparameters: Hyperparameters,
    pub labels: ClassLabels,
    pub info: ModelInfo,
}

impl ChurnModel {
    pub fn predictor(&self) -> &dyn Predictor {
        self.predictor.as_predictor()
    }

    pub fn version(&self) -> u64 {
        self.info.version
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.info.version = version;
        self
    }

    /// Check that the parts of a deserialized model agree with each other
    pub fn validate(&self) -> Result<()> {
        self.predictor.validate()?;
        let width = self.predictor().n_features();
        if width != self.schema.len() {
            return Err(ChurnError::CorruptArtifact(format!(
                "predictor expects {} features but schema lists {}",
                width,
                self.schema.len()
            )));
        }
        if self.labels.len() < 2 {
            return Err(ChurnError::CorruptArtifact(format!(
                "model has {} class(es), need at least 2",
                self.labels.len()
            )));
        }
        if self.predictor.n_classes() != self.labels.len() {
            return Err(ChurnError::CorruptArtifact(format!(
                "predictor has {} classes but {} labels are recorded",
                self.predictor.n_classes(),
                self.labels.len()
            )));
        }
        Ok(())
    }

    /// Feature names with their importance, most important first.
    /// `None` when the predictor cannot rank features.
    pub fn ranked_features(&self) -> Option<Vec<(String, f64)>> {
        let importances = self.predictor().as_importance_ranked()?.feature_importances();
        let mut ranked: Vec<(String, f64)> = self
            .schema
            .columns()
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Some(ranked)
    }
}
