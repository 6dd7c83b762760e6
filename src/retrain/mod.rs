//! Retraining orchestrator
//!
//! Load → encode → train → save → swap. Any failure leaves the active model
//! untouched; a second retrain while one is running is rejected.

use crate::data::DatasetLoader;
use crate::error::{ChurnError, Result};
use crate::preprocessing::FeatureEncoder;
use crate::registry::{ActiveModel, ModelRegistry};
use crate::training::{Hyperparameters, ModelTrainer};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Result of a successful retrain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrainOutcome {
    pub model_id: String,
    pub version: u64,
    pub previous_version: Option<u64>,
    pub n_samples: usize,
    pub n_features: usize,
    pub trained_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

pub struct RetrainOrchestrator {
    loader: DatasetLoader,
    encoder: FeatureEncoder,
    trainer: ModelTrainer,
    registry: ModelRegistry,
    active: Arc<ActiveModel>,
    model_key: String,
    label_column: String,
    running: Mutex<()>,
}

impl RetrainOrchestrator {
    pub fn new(
        loader: DatasetLoader,
        encoder: FeatureEncoder,
        registry: ModelRegistry,
        active: Arc<ActiveModel>,
        model_key: impl Into<String>,
        label_column: impl Into<String>,
    ) -> Self {
        Self {
            loader,
            encoder,
            trainer: ModelTrainer::new(),
            registry,
            active,
            model_key: model_key.into(),
            label_column: label_column.into(),
            running: Mutex::new(()),
        }
    }

    pub fn active(&self) -> &Arc<ActiveModel> {
        &self.active
    }

    /// Train a new model from `source_id` and make it active.
    ///
    /// The new version is the active version plus one (1 when none is active).
    pub fn retrain(&self, params: &Hyperparameters, source_id: &str) -> Result<RetrainOutcome> {
        let _guard = self.running.try_lock().ok_or(ChurnError::RetrainInProgress)?;

        let start = Instant::now();
        info!(
            source = source_id,
            trees = params.tree_count,
            max_depth = ?params.max_depth,
            seed = params.random_seed,
            "Retraining started"
        );

        match self.run(params, source_id, start) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(
                    source = source_id,
                    error = %e,
                    active_version = ?self.active.version(),
                    "Retraining failed, keeping active model"
                );
                Err(e)
            }
        }
    }

    fn run(&self, params: &Hyperparameters, source_id: &str, start: Instant) -> Result<RetrainOutcome> {
        params.validate()?;

        let table = self.loader.load_split(source_id)?;
        let data = self.encoder.encode_labeled(&table, &self.label_column)?;

        let previous_version = self.active.version();
        let version = previous_version.map_or(1, |v| v + 1);
        let model = self.trainer.train_version(&data, params, version)?;

        self.registry.save(&model, &self.model_key)?;

        let outcome = RetrainOutcome {
            model_id: model.info.model_id.clone(),
            version,
            previous_version,
            n_samples: model.info.n_samples,
            n_features: model.info.n_features,
            trained_at: model.info.trained_at,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        self.active.replace(model);

        info!(
            model_id = %outcome.model_id,
            version,
            elapsed_ms = outcome.elapsed_ms,
            "Retraining finished"
        );
        Ok(outcome)
    }
}
