//! Application state management

use crate::config::ServiceConfig;
use crate::data::{CsvSource, DatasetLoader, TableSource};
use crate::inference::PredictionService;
use crate::preprocessing::FeatureEncoder;
use crate::registry::{ActiveModel, BlobStore, FsBlobStore, ModelRegistry};
use crate::retrain::RetrainOrchestrator;
use std::sync::Arc;
use tracing::{info, warn};

/// Application state shared across handlers
pub struct AppState {
    pub config: ServiceConfig,
    pub predictions: PredictionService,
    pub retrainer: Arc<RetrainOrchestrator>,
    pub registry: ModelRegistry,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        source: Arc<dyn TableSource>,
        store: Arc<dyn BlobStore>,
    ) -> Self {
        let active = Arc::new(ActiveModel::new());
        let registry = ModelRegistry::new(store);
        let retrainer = RetrainOrchestrator::new(
            DatasetLoader::new(source),
            FeatureEncoder::new(config.encoder.clone()),
            registry.clone(),
            active.clone(),
            config.model_path.clone(),
            config.target.clone(),
        );

        Self {
            predictions: PredictionService::new(active),
            retrainer: Arc::new(retrainer),
            registry,
            config,
            started_at: chrono::Utc::now(),
        }
    }

    /// State backed by CSV files and a filesystem model store
    pub fn from_config(config: ServiceConfig) -> Self {
        Self::new(config, Arc::new(CsvSource::new()), Arc::new(FsBlobStore::default()))
    }

    pub fn active(&self) -> &Arc<ActiveModel> {
        self.predictions.active()
    }

    /// Try to activate the stored model. On failure the service keeps running
    /// without a model and predictions answer 503.
    pub fn load_model(&self) -> bool {
        match self.registry.load(&self.config.model_path) {
            Ok(model) => {
                info!(key = %self.config.model_path, version = model.version(), "Startup model loaded");
                self.active().replace(model);
                true
            }
            Err(e) => {
                warn!(
                    key = %self.config.model_path,
                    error = %e,
                    "No model loaded at startup; train one via /api/retrain"
                );
                false
            }
        }
    }
}
