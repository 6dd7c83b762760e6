//! Model persistence
//!
//! Artifacts go through a [`BlobStore`] wrapped in a versioned envelope; the
//! [`ActiveModel`] slot holds the model currently used for predictions.

mod active;
mod artifact;
mod store;

pub use active::ActiveModel;
pub use artifact::{FORMAT_VERSION, MAGIC};
pub use store::{BlobStore, FsBlobStore, MemoryBlobStore};

use crate::error::{ChurnError, Result};
use crate::preprocessing::EncodedDataset;
use crate::training::ChurnModel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Reconciled train and eval encodings, persisted between `prepare` and `evaluate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedData {
    pub train: EncodedDataset,
    pub eval: EncodedDataset,
}

impl PreparedData {
    /// Both sides must share one schema
    pub fn validate(&self) -> Result<()> {
        self.train.schema.ensure_compatible(&self.eval.schema)
    }
}

/// Saves and loads models and prepared data
#[derive(Clone)]
pub struct ModelRegistry {
    store: Arc<dyn BlobStore>,
}

impl ModelRegistry {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Serialize `model` under `key`, overwriting any previous artifact
    pub fn save(&self, model: &ChurnModel, key: &str) -> Result<()> {
        let bytes = artifact::encode(artifact::MODEL_FORMAT, model)?;
        self.store.write(key, &bytes)?;
        info!(
            key,
            model_id = %model.info.model_id,
            version = model.version(),
            bytes = bytes.len(),
            "Saved model"
        );
        Ok(())
    }

    /// Load and validate the model stored under `key`
    pub fn load(&self, key: &str) -> Result<ChurnModel> {
        let bytes = self.store.read(key)?;
        let model: ChurnModel = artifact::decode(artifact::MODEL_FORMAT, &bytes)?;
        model.validate()?;
        info!(
            key,
            model_id = %model.info.model_id,
            version = model.version(),
            features = model.schema.len(),
            "Loaded model"
        );
        Ok(model)
    }

    pub fn save_prepared(&self, data: &PreparedData, key: &str) -> Result<()> {
        let bytes = artifact::encode(artifact::PREPARED_FORMAT, data)?;
        self.store.write(key, &bytes)?;
        info!(
            key,
            train_rows = data.train.n_rows(),
            eval_rows = data.eval.n_rows(),
            "Saved prepared data"
        );
        Ok(())
    }

    pub fn load_prepared(&self, key: &str) -> Result<PreparedData> {
        let bytes = self.store.read(key)?;
        let data: PreparedData = artifact::decode(artifact::PREPARED_FORMAT, &bytes)?;
        data.validate()
            .map_err(|e| ChurnError::CorruptArtifact(format!("prepared data: {}", e)))?;
        Ok(data)
    }
}
