//! The process-wide active model slot

use crate::error::{ChurnError, Result};
use crate::training::ChurnModel;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// Holds at most one model. Readers get a cloned `Arc` and release the lock
/// before predicting, so a swap never disturbs an in-flight prediction.
#[derive(Debug, Default)]
pub struct ActiveModel {
    slot: RwLock<Option<Arc<ChurnModel>>>,
}

impl ActiveModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: ChurnModel) -> Self {
        Self {
            slot: RwLock::new(Some(Arc::new(model))),
        }
    }

    pub fn current(&self) -> Option<Arc<ChurnModel>> {
        self.slot.read().clone()
    }

    /// Current model or `ModelNotLoaded`
    pub fn require(&self) -> Result<Arc<ChurnModel>> {
        self.current().ok_or(ChurnError::ModelNotLoaded)
    }

    pub fn version(&self) -> Option<u64> {
        self.slot.read().as_ref().map(|m| m.version())
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Install `model`, returning the one it replaced
    pub fn replace(&self, model: ChurnModel) -> Option<Arc<ChurnModel>> {
        let model = Arc::new(model);
        let (model_id, version) = (model.info.model_id.clone(), model.version());
        let previous = self.slot.write().replace(model);
        info!(
            model_id = %model_id,
            version,
            previous_version = ?previous.as_ref().map(|m| m.version()),
            "Activated model"
        );
        previous
    }
}
