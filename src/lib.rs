//! Churn Service - customer churn model lifecycle
//!
//! Loads labeled customer records, encodes them into numeric matrices, trains
//! a random forest classifier, evaluates it on a held-out split, persists it,
//! serves predictions and retrains on demand.
//!
//! # Modules
//!
//! ## Pipeline stages
//! - [`data`] - Dataset loading and incomplete-row removal
//! - [`preprocessing`] - Dummy encoding and schema reconciliation
//! - [`training`] - Random forest classifier and model trainer
//! - [`evaluation`] - Accuracy, precision, recall and F1 reports
//! - [`registry`] - Model artifacts and the active model slot
//! - [`inference`] - Prediction service
//! - [`retrain`] - Retraining orchestrator
//! - [`pipeline`] - Offline prepare/train/evaluate runs
//!
//! ## Services
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface

pub mod error;
pub mod config;

pub mod data;
pub mod preprocessing;
pub mod training;
pub mod evaluation;
pub mod registry;
pub mod inference;
pub mod retrain;
pub mod pipeline;

pub mod server;
pub mod cli;

pub use error::{ChurnError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::ServiceConfig;
    pub use crate::data::{CsvSource, DatasetLoader, MemorySource, RawTable, RawValue, TableSource};
    pub use crate::error::{ChurnError, Result};
    pub use crate::evaluation::{EvaluationReport, ModelEvaluator};
    pub use crate::inference::{Prediction, PredictionService};
    pub use crate::pipeline::ChurnPipeline;
    pub use crate::preprocessing::{EncodedDataset, EncoderConfig, FeatureEncoder, FeatureSchema};
    pub use crate::registry::{ActiveModel, BlobStore, FsBlobStore, MemoryBlobStore, ModelRegistry, PreparedData};
    pub use crate::retrain::RetrainOrchestrator;
    pub use crate::training::{ChurnModel, Hyperparameters, ModelTrainer, Predictor};
}
