//! Inference
//!
//! Validates encoded vectors (or encodes named records) against the active
//! model's schema and returns the predicted class with its probability.

mod service;

pub use service::{FeatureImportance, Prediction, PredictionService};
