//! HTTP request handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::data::RawValue;
use crate::inference::{FeatureImportance, Prediction};
use crate::retrain::RetrainOutcome;
use crate::training::{ChurnModel, Hyperparameters};

use super::error::{Result, ServerError};
use super::state::AppState;

// ============================================================================
// Prediction Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub features: Vec<f64>,
}

/// Predict from an encoded feature vector in schema order
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<Prediction>> {
    let prediction = state.predictions.predict(&request.features)?;
    Ok(Json(prediction))
}

#[derive(Debug, Deserialize)]
pub struct PredictRecordRequest {
    pub fields: HashMap<String, RawValue>,
}

/// Predict from named raw fields, encoded with the model's own plan
pub async fn predict_record(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRecordRequest>,
) -> Result<Json<Prediction>> {
    let prediction = state.predictions.predict_record(&request.fields)?;
    Ok(Json(prediction))
}

#[derive(Debug, Deserialize)]
pub struct TopFeaturesQuery {
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TopFeaturesResponse {
    pub model_version: Option<u64>,
    pub features: Vec<FeatureImportance>,
}

pub async fn top_features(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopFeaturesQuery>,
) -> Result<Json<TopFeaturesResponse>> {
    let k = query.k.unwrap_or(4);
    let features = state.predictions.top_k_features(k)?;
    Ok(Json(TopFeaturesResponse {
        model_version: state.active().version(),
        features,
    }))
}

// ============================================================================
// Retraining
// ============================================================================

/// Retrain body; field names follow the forest's conventional parameter names.
///
/// Training always reads the configured training data; unknown fields such as
/// a data path are rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrainRequest {
    pub n_estimators: Option<usize>,
    pub max_depth: Option<usize>,
    pub random_state: Option<u64>,
}

impl RetrainRequest {
    fn hyperparameters(&self, defaults: &Hyperparameters) -> Hyperparameters {
        Hyperparameters {
            tree_count: self.n_estimators.unwrap_or(defaults.tree_count),
            max_depth: self.max_depth.or(defaults.max_depth),
            random_seed: self.random_state.unwrap_or(defaults.random_seed),
        }
    }
}

pub async fn retrain(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RetrainRequest>,
) -> Result<Json<RetrainOutcome>> {
    let params = request.hyperparameters(&state.config.hyperparameters);
    let source = state.config.train_data.clone();
    info!(source = %source, trees = params.tree_count, "Retrain requested");

    let retrainer = Arc::clone(&state.retrainer);
    let outcome = tokio::task::spawn_blocking(move || retrainer.retrain(&params, &source))
        .await
        .map_err(|e| ServerError::Internal(format!("retrain task failed: {}", e)))??;

    Ok(Json(outcome))
}

// ============================================================================
// Model & System
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ModelSummary {
    pub model_id: String,
    pub version: u64,
    pub trained_at: String,
    pub n_samples: usize,
    pub n_features: usize,
    pub classes: Vec<String>,
    pub hyperparameters: Hyperparameters,
    pub features: Vec<String>,
}

impl From<&ChurnModel> for ModelSummary {
    fn from(model: &ChurnModel) -> Self {
        Self {
            model_id: model.info.model_id.clone(),
            version: model.info.version,
            trained_at: model.info.trained_at.to_rfc3339(),
            n_samples: model.info.n_samples,
            n_features: model.info.n_features,
            classes: (0..model.labels.len()).map(|i| model.labels.display_name(i)).collect(),
            hyperparameters: model.hyperparameters.clone(),
            features: model.schema.columns().to_vec(),
        }
    }
}

pub async fn get_model(State(state): State<Arc<AppState>>) -> Result<Json<ModelSummary>> {
    let model = state.active().require()?;
    Ok(Json(ModelSummary::from(model.as_ref())))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.active().is_loaded(),
        "model_version": state.active().version(),
        "uptime_secs": uptime.num_seconds(),
    }))
}
