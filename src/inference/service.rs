//! Prediction service over the active model

use crate::data::RawValue;
use crate::error::Result;
use crate::registry::ActiveModel;
use crate::training::ChurnModel;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Index into the model's class labels
    pub class_index: usize,
    /// Raw label value, e.g. "true"
    pub label: String,
    /// Display name, e.g. "Positive"
    pub display: String,
    /// Probability of the predicted class
    pub probability: f64,
    pub model_id: String,
    pub model_version: u64,
}

/// Feature name with its importance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub name: String,
    pub importance: f64,
}

/// Read-only predictions against whatever model is active at call time
#[derive(Debug, Clone)]
pub struct PredictionService {
    active: Arc<ActiveModel>,
}

impl PredictionService {
    pub fn new(active: Arc<ActiveModel>) -> Self {
        Self { active }
    }

    pub fn active(&self) -> &Arc<ActiveModel> {
        &self.active
    }

    /// Predict from an already encoded feature vector in schema order
    pub fn predict(&self, features: &[f64]) -> Result<Prediction> {
        let model = self.active.require()?;
        Self::predict_with(&model, features)
    }

    /// Encode a named raw record with the model's encoding plan, then predict
    pub fn predict_record(&self, fields: &HashMap<String, RawValue>) -> Result<Prediction> {
        let model = self.active.require()?;
        let features = model.schema.encode_record(fields)?;
        Self::predict_with(&model, &features)
    }

    /// The `k` most important features, highest first. Empty when the active
    /// predictor cannot rank features.
    pub fn top_k_features(&self, k: usize) -> Result<Vec<FeatureImportance>> {
        let model = self.active.require()?;
        Ok(model
            .ranked_features()
            .unwrap_or_default()
            .into_iter()
            .take(k)
            .map(|(name, importance)| FeatureImportance { name, importance })
            .collect())
    }

    fn predict_with(model: &ChurnModel, features: &[f64]) -> Result<Prediction> {
        model.schema.validate_vector(features)?;

        let x = Array2::from_shape_vec((1, features.len()), features.to_vec())?;
        let proba = model.predictor().predict_proba(&x)?;
        let (class_index, probability) = proba
            .row(0)
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, &p)| if p > best.1 { (i, p) } else { best });

        let prediction = Prediction {
            class_index,
            label: model.labels.value(class_index).unwrap_or_default().to_string(),
            display: model.labels.display_name(class_index),
            probability,
            model_id: model.info.model_id.clone(),
            model_version: model.version(),
        };
        debug!(
            class = %prediction.display,
            probability,
            version = prediction.model_version,
            "Prediction"
        );
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RawColumn, RawTable};
    use crate::error::ChurnError;
    use crate::preprocessing::FeatureEncoder;
    use crate::training::{Hyperparameters, ModelTrainer};

    fn service() -> PredictionService {
        let table = RawTable::new(vec![
            RawColumn::numeric("minutes", vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]),
            RawColumn::text("plan", vec!["basic", "gold", "silver", "basic", "gold", "silver"]),
            RawColumn::boolean("Churn", vec![false, false, false, true, true, true]),
        ])
        .unwrap();
        let data = FeatureEncoder::default().encode_labeled(&table, "Churn").unwrap();
        let model = ModelTrainer::new()
            .train(&data, &Hyperparameters::default().with_tree_count(10))
            .unwrap();
        PredictionService::new(Arc::new(ActiveModel::with_model(model)))
    }

    #[test]
    fn test_predict_vector() {
        // columns: minutes, plan_gold, plan_silver
        let service = service();
        let high = service.predict(&[11.5, 1.0, 0.0]).unwrap();
        assert_eq!(high.display, "Positive");
        assert_eq!(high.label, "true");
        assert!(high.probability > 0.5);

        let low = service.predict(&[1.5, 0.0, 0.0]).unwrap();
        assert_eq!(low.display, "Negative");
        assert_eq!(low.model_version, 1);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let service = service();
        for features in [vec![], vec![1.0], vec![1.0, 0.0, 0.0, 0.0]] {
            assert!(matches!(
                service.predict(&features),
                Err(ChurnError::FeatureCountMismatch { expected: 3, .. })
            ));
        }
    }

    #[test]
    fn test_malformed_indicators_rejected() {
        let service = service();
        assert!(matches!(
            service.predict(&[1.0, 1.0, 1.0]),
            Err(ChurnError::InvalidFeatureValue { .. })
        ));
        assert!(matches!(
            service.predict(&[1.0, 0.5, 0.0]),
            Err(ChurnError::InvalidFeatureValue { .. })
        ));
        assert!(matches!(
            service.predict(&[f64::NAN, 0.0, 0.0]),
            Err(ChurnError::InvalidFeatureValue { .. })
        ));
    }

    #[test]
    fn test_predict_record() {
        let service = service();
        let mut fields = HashMap::new();
        fields.insert("minutes".to_string(), RawValue::Number(12.0));
        fields.insert("plan".to_string(), RawValue::Text("silver".to_string()));
        assert_eq!(service.predict_record(&fields).unwrap().display, "Positive");

        fields.insert("plan".to_string(), RawValue::Text("platinum".to_string()));
        assert!(matches!(
            service.predict_record(&fields),
            Err(ChurnError::UnseenCategory { .. })
        ));

        fields.remove("minutes");
        fields.insert("plan".to_string(), RawValue::Text("gold".to_string()));
        assert!(matches!(
            service.predict_record(&fields),
            Err(ChurnError::MissingFeature(name)) if name == "minutes"
        ));
    }

    #[test]
    fn test_top_k_features() {
        let service = service();
        let top = service.top_k_features(2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "minutes");
        assert!(top[0].importance >= top[1].importance);
    }

    #[test]
    fn test_no_model_loaded() {
        let service = PredictionService::new(Arc::new(ActiveModel::new()));
        assert!(matches!(service.predict(&[1.0]), Err(ChurnError::ModelNotLoaded)));
        assert!(matches!(service.top_k_features(3), Err(ChurnError::ModelNotLoaded)));
    }
}
