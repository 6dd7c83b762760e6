//! Fits a churn model on an encoded dataset

use super::config::Hyperparameters;
use super::labels::ClassLabels;
use super::model::{ChurnModel, ModelInfo, TrainedPredictor};
use super::random_forest::RandomForest;
use crate::error::{ChurnError, Result};
use crate::preprocessing::EncodedDataset;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct ModelTrainer;

impl ModelTrainer {
    pub fn new() -> Self {
        Self
    }

    /// Train a version 1 model
    pub fn train(&self, data: &EncodedDataset, params: &Hyperparameters) -> Result<ChurnModel> {
        self.train_version(data, params, 1)
    }

    /// Train a model tagged with `version`. The model's schema is exactly the
    /// dataset's column list.
    pub fn train_version(
        &self,
        data: &EncodedDataset,
        params: &Hyperparameters,
        version: u64,
    ) -> Result<ChurnModel> {
        params.validate()?;

        let label_vector = data
            .labels
            .as_ref()
            .ok_or_else(|| ChurnError::TrainingFailure("dataset has no labels".to_string()))?;

        let (n_rows, n_features) = (data.n_rows(), data.n_features());
        if n_rows == 0 {
            return Err(ChurnError::TrainingFailure("dataset has no rows".to_string()));
        }
        if n_features == 0 {
            return Err(ChurnError::TrainingFailure("dataset has no feature columns".to_string()));
        }
        if label_vector.len() != n_rows {
            return Err(ChurnError::TrainingFailure(format!(
                "{} labels for {} rows",
                label_vector.len(),
                n_rows
            )));
        }
        if let Some(((row, col), value)) = data.x.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(ChurnError::TrainingFailure(format!(
                "non-finite value {} at row {}, column '{}'",
                value,
                row,
                data.schema.columns().get(col).map(String::as_str).unwrap_or("?")
            )));
        }

        let labels = ClassLabels::fit(label_vector)?;
        if labels.len() < 2 {
            return Err(ChurnError::TrainingFailure(format!(
                "label column '{}' has a single class",
                label_vector.name
            )));
        }
        let y = labels.encode(label_vector)?;

        let start = Instant::now();
        let mut forest = RandomForest::new(params.tree_count)
            .with_max_depth(params.max_depth)
            .with_random_state(params.random_seed);
        forest.fit(&data.x, &y, labels.len())?;

        let model = ChurnModel {
            predictor: TrainedPredictor::RandomForest(forest),
            schema: data.schema.clone(),
            hyperparameters: params.clone(),
            info: ModelInfo {
                model_id: Uuid::new_v4().to_string()[..8].to_string(),
                version,
                trained_at: chrono::Utc::now(),
                n_samples: n_rows,
                n_features,
                n_classes: labels.len(),
            },
            labels,
        };

        info!(
            model_id = %model.info.model_id,
            version,
            rows = n_rows,
            features = n_features,
            trees = params.tree_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Trained model"
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RawColumn, RawTable};
    use crate::preprocessing::FeatureEncoder;

    fn dataset(churn: Vec<bool>) -> EncodedDataset {
        let n = churn.len();
        let table = RawTable::new(vec![
            RawColumn::numeric("minutes", (0..n).map(|i| i as f64 * 10.0).collect()),
            RawColumn::text("plan", (0..n).map(|i| if i % 2 == 0 { "yes" } else { "no" }).collect()),
            RawColumn::boolean("Churn", churn),
        ])
        .unwrap();
        FeatureEncoder::default().encode_labeled(&table, "Churn").unwrap()
    }

    #[test]
    fn test_train_records_schema_and_metadata() {
        let data = dataset(vec![false, false, false, true, true, true]);
        let params = Hyperparameters::default().with_tree_count(5);
        let model = ModelTrainer::new().train(&data, &params).unwrap();

        assert_eq!(model.schema, data.schema);
        assert_eq!(model.info.version, 1);
        assert_eq!(model.info.n_samples, 6);
        assert_eq!(model.info.n_classes, 2);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_single_class_fails() {
        let data = dataset(vec![true; 4]);
        let err = ModelTrainer::new().train(&data, &Hyperparameters::default()).unwrap_err();
        assert!(matches!(err, ChurnError::TrainingFailure(_)));
    }

    #[test]
    fn test_invalid_hyperparameters() {
        let data = dataset(vec![false, true]);
        let params = Hyperparameters::default().with_tree_count(0);
        let err = ModelTrainer::new().train(&data, &params).unwrap_err();
        assert!(matches!(err, ChurnError::InvalidHyperparameter { .. }));
    }

    #[test]
    fn test_non_finite_values_fail() {
        let mut data = dataset(vec![false, true, false, true]);
        data.x[[2, 0]] = f64::INFINITY;
        let err = ModelTrainer::new().train(&data, &Hyperparameters::default()).unwrap_err();
        assert!(matches!(err, ChurnError::TrainingFailure(msg) if msg.contains("minutes")));
    }

    #[test]
    fn test_unlabeled_dataset_fails() {
        let mut data = dataset(vec![false, true]);
        data.labels = None;
        assert!(ModelTrainer::new().train(&data, &Hyperparameters::default()).is_err());
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let data = dataset(vec![false, true, false, true, true, false, true, false]);
        let params = Hyperparameters::default().with_tree_count(20).with_random_seed(7);
        let a = ModelTrainer::new().train(&data, &params).unwrap();
        let b = ModelTrainer::new().train(&data, &params).unwrap();
        assert_eq!(
            a.predictor().predict_proba(&data.x).unwrap(),
            b.predictor().predict_proba(&data.x).unwrap()
        );
    }
}
