//! Scores a trained model against a labeled dataset

use super::metrics::EvaluationReport;
use crate::error::{ChurnError, Result};
use crate::preprocessing::EncodedDataset;
use crate::training::ChurnModel;
use std::collections::BTreeSet;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ModelEvaluator;

impl ModelEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate `model` on `data`, whose schema must equal the model's.
    ///
    /// Labels unknown to the model are reported as extra classes that are
    /// never predicted.
    pub fn evaluate(&self, model: &ChurnModel, data: &EncodedDataset) -> Result<EvaluationReport> {
        model.schema.ensure_compatible(&data.schema)?;

        let labels = data
            .labels
            .as_ref()
            .ok_or_else(|| ChurnError::MissingLabelColumn(model.labels.name.clone()))?;

        let unknown: Vec<&String> = labels
            .values
            .iter()
            .filter(|v| model.labels.index_of(v).is_none())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut class_names: Vec<String> = (0..model.labels.len())
            .map(|i| model.labels.display_name(i))
            .collect();
        class_names.extend(unknown.iter().map(|v| v.to_string()));

        let y_true: Vec<usize> = labels
            .values
            .iter()
            .map(|v| {
                model.labels.index_of(v).unwrap_or_else(|| {
                    model.labels.len() + unknown.iter().position(|u| *u == v).unwrap_or(0)
                })
            })
            .collect();

        let y_pred = if data.n_rows() == 0 {
            Vec::new()
        } else {
            model.predictor().predict(&data.x)?.to_vec()
        };

        let report = EvaluationReport::compute(&y_true, &y_pred, &class_names);
        info!(
            model_id = %model.info.model_id,
            rows = report.n_samples,
            accuracy = report.accuracy,
            f1 = report.f1_score,
            "Evaluated model"
        );
        Ok(report)
    }
}
