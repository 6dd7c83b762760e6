//! Batch pipeline: prepare, train, evaluate, save

use crate::data::DatasetLoader;
use crate::error::Result;
use crate::evaluation::{EvaluationReport, ModelEvaluator};
use crate::preprocessing::FeatureEncoder;
use crate::registry::{ModelRegistry, PreparedData};
use crate::training::{ChurnModel, Hyperparameters, ModelTrainer};
use tracing::info;

/// Model and its held-out evaluation from one full run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub model: ChurnModel,
    pub report: EvaluationReport,
}

/// Wires the loader, encoder, trainer, evaluator and registry together for
/// offline runs
#[derive(Clone)]
pub struct ChurnPipeline {
    loader: DatasetLoader,
    encoder: FeatureEncoder,
    trainer: ModelTrainer,
    evaluator: ModelEvaluator,
    registry: ModelRegistry,
    target: String,
}

impl ChurnPipeline {
    pub fn new(
        loader: DatasetLoader,
        encoder: FeatureEncoder,
        registry: ModelRegistry,
        target: impl Into<String>,
    ) -> Self {
        Self {
            loader,
            encoder,
            trainer: ModelTrainer::new(),
            evaluator: ModelEvaluator::new(),
            registry,
            target: target.into(),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Load both splits, encode them and reconcile to a shared schema
    pub fn prepare(&self, train_id: &str, eval_id: &str) -> Result<PreparedData> {
        let (train_table, eval_table) = self.loader.load_pair(train_id, eval_id)?;
        let train = self.encoder.encode_labeled(&train_table, &self.target)?;
        let eval = self.encoder.encode_labeled(&eval_table, &self.target)?;
        let (train, eval) = self.encoder.reconcile(&train, &eval)?;

        info!(
            train_rows = train.n_rows(),
            eval_rows = eval.n_rows(),
            features = train.n_features(),
            "Prepared datasets"
        );
        Ok(PreparedData { train, eval })
    }

    pub fn train(&self, prepared: &PreparedData, params: &Hyperparameters) -> Result<ChurnModel> {
        self.trainer.train(&prepared.train, params)
    }

    pub fn evaluate(&self, model: &ChurnModel, prepared: &PreparedData) -> Result<EvaluationReport> {
        self.evaluator.evaluate(model, &prepared.eval)
    }

    /// Prepare, train, evaluate on the held-out split, then save under `model_key`
    pub fn run(
        &self,
        train_id: &str,
        eval_id: &str,
        params: &Hyperparameters,
        model_key: &str,
    ) -> Result<PipelineOutcome> {
        let prepared = self.prepare(train_id, eval_id)?;
        let model = self.train(&prepared, params)?;
        let report = self.evaluate(&model, &prepared)?;
        self.registry.save(&model, model_key)?;
        Ok(PipelineOutcome { model, report })
    }
}
