//! Churn service CLI
//!
//! Offline lifecycle commands (prepare, train, evaluate, save, load), one-off
//! predictions and retraining, and the HTTP server.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use crate::config::ServiceConfig;
use crate::error::ChurnError;
use crate::data::{CsvSource, DatasetLoader, RawValue};
use crate::evaluation::EvaluationReport;
use crate::inference::PredictionService;
use crate::preprocessing::FeatureEncoder;
use crate::registry::{ActiveModel, FsBlobStore, ModelRegistry, PreparedData};
use crate::retrain::RetrainOrchestrator;
use crate::pipeline::ChurnPipeline;
use crate::training::{ChurnModel, Hyperparameters};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "churn")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Customer churn model lifecycle: prepare, train, evaluate, serve")]
#[command(long_about = None)]
pub struct Cli {
    /// Training data file
    #[arg(long, global = true)]
    pub train_data: Option<String>,

    /// Held-out evaluation data file
    #[arg(long, global = true)]
    pub eval_data: Option<String>,

    /// Label column name
    #[arg(long, global = true)]
    pub target: Option<String>,

    /// Model artifact path
    #[arg(long, global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Forest hyperparameter overrides
#[derive(Args, Debug, Clone, Default)]
pub struct HyperparameterArgs {
    /// Number of trees
    #[arg(long)]
    pub trees: Option<usize>,

    /// Maximum tree depth (unlimited when omitted)
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,
}

impl HyperparameterArgs {
    pub fn apply(&self, defaults: &Hyperparameters) -> Hyperparameters {
        Hyperparameters {
            tree_count: self.trees.unwrap_or(defaults.tree_count),
            max_depth: self.max_depth.or(defaults.max_depth),
            random_seed: self.seed.unwrap_or(defaults.random_seed),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load, encode and reconcile both splits, then store the result
    Prepare {
        /// Output path for the prepared data
        #[arg(short, long, default_value = "prepared.bin")]
        output: String,
    },

    /// Train on the training split, report on the evaluation split, save the model
    Train {
        #[command(flatten)]
        params: HyperparameterArgs,

        /// Reuse prepared data instead of re-reading the CSV files
        #[arg(long)]
        prepared: Option<String>,
    },

    /// Evaluate the saved model on the evaluation split
    Evaluate {
        /// Reuse prepared data instead of re-reading the CSV files
        #[arg(long)]
        prepared: Option<String>,
    },

    /// Copy the saved model to another path after validating it
    Save {
        /// Destination path
        #[arg(short, long)]
        output: String,
    },

    /// Load the saved model and show its metadata
    Load,

    /// Predict one record
    Predict {
        /// Encoded feature vector, comma separated, in schema order
        #[arg(long, conflicts_with = "record")]
        features: Option<String>,

        /// Raw record as a JSON object of column name to value
        #[arg(long)]
        record: Option<String>,
    },

    /// Retrain from the training split and replace the saved model
    Retrain {
        #[command(flatten)]
        params: HyperparameterArgs,
    },

    /// Show the most important features of the saved model
    Importance {
        /// Number of features
        #[arg(short, long, default_value = "4")]
        k: usize,
    },

    /// Start the web server
    Serve {
        /// Server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Server host
        #[arg(long)]
        host: Option<String>,
    },
}

impl Cli {
    /// Environment defaults with command-line overrides applied
    pub fn service_config(&self) -> ServiceConfig {
        let mut config = ServiceConfig::default();
        if let Some(v) = &self.train_data {
            config = config.with_train_data(v);
        }
        if let Some(v) = &self.eval_data {
            config = config.with_eval_data(v);
        }
        if let Some(v) = &self.target {
            config = config.with_target(v);
        }
        if let Some(v) = &self.model {
            config = config.with_model_path(v);
        }
        config
    }
}

// ─── Wiring ────────────────────────────────────────────────────────────────────

fn registry() -> ModelRegistry {
    ModelRegistry::new(Arc::new(FsBlobStore::default()))
}

fn pipeline(config: &ServiceConfig) -> ChurnPipeline {
    ChurnPipeline::new(
        DatasetLoader::new(Arc::new(CsvSource::new())),
        FeatureEncoder::new(config.encoder.clone()),
        registry(),
        config.target.clone(),
    )
}

fn prepared_data(
    config: &ServiceConfig,
    pipeline: &ChurnPipeline,
    prepared: Option<&str>,
) -> anyhow::Result<PreparedData> {
    let start = Instant::now();
    let data = match prepared {
        Some(key) => {
            step_run(&format!("Loading prepared data from {}", key.cyan()));
            pipeline.registry().load_prepared(key)?
        }
        None => {
            step_run(&format!(
                "Preparing {} and {}",
                config.train_data.cyan(),
                config.eval_data.cyan()
            ));
            pipeline.prepare(&config.train_data, &config.eval_data)?
        }
    };
    step_done(&format!(
        "{} train / {} eval rows, {} features in {:?}",
        data.train.n_rows(),
        data.eval.n_rows(),
        data.train.n_features(),
        start.elapsed()
    ));
    Ok(data)
}

fn print_report(report: &EvaluationReport) {
    println!();
    println!("  {:<16} {}", muted("Accuracy"), format!("{:.4}", report.accuracy).white().bold());
    println!("  {:<16} {}", muted("Precision"), format!("{:.4}", report.precision).white());
    println!("  {:<16} {}", muted("Recall"), format!("{:.4}", report.recall).white());
    println!("  {:<16} {}", muted("F1"), format!("{:.4}", report.f1_score).white());
    println!();
    for line in report.to_string().lines() {
        println!("  {}", line);
    }
}

fn print_model(model: &ChurnModel) {
    let params = &model.hyperparameters;
    println!();
    println!("  {:<16} {}", muted("Model id"), model.info.model_id.white());
    println!("  {:<16} {}", muted("Version"), model.info.version.to_string().white());
    println!("  {:<16} {}", muted("Trained at"), model.info.trained_at.to_rfc3339().white());
    println!("  {:<16} {}", muted("Rows"), model.info.n_samples.to_string().white());
    println!(
        "  {:<16} {}",
        muted("Trees"),
        format!(
            "{} (max depth {}, seed {})",
            params.tree_count,
            params.max_depth.map_or("unlimited".to_string(), |d| d.to_string()),
            params.random_seed
        )
        .white()
    );
    let classes: Vec<String> = (0..model.labels.len()).map(|i| model.labels.display_name(i)).collect();
    println!("  {:<16} {}", muted("Classes"), classes.join(", ").white());
    println!("  {:<16} {}", muted("Features"), model.schema.len().to_string().white());
    for name in model.schema.columns() {
        println!("    {}", dim(name));
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_prepare(config: &ServiceConfig, output: &str) -> anyhow::Result<()> {
    section("Prepare");
    let pipeline = pipeline(config);
    let data = prepared_data(config, &pipeline, None)?;

    step_run(&format!("Writing {}", output.cyan()));
    pipeline.registry().save_prepared(&data, output)?;
    step_done("");
    Ok(())
}

pub fn cmd_train(
    config: &ServiceConfig,
    params: &HyperparameterArgs,
    prepared: Option<&str>,
) -> anyhow::Result<()> {
    section("Train");
    let pipeline = pipeline(config);
    let data = prepared_data(config, &pipeline, prepared)?;
    let params = params.apply(&config.hyperparameters);

    step_run(&format!("Training random forest ({} trees)", params.tree_count));
    let start = Instant::now();
    let model = pipeline.train(&data, &params)?;
    step_done(&format!("{:?}", start.elapsed()));

    let report = pipeline.evaluate(&model, &data)?;
    print_report(&report);

    step_run(&format!("Saving model to {}", config.model_path.cyan()));
    pipeline.registry().save(&model, &config.model_path)?;
    step_done("");
    Ok(())
}

pub fn cmd_evaluate(config: &ServiceConfig, prepared: Option<&str>) -> anyhow::Result<()> {
    section("Evaluate");
    let pipeline = pipeline(config);

    step_run(&format!("Loading model from {}", config.model_path.cyan()));
    let model = pipeline.registry().load(&config.model_path)?;
    step_done(&format!("version {}", model.version()));

    let data = prepared_data(config, &pipeline, prepared)?;
    let report = pipeline.evaluate(&model, &data)?;
    print_report(&report);
    Ok(())
}

pub fn cmd_save(config: &ServiceConfig, output: &str) -> anyhow::Result<()> {
    section("Save");
    let registry = registry();
    let model = registry.load(&config.model_path)?;
    registry.save(&model, output)?;
    println!("  {} {} → {}", ok("✓"), config.model_path, output.cyan());
    Ok(())
}

pub fn cmd_load(config: &ServiceConfig) -> anyhow::Result<()> {
    section("Load");
    let model = registry().load(&config.model_path)?;
    print_model(&model);
    Ok(())
}

fn prediction_service(config: &ServiceConfig) -> anyhow::Result<PredictionService> {
    let model = registry().load(&config.model_path)?;
    Ok(PredictionService::new(Arc::new(ActiveModel::with_model(model))))
}

pub fn cmd_predict(
    config: &ServiceConfig,
    features: Option<&str>,
    record: Option<&str>,
) -> anyhow::Result<()> {
    section("Predict");
    let service = prediction_service(config)?;

    let prediction = match (features, record) {
        (Some(features), _) => {
            let vector = features
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| anyhow::anyhow!("Invalid feature value: {}", e))?;
            service.predict(&vector)?
        }
        (None, Some(record)) => {
            let fields: HashMap<String, RawValue> = serde_json::from_str(record)?;
            service.predict_record(&fields)?
        }
        (None, None) => anyhow::bail!("Provide --features or --record"),
    };

    println!();
    println!("  {:<16} {}", muted("Prediction"), prediction.display.white().bold());
    println!("  {:<16} {}", muted("Probability"), format!("{:.4}", prediction.probability).white());
    println!("  {:<16} {}", muted("Model version"), prediction.model_version.to_string().white());
    Ok(())
}

/// The model currently stored under `key`, if any. A missing artifact is the
/// normal first-run case; anything else is logged before starting over.
fn stored_model(registry: &ModelRegistry, key: &str) -> Option<ChurnModel> {
    match registry.load(key) {
        Ok(model) => Some(model),
        Err(ChurnError::ArtifactUnavailable { .. }) => None,
        Err(e) => {
            warn!(key, error = %e, "Stored model is unusable; retraining starts from version 1");
            None
        }
    }
}

pub fn cmd_retrain(config: &ServiceConfig, params: &HyperparameterArgs) -> anyhow::Result<()> {
    section("Retrain");
    let registry = registry();
    let active = Arc::new(ActiveModel::new());
    if let Some(model) = stored_model(&registry, &config.model_path) {
        active.replace(model);
    }

    let orchestrator = RetrainOrchestrator::new(
        DatasetLoader::new(Arc::new(CsvSource::new())),
        FeatureEncoder::new(config.encoder.clone()),
        registry,
        active,
        config.model_path.clone(),
        config.target.clone(),
    );

    let params = params.apply(&config.hyperparameters);
    step_run(&format!("Retraining from {}", config.train_data.cyan()));
    let outcome = orchestrator.retrain(&params, &config.train_data)?;
    step_done(&format!("{} ms", outcome.elapsed_ms));

    println!();
    println!("  {:<16} {}", muted("Model id"), outcome.model_id.white());
    println!("  {:<16} {}", muted("Version"), outcome.version.to_string().white().bold());
    println!("  {:<16} {}", muted("Rows"), outcome.n_samples.to_string().white());
    println!("  {:<16} {}", muted("Features"), outcome.n_features.to_string().white());
    Ok(())
}

pub fn cmd_importance(config: &ServiceConfig, k: usize) -> anyhow::Result<()> {
    section("Feature importance");
    let service = prediction_service(config)?;
    let features = service.top_k_features(k)?;
    if features.is_empty() {
        println!("  {}", muted("Model does not rank features"));
    }
    for (rank, feature) in features.iter().enumerate() {
        println!(
            "  {:>2}. {:<32} {}",
            rank + 1,
            feature.name,
            format!("{:.4}", feature.importance).white()
        );
    }
    Ok(())
}

pub async fn cmd_serve(config: ServiceConfig, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    use crate::server::run_server;

    let mut config = config;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Churn Service".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("API    ", &format!("http://{}/api", config.address())));
    line_box(&kv("Health ", &format!("http://{}/api/health", config.address())));
    line_box(&kv("Model  ", &config.model_path));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_train_overrides() {
        let cli = Cli::parse_from([
            "churn", "train", "--trees", "50", "--seed", "7", "--target", "Exited",
        ]);
        assert_eq!(cli.target.as_deref(), Some("Exited"));
        match cli.command {
            Commands::Train { params, prepared } => {
                let params = params.apply(&Hyperparameters::default());
                assert_eq!(params.tree_count, 50);
                assert_eq!(params.random_seed, 7);
                assert_eq!(params.max_depth, None);
                assert!(prepared.is_none());
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_stored_model_lookup() {
        use crate::data::{RawColumn, RawTable};
        use crate::registry::{BlobStore, MemoryBlobStore};
        use crate::training::ModelTrainer;

        let store = Arc::new(MemoryBlobStore::new());
        let registry = ModelRegistry::new(store.clone());
        assert!(stored_model(&registry, "model.bin").is_none());

        store.write("model.bin", b"not a model").unwrap();
        assert!(stored_model(&registry, "model.bin").is_none());

        let table = RawTable::new(vec![
            RawColumn::numeric("minutes", vec![1.0, 2.0, 10.0, 11.0]),
            RawColumn::boolean("Churn", vec![false, false, true, true]),
        ])
        .unwrap();
        let data = FeatureEncoder::default().encode_labeled(&table, "Churn").unwrap();
        let model = ModelTrainer::new()
            .train_version(&data, &Hyperparameters::default().with_tree_count(3), 5)
            .unwrap();
        registry.save(&model, "model.bin").unwrap();
        assert_eq!(stored_model(&registry, "model.bin").map(|m| m.version()), Some(5));
    }

    #[test]
    fn test_strip_ansi() {
        let s = format!("{}", "hello".red());
        assert_eq!(strip_ansi(&s), "hello");
    }
}
