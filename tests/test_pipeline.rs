//! Integration test: CSV → prepare → train → evaluate → save → load → predict

use churn_service::prelude::*;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

const STATES: [&str; 5] = ["KS", "OH", "NJ", "OK", "AL"];

/// Churn when day minutes are high or the customer called support a lot
fn write_split(path: &Path, n: usize, offset: usize, extra_state: Option<&str>, with_gap: bool) {
    let mut csv = String::from(
        "State,Account length,International plan,Total day minutes,Customer service calls,Churn\n",
    );
    for i in offset..offset + n {
        let state = match extra_state {
            Some(extra) if i % 7 == 0 => extra,
            _ => STATES[i % STATES.len()],
        };
        let plan = if i % 3 == 0 { "Yes" } else { "No" };
        let minutes = 100.0 + ((i * 37) % 200) as f64 + 0.5;
        let calls = (i * 13) % 7;
        let churn = minutes > 250.0 || calls >= 5;
        writeln!(
            csv,
            "{},{},{},{},{},{}",
            state,
            60 + (i * 11) % 120,
            plan,
            minutes,
            calls,
            if churn { "True" } else { "False" }
        )
        .unwrap();
    }
    if with_gap {
        csv.push_str("KS,100,No,,2,False\n");
    }
    std::fs::write(path, csv).unwrap();
}

struct Fixture {
    _dir: tempfile::TempDir,
    pipeline: ChurnPipeline,
    store: Arc<FsBlobStore>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    write_split(&dir.path().join("train.csv"), 100, 0, None, true);
    write_split(&dir.path().join("eval.csv"), 30, 1000, Some("TX"), false);

    let store = Arc::new(FsBlobStore::new(dir.path()));
    let pipeline = ChurnPipeline::new(
        DatasetLoader::new(Arc::new(CsvSource::new().with_base_dir(dir.path()))),
        FeatureEncoder::default(),
        ModelRegistry::new(store.clone()),
        "Churn",
    );
    Fixture { _dir: dir, pipeline, store }
}

fn params() -> Hyperparameters {
    Hyperparameters::default().with_tree_count(50).with_random_seed(7)
}

#[test]
fn test_prepare_reconciles_splits() {
    let fx = fixture();
    let prepared = fx.pipeline.prepare("train.csv", "eval.csv").unwrap();

    // the row with a missing value is dropped
    assert_eq!(prepared.train.n_rows(), 100);
    assert_eq!(prepared.eval.n_rows(), 30);
    assert_eq!(prepared.train.schema, prepared.eval.schema);

    let columns = prepared.train.schema.columns();
    assert_eq!(
        &columns[..3],
        &["Account length", "Total day minutes", "Customer service calls"]
    );
    // AL is the dropped reference category; TX only exists in eval
    assert!(columns.contains(&"State_KS".to_string()));
    assert!(!columns.iter().any(|c| c == "State_AL" || c == "State_TX"));
    assert!(columns.contains(&"International plan_Yes".to_string()));
}

#[test]
fn test_end_to_end_train_save_load() {
    let fx = fixture();
    let prepared = fx.pipeline.prepare("train.csv", "eval.csv").unwrap();
    let model = fx.pipeline.train(&prepared, &params()).unwrap();

    assert_eq!(model.schema.columns(), prepared.train.schema.columns());
    assert_eq!(model.predictor().n_features(), prepared.train.n_features());

    let report = fx.pipeline.evaluate(&model, &prepared).unwrap();
    assert_eq!(report.n_samples, 30);
    assert!(report.accuracy >= 0.8, "accuracy {}", report.accuracy);
    assert!((0.0..=1.0).contains(&report.f1_score));
    assert!(report.classes.iter().any(|c| c.label == "Positive"));

    fx.pipeline.registry().save(&model, "model.bin").unwrap();
    assert!(fx.store.path("model.bin").is_file());
    let loaded = fx.pipeline.registry().load("model.bin").unwrap();

    assert_eq!(
        loaded.predictor().predict(&prepared.eval.x).unwrap(),
        model.predictor().predict(&prepared.eval.x).unwrap()
    );
    assert_eq!(
        loaded.predictor().predict_proba(&prepared.eval.x).unwrap(),
        model.predictor().predict_proba(&prepared.eval.x).unwrap()
    );
}

#[test]
fn test_same_seed_same_model() {
    let fx = fixture();
    let prepared = fx.pipeline.prepare("train.csv", "eval.csv").unwrap();
    let a = fx.pipeline.train(&prepared, &params()).unwrap();
    let b = fx.pipeline.train(&prepared, &params()).unwrap();

    assert_eq!(
        a.predictor().predict_proba(&prepared.eval.x).unwrap(),
        b.predictor().predict_proba(&prepared.eval.x).unwrap()
    );
    assert_eq!(a.ranked_features(), b.ranked_features());
}

#[test]
fn test_prepared_data_round_trip_and_run() {
    let fx = fixture();
    let prepared = fx.pipeline.prepare("train.csv", "eval.csv").unwrap();
    fx.pipeline.registry().save_prepared(&prepared, "prepared.bin").unwrap();
    assert_eq!(fx.pipeline.registry().load_prepared("prepared.bin").unwrap(), prepared);

    let outcome = fx
        .pipeline
        .run("train.csv", "eval.csv", &params(), "model.bin")
        .unwrap();
    assert_eq!(outcome.model.version(), 1);
    assert!(fx.pipeline.registry().load("model.bin").is_ok());
}

#[test]
fn test_prediction_service_on_saved_model() {
    let fx = fixture();
    let outcome = fx
        .pipeline
        .run("train.csv", "eval.csv", &params(), "model.bin")
        .unwrap();
    let model = fx.pipeline.registry().load("model.bin").unwrap();
    let service = PredictionService::new(Arc::new(ActiveModel::with_model(model)));

    let mut record = std::collections::HashMap::new();
    record.insert("State".to_string(), RawValue::Text("OH".to_string()));
    record.insert("Account length".to_string(), RawValue::Number(120.0));
    record.insert("International plan".to_string(), RawValue::Text("No".to_string()));
    record.insert("Total day minutes".to_string(), RawValue::Number(295.5));
    record.insert("Customer service calls".to_string(), RawValue::Number(1.0));

    let prediction = service.predict_record(&record).unwrap();
    assert_eq!(prediction.display, "Positive");
    assert_eq!(prediction.model_id, outcome.model.info.model_id);

    let width = outcome.model.schema.len();
    assert!(matches!(
        service.predict(&vec![0.0; width + 1]),
        Err(ChurnError::FeatureCountMismatch { .. })
    ));
}

#[test]
fn test_missing_sources() {
    let fx = fixture();
    assert!(matches!(
        fx.pipeline.prepare("absent.csv", "eval.csv"),
        Err(ChurnError::DataUnavailable { .. })
    ));
    assert!(matches!(
        fx.pipeline.registry().load("absent.bin"),
        Err(ChurnError::ArtifactUnavailable { .. })
    ));
}
