//! Integration test: Forest training, evaluation and model persistence

use churn_service::data::{RawColumn, RawTable};
use churn_service::evaluation::ModelEvaluator;
use churn_service::preprocessing::FeatureEncoder;
use churn_service::registry::{MemoryBlobStore, ModelRegistry};
use churn_service::training::{Hyperparameters, MaxFeatures, ModelTrainer, RandomForest};
use churn_service::ChurnError;
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// Three well separated blobs in two dimensions plus one noise column
fn blobs(n_per_class: usize, seed: u64) -> (Array2<f64>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let centers = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)];
    let mut rows = Vec::new();
    let mut y = Vec::new();
    for (class, (cx, cy)) in centers.iter().enumerate() {
        for _ in 0..n_per_class {
            rows.push(cx + rng.gen_range(-1.0..1.0));
            rows.push(cy + rng.gen_range(-1.0..1.0));
            rows.push(rng.gen_range(0.0..5.0));
            y.push(class);
        }
    }
    let x = Array2::from_shape_vec((y.len(), 3), rows).unwrap();
    (x, y)
}

#[test]
fn test_forest_multiclass() {
    let (x, y) = blobs(30, 1);
    let mut forest = RandomForest::new(25).with_random_state(11);
    forest.fit(&x, &y, 3).unwrap();

    assert_eq!(forest.n_trees(), 25);
    assert_eq!(forest.n_classes(), 3);

    let (x_test, y_test) = blobs(10, 2);
    let predictions = forest.predict(&x_test).unwrap();
    let correct = predictions.iter().zip(&y_test).filter(|(p, t)| *p == *t).count();
    assert!(correct >= 28, "{} of 30 correct", correct);

    let proba = forest.predict_proba(&x_test).unwrap();
    for row in proba.rows() {
        assert!((row.sum() - 1.0).abs() < 1e-9);
    }

    let importances = forest.feature_importances().unwrap();
    assert!((importances.sum() - 1.0).abs() < 1e-9);
    assert!(importances[2] < importances[0].max(importances[1]));
}

#[test]
fn test_forest_same_seed_same_output() {
    let (x, y) = blobs(20, 3);
    let (x_test, _) = blobs(5, 4);

    let fit = |seed: u64| {
        let mut forest = RandomForest::new(10)
            .with_max_features(MaxFeatures::Fixed(1))
            .with_random_state(seed);
        forest.fit(&x, &y, 3).unwrap();
        (
            forest.predict_proba(&x_test).unwrap(),
            forest.feature_importances().cloned(),
        )
    };

    assert_eq!(fit(5), fit(5));
}

#[test]
fn test_forest_rejects_bad_input() {
    let (x, y) = blobs(5, 5);
    assert!(matches!(
        RandomForest::new(0).fit(&x, &y, 3),
        Err(ChurnError::InvalidHyperparameter { .. })
    ));
    assert!(RandomForest::new(5).fit(&x, &y[..3], 3).is_err());

    let mut forest = RandomForest::new(5);
    forest.fit(&x, &y, 3).unwrap();
    let narrow = Array2::<f64>::zeros((2, 2));
    assert!(matches!(
        forest.predict(&narrow),
        Err(ChurnError::FeatureCountMismatch { expected: 3, actual: 2 })
    ));
}

fn plan_table(n: usize, offset: usize) -> RawTable {
    let minutes: Vec<f64> = (offset..offset + n).map(|i| (i % 50) as f64 * 6.0).collect();
    let tier: Vec<&str> = (offset..offset + n)
        .map(|i| ["basic", "gold", "silver"][i % 3])
        .collect();
    let outcome: Vec<&str> = minutes
        .iter()
        .map(|m| if *m < 100.0 { "stay" } else if *m < 200.0 { "downgrade" } else { "leave" })
        .collect();
    RawTable::new(vec![
        RawColumn::numeric("minutes", minutes),
        RawColumn::text("tier", tier),
        RawColumn::text("outcome", outcome),
    ])
    .unwrap()
}

#[test]
fn test_trainer_with_text_labels() {
    let encoder = FeatureEncoder::default();
    let train = encoder.encode_labeled(&plan_table(150, 0), "outcome").unwrap();
    let eval = encoder.encode_labeled(&plan_table(60, 7), "outcome").unwrap();
    let (train, eval) = encoder.reconcile(&train, &eval).unwrap();

    let params = Hyperparameters::default().with_tree_count(30).with_max_depth(Some(6));
    let model = ModelTrainer::new().train(&train, &params).unwrap();
    assert_eq!(model.labels.values(), &["downgrade", "leave", "stay"]);
    assert_eq!(model.info.n_classes, 3);
    assert_eq!(model.info.n_samples, 150);

    let report = ModelEvaluator::new().evaluate(&model, &eval).unwrap();
    assert_eq!(report.n_samples, 60);
    assert!(report.accuracy > 0.95, "accuracy {}", report.accuracy);
    assert_eq!(report.classes.len(), 3);
    assert!(report.to_string().contains("downgrade"));

    let ranked = model.ranked_features().unwrap();
    assert_eq!(ranked[0].0, "minutes");
}

#[test]
fn test_trained_model_survives_registry() {
    let encoder = FeatureEncoder::default();
    let train = encoder.encode_labeled(&plan_table(90, 0), "outcome").unwrap();
    let model = ModelTrainer::new()
        .train_version(&train, &Hyperparameters::default().with_tree_count(8), 4)
        .unwrap();

    let registry = ModelRegistry::new(Arc::new(MemoryBlobStore::new()));
    registry.save(&model, "models/churn.bin").unwrap();
    let loaded = registry.load("models/churn.bin").unwrap();

    assert_eq!(loaded.version(), 4);
    assert_eq!(loaded.info, model.info);
    assert_eq!(loaded.schema, model.schema);
    assert_eq!(
        loaded.predictor().predict_proba(&train.x).unwrap(),
        model.predictor().predict_proba(&train.x).unwrap()
    );
}
