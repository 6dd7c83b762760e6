//! Integration test: Dummy encoding and train/eval reconciliation

use churn_service::data::{RawColumn, RawTable, RawValue};
use churn_service::preprocessing::{EncoderConfig, FeatureEncoder, SourceKind};
use churn_service::ChurnError;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

const STATES: [&str; 4] = ["AL", "KS", "NJ", "OH"];

fn table(states: &[usize], minutes: &[f64]) -> RawTable {
    RawTable::new(vec![
        RawColumn::text("State", states.iter().map(|&s| STATES[s]).collect()),
        RawColumn::numeric("Total day minutes", minutes.to_vec()),
        RawColumn::boolean("Churn", minutes.iter().map(|m| *m > 0.0).collect()),
    ])
    .unwrap()
}

fn split() -> impl Strategy<Value = (Vec<usize>, Vec<f64>)> {
    (1usize..40).prop_flat_map(|n| {
        (
            prop::collection::vec(0usize..STATES.len(), n),
            prop::collection::vec(-500.0f64..500.0, n),
        )
    })
}

proptest! {
    #[test]
    fn prop_encoding_is_deterministic((states, minutes) in split()) {
        let encoder = FeatureEncoder::default();
        let t = table(&states, &minutes);
        let a = encoder.encode_labeled(&t, "Churn").unwrap();
        let b = encoder.encode_labeled(&t, "Churn").unwrap();
        prop_assert_eq!(&a.schema, &b.schema);
        prop_assert_eq!(&a.x, &b.x);

        let distinct: HashSet<usize> = states.iter().copied().collect();
        prop_assert_eq!(a.n_features(), 1 + distinct.len() - 1);
        prop_assert_eq!(a.n_rows(), states.len());
    }

    #[test]
    fn prop_reconcile_keeps_shared_columns((ts, tm) in split(), (es, em) in split()) {
        let encoder = FeatureEncoder::default();
        let train = encoder.encode_labeled(&table(&ts, &tm), "Churn").unwrap();
        let eval = encoder.encode_labeled(&table(&es, &em), "Churn").unwrap();
        let (rt, re) = encoder.reconcile(&train, &eval).unwrap();

        prop_assert_eq!(&rt.schema, &re.schema);
        prop_assert_eq!(rt.n_rows(), ts.len());
        prop_assert_eq!(re.n_rows(), es.len());

        let train_cols: HashSet<&String> = train.schema.columns().iter().collect();
        let eval_cols: HashSet<&String> = eval.schema.columns().iter().collect();
        let shared = train_cols.intersection(&eval_cols).count();
        prop_assert_eq!(rt.schema.len(), shared);
        prop_assert_eq!(rt.schema.columns()[0].as_str(), "Total day minutes");

        // Every encoded row has at most one indicator set per group
        for row in rt.x.rows().into_iter().chain(re.x.rows()) {
            let indicators: f64 = row.iter().skip(1).sum();
            prop_assert!(indicators <= 1.0);
        }
    }
}

#[test]
fn test_reconcile_drops_one_sided_categories() {
    let encoder = FeatureEncoder::default();
    // train: AL KS NJ -> State_KS State_NJ; eval: AL NJ OH -> State_NJ State_OH
    let train = encoder
        .encode_labeled(&table(&[0, 1, 2, 1], &[10.0, -5.0, 3.0, 7.0]), "Churn")
        .unwrap();
    let eval = encoder
        .encode_labeled(&table(&[0, 2, 3], &[1.0, 2.0, -3.0]), "Churn")
        .unwrap();

    let (train, eval) = encoder.reconcile(&train, &eval).unwrap();
    assert_eq!(train.schema.columns(), &["Total day minutes", "State_NJ"]);
    assert_eq!(eval.schema, train.schema);
    assert_eq!(eval.x.column(1).to_vec(), vec![0.0, 1.0, 0.0]);
}

#[test]
fn test_record_encoding_follows_reconciled_schema() {
    let encoder = FeatureEncoder::default();
    let train = encoder
        .encode_labeled(&table(&[0, 1, 2, 1], &[10.0, -5.0, 3.0, 7.0]), "Churn")
        .unwrap();
    let eval = encoder
        .encode_labeled(&table(&[0, 2, 3], &[1.0, 2.0, -3.0]), "Churn")
        .unwrap();
    let (train, _) = encoder.reconcile(&train, &eval).unwrap();
    let schema = &train.schema;

    let record = |state: &str| {
        let mut fields = HashMap::new();
        fields.insert("State".to_string(), RawValue::Text(state.to_string()));
        fields.insert("Total day minutes".to_string(), RawValue::Number(42.0));
        fields
    };

    assert_eq!(schema.encode_record(&record("NJ")).unwrap(), vec![42.0, 1.0]);
    // AL is the dropped reference category
    assert_eq!(schema.encode_record(&record("AL")).unwrap(), vec![42.0, 0.0]);
    assert!(matches!(
        schema.encode_record(&record("TX")),
        Err(ChurnError::UnseenCategory { .. })
    ));

    let mut partial = record("NJ");
    partial.remove("Total day minutes");
    assert!(matches!(
        schema.encode_record(&partial),
        Err(ChurnError::MissingFeature(_))
    ));
}

#[test]
fn test_boolean_and_full_dummies() {
    let t = RawTable::new(vec![
        RawColumn::boolean("Voice mail plan", vec![true, false, true]),
        RawColumn::text("Area", vec!["408", "415", "510"]),
        RawColumn::boolean("Churn", vec![false, true, false]),
    ])
    .unwrap();

    let encoder = FeatureEncoder::new(EncoderConfig::default().with_drop_first(false));
    let encoded = encoder.encode_labeled(&t, "Churn").unwrap();
    assert_eq!(
        encoded.schema.columns(),
        &["Voice mail plan", "Area_408", "Area_415", "Area_510"]
    );
    assert_eq!(encoded.x.row(1).to_vec(), vec![0.0, 0.0, 1.0, 0.0]);
    assert!(matches!(
        encoded.schema.sources()[1].kind,
        SourceKind::Categorical { reference: None, .. }
    ));
}

#[test]
fn test_missing_label_column() {
    let t = table(&[0, 1], &[1.0, 2.0]);
    assert!(matches!(
        FeatureEncoder::default().encode_labeled(&t, "Exited"),
        Err(ChurnError::MissingLabelColumn(name)) if name == "Exited"
    ));
}
