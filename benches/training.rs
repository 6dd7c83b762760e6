use churn_service::training::RandomForest;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn create_churn_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen::<f64>() * 10.0);

    // Churn when the first two features are high, with some label noise
    let y = x
        .rows()
        .into_iter()
        .map(|row| {
            let score = row[0] + row[1] + rng.gen::<f64>() * 2.0;
            usize::from(score > 11.0)
        })
        .collect();

    (x, y)
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_rows in [1000, 5000, 10000].iter() {
        let data = create_churn_data(*n_rows, 16);

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &data, |b, (x, y)| {
            b.iter(|| {
                let mut forest = RandomForest::new(50).with_random_state(42);
                forest.fit(black_box(x), black_box(y), 2).unwrap();
                forest.n_trees()
            })
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train model once
    let (x_train, y_train) = create_churn_data(5000, 16);
    let mut forest = RandomForest::new(100).with_random_state(42);
    forest.fit(&x_train, &y_train, 2).unwrap();

    for n_rows in [1, 100, 1000].iter() {
        let (x_test, _) = create_churn_data(*n_rows, 16);

        group.bench_with_input(BenchmarkId::new("predict_proba", n_rows), &x_test, |b, x| {
            b.iter(|| forest.predict_proba(black_box(x)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_prediction);
criterion_main!(benches);
