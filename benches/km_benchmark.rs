use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kaplan_meier::{
    comparison::{log_rank_test, multivariate_log_rank_test},
    render::render,
    KaplanMeier, ObservationSet,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn generate_synthetic_data(n_samples: usize, hazard: f64, seed: u64) -> ObservationSet {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut durations = Vec::with_capacity(n_samples);
    let mut events = Vec::with_capacity(n_samples);

    for _ in 0..n_samples {
        let time = -rng.r#gen::<f64>().ln() / hazard;
        let censoring_time = rng.gen_range(1.0..30.0);

        if time < censoring_time {
            durations.push(time);
            events.push(true);
        } else {
            durations.push(censoring_time);
            events.push(false);
        }
    }

    ObservationSet::new(durations, events).unwrap()
}

fn benchmark_km_fitting(c: &mut Criterion) {
    let mut group = c.benchmark_group("km_fitting");

    for &n_samples in [100, 1_000, 10_000, 100_000].iter() {
        let data = generate_synthetic_data(n_samples, 0.1, 42);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_samples", n_samples)),
            &data,
            |b, data| {
                let estimator = KaplanMeier::new();
                b.iter(|| estimator.fit(black_box(data)).unwrap());
            },
        );
    }
    group.finish();
}

fn benchmark_curve_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("curve_queries");

    let data = generate_synthetic_data(10_000, 0.1, 7);
    let curve = KaplanMeier::new().fit(&data).unwrap();
    let timeline: Vec<f64> = (0..1_000).map(|i| f64::from(i) * 0.03).collect();

    group.bench_function("survival_at_1000_times", |b| {
        b.iter(|| curve.survival_function_at_times(black_box(&timeline)));
    });

    group.bench_function("median_survival", |b| {
        b.iter(|| black_box(&curve).median_survival());
    });

    group.bench_function("render", |b| {
        b.iter(|| render(black_box(&curve)));
    });

    group.finish();
}

fn benchmark_log_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_rank");

    for &n_samples in [100, 1_000, 10_000].iter() {
        let a = generate_synthetic_data(n_samples, 0.1, 1);
        let b_data = generate_synthetic_data(n_samples, 0.2, 2);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("2x{}", n_samples)),
            &(a, b_data),
            |b, (a, b_data)| {
                b.iter(|| log_rank_test(black_box(a), black_box(b_data)).unwrap());
            },
        );
    }

    let groups: Vec<ObservationSet> = (0..5u32)
        .map(|g| generate_synthetic_data(2_000, 0.1 + 0.02 * f64::from(g), u64::from(g)))
        .collect();
    let refs: Vec<&ObservationSet> = groups.iter().collect();
    group.bench_function("5_groups_2000_each", |b| {
        b.iter(|| multivariate_log_rank_test(black_box(&refs)).unwrap());
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_km_fitting,
    benchmark_curve_queries,
    benchmark_log_rank
);
criterion_main!(benches);
