#[allow(dead_code)]
mod test_functions;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use optimistic::EngineBuilder;

fn bench_soo_sin_product(c: &mut Criterion) {
    let mut group = c.benchmark_group("soo_sin_product");
    group.sample_size(20);

    for budget in [100, 500] {
        group.bench_with_input(BenchmarkId::new("budget", budget), &budget, |b, &budget| {
            b.iter(|| {
                let mut engine = EngineBuilder::new(test_functions::sin_product, 1, budget)
                    .build()
                    .unwrap();
                engine.optimize().unwrap();
                engine.best_node().unwrap().center()
            });
        });
    }
    group.finish();
}

fn bench_variants_rosenbrock(c: &mut Criterion) {
    let mut group = c.benchmark_group("variants_rosenbrock_2d");
    group.sample_size(20);
    let budget = 300;

    group.bench_function("soo", |b| {
        b.iter(|| {
            let mut engine = EngineBuilder::new(test_functions::rosenbrock, 2, budget)
                .build()
                .unwrap();
            engine.optimize().unwrap();
            engine.best_node().unwrap().center()
        });
    });

    group.bench_function("logo", |b| {
        b.iter(|| {
            let mut engine = EngineBuilder::new(test_functions::rosenbrock, 2, budget)
                .depth_bands(vec![1, 2, 3, 4, 5, 6, 8, 30])
                .build()
                .unwrap();
            engine.optimize().unwrap();
            engine.best_node().unwrap().center()
        });
    });

    group.bench_function("doo", |b| {
        b.iter(|| {
            let mut engine = EngineBuilder::new(test_functions::rosenbrock, 2, budget)
                .slope_bound(2000.0)
                .build()
                .unwrap();
            engine.optimize().unwrap();
            engine.best_node().unwrap().center()
        });
    });

    group.finish();
}

fn bench_bamsoo_rastrigin(c: &mut Criterion) {
    let mut group = c.benchmark_group("bamsoo_rastrigin_2d");
    group.sample_size(10);

    for budget in [50, 100] {
        group.bench_with_input(BenchmarkId::new("budget", budget), &budget, |b, &budget| {
            b.iter(|| {
                let mut engine = EngineBuilder::new(test_functions::rastrigin, 2, budget)
                    .bamsoo()
                    .build()
                    .unwrap();
                engine.optimize().unwrap();
                engine.best_node().unwrap().center()
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_soo_sin_product,
    bench_variants_rosenbrock,
    bench_bamsoo_rastrigin
);
criterion_main!(benches);
