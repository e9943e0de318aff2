//! Benchmarks for noise application and stream derivation.
//!
//! Performance budgets:
//! - Gaussian on D=2048: **< 50μs**
//! - Sparse / sign-flip on D=2048: **< 5μs**
//! - Cell seed derivation: **< 1μs**

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use robustsim_core::corpus::generate_base_vectors;
use robustsim_core::noise::{NoiseConfig, NoiseInjector, NoiseModel};
use robustsim_core::prng::{CellLabels, StreamPurpose, XorShift32};
use std::hint::black_box;

fn bench_models(c: &mut Criterion) {
    let mut group = c.benchmark_group("noise_apply");
    let corpus = generate_base_vectors(1337, 2048, 1);
    let vector = &corpus.vectors()[0];

    for model in NoiseModel::ALL {
        let injector = NoiseInjector::from_config(&NoiseConfig::known(model, 0.1), 0.5)
            .expect("built-in models resolve");
        group.bench_with_input(BenchmarkId::new(model.as_str(), 2048), vector, |b, v| {
            let mut rng = XorShift32::new(11);
            b.iter(|| black_box(injector.apply(v, &mut rng)));
        });
    }

    group.finish();
}

fn bench_seed_derivation(c: &mut Criterion) {
    let labels = CellLabels {
        purpose: StreamPurpose::Noise,
        metric: "cosine_similarity",
        file: "metrics/cosine.rs",
        dimension: 1024,
        model: "gaussian",
        level: 0.05,
    };
    c.bench_function("cell_seed", |b| {
        b.iter(|| black_box(black_box(&labels).seed(1337)));
    });
}

criterion_group!(benches, bench_models, bench_seed_derivation);
criterion_main!(benches);
