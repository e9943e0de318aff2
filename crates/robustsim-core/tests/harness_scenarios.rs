//! End-to-end scenarios for `Harness::run`.
//!
//! Each test builds a small grid so the full pipeline (corpus, noise,
//! evaluator, stats, rank stability, report) runs in milliseconds.

use chrono::{TimeZone, Utc};
use robustsim_core::config::{HarnessConfig, NoiseSettings};
use robustsim_core::metric::{MetricEntry, MetricRegistry};
use robustsim_core::noise::NoiseConfig;
use robustsim_core::report::Report;
use robustsim_core::Harness;

// =============================================================================
// Fixtures
// =============================================================================

fn gaussian_only(sigmas: &[f64]) -> NoiseSettings {
    NoiseSettings {
        gaussian_sigmas: sigmas.to_vec(),
        ..NoiseSettings::none()
    }
}

fn config(dimensions: &[usize], count: usize, candidates: usize, noise: NoiseSettings) -> HarnessConfig {
    HarnessConfig {
        seed: 1337,
        dimensions: dimensions.to_vec(),
        base_vector_count: count,
        rank_stability_candidates: candidates,
        noise,
    }
}

fn exact_match() -> MetricEntry {
    MetricEntry::new("exact_match", "probes.rs", |a: &[f64], b: &[f64]| {
        Ok(if a == b { 1.0 } else { 0.0 })
    })
}

fn negative_euclidean() -> MetricEntry {
    MetricEntry::new("neg_euclidean", "probes.rs", |a: &[f64], b: &[f64]| {
        Ok(-a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt())
    })
}

fn run(config: HarnessConfig, metrics: Vec<MetricEntry>) -> Report {
    let pinned = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
    Harness::new(config)
        .with_generated_at(pinned)
        .run(&MetricRegistry::from_entries(metrics))
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn identical_runs_are_byte_identical() {
    let make = || {
        run(
            config(&[8, 16], 10, 4, NoiseSettings::default()),
            vec![exact_match(), negative_euclidean()],
        )
    };
    let first = make().to_json(true).unwrap();
    let second = make().to_json(true).unwrap();
    assert_eq!(first, second);
}

#[test]
fn digest_is_stable_and_seed_sensitive() {
    let base = config(&[8], 6, 3, gaussian_only(&[0.1]));
    let a = run(base.clone(), vec![negative_euclidean()]);
    let b = run(base.clone(), vec![negative_euclidean()]);
    assert_eq!(a.results_digest().unwrap(), b.results_digest().unwrap());

    let reseeded = HarnessConfig { seed: 42, ..base };
    let c = run(reseeded, vec![negative_euclidean()]);
    assert_ne!(a.results_digest().unwrap(), c.results_digest().unwrap());
}

#[test]
fn results_do_not_depend_on_other_metrics() {
    let cfg = config(&[8], 6, 3, gaussian_only(&[0.05, 0.2]));
    let alone = run(cfg.clone(), vec![negative_euclidean()]);
    let together = run(cfg, vec![exact_match(), negative_euclidean()]);
    assert_eq!(
        alone.function("neg_euclidean").unwrap(),
        together.function("neg_euclidean").unwrap()
    );
}

// =============================================================================
// Reference scenarios
// =============================================================================

#[test]
fn identity_indicator_under_small_gaussian() {
    let report = run(config(&[8], 5, 10, gaussian_only(&[0.01])), vec![exact_match()]);
    let function = &report.functions[0];
    assert!(function.errors.is_empty(), "{:?}", function.errors);
    assert_eq!(function.results.len(), 1);

    let record = &function.results[0];
    assert_eq!(record.dimension, 8);
    assert_eq!(record.noise_model, "gaussian");
    assert_eq!(record.samples, 5);
    let mean = record.mean_similarity.unwrap();
    assert!(mean < 1.0);
    // Baseline mean is exactly 1 for the identity indicator.
    assert!((record.mean_drop_from_clean.unwrap() - (1.0 - mean)).abs() < 1e-12);
    assert!((record.top1_preservation.unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn candidate_count_above_corpus_size_is_clamped() {
    let report = run(config(&[8], 5, 50, gaussian_only(&[0.1])), vec![negative_euclidean()]);
    let record = &report.functions[0].results[0];
    let top1 = record.top1_preservation.unwrap();
    let top3 = record.top3_preservation.unwrap();
    assert!(top1 <= top3 && top3 <= 1.0);
    assert_eq!(report.meta.rank_stability_candidates, 50);
}

#[test]
fn distance_degrades_monotonically_with_sigma() {
    let sigmas = [0.01, 0.05, 0.1, 0.2, 0.5];
    let report = run(config(&[64], 20, 5, gaussian_only(&sigmas)), vec![negative_euclidean()]);
    let results = &report.functions[0].results;
    assert_eq!(results.len(), sigmas.len());

    let means: Vec<f64> = results.iter().map(|r| r.mean_similarity.unwrap()).collect();
    for pair in means.windows(2) {
        assert!(pair[0] > pair[1], "means not decreasing: {means:?}");
    }
    let drops: Vec<f64> = results.iter().map(|r| r.mean_drop_from_clean.unwrap()).collect();
    for pair in drops.windows(2) {
        assert!(pair[0] < pair[1], "drops not increasing: {drops:?}");
    }
    assert_eq!(results[0].top1_preservation, Some(1.0));
}

// =============================================================================
// Failure isolation
// =============================================================================

#[test]
fn baseline_failure_skips_only_that_dimension() {
    let picky = MetricEntry::new("picky", "probes.rs", |a: &[f64], _: &[f64]| {
        if a.len() == 8 {
            Err("dimension 8 unsupported".to_string())
        } else {
            Ok(1.0)
        }
    });
    let report = run(config(&[4, 8, 16], 4, 3, gaussian_only(&[0.1, 0.2])), vec![picky]);
    let function = &report.functions[0];

    assert_eq!(function.errors.len(), 1);
    let err = &function.errors[0];
    assert_eq!(err.dimension, 8);
    assert_eq!(err.noise_model, "baseline");
    assert_eq!(err.noise_level, 0.0);
    assert_eq!(err.message, "dimension 8 unsupported");

    let dims: Vec<usize> = function.results.iter().map(|r| r.dimension).collect();
    assert_eq!(dims, vec![4, 4, 16, 16]);
}

#[test]
fn non_finite_baseline_is_reported() {
    let nan = MetricEntry::new("nan", "probes.rs", |_: &[f64], _: &[f64]| Ok(f64::NAN));
    let report = run(config(&[4], 3, 3, gaussian_only(&[0.1])), vec![nan]);
    let function = &report.functions[0];
    assert!(function.results.is_empty());
    assert_eq!(function.errors[0].message, "Non-finite baseline similarity for (v, v)");
}

#[test]
fn noisy_pair_failure_drops_cell_only() {
    // Accepts identical inputs only, so every noisy pair is rejected.
    let strict = MetricEntry::new("strict", "probes.rs", |a: &[f64], b: &[f64]| {
        if a == b { Ok(1.0) } else { Err("inputs differ".to_string()) }
    });
    let report = run(
        config(&[4], 3, 3, gaussian_only(&[0.1, 0.2])),
        vec![strict, negative_euclidean()],
    );
    let strict = report.function("strict").unwrap();
    assert!(strict.results.is_empty());
    assert_eq!(strict.errors.len(), 2);
    assert!(strict.errors.iter().all(|e| e.message == "inputs differ"));

    let healthy = report.function("neg_euclidean").unwrap();
    assert_eq!(healthy.results.len(), 2);
    assert!(healthy.errors.is_empty());
}

#[test]
fn panicking_metric_is_contained() {
    let panicky = MetricEntry::new("panicky", "probes.rs", |a: &[f64], b: &[f64]| {
        if a == b { Ok(1.0) } else { panic!("boom") }
    });
    let report = run(config(&[4], 3, 3, gaussian_only(&[0.1])), vec![panicky]);
    let function = &report.functions[0];
    assert!(function.results.is_empty());
    assert_eq!(function.errors[0].message, "metric panicked: boom");
}

#[test]
fn rank_failure_nulls_preservation_but_keeps_record() {
    // Accepts near pairs (a vector and its lightly perturbed copy) and rejects
    // far pairs, which only rank stability compares.
    let near_only = MetricEntry::new("near_only", "probes.rs", |a: &[f64], b: &[f64]| {
        let linf = a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max);
        if linf < 0.9 { Ok(1.0 - linf) } else { Err("too far".to_string()) }
    });
    let report = run(config(&[8], 5, 5, gaussian_only(&[0.01])), vec![near_only]);
    let function = &report.functions[0];
    assert!(function.errors.is_empty());
    let record = &function.results[0];
    assert!(record.mean_similarity.is_some());
    assert!(record.top1_preservation.is_none());
    assert!(record.top3_preservation.is_none());
}

// =============================================================================
// Degenerate inputs
// =============================================================================

#[test]
fn empty_registry_yields_well_formed_report() {
    let report = run(HarnessConfig::default(), vec![]);
    assert!(report.functions.is_empty());
    let json: serde_json::Value = serde_json::from_str(&report.to_json(false).unwrap()).unwrap();
    assert_eq!(json["functions"], serde_json::json!([]));
    assert_eq!(json["meta"]["seed"], 1337);
    assert_eq!(json["meta"]["generatedAt"], "2024-05-06T07:08:09.000Z");
}

#[test]
fn unknown_model_yields_error_without_record() {
    let noise = NoiseSettings {
        extra: vec![NoiseConfig::new("pink", 0.1)],
        ..gaussian_only(&[0.1])
    };
    let report = run(config(&[8], 4, 3, noise), vec![negative_euclidean()]);
    let function = &report.functions[0];
    assert_eq!(function.results.len(), 1);
    assert_eq!(function.errors.len(), 1);
    assert_eq!(function.errors[0].noise_model, "pink");
    assert_eq!(function.errors[0].message, "Unknown noise model: pink");
}

#[test]
fn functions_sorted_by_name_and_records_by_grid_order() {
    let noise = NoiseSettings {
        gaussian_sigmas: vec![0.2, 0.05],
        uniform_amplitudes: vec![0.1],
        ..NoiseSettings::none()
    };
    let report = run(
        config(&[16, 4], 4, 3, noise),
        vec![negative_euclidean(), exact_match()],
    );
    let names: Vec<&str> = report.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["exact_match", "neg_euclidean"]);

    let keys: Vec<(usize, &str, f64)> = report.functions[1]
        .results
        .iter()
        .map(|r| (r.dimension, r.noise_model.as_str(), r.noise_level))
        .collect();
    assert_eq!(
        keys,
        vec![
            (4, "gaussian", 0.05),
            (4, "gaussian", 0.2),
            (4, "uniform", 0.1),
            (16, "gaussian", 0.05),
            (16, "gaussian", 0.2),
            (16, "uniform", 0.1),
        ]
    );
}
