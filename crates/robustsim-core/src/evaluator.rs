//! Clean and noisy score samples for one (metric, dimension) pair.

use crate::corpus::BaseCorpus;
use crate::metric::{MetricEntry, MetricFailure};
use crate::noise::{NoiseError, NoiseInjector};
use crate::prng::XorShift32;

/// Why a grid cell produced no score sample.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CellFailure {
    /// The noise configuration could not be resolved.
    #[error(transparent)]
    Noise(#[from] NoiseError),

    /// The metric failed on a (clean, noisy) pair.
    #[error("{}", noisy_failure_message(.0))]
    Metric(MetricFailure),

    /// The corpus was empty, so no sample exists.
    #[error("No valid samples")]
    NoSamples,
}

/// Baseline self-similarity failure at one corpus index.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}", baseline_failure_message(.failure))]
pub struct BaselineFailure {
    pub index: usize,
    pub failure: MetricFailure,
}

fn baseline_failure_message(failure: &MetricFailure) -> String {
    match failure {
        MetricFailure::NonFinite(_) => "Non-finite baseline similarity for (v, v)".to_string(),
        other => other.to_string(),
    }
}

fn noisy_failure_message(failure: &MetricFailure) -> String {
    match failure {
        MetricFailure::NonFinite(_) => "Non-finite similarity for noisy pair".to_string(),
        other => other.to_string(),
    }
}

/// Score `f(v, v)` for every corpus vector, stopping at the first failure.
pub fn baseline_scores(
    metric: &MetricEntry,
    corpus: &BaseCorpus,
) -> Result<Vec<f64>, BaselineFailure> {
    corpus
        .iter()
        .enumerate()
        .map(|(index, v)| {
            metric
                .score(v, v)
                .map_err(|failure| BaselineFailure { index, failure })
        })
        .collect()
}

/// Score `f(v, noisy(v))` for every corpus vector in order, drawing noise
/// from `rng`. Stops at the first failure.
pub fn noisy_scores(
    metric: &MetricEntry,
    corpus: &BaseCorpus,
    injector: &NoiseInjector,
    rng: &mut XorShift32,
) -> Result<Vec<f64>, CellFailure> {
    let mut scores = Vec::with_capacity(corpus.len());
    for v in corpus.iter() {
        let noisy = injector.apply(v, rng);
        let score = metric.score(v, &noisy).map_err(CellFailure::Metric)?;
        scores.push(score);
    }
    if scores.is_empty() {
        return Err(CellFailure::NoSamples);
    }
    Ok(scores)
}
