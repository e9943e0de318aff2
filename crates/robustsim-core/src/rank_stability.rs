//! Nearest-neighbor preservation under noise.
//!
//! For every corpus vector `v_i` we draw a small candidate pool containing
//! `i` plus random other indices, confirm that the metric ranks `v_i` first
//! against its own pool without noise, then perturb `v_i` and check whether
//! it still ranks first (top-1) or within the first three (top-3).
//!
//! Indices whose clean ranking already misses `i` are skipped: the metric
//! cannot self-identify there even without noise, so they say nothing about
//! robustness.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::corpus::BaseCorpus;
use crate::metric::{MetricEntry, MetricFailure};
use crate::noise::NoiseInjector;
use crate::prng::XorShift32;

/// Rank cutoff for the wider preservation rate.
const TOP_K_WIDE: usize = 3;

/// Preservation rates in `[0, 1]`, with `top1_preservation <= top3_preservation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankStabilityResult {
    pub top1_preservation: f64,
    pub top3_preservation: f64,
}

/// Raw counters behind a [`RankStabilityResult`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankCounts {
    pub trials: usize,
    pub top1: usize,
    pub top3: usize,
    /// Indices skipped because the clean ranking did not put them first.
    pub skipped: usize,
}

impl RankCounts {
    /// Preservation rates, or `None` when no trial was counted.
    #[must_use]
    pub fn rates(&self) -> Option<RankStabilityResult> {
        if self.trials == 0 {
            return None;
        }
        let trials = self.trials as f64;
        Some(RankStabilityResult {
            top1_preservation: self.top1 as f64 / trials,
            top3_preservation: self.top3 as f64 / trials,
        })
    }
}

/// Rank-stability analysis for one grid cell.
#[derive(Debug, Clone, Copy)]
pub struct RankStabilityAnalyzer {
    candidate_count: usize,
}

impl RankStabilityAnalyzer {
    /// `candidate_count` is the pool size per query, clamped to the corpus
    /// size at analysis time.
    #[must_use]
    pub fn new(candidate_count: usize) -> Self {
        Self { candidate_count }
    }

    /// Run the analysis, returning `None` if the metric failed on any
    /// candidate pair or no index produced a trial.
    pub fn analyze(
        &self,
        metric: &MetricEntry,
        corpus: &BaseCorpus,
        injector: &NoiseInjector,
        rng: &mut XorShift32,
    ) -> Option<RankStabilityResult> {
        match self.count(metric, corpus, injector, rng) {
            Ok(counts) => counts.rates(),
            Err(failure) => {
                tracing::debug!(metric = %metric.name, error = %failure, "Rank stability aborted");
                None
            }
        }
    }

    /// Counting pass behind [`Self::analyze`].
    pub fn count(
        &self,
        metric: &MetricEntry,
        corpus: &BaseCorpus,
        injector: &NoiseInjector,
        rng: &mut XorShift32,
    ) -> Result<RankCounts, MetricFailure> {
        let n = corpus.len();
        let mut counts = RankCounts::default();
        if n == 0 {
            return Ok(counts);
        }
        let pool_size = self.candidate_count.min(n);
        let vectors = corpus.vectors();

        for (i, query) in vectors.iter().enumerate() {
            let candidates = draw_candidates(i, n, pool_size, rng);

            let clean = score_candidates(metric, query, vectors, &candidates)?;
            if rank_order(&clean).first() != Some(&0) {
                counts.skipped += 1;
                continue;
            }

            let noisy_query = injector.apply(query, rng);
            let noisy = score_candidates(metric, &noisy_query, vectors, &candidates)?;
            let position = rank_order(&noisy)
                .iter()
                .position(|&slot| slot == 0)
                .unwrap_or(usize::MAX);

            counts.trials += 1;
            if position == 0 {
                counts.top1 += 1;
            }
            if position < TOP_K_WIDE {
                counts.top3 += 1;
            }
        }

        Ok(counts)
    }
}

/// Candidate indices for query `i`: `i` first, then distinct uniform draws
/// from `0..n` until the pool holds `pool_size` entries.
///
/// `pool_size` must not exceed `n`, otherwise the loop cannot terminate.
pub fn draw_candidates(i: usize, n: usize, pool_size: usize, rng: &mut XorShift32) -> Vec<usize> {
    debug_assert!(pool_size <= n, "candidate pool larger than corpus");
    let mut candidates = Vec::with_capacity(pool_size);
    candidates.push(i);
    while candidates.len() < pool_size {
        let idx = rng.next_index(n);
        if !candidates.contains(&idx) {
            candidates.push(idx);
        }
    }
    candidates
}

fn score_candidates(
    metric: &MetricEntry,
    query: &[f64],
    vectors: &[Vec<f64>],
    candidates: &[usize],
) -> Result<Vec<f64>, MetricFailure> {
    candidates
        .iter()
        .map(|&idx| metric.score(query, &vectors[idx]))
        .collect()
}

/// Candidate slots ordered by score descending. Ties keep candidate order.
fn rank_order(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));
    order
}
