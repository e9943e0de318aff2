//! Descriptive statistics over score samples.

use serde::{Deserialize, Serialize};

/// Summary of one score sample. Every field is `None` for an empty sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: Option<f64>,
    /// Sample standard deviation (n − 1 denominator); 0 for a single value.
    pub std: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl SummaryStats {
    /// All-null summary.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            mean: None,
            std: None,
            median: None,
            min: None,
            max: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mean.is_none()
    }
}

/// Reduce `samples` to a [`SummaryStats`]. The input is not reordered.
#[must_use]
pub fn summarize(samples: &[f64]) -> SummaryStats {
    let n = samples.len();
    if n == 0 {
        return SummaryStats::empty();
    }

    let mut sum = 0.0;
    let mut min = samples[0];
    let mut max = samples[0];
    for &v in samples {
        sum += v;
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    let mean = sum / n as f64;

    let std = if n > 1 {
        let var_sum: f64 = samples.iter().map(|v| (v - mean) * (v - mean)).sum();
        (var_sum / (n - 1) as f64).sqrt()
    } else {
        0.0
    };

    SummaryStats {
        mean: Some(mean),
        std: Some(std),
        median: Some(median(samples)),
        min: Some(min),
        max: Some(max),
    }
}

/// Median of a non-empty sample, computed on a sorted copy.
fn median(samples: &[f64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Difference of two optional means (`clean − noisy`).
///
/// Positive values mean the noisy scores dropped, assuming higher scores
/// mean "more similar". For distance-valued metrics the sign is inverted.
#[must_use]
pub fn mean_drop(clean_mean: Option<f64>, noisy_mean: Option<f64>) -> Option<f64> {
    match (clean_mean, noisy_mean) {
        (Some(clean), Some(noisy)) => Some(clean - noisy),
        _ => None,
    }
}
