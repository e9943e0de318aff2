//! Machine-readable robustness report.
//!
//! Field names serialize in camelCase. Every optional numeric field is
//! `null` when absent or non-finite, never `NaN`.

use std::cmp::Ordering;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{HarnessConfig, NoiseSettings};
use crate::noise::NoiseConfig;
use crate::rank_stability::RankStabilityResult;
use crate::stats::SummaryStats;

/// Pseudo model name used for baseline failures.
pub const BASELINE_MODEL: &str = "baseline";

// =============================================================================
// Report types
// =============================================================================

/// Full report for one harness run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,
    /// One entry per metric, sorted by name.
    pub functions: Vec<FunctionReport>,
}

/// Run parameters echoed into the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    /// ISO-8601 UTC timestamp with millisecond precision.
    pub generated_at: String,
    pub seed: u32,
    pub dimensions: Vec<usize>,
    pub noise_models: NoiseModelTable,
    pub base_vector_count: usize,
    pub rank_stability_candidates: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseModelTable {
    pub gaussian: GaussianParams,
    pub uniform: UniformParams,
    pub sparse: SparseParams,
    pub signflip: SignFlipParams,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<NoiseConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianParams {
    pub sigmas: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformParams {
    pub amplitudes: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseParams {
    pub fractions: Vec<f64>,
    pub perturbation_scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignFlipParams {
    pub fractions: Vec<f64>,
}

impl From<&NoiseSettings> for NoiseModelTable {
    fn from(noise: &NoiseSettings) -> Self {
        Self {
            gaussian: GaussianParams {
                sigmas: noise.gaussian_sigmas.clone(),
            },
            uniform: UniformParams {
                amplitudes: noise.uniform_amplitudes.clone(),
            },
            sparse: SparseParams {
                fractions: noise.sparse_fractions.clone(),
                perturbation_scale: noise.sparse_perturbation_scale,
            },
            signflip: SignFlipParams {
                fractions: noise.signflip_fractions.clone(),
            },
            extra: noise.extra.clone(),
        }
    }
}

impl ReportMeta {
    #[must_use]
    pub fn new(config: &HarnessConfig, generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at: format_timestamp(generated_at),
            seed: config.seed,
            dimensions: config.dimensions.clone(),
            noise_models: NoiseModelTable::from(&config.noise),
            base_vector_count: config.base_vector_count,
            rank_stability_candidates: config.rank_stability_candidates,
        }
    }
}

/// Format as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Results and errors for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionReport {
    pub name: String,
    pub file: String,
    pub results: Vec<EvaluationRecord>,
    pub errors: Vec<ErrorEntry>,
}

impl FunctionReport {
    #[must_use]
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            results: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Order records by dimension, then model name, then level.
    pub fn sort_results(&mut self) {
        self.results.sort_by(EvaluationRecord::grid_order);
    }
}

/// Outcome of one (metric, dimension, model, level) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub dimension: usize,
    pub noise_model: String,
    pub noise_level: f64,
    pub mean_similarity: Option<f64>,
    pub std_similarity: Option<f64>,
    pub median_similarity: Option<f64>,
    pub min_similarity: Option<f64>,
    pub max_similarity: Option<f64>,
    pub mean_drop_from_clean: Option<f64>,
    pub top1_preservation: Option<f64>,
    pub top3_preservation: Option<f64>,
    pub samples: usize,
}

impl EvaluationRecord {
    /// Assemble a record, mapping every non-finite number to `None`.
    #[must_use]
    pub fn new(
        cell: &NoiseConfig,
        dimension: usize,
        noisy: &SummaryStats,
        mean_drop: Option<f64>,
        rank: Option<RankStabilityResult>,
        samples: usize,
    ) -> Self {
        Self {
            dimension,
            noise_model: cell.model.clone(),
            noise_level: cell.level,
            mean_similarity: safe_number(noisy.mean),
            std_similarity: safe_number(noisy.std),
            median_similarity: safe_number(noisy.median),
            min_similarity: safe_number(noisy.min),
            max_similarity: safe_number(noisy.max),
            mean_drop_from_clean: safe_number(mean_drop),
            top1_preservation: safe_number(rank.map(|r| r.top1_preservation)),
            top3_preservation: safe_number(rank.map(|r| r.top3_preservation)),
            samples,
        }
    }

    fn grid_order(a: &Self, b: &Self) -> Ordering {
        a.dimension
            .cmp(&b.dimension)
            .then_with(|| a.noise_model.cmp(&b.noise_model))
            .then_with(|| a.noise_level.total_cmp(&b.noise_level))
    }
}

/// A cell (or a whole dimension, for baseline failures) that produced no record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub dimension: usize,
    pub noise_model: String,
    pub noise_level: f64,
    pub message: String,
}

impl ErrorEntry {
    #[must_use]
    pub fn cell(dimension: usize, cell: &NoiseConfig, message: impl Into<String>) -> Self {
        Self {
            dimension,
            noise_model: cell.model.clone(),
            noise_level: cell.level,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn baseline(dimension: usize, message: impl Into<String>) -> Self {
        Self {
            dimension,
            noise_model: BASELINE_MODEL.to_string(),
            noise_level: 0.0,
            message: message.into(),
        }
    }
}

/// `Some(x)` only when `x` is finite.
#[must_use]
pub fn safe_number(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

// =============================================================================
// Output
// =============================================================================

#[derive(Serialize)]
struct DigestView<'a> {
    seed: u32,
    functions: &'a [FunctionReport],
}

impl Report {
    /// Sort each metric's records, then the metrics themselves by name.
    /// The metric sort is stable, so same-named entries keep registry order.
    pub fn finalize(&mut self) {
        for function in &mut self.functions {
            function.sort_results();
        }
        self.functions.sort_by(|a, b| a.name.cmp(&b.name));
    }

    pub fn to_json(&self, pretty: bool) -> crate::Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Write the JSON report to `path`, creating parent directories.
    pub fn write_to(&self, path: &Path, pretty: bool) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut json = self.to_json(pretty)?;
        json.push('\n');
        std::fs::write(path, json)?;
        Ok(())
    }

    /// SHA-256 over the seed and per-function results. Independent of
    /// `generatedAt`, so two runs of the same grid share a digest.
    pub fn results_digest(&self) -> crate::Result<String> {
        let view = DigestView {
            seed: self.meta.seed,
            functions: &self.functions,
        };
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(&view)?);
        Ok(hex::encode(hasher.finalize()))
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.functions.iter().map(|f| f.results.len()).sum()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.functions.iter().map(|f| f.errors.len()).sum()
    }

    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FunctionReport> {
        self.functions.iter().find(|f| f.name == name)
    }
}
