//! Evaluation orchestrator.
//!
//! Walks the full grid (metric × dimension × noise cell) sequentially and
//! folds every outcome into a [`Report`]. Per-cell failures become error
//! entries; nothing aborts the run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{HarnessConfig, NoiseSettings};
use crate::corpus::{BaseCorpus, CorpusCache};
use crate::evaluator::{CellFailure, baseline_scores, noisy_scores};
use crate::metric::{MetricEntry, MetricRegistry};
use crate::noise::{NoiseConfig, NoiseInjector, NoiseModel};
use crate::prng::{CellLabels, StreamPurpose};
use crate::rank_stability::RankStabilityAnalyzer;
use crate::report::{ErrorEntry, EvaluationRecord, FunctionReport, Report, ReportMeta};
use crate::stats::{mean_drop, summarize};

/// Enumerate noise cells: every gaussian level, then uniform, sparse and
/// signflip in configured order, then any extra cells.
#[must_use]
pub fn noise_grid(noise: &NoiseSettings) -> Vec<NoiseConfig> {
    NoiseModel::ALL
        .iter()
        .flat_map(|&model| {
            noise
                .levels(model)
                .iter()
                .map(move |&level| NoiseConfig::known(model, level))
        })
        .chain(noise.extra.iter().cloned())
        .collect()
}

/// One (metric, dimension, noise cell) coordinate of the grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub metric: String,
    pub file: String,
    pub dimension: usize,
    pub noise_model: String,
    pub noise_level: f64,
}

/// Deterministic robustness harness.
#[derive(Debug, Clone)]
pub struct Harness {
    config: HarnessConfig,
    generated_at: Option<DateTime<Utc>>,
}

impl Harness {
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            generated_at: None,
        }
    }

    /// Pin `meta.generatedAt` instead of reading the clock at run time.
    #[must_use]
    pub fn with_generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Every cell `run` would evaluate, in evaluation order.
    #[must_use]
    pub fn grid_cells(&self, registry: &MetricRegistry) -> Vec<GridCell> {
        let grid = noise_grid(&self.config.noise);
        let mut cells = Vec::new();
        for metric in registry.iter() {
            for &dimension in &self.config.dimensions {
                cells.extend(grid.iter().map(|cell| GridCell {
                    metric: metric.name.clone(),
                    file: metric.file.clone(),
                    dimension,
                    noise_model: cell.model.clone(),
                    noise_level: cell.level,
                }));
            }
        }
        cells
    }

    /// Evaluate every metric in `registry` over the configured grid.
    pub fn run(&self, registry: &MetricRegistry) -> Report {
        let generated_at = self.generated_at.unwrap_or_else(Utc::now);
        let meta = ReportMeta::new(&self.config, generated_at);

        if registry.is_empty() {
            tracing::warn!("No metrics registered; report will be empty");
        }

        let grid = noise_grid(&self.config.noise);
        let analyzer = RankStabilityAnalyzer::new(self.config.rank_stability_candidates);
        let mut corpora = CorpusCache::new(self.config.seed, self.config.base_vector_count);
        let mut functions = Vec::with_capacity(registry.len());

        for metric in registry.iter() {
            tracing::info!(
                metric = %metric.name,
                file = %metric.file,
                dimensions = self.config.dimensions.len(),
                cells = grid.len(),
                "Evaluating metric"
            );
            let mut function = FunctionReport::new(&metric.name, &metric.file);
            for &dimension in &self.config.dimensions {
                let corpus = corpora.get_or_build(dimension);
                self.evaluate_dimension(metric, &corpus, &grid, &analyzer, &mut function);
            }
            functions.push(function);
        }

        let mut report = Report { meta, functions };
        report.finalize();

        tracing::info!(
            metrics = report.functions.len(),
            records = report.record_count(),
            errors = report.error_count(),
            "Evaluation complete"
        );
        report
    }

    fn evaluate_dimension(
        &self,
        metric: &MetricEntry,
        corpus: &BaseCorpus,
        grid: &[NoiseConfig],
        analyzer: &RankStabilityAnalyzer,
        function: &mut FunctionReport,
    ) {
        let dimension = corpus.dimension();
        let baseline = match baseline_scores(metric, corpus) {
            Ok(scores) if scores.is_empty() => {
                tracing::debug!(
                    metric = %metric.name,
                    dimension,
                    "Empty corpus; skipping dimension"
                );
                return;
            }
            Ok(scores) => summarize(&scores),
            Err(failure) => {
                tracing::warn!(
                    metric = %metric.name,
                    dimension,
                    index = failure.index,
                    error = %failure,
                    "Baseline failed; skipping dimension"
                );
                function
                    .errors
                    .push(ErrorEntry::baseline(dimension, failure.to_string()));
                return;
            }
        };

        for cell in grid {
            match self.evaluate_cell(metric, corpus, cell, baseline.mean, analyzer) {
                Ok(record) => {
                    tracing::debug!(
                        metric = %metric.name,
                        dimension,
                        model = %cell.model,
                        level = cell.level,
                        samples = record.samples,
                        "Cell evaluated"
                    );
                    function.results.push(record);
                }
                Err(failure) => {
                    tracing::warn!(
                        metric = %metric.name,
                        dimension,
                        model = %cell.model,
                        level = cell.level,
                        error = %failure,
                        "Cell failed"
                    );
                    function
                        .errors
                        .push(ErrorEntry::cell(dimension, cell, failure.to_string()));
                }
            }
        }
    }

    fn evaluate_cell(
        &self,
        metric: &MetricEntry,
        corpus: &BaseCorpus,
        cell: &NoiseConfig,
        baseline_mean: Option<f64>,
        analyzer: &RankStabilityAnalyzer,
    ) -> Result<EvaluationRecord, CellFailure> {
        let injector = NoiseInjector::from_config(cell, self.config.noise.sparse_perturbation_scale)?;

        let seed = self.config.seed;
        let dimension = corpus.dimension();

        let mut noise_rng =
            cell_labels(StreamPurpose::Noise, metric, dimension, cell).stream(seed);
        let scores = noisy_scores(metric, corpus, &injector, &mut noise_rng)?;
        let noisy = summarize(&scores);

        let mut rank_rng =
            cell_labels(StreamPurpose::RankStability, metric, dimension, cell).stream(seed);
        let rank = analyzer.analyze(metric, corpus, &injector, &mut rank_rng);

        Ok(EvaluationRecord::new(
            cell,
            dimension,
            &noisy,
            mean_drop(baseline_mean, noisy.mean),
            rank,
            scores.len(),
        ))
    }
}

fn cell_labels<'a>(
    purpose: StreamPurpose,
    metric: &'a MetricEntry,
    dimension: usize,
    cell: &'a NoiseConfig,
) -> CellLabels<'a> {
    CellLabels {
        purpose,
        metric: &metric.name,
        file: &metric.file,
        dimension,
        model: &cell.model,
        level: cell.level,
    }
}
