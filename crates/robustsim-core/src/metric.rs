//! Metric registry and single-call evaluation.
//!
//! A metric is any pure function of two equal-length vectors returning a
//! score. The harness does not know or care what the score means; it only
//! distinguishes a finite score from a failure.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Outcome of one metric call as reported by the metric itself.
pub type MetricResult = Result<f64, String>;

/// Boxed metric function.
pub type MetricFn = dyn Fn(&[f64], &[f64]) -> MetricResult + Send + Sync;

/// Why a single metric call did not produce a usable score.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricFailure {
    /// The metric returned an error.
    #[error("{0}")]
    Rejected(String),

    /// The metric panicked.
    #[error("metric panicked: {0}")]
    Panicked(String),

    /// The metric returned NaN or an infinity.
    #[error("non-finite score: {0}")]
    NonFinite(f64),
}

/// One registered metric.
#[derive(Clone)]
pub struct MetricEntry {
    pub name: String,
    /// Origin label (source file or module path) used to disambiguate
    /// metrics that share a name.
    pub file: String,
    func: Arc<MetricFn>,
}

impl MetricEntry {
    pub fn new<F>(name: impl Into<String>, file: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[f64], &[f64]) -> MetricResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            file: file.into(),
            func: Arc::new(func),
        }
    }

    /// Call the metric once, classifying errors, panics and non-finite
    /// scores as failures.
    pub fn score(&self, a: &[f64], b: &[f64]) -> Result<f64, MetricFailure> {
        let outcome = catch_unwind(AssertUnwindSafe(|| (self.func)(a, b)))
            .map_err(|payload| MetricFailure::Panicked(panic_message(payload.as_ref())))?;
        match outcome {
            Ok(score) if score.is_finite() => Ok(score),
            Ok(score) => Err(MetricFailure::NonFinite(score)),
            Err(reason) => Err(MetricFailure::Rejected(reason)),
        }
    }
}

impl fmt::Debug for MetricEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricEntry")
            .field("name", &self.name)
            .field("file", &self.file)
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Ordered, de-duplicated collection of metrics.
///
/// Entries are unique by `(file, name)` (first registration wins) and kept
/// sorted by `(name, file)`.
#[derive(Debug, Clone, Default)]
pub struct MetricRegistry {
    entries: Vec<MetricEntry>,
}

impl MetricRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from arbitrary entries.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = MetricEntry>) -> Self {
        let mut registry = Self::new();
        for entry in entries {
            registry.insert(entry);
        }
        registry
    }

    /// Insert an entry. Returns `false` if `(file, name)` was already present.
    pub fn insert(&mut self, entry: MetricEntry) -> bool {
        if self.contains(&entry.file, &entry.name) {
            tracing::debug!(name = %entry.name, file = %entry.file, "Duplicate metric ignored");
            return false;
        }
        let pos = self.entries.partition_point(|e| {
            (e.name.as_str(), e.file.as_str()) <= (entry.name.as_str(), entry.file.as_str())
        });
        self.entries.insert(pos, entry);
        true
    }

    /// Convenience wrapper around [`MetricEntry::new`] + [`Self::insert`].
    pub fn register<F>(&mut self, name: impl Into<String>, file: impl Into<String>, func: F) -> bool
    where
        F: Fn(&[f64], &[f64]) -> MetricResult + Send + Sync + 'static,
    {
        self.insert(MetricEntry::new(name, file, func))
    }

    #[must_use]
    pub fn contains(&self, file: &str, name: &str) -> bool {
        self.entries.iter().any(|e| e.file == file && e.name == name)
    }

    #[must_use]
    pub fn entries(&self) -> &[MetricEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
