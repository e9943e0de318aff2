//! Deterministic base-vector corpus, built once per dimension.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::prng::{Label, XorShift32, labeled_stream};

/// Label prefix for corpus streams.
const CORPUS_STREAM_TAG: &str = "baseVectors";

/// Read-only pool of reference vectors for one dimension.
///
/// Every metric and noise configuration in a run sees the same corpus for a
/// given dimension, which keeps cross-metric comparisons fair.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseCorpus {
    dimension: usize,
    vectors: Vec<Vec<f64>>,
}

impl BaseCorpus {
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    #[must_use]
    pub fn vectors(&self) -> &[Vec<f64>] {
        &self.vectors
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.vectors.iter().map(Vec::as_slice)
    }
}

/// Draw one vector of `dimension` values uniform in `[-1, 1)`.
pub fn generate_vector(dimension: usize, rng: &mut XorShift32) -> Vec<f64> {
    (0..dimension).map(|_| rng.next_signed_unit()).collect()
}

/// Build the corpus for `dimension` from the `["baseVectors", dimension]`
/// stream of `seed`.
#[must_use]
pub fn generate_base_vectors(seed: u32, dimension: usize, count: usize) -> BaseCorpus {
    let mut rng = labeled_stream(seed, &[Label::Text(CORPUS_STREAM_TAG), Label::from(dimension)]);
    let vectors = (0..count)
        .map(|_| generate_vector(dimension, &mut rng))
        .collect();
    BaseCorpus { dimension, vectors }
}

/// Per-run memo of corpora keyed by dimension.
///
/// A corpus is fully generated before it is inserted and is only ever handed
/// out behind an `Arc`, so readers never observe a partially built pool.
#[derive(Debug)]
pub struct CorpusCache {
    seed: u32,
    count: usize,
    corpora: BTreeMap<usize, Arc<BaseCorpus>>,
}

impl CorpusCache {
    #[must_use]
    pub fn new(seed: u32, count: usize) -> Self {
        Self {
            seed,
            count,
            corpora: BTreeMap::new(),
        }
    }

    /// Return the corpus for `dimension`, generating it on first use.
    pub fn get_or_build(&mut self, dimension: usize) -> Arc<BaseCorpus> {
        let (seed, count) = (self.seed, self.count);
        Arc::clone(self.corpora.entry(dimension).or_insert_with(|| {
            tracing::debug!(dimension, count, "Generating base corpus");
            Arc::new(generate_base_vectors(seed, dimension, count))
        }))
    }

    /// Number of dimensions generated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.corpora.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.corpora.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_shape() {
        let corpus = generate_base_vectors(1337, 16, 7);
        assert_eq!(corpus.len(), 7);
        assert_eq!(corpus.dimension(), 16);
        assert!(corpus.iter().all(|v| v.len() == 16));
    }

    #[test]
    fn values_in_signed_unit_range() {
        let corpus = generate_base_vectors(1337, 32, 20);
        for v in corpus.iter() {
            for &x in v {
                assert!((-1.0..1.0).contains(&x), "value out of range: {x}");
            }
        }
    }

    #[test]
    fn deterministic_per_seed_and_dimension() {
        assert_eq!(
            generate_base_vectors(1337, 8, 5),
            generate_base_vectors(1337, 8, 5)
        );
        assert_ne!(
            generate_base_vectors(1337, 8, 5),
            generate_base_vectors(1338, 8, 5)
        );
    }

    #[test]
    fn different_dimensions_use_different_streams() {
        let a = generate_base_vectors(1337, 8, 1);
        let b = generate_base_vectors(1337, 9, 1);
        assert_ne!(a.vectors()[0][..8], b.vectors()[0][..8]);
    }

    #[test]
    fn cache_returns_same_instance() {
        let mut cache = CorpusCache::new(1337, 4);
        let first = cache.get_or_build(8);
        let second = cache.get_or_build(8);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_builds_each_dimension_once() {
        let mut cache = CorpusCache::new(1, 2);
        for dimension in [4, 8, 4] {
            let _ = cache.get_or_build(dimension);
        }
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_count_yields_empty_corpus() {
        let corpus = generate_base_vectors(1337, 8, 0);
        assert!(corpus.is_empty());
    }
}
