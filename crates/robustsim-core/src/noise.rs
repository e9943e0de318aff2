//! Noise models used to perturb corpus vectors.
//!
//! Each model is a pure function of `(vector, level, rng)`. All randomness
//! comes from the caller's stream, so the same stream state always yields the
//! same perturbation.
//!
//! | model      | level meaning                         |
//! |------------|---------------------------------------|
//! | `gaussian` | standard deviation of additive noise  |
//! | `uniform`  | half-width of additive uniform noise  |
//! | `sparse`   | fraction of coordinates perturbed     |
//! | `signflip` | fraction of coordinates negated       |
//!
//! Sparse and sign-flip pick indices with replacement, so the fraction is an
//! upper bound on how many coordinates actually change.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::prng::XorShift32;

/// Lower clamp for the first Box–Muller uniform, keeps `ln` finite.
const BOX_MULLER_MIN_UNIFORM: f64 = 1e-12;

/// Closed set of supported perturbation models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseModel {
    Gaussian,
    Uniform,
    Sparse,
    #[serde(rename = "signflip")]
    SignFlip,
}

impl NoiseModel {
    /// Enumeration order used when building the grid.
    pub const ALL: [Self; 4] = [Self::Gaussian, Self::Uniform, Self::Sparse, Self::SignFlip];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gaussian => "gaussian",
            Self::Uniform => "uniform",
            Self::Sparse => "sparse",
            Self::SignFlip => "signflip",
        }
    }
}

impl fmt::Display for NoiseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoiseModel {
    type Err = NoiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gaussian" => Ok(Self::Gaussian),
            "uniform" => Ok(Self::Uniform),
            "sparse" => Ok(Self::Sparse),
            "signflip" => Ok(Self::SignFlip),
            other => Err(NoiseError::UnknownModel(other.to_string())),
        }
    }
}

/// Configuration-level noise failure. Never a metric failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoiseError {
    #[error("Unknown noise model: {0}")]
    UnknownModel(String),
}

/// One `(model, level)` grid axis value.
///
/// The model is kept as a name so configurations can carry models this build
/// does not know about; they surface as [`NoiseError::UnknownModel`] when the
/// cell is evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    pub model: String,
    pub level: f64,
}

impl NoiseConfig {
    #[must_use]
    pub fn new(model: impl Into<String>, level: f64) -> Self {
        Self {
            model: model.into(),
            level,
        }
    }

    #[must_use]
    pub fn known(model: NoiseModel, level: f64) -> Self {
        Self::new(model.as_str(), level)
    }

    /// Resolve the model name.
    pub fn resolve(&self) -> Result<NoiseModel, NoiseError> {
        self.model.parse()
    }
}

impl fmt::Display for NoiseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.model, self.level)
    }
}

/// Resolved noise model plus its parameters, ready to apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseInjector {
    pub model: NoiseModel,
    pub level: f64,
    /// Magnitude of sparse perturbations, independent of `level`.
    pub sparse_scale: f64,
}

impl NoiseInjector {
    pub fn from_config(config: &NoiseConfig, sparse_scale: f64) -> Result<Self, NoiseError> {
        Ok(Self {
            model: config.resolve()?,
            level: config.level,
            sparse_scale,
        })
    }

    /// Perturb `vector`, returning a new vector.
    #[must_use]
    pub fn apply(&self, vector: &[f64], rng: &mut XorShift32) -> Vec<f64> {
        match self.model {
            NoiseModel::Gaussian => apply_gaussian(vector, self.level, rng),
            NoiseModel::Uniform => apply_uniform(vector, self.level, rng),
            NoiseModel::Sparse => apply_sparse(vector, self.level, self.sparse_scale, rng),
            NoiseModel::SignFlip => apply_sign_flip(vector, self.level, rng),
        }
    }
}

/// Standard normal draw via Box–Muller; consumes two uniforms.
fn standard_normal(rng: &mut XorShift32) -> f64 {
    let u1 = rng.next_f64().max(BOX_MULLER_MIN_UNIFORM);
    let u2 = rng.next_f64();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Add `N(0, sigma)` to every coordinate.
#[must_use]
pub fn apply_gaussian(vector: &[f64], sigma: f64, rng: &mut XorShift32) -> Vec<f64> {
    vector
        .iter()
        .map(|&x| x + standard_normal(rng) * sigma)
        .collect()
}

/// Add uniform noise in `[-amplitude, amplitude)` to every coordinate.
#[must_use]
pub fn apply_uniform(vector: &[f64], amplitude: f64, rng: &mut XorShift32) -> Vec<f64> {
    vector
        .iter()
        .map(|&x| x + rng.next_signed_unit() * amplitude)
        .collect()
}

/// Number of index draws for fraction-based models: `max(1, floor(dim * fraction))`.
#[must_use]
pub fn affected_count(dimension: usize, fraction: f64) -> usize {
    ((dimension as f64 * fraction).floor() as usize).max(1)
}

/// Perturb `affected_count` randomly chosen coordinates by up to `scale`.
#[must_use]
pub fn apply_sparse(vector: &[f64], fraction: f64, scale: f64, rng: &mut XorShift32) -> Vec<f64> {
    let mut out = vector.to_vec();
    if out.is_empty() {
        return out;
    }
    for _ in 0..affected_count(out.len(), fraction) {
        let idx = rng.next_index(out.len());
        let delta = rng.next_signed_unit() * scale;
        out[idx] += delta;
    }
    out
}

/// Negate `affected_count` randomly chosen coordinates. A coordinate drawn an
/// even number of times ends up unchanged.
#[must_use]
pub fn apply_sign_flip(vector: &[f64], fraction: f64, rng: &mut XorShift32) -> Vec<f64> {
    let mut out = vector.to_vec();
    if out.is_empty() {
        return out;
    }
    for _ in 0..affected_count(out.len(), fraction) {
        let idx = rng.next_index(out.len());
        out[idx] = -out[idx];
    }
    out
}
