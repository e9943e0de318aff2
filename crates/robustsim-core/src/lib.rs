//! robustsim-core: Core library for robustsim
//!
//! This crate measures how well vector similarity functions tolerate noise.
//! It generates deterministic random corpora, perturbs them with several
//! noise models, and reports how each metric's scores and nearest-neighbor
//! rankings degrade.
//!
//! # Architecture
//!
//! ```text
//! HarnessConfig → noise_grid ─┐
//!                             ↓
//! MetricRegistry → Harness::run → baseline → noisy samples → stats
//!                                                ↓
//!                                         rank stability → Report (JSON)
//! ```
//!
//! # Modules
//!
//! - `prng`: xorshift32 generator and label-derived stream seeds
//! - `corpus`: Deterministic base vectors per dimension
//! - `noise`: Gaussian, uniform, sparse and sign-flip perturbations
//! - `metric`: Metric entries and the registry handed to the harness
//! - `evaluator`: Clean and noisy score samples
//! - `stats`: Summary statistics
//! - `rank_stability`: Top-1 / top-3 neighbor preservation
//! - `harness`: Grid enumeration and the evaluation loop
//! - `report`: Report types and JSON output
//! - `config`: Configuration management
//! - `logging`: Structured logging setup
//! - `error`: Setup-level error types
//!
//! Every random draw comes from a stream seeded by the run seed plus a label
//! tuple, so a report depends only on the configuration and the registry.
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod config;
pub mod corpus;
pub mod error;
pub mod evaluator;
pub mod harness;
pub mod logging;
pub mod metric;
pub mod noise;
pub mod prng;
pub mod rank_stability;
pub mod report;
pub mod stats;

pub use config::{Config, HarnessConfig, NoiseSettings};
pub use error::{ConfigError, Error, Result};
pub use harness::{Harness, noise_grid};
pub use metric::{MetricEntry, MetricRegistry};
pub use noise::{NoiseConfig, NoiseModel};
pub use report::Report;
