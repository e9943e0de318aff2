//! Configuration management for robustsim
//!
//! Handles loading and validation of `robustsim.toml`. Every section and
//! field has a default, so an empty file (or no file at all) yields the
//! standard evaluation grid.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::noise::{NoiseConfig, NoiseModel};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "ROBUSTSIM_CONFIG";

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "robustsim.toml";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {s}. Expected one of: pretty, json")),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Evaluation grid settings
    #[serde(default)]
    pub harness: HarnessConfig,

    /// Report output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Append a copy of the logs to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            log_file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Evaluation grid configuration. Immutable once handed to the harness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Root seed for every derived stream
    pub seed: u32,

    /// Vector dimensions to evaluate, in order
    pub dimensions: Vec<usize>,

    /// Base vectors generated per dimension
    pub base_vector_count: usize,

    /// Candidate pool size for rank stability (clamped to the corpus size)
    pub rank_stability_candidates: usize,

    /// Noise grid
    pub noise: NoiseSettings,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: 1337,
            dimensions: vec![64, 128, 256, 512, 1024, 2048],
            base_vector_count: 100,
            rank_stability_candidates: 10,
            noise: NoiseSettings::default(),
        }
    }
}

/// Noise model parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoiseSettings {
    pub gaussian_sigmas: Vec<f64>,
    pub uniform_amplitudes: Vec<f64>,
    pub sparse_fractions: Vec<f64>,
    /// Magnitude of each sparse perturbation, independent of the fraction
    pub sparse_perturbation_scale: f64,
    pub signflip_fractions: Vec<f64>,
    /// Additional cells evaluated after the standard lists
    pub extra: Vec<NoiseConfig>,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            gaussian_sigmas: vec![0.01, 0.05, 0.1, 0.2, 0.5],
            uniform_amplitudes: vec![0.01, 0.05, 0.1, 0.2, 0.5],
            sparse_fractions: vec![0.01, 0.05, 0.1],
            sparse_perturbation_scale: 0.5,
            signflip_fractions: vec![0.01, 0.05],
            extra: Vec::new(),
        }
    }
}

impl NoiseSettings {
    /// Configured levels for one model.
    #[must_use]
    pub fn levels(&self, model: NoiseModel) -> &[f64] {
        match model {
            NoiseModel::Gaussian => &self.gaussian_sigmas,
            NoiseModel::Uniform => &self.uniform_amplitudes,
            NoiseModel::Sparse => &self.sparse_fractions,
            NoiseModel::SignFlip => &self.signflip_fractions,
        }
    }

    /// A configuration with no cells at all.
    #[must_use]
    pub fn none() -> Self {
        Self {
            gaussian_sigmas: Vec::new(),
            uniform_amplitudes: Vec::new(),
            sparse_fractions: Vec::new(),
            sparse_perturbation_scale: 0.5,
            signflip_fractions: Vec::new(),
            extra: Vec::new(),
        }
    }
}

fn check_level(field: &str, level: f64) -> Result<(), ConfigError> {
    if level.is_finite() && level > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "{field} must contain positive finite values, got {level}"
        )))
    }
}

impl HarnessConfig {
    /// Reject configurations the harness cannot evaluate meaningfully.
    ///
    /// Unknown model names in `noise.extra` are allowed here; they are
    /// reported per cell at evaluation time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "harness.dimensions must not be empty".to_string(),
            ));
        }
        if let Some(zero) = self.dimensions.iter().find(|&&d| d == 0) {
            return Err(ConfigError::ValidationError(format!(
                "harness.dimensions must be positive, got {zero}"
            )));
        }
        if self.base_vector_count == 0 {
            return Err(ConfigError::ValidationError(
                "harness.base_vector_count must be positive".to_string(),
            ));
        }
        if self.rank_stability_candidates == 0 {
            return Err(ConfigError::ValidationError(
                "harness.rank_stability_candidates must be positive".to_string(),
            ));
        }
        for model in NoiseModel::ALL {
            for &level in self.noise.levels(model) {
                check_level(&format!("harness.noise.{model} levels"), level)?;
            }
        }
        for cell in &self.noise.extra {
            check_level("harness.noise.extra levels", cell.level)?;
        }
        check_level(
            "harness.noise.sparse_perturbation_scale",
            self.noise.sparse_perturbation_scale,
        )?;
        Ok(())
    }
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Report path; stdout when unset
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            pretty: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Parse configuration from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(text).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.harness.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let shown = path.display().to_string();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(shown).into());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(shown.clone(), e.to_string()))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %shown, "Loaded config");
        Ok(config)
    }

    /// Load from the resolved config path, or defaults when none exists.
    pub fn load(explicit: Option<&Path>) -> crate::Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match resolve_config_path(None) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeFailed(e.to_string()))
    }
}

/// Locate a config file.
///
/// Order: explicit path, `$ROBUSTSIM_CONFIG`, `./robustsim.toml`, then
/// `<config dir>/robustsim/robustsim.toml`. Only the explicit path is
/// returned without checking that it exists.
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        if !env_path.is_empty() {
            let path = PathBuf::from(env_path);
            if path.exists() {
                return Some(path);
            }
        }
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("robustsim").join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}
