//! Configuration loading, validation and environment interpolation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use grid_optimizer::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("optimizer.yaml"))?;
//! println!("workers: {}", config.parallel.worker_count());
//! ```

mod batch;
mod observability;
mod search;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use batch::BatchSection;
pub use observability::{LoggingConfig, ObservabilityConfig};
pub use search::SearchConfig;

use observability::default_true;

use crate::batch::BatchConfig;
use crate::parallel::ParallelConfig;
use crate::ranking::FilterCriteria;
use crate::worker::WorkerLimits;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    /// Worker pool sizing and timeouts.
    #[serde(default)]
    pub parallel: ParallelConfig,
    /// Search mode and ranges.
    #[serde(default)]
    pub search: SearchConfig,
    /// Acceptance thresholds.
    #[serde(default)]
    pub filter: FilterCriteria,
    /// Batch units and files.
    #[serde(default)]
    pub batch: BatchSection,
    /// Evaluation-level rejection limits.
    #[serde(default)]
    pub worker: WorkerLimits,
    /// Logging.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Batch driver configuration assembled from the sections.
    #[must_use]
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            exchange: self.batch.exchange.clone(),
            symbols: self.batch.symbols.clone(),
            timeframes: self.batch.timeframes.clone(),
            filter: self.filter.clone(),
            search: self.search.mode,
            ranges: self.search.ranges.clone(),
            constraints: self.search.constraints.clone(),
            tuning: self.search.tuning(),
            resume: self.batch.resume,
            allow_symbol_list_change: self.batch.allow_symbol_list_change,
            summary_failure_limit: self.batch.summary_failure_limit,
        }
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map(|m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

    if config.parallel.evaluation_threads == 0 {
        return invalid("parallel.evaluation_threads must be at least 1".to_string());
    }
    if config.parallel.memory_per_worker_mb == 0 {
        return invalid("parallel.memory_per_worker_mb must be positive".to_string());
    }
    if config.parallel.available_memory_mb == Some(0) {
        return invalid("parallel.available_memory_mb must be positive when set".to_string());
    }

    if let Err(e) = config.filter.validate() {
        return invalid(format!("filter: {e}"));
    }
    if let Err(e) = config.search.ranges.validate() {
        return invalid(format!("search.ranges: {e}"));
    }
    if config.search.confirmation_threshold == 0 {
        return invalid("search.confirmation_threshold must be positive".to_string());
    }
    let threshold = config.search.improvement_threshold;
    if !threshold.is_finite() || threshold < 0.0 {
        return invalid(format!(
            "search.improvement_threshold must be a non-negative number, got {threshold}"
        ));
    }
    if config.search.constraints.max_leverage == Some(0) {
        return invalid("search.constraints.max_leverage must be at least 1".to_string());
    }

    if config.batch.exchange.trim().is_empty() {
        return invalid("batch.exchange must not be empty".to_string());
    }
    if config.batch.timeframes.is_empty() {
        return invalid("batch.timeframes must not be empty".to_string());
    }
    if config.batch.symbols.iter().any(|s| s.trim().is_empty()) {
        return invalid("batch.symbols must not contain blank entries".to_string());
    }

    if config.worker.min_trades == 0 {
        return invalid("worker.min_trades must be at least 1".to_string());
    }

    let valid_formats = ["json", "pretty"];
    let format = config.observability.logging.format.to_ascii_lowercase();
    if !valid_formats.contains(&format.as_str()) {
        return invalid(format!(
            "observability.logging.format must be one of: {valid_formats:?}"
        ));
    }

    Ok(())
}
