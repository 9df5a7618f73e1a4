//! Accepted parameter sets persisted as named presets.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PersistenceError;
use super::persist::{read_json, write_json_atomic};
use crate::metrics::Grade;
use crate::params::{ParameterSet, Timeframe};
use crate::worker::OptimizationResult;

/// Preset identity and provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetMeta {
    /// Exchange label.
    pub exchange: String,
    /// Symbol.
    pub symbol: String,
    /// Timeframe.
    pub timeframe: Timeframe,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Metrics that got the preset accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetResult {
    /// Win rate in percent.
    pub win_rate: Decimal,
    /// Profit factor.
    pub profit_factor: Decimal,
    /// Max drawdown in percent.
    pub max_drawdown: Decimal,
    /// Number of trades.
    pub total_trades: usize,
    /// Sharpe ratio.
    pub sharpe_ratio: Decimal,
    /// Grade.
    pub grade: Grade,
}

/// A persisted winning parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Identity.
    pub meta: PresetMeta,
    /// Metrics.
    pub result: PresetResult,
    /// Parameters.
    pub params: ParameterSet,
}

impl Preset {
    /// Preset from an accepted result.
    #[must_use]
    pub fn from_result(
        exchange: &str,
        symbol: &str,
        timeframe: Timeframe,
        result: &OptimizationResult,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            meta: PresetMeta {
                exchange: exchange.to_string(),
                symbol: symbol.to_string(),
                timeframe,
                created_at,
            },
            result: PresetResult {
                win_rate: result.win_rate,
                profit_factor: result.profit_factor,
                max_drawdown: result.max_drawdown,
                total_trades: result.total_trades,
                sharpe_ratio: result.sharpe_ratio,
                grade: result.grade,
            },
            params: result.params,
        }
    }

    /// Store name of this preset.
    #[must_use]
    pub fn name(&self) -> String {
        preset_name(&self.meta.exchange, &self.meta.symbol, self.meta.timeframe)
    }
}

/// `{exchange}_{symbol}_{timeframe}` with unsafe characters replaced.
#[must_use]
pub fn preset_name(exchange: &str, symbol: &str, timeframe: Timeframe) -> String {
    let clean = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect()
    };
    format!("{}_{}_{}", clean(exchange), clean(symbol), timeframe)
}

/// Named preset storage.
#[cfg_attr(test, mockall::automock)]
pub trait PresetStore: Send + Sync {
    /// Store `preset` under `name`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns error if the preset cannot be written.
    fn save(&self, name: &str, preset: &Preset) -> Result<(), PersistenceError>;

    /// Load the preset named `name`.
    ///
    /// # Errors
    ///
    /// Returns error if the preset exists but cannot be read.
    fn load(&self, name: &str) -> Result<Option<Preset>, PersistenceError>;

    /// Names of every stored preset, sorted.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be listed.
    fn list(&self) -> Result<Vec<String>, PersistenceError>;
}

/// One JSON file per preset in a directory.
#[derive(Debug, Clone)]
pub struct JsonPresetStore {
    dir: PathBuf,
}

impl JsonPresetStore {
    /// Store rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Preset directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        if !valid {
            return Err(PersistenceError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }
}

impl PresetStore for JsonPresetStore {
    fn save(&self, name: &str, preset: &Preset) -> Result<(), PersistenceError> {
        write_json_atomic(&self.path_for(name)?, preset)
    }

    fn load(&self, name: &str) -> Result<Option<Preset>, PersistenceError> {
        read_json(&self.path_for(name)?)
    }

    fn list(&self) -> Result<Vec<String>, PersistenceError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistenceError::io(&self.dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| PersistenceError::io(&self.dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
