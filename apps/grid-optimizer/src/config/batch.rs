//! Batch run configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::default_true;
use crate::params::Timeframe;

/// Which units a batch covers and where its files live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSection {
    /// Exchange label.
    #[serde(default = "default_exchange")]
    pub exchange: String,
    /// Symbols, in run order.
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Timeframes per symbol.
    #[serde(default = "default_timeframes")]
    pub timeframes: Vec<Timeframe>,
    /// Continue a stored run.
    #[serde(default = "default_true")]
    pub resume: bool,
    /// Resume even if the symbol list changed.
    #[serde(default)]
    pub allow_symbol_list_change: bool,
    /// State file path.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    /// Preset directory.
    #[serde(default = "default_preset_dir")]
    pub preset_dir: PathBuf,
    /// Failures listed verbatim in the summary.
    #[serde(default = "default_failure_limit")]
    pub summary_failure_limit: usize,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            exchange: default_exchange(),
            symbols: Vec::new(),
            timeframes: default_timeframes(),
            resume: true,
            allow_symbol_list_change: false,
            state_path: default_state_path(),
            preset_dir: default_preset_dir(),
            summary_failure_limit: default_failure_limit(),
        }
    }
}

fn default_exchange() -> String {
    "bybit".to_string()
}

fn default_timeframes() -> Vec<Timeframe> {
    vec![Timeframe::H1]
}

fn default_state_path() -> PathBuf {
    PathBuf::from("data/optimization_state.json")
}

fn default_preset_dir() -> PathBuf {
    PathBuf::from("presets")
}

const fn default_failure_limit() -> usize {
    20
}
