//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use grid_optimizer::batch::SearchMode;
use grid_optimizer::params::Timeframe;

/// Strategy parameter grid optimizer.
#[derive(Debug, Parser)]
#[command(name = "grid-optimizer", version, about)]
pub struct Cli {
    /// Configuration file.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show combination count and runtime of a search grid.
    Estimate {
        /// Search mode; defaults to the configured one.
        #[arg(long, value_parser = parse_mode)]
        mode: Option<SearchMode>,
        /// Trend timeframe; defaults to the configured one.
        #[arg(long = "trend-tf", value_parser = parse_timeframe)]
        trend_tf: Option<Timeframe>,
    },

    /// Print the stored batch progress.
    Status {
        /// State file; defaults to the configured one.
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// List stored presets.
    Presets {
        /// Preset directory; defaults to the configured one.
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Print the named preset instead of listing.
        #[arg(long)]
        show: Option<String>,
    },

    /// Load and validate a configuration file.
    ValidateConfig,
}

fn parse_mode(s: &str) -> Result<SearchMode, String> {
    s.parse()
}

fn parse_timeframe(s: &str) -> Result<Timeframe, String> {
    s.parse().map_err(|e: grid_optimizer::params::ParamError| e.to_string())
}
