//! Grid Optimizer Binary
//!
//! Inspection and planning commands around the optimizer library. Running a
//! batch needs a concrete strategy engine and price source, so it is a
//! library entry point ([`grid_optimizer::BatchOptimizer`]).
//!
//! # Usage
//!
//! ```bash
//! grid-optimizer estimate --mode standard --trend-tf 4h
//! grid-optimizer status --state data/optimization_state.json
//! grid-optimizer presets --dir presets
//! grid-optimizer --config optimizer.yaml validate-config
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter (default: `grid_optimizer=info`)

mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;

use grid_optimizer::batch::{JsonPresetStore, JsonStateStore, PresetStore, StateStore};
use grid_optimizer::config::{Config, load_config};
use grid_optimizer::grid::GridBuilder;
use grid_optimizer::telemetry::init_tracing;

use crate::cli::{Cli, Command};

fn main() -> Result<()> {
    // Load .env if present; real environment wins.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = match (&cli.config, &cli.command) {
        (Some(path), _) => {
            let path = path.to_string_lossy();
            load_config(Some(&*path)).with_context(|| format!("loading {path}"))?
        }
        (None, Command::ValidateConfig) => bail!("validate-config needs --config <path>"),
        (None, _) => Config::default(),
    };

    init_tracing(&config.observability.logging).context("initializing tracing")?;

    match cli.command {
        Command::Estimate { mode, trend_tf } => estimate(&config, mode, trend_tf),
        Command::Status { state } => status(&config, state),
        Command::Presets { dir, show } => presets(&config, dir, show),
        Command::ValidateConfig => {
            info!("Configuration is valid");
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn estimate(
    config: &Config,
    mode: Option<grid_optimizer::batch::SearchMode>,
    trend_tf: Option<grid_optimizer::Timeframe>,
) -> Result<()> {
    let mode = mode.unwrap_or(config.search.mode);
    let trend_tf = trend_tf.unwrap_or(config.search.trend_timeframe);

    let grid = match mode.grid_mode() {
        Some(grid_mode) => GridBuilder::generate(grid_mode, trend_tf, &config.search.constraints)?,
        None => GridBuilder::coarse(&config.search.ranges)?,
    };
    let estimate = GridBuilder::estimate(&grid);
    let workers = config.parallel.worker_count();
    let confirm = GridBuilder::requires_confirmation(&grid, config.search.confirmation_threshold);

    println!("mode:           {mode}");
    println!("trend timeframe: {trend_tf}");
    for (key, values) in grid.axes() {
        let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
        println!("  {key:<22} [{}]", rendered.join(", "));
    }
    println!("combinations:   {}", estimate.combinations);
    println!("single worker:  {:.1} min", estimate.estimated_minutes);
    #[allow(clippy::cast_precision_loss)]
    let parallel_minutes = estimate.estimated_minutes / workers as f64;
    println!("{workers} workers:     {parallel_minutes:.1} min");
    if mode.grid_mode().is_none() {
        println!("(coarse phase only; fine phases depend on coarse results)");
    }
    if confirm {
        println!(
            "exceeds confirmation threshold of {}; confirm before running",
            config.search.confirmation_threshold
        );
    }
    Ok(())
}

fn status(config: &Config, state: Option<std::path::PathBuf>) -> Result<()> {
    let store = JsonStateStore::new(state.unwrap_or_else(|| config.batch.state_path.clone()));
    let Some(state) = store.load()? else {
        println!("no stored state at {}", store.path().display());
        return Ok(());
    };
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn presets(
    config: &Config,
    dir: Option<std::path::PathBuf>,
    show: Option<String>,
) -> Result<()> {
    let store = JsonPresetStore::new(dir.unwrap_or_else(|| config.batch.preset_dir.clone()));
    if let Some(name) = show {
        let Some(preset) = store.load(&name)? else {
            bail!("no preset named {name} in {}", store.dir().display());
        };
        println!("{}", serde_json::to_string_pretty(&preset)?);
        return Ok(());
    }
    for name in store.list()? {
        println!("{name}");
    }
    Ok(())
}
