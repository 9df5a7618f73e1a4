//! Log subscriber setup.
//!
//! # Configuration
//!
//! - `RUST_LOG`: filter directives; overrides `observability.logging.level`
//! - `observability.logging.format`: `json` or `pretty`
//!
//! # Usage
//!
//! ```rust,ignore
//! use grid_optimizer::telemetry::init_tracing;
//!
//! init_tracing(&config.observability.logging)?;
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::LoggingConfig;

/// Error type for subscriber setup.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A global subscriber is already installed, or setup failed.
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberError(String),
}

/// Filter from `RUST_LOG`, falling back to `grid_optimizer=<level>`.
#[must_use]
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("grid_optimizer={}", config.level)))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let span_events = if config.include_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_span_events(span_events)
        .with_thread_names(true);

    let result = if config.is_json() {
        builder
            .json()
            .with_current_span(config.include_spans)
            .try_init()
    } else {
        builder.with_target(true).try_init()
    };

    result.map_err(|e| TelemetryError::SubscriberError(e.to_string()))?;
    tracing::debug!(format = %config.format, level = %config.level, "Tracing initialized");
    Ok(())
}
