//! Logging setup.
//! Structured logs via `tracing`, text or JSON format per configuration.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::LoggingConfig;

/// Initialize the global subscriber. `RUST_LOG` overrides the configured
/// level when set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = if config.format == "json" {
        Registry::default()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        Registry::default().with(filter).with(fmt::layer()).try_init()
    };

    result.map_err(|err| anyhow::anyhow!("Failed to initialize logging: {err}"))
}

/// Simplified initialization with default configuration.
pub fn init_default_logging() {
    let config = LoggingConfig::default();
    if let Err(err) = init_logging(&config) {
        eprintln!("Failed to initialize logging: {err}");
    }
}
