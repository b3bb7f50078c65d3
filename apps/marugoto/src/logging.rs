//! # Logging
//!
//! Installs the global `tracing` subscriber.
//!
//! `RUST_LOG` selects levels (default `marugoto=info,marugoto_core=info`).
//! `MARUGOTO_LOG_FORMAT=json` enables machine-parseable output and takes
//! precedence over `log_format` in the config file.

use crate::config::LogFormat;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable overriding the configured log format.
pub const LOG_FORMAT_ENV: &str = "MARUGOTO_LOG_FORMAT";

/// Format to use: the environment first, then the config file.
#[must_use]
pub fn effective_format(configured: LogFormat) -> LogFormat {
    match std::env::var(LOG_FORMAT_ENV) {
        Ok(value) => LogFormat::from_env_value(&value),
        Err(_) => configured,
    }
}

/// Install the subscriber. `verbose` raises the default level to debug.
pub fn init(format: LogFormat, verbose: bool) {
    let default = if verbose {
        "marugoto=debug,marugoto_core=debug"
    } else {
        "marugoto=info,marugoto_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
