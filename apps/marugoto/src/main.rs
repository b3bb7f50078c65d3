//! # Marugoto
//!
//! The command line binary for Marugoto content graphs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 apps/marugoto (THE BINARY)               │
//! │                                                          │
//! │   ┌─────────────┐   ┌──────────────┐   ┌─────────────┐   │
//! │   │    CLI      │   │    Config    │   │   Logging   │   │
//! │   │   (clap)    │   │    (toml)    │   │  (tracing)  │   │
//! │   └──────┬──────┘   └──────┬───────┘   └─────────────┘   │
//! │          └────────┬────────┘                             │
//! │                   ▼                                      │
//! │           ┌───────────────┐                              │
//! │           │ marugoto-core │                              │
//! │           │  (THE MODEL)  │                              │
//! │           └───────────────┘                              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! marugoto init
//! marugoto sample -o game.json --title harbour
//! marugoto import -f game.json
//! marugoto games
//! marugoto export -t harbour -o copy.json
//! marugoto hash -f copy.json
//! ```

use clap::Parser;
use marugoto::cli::{self, Cli};
use marugoto::config::{Config, LogFormat, Overrides};
use marugoto::logging;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config.apply(Overrides {
            database: cli.database.clone(),
            backend: cli.backend,
        }),
        Err(e) => {
            logging::init(logging::effective_format(LogFormat::Text), cli.verbose);
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    };

    logging::init(logging::effective_format(config.log_format), cli.verbose);
    tracing::debug!(
        database = %config.database.display(),
        backend = %config.backend,
        "configuration loaded"
    );

    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
