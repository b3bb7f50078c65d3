//! # Marugoto CLI Module
//!
//! This module implements the CLI interface for Marugoto.
//!
//! ## Available Commands
//!
//! - `init` - Initialize a new database
//! - `check` - Validate a payload file by decoding it
//! - `sample` - Write the payload of a sample game (or instance)
//! - `import` - Store a game or instance from a payload file
//! - `export` - Write a stored game to a payload file
//! - `games` - List stored game titles
//! - `dialogs` - List stored dialogs
//! - `delete` - Remove a game and its dialogs
//! - `saves` - Instances a player has joined
//! - `hosts` - Instances a player hosts
//! - `load` - Show a stored instance
//! - `hash` - Compute the BLAKE3 digest of a payload file

mod commands;
mod sample;

use crate::config::{Backend, Config};
use clap::{Parser, Subcommand};
use marugoto_core::MarugotoError;
use std::path::PathBuf;

pub use commands::*;
pub use sample::{SampleContent, sample_content};

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Marugoto - interactive narrative content graphs
///
/// Games of waypoints and tasks, dialogs of mails and speeches, and the
/// play-through instances built on them, stored as identity-preserving payloads.
#[derive(Parser, Debug)]
#[command(name = "marugoto")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides the config file)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Config file (default: marugoto.toml if present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Decode a payload file and report what it holds
    Check {
        /// Payload file (JSON)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Write the payload of a sample game
    Sample {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Title of the sample game
        #[arg(short, long, default_value = "sample")]
        title: String,

        /// Write a hosted play-through of the game instead of the game
        #[arg(long)]
        instance: bool,
    },

    /// Store a game or instance read from a payload file
    Import {
        /// Payload file (JSON)
        #[arg(short, long)]
        file: PathBuf,

        /// Replace a stored game with the same title and identity
        #[arg(long)]
        update: bool,
    },

    /// Write a stored game to a payload file
    Export {
        /// Game title
        #[arg(short, long)]
        title: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List stored game titles
    Games,

    /// List stored dialogs
    Dialogs,

    /// Remove a game and the dialogs stored with it
    Delete {
        /// Game title
        #[arg(short, long)]
        title: String,
    },

    /// List instances a player has joined
    Saves {
        /// Player email
        #[arg(short, long)]
        player: String,
    },

    /// List instances a player hosts
    Hosts {
        /// Player email
        #[arg(short, long)]
        player: String,
    },

    /// Show a stored instance
    Load {
        /// Instance identity
        #[arg(short, long)]
        instance: String,
    },

    /// Compute BLAKE3 digest of a payload file
    Hash {
        /// Payload file (JSON)
        #[arg(short, long)]
        file: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and resolved settings.
pub fn execute(cli: Cli, config: &Config) -> Result<(), MarugotoError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(config, force),
        Some(Commands::Check { file }) => cmd_check(config, json_mode, &file),
        Some(Commands::Sample {
            output,
            title,
            instance,
        }) => cmd_sample(config, &output, &title, instance),
        Some(Commands::Import { file, update }) => cmd_import(config, json_mode, &file, update),
        Some(Commands::Export { title, output }) => cmd_export(config, &title, &output),
        Some(Commands::Games) => cmd_games(config, json_mode),
        Some(Commands::Dialogs) => cmd_dialogs(config, json_mode),
        Some(Commands::Delete { title }) => cmd_delete(config, &title),
        Some(Commands::Saves { player }) => cmd_saves(config, json_mode, &player),
        Some(Commands::Hosts { player }) => cmd_hosts(config, json_mode, &player),
        Some(Commands::Load { instance }) => cmd_load(config, json_mode, &instance),
        Some(Commands::Hash { file }) => cmd_hash(config, json_mode, &file),
        None => {
            // No subcommand - list games by default
            cmd_games(config, json_mode)
        }
    }
}
