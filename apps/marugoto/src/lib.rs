//! # marugoto
//!
//! Command line front end for the Marugoto content graph: configuration,
//! logging setup and the `marugoto` subcommands.

pub mod cli;
pub mod config;
pub mod logging;
