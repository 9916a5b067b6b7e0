//! Command-line interface for the geofeatures store.
//!
//! Every command opens the configured SQLite database, performs one record
//! operation and prints the wire representation from [`api`] as pretty JSON.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};
use geofeatures_core::{drop_schema, migrate};
use log::info;
use serde::Serialize;

pub mod api;
mod collections;
mod config;
mod error;
mod features;
mod fs;

pub use config::{StoreArgs, StoreConfig};
pub use error::CliError;

use collections::CollectionsCommand;
use features::FeaturesCommand;

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const DEFAULT_DATABASE: &str = "geofeatures.db";

/// Run the CLI with the current process arguments, writing to stdout.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    run_with(cli, &mut stdout)
}

/// Resolve layered configuration for `cli` and execute its command.
pub fn run_with(cli: Cli, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = cli.store.into_config()?;
    execute(&config, cli.command, writer)
}

/// Execute `command` against the database described by `config`.
pub fn execute(
    config: &StoreConfig,
    command: Command,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        Command::Migrate => {
            let mut connection = config.open()?;
            migrate(&mut connection)?;
            info!("schema ready in {}", config.database);
            Ok(())
        }
        Command::Drop => {
            let mut connection = config.open()?;
            drop_schema(&mut connection)?;
            info!("schema dropped from {}", config.database);
            Ok(())
        }
        Command::Collections { command } => {
            let connection = config.open_migrated()?;
            collections::run(&connection, command, writer)
        }
        Command::Features { command } => {
            let mut connection = config.open_migrated()?;
            features::run(&mut connection, command, writer)
        }
    }
}

/// Top-level arguments.
#[derive(Debug, Parser)]
#[command(
    name = "geofeatures",
    about = "Manage collections of GeoJSON features stored in SQLite",
    version
)]
pub struct Cli {
    #[command(flatten)]
    store: StoreArgs,
    #[command(subcommand)]
    command: Command,
}

/// Operations exposed by the CLI.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the tables, spatial index and triggers if missing.
    Migrate,
    /// Remove every table created by `migrate`.
    Drop,
    /// Create, read, update and list collections.
    Collections {
        /// Collection operation.
        #[command(subcommand)]
        command: CollectionsCommand,
    },
    /// Add, page through, read, update and delete features.
    Features {
        /// Feature operation.
        #[command(subcommand)]
        command: FeaturesCommand,
    },
}

pub(crate) fn write_json<T: Serialize + ?Sized>(
    writer: &mut dyn Write,
    value: &T,
) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerializeOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
