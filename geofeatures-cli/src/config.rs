//! Layered configuration for the database location.

use camino::Utf8PathBuf;
use clap::Parser;
use geofeatures_core::{migrate, open};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{ARG_DATABASE, CliError, DEFAULT_DATABASE, fs::ensure_parent_dir};

/// Database options shared by every command.
///
/// Values merge from configuration files, `GEOFEATURES_*` environment
/// variables and CLI flags, in increasing order of precedence.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[ortho_config(prefix = "GEOFEATURES")]
pub struct StoreArgs {
    /// Path to the SQLite database file (defaults to `geofeatures.db`).
    #[arg(long = ARG_DATABASE, value_name = "path", global = true)]
    #[serde(default)]
    pub database: Option<Utf8PathBuf>,
}

impl StoreArgs {
    pub(crate) fn into_config(self) -> Result<StoreConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        Ok(StoreConfig::from(merged))
    }
}

/// Resolved database configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Location of the SQLite database file.
    pub database: Utf8PathBuf,
}

impl StoreConfig {
    /// Open the database, creating its parent directory when needed.
    pub fn open(&self) -> Result<Connection, CliError> {
        ensure_parent_dir(&self.database).map_err(|source| CliError::PrepareDatabaseDir {
            path: self.database.clone(),
            source,
        })?;
        Ok(open(self.database.as_std_path())?)
    }

    /// Open the database and bring its schema up to date.
    pub fn open_migrated(&self) -> Result<Connection, CliError> {
        let mut connection = self.open()?;
        migrate(&mut connection)?;
        Ok(connection)
    }
}

impl From<StoreArgs> for StoreConfig {
    fn from(args: StoreArgs) -> Self {
        Self {
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
        }
    }
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<StoreConfig, CliError> {
    let merged = StoreArgs::merge_from_layers(layers).map_err(CliError::from)?;
    Ok(StoreConfig::from(merged))
}
