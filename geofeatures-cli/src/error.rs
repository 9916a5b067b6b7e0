//! Error types emitted by the geofeatures CLI.

use std::sync::Arc;

use camino::Utf8PathBuf;
use geofeatures_core::{SchemaError, StoreError};
use thiserror::Error;

use crate::api::{ValidationError, status_for};

/// Errors emitted by the geofeatures CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// Request data was rejected before reaching the store.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The directory holding the database could not be created.
    #[error("failed to prepare directory for {path:?}: {source}")]
    PrepareDatabaseDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Opening an input document failed.
    #[error("failed to open input at {path:?}: {source}")]
    OpenInput {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An input document was not valid JSON of the expected shape.
    #[error("failed to parse input JSON at {path:?}: {source}")]
    ParseInput {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Opening or migrating the database failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A record operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Serializing command output failed.
    #[error("failed to serialize output: {0}")]
    SerializeOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}

impl CliError {
    /// HTTP-style status describing the failure.
    ///
    /// Caller mistakes map to 4xx and store or environment failures to 5xx.
    pub fn status(&self) -> u16 {
        match self {
            Self::ArgumentParsing(_)
            | Self::Validation(_)
            | Self::OpenInput { .. }
            | Self::ParseInput { .. } => 400,
            Self::Store(err) => status_for(err.kind()),
            Self::Configuration(_)
            | Self::PrepareDatabaseDir { .. }
            | Self::Schema(_)
            | Self::SerializeOutput(_)
            | Self::WriteOutput(_) => 500,
        }
    }
}
