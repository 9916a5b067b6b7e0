//! Errors surfaced by record operations.

use rusqlite::ffi;
use thiserror::Error;
use uuid::Uuid;

use crate::geometry::{DecodeError, EncodeError, WkbError};

/// Broad classification used by callers to choose a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The addressed record does not exist.
    NotFound,
    /// A record with the same key already exists.
    Conflict,
    /// The request carried data the store cannot accept.
    InvalidInput,
    /// The store failed for another reason.
    Storage,
}

/// Error raised by get, insert, update, delete, query and bulk insert.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row matched the natural key.
    #[error("{entity} {key} not found")]
    NotFound {
        /// Record kind.
        entity: &'static str,
        /// Natural key that was looked up.
        key: String,
    },
    /// A primary key or uniqueness constraint rejected the insert.
    #[error("{entity} {key} already exists")]
    Conflict {
        /// Record kind.
        entity: &'static str,
        /// Natural key that collided.
        key: String,
    },
    /// A geometry could not be decoded from the store.
    #[error("invalid stored geometry: {0}")]
    GeometryDecode(#[from] DecodeError),
    /// A geometry could not be encoded for the store.
    #[error("invalid geometry: {0}")]
    GeometryEncode(#[from] EncodeError),
    /// A geometry has no native storage representation.
    #[error("geometry cannot be stored: {0}")]
    GeometryStorage(#[from] WkbError),
    /// The stored property payload was not a JSON object.
    #[error("failed to parse properties for feature {id}: {source}")]
    InvalidProperties {
        /// Identifier of the feature whose properties failed to parse.
        id: Uuid,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// Statement construction failed.
    #[error("failed to build statement: {0}")]
    Build(#[from] sea_query::error::Error),
    /// SQLite reported an error.
    #[error("failed to {operation}: {source}")]
    Database {
        /// Operation being performed.
        operation: &'static str,
        /// Error reported by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
}

impl StoreError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::GeometryEncode(_) | Self::GeometryStorage(_) => ErrorKind::InvalidInput,
            Self::GeometryDecode(_)
            | Self::InvalidProperties { .. }
            | Self::Build(_)
            | Self::Database { .. } => ErrorKind::Storage,
        }
    }

    pub(crate) fn database(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Database { operation, source }
    }
}

/// Whether `err` reports a primary key or unique constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
