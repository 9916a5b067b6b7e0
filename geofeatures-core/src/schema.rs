//! Connection setup and schema lifecycle.
//!
//! Every connection must pass through [`prepare_connection`] (done by
//! [`open`] and [`open_in_memory`]) before use: it enables foreign keys and
//! registers the spatial SQL functions the tables and triggers depend on.

use std::path::{Path, PathBuf};

use log::info;
use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

use crate::geometry::register_spatial_functions;

/// Version recorded in `geofeatures_schema_version` by [`migrate`].
pub const SCHEMA_VERSION: i64 = 1;

/// Errors raised when opening a database or changing its schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    Open {
        /// Location of the database.
        path: PathBuf,
        /// Error reported by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Enabling foreign key enforcement failed.
    #[error("failed to enable SQLite foreign keys")]
    ForeignKeys {
        /// Error reported by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Registering the spatial SQL functions failed.
    #[error("failed to register spatial SQL functions")]
    Functions {
        /// Error reported by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A migration statement failed.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Label of the failing step.
        step: &'static str,
        /// Error reported by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The database was created by an incompatible release.
    #[error("expected schema version {expected} but found {found}; apply migrations before retrying")]
    VersionMismatch {
        /// Version this build understands.
        expected: i64,
        /// Version recorded in the database.
        found: i64,
    },
}

/// Open (creating if needed) the database at `path` and prepare it for use.
pub fn open(path: impl AsRef<Path>) -> Result<Connection, SchemaError> {
    let path = path.as_ref();
    let connection = Connection::open(path).map_err(|source| SchemaError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    prepare_connection(&connection)?;
    Ok(connection)
}

/// Open a private in-memory database and prepare it for use.
pub fn open_in_memory() -> Result<Connection, SchemaError> {
    let connection = Connection::open_in_memory().map_err(|source| SchemaError::Open {
        path: PathBuf::from(":memory:"),
        source,
    })?;
    prepare_connection(&connection)?;
    Ok(connection)
}

/// Enable foreign keys and register the spatial SQL functions.
///
/// Use this for connections opened by other means, e.g. a pool.
pub fn prepare_connection(connection: &Connection) -> Result<(), SchemaError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(|source| SchemaError::ForeignKeys { source })?;
    register_spatial_functions(connection).map_err(|source| SchemaError::Functions { source })
}

/// Create the tables, indexes and triggers, recording [`SCHEMA_VERSION`].
///
/// Idempotent: running it against an up-to-date database changes nothing.
///
/// # Examples
/// ```
/// use geofeatures_core::{SCHEMA_VERSION, migrate, open_in_memory};
///
/// let mut conn = open_in_memory()?;
/// migrate(&mut conn)?;
/// migrate(&mut conn)?;
///
/// let version: i64 = conn.query_row(
///     "SELECT version FROM geofeatures_schema_version",
///     [],
///     |row| row.get(0),
/// )?;
/// assert_eq!(version, SCHEMA_VERSION);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn migrate(connection: &mut Connection) -> Result<(), SchemaError> {
    let transaction = begin(connection)?;
    create_tables(&transaction)?;
    create_spatial_index(&transaction)?;
    ensure_schema_version(&transaction)?;
    commit(transaction)?;
    info!("schema at version {SCHEMA_VERSION}");
    Ok(())
}

/// Remove every table, index and trigger created by [`migrate`].
///
/// Idempotent: dropping an empty database succeeds.
pub fn drop_schema(connection: &mut Connection) -> Result<(), SchemaError> {
    let transaction = begin(connection)?;
    for (step, sql) in [
        ("drop features_geometry_delete", "DROP TRIGGER IF EXISTS features_geometry_delete"),
        ("drop features_geometry_update", "DROP TRIGGER IF EXISTS features_geometry_update"),
        ("drop features_geometry_insert", "DROP TRIGGER IF EXISTS features_geometry_insert"),
        ("drop features_geometry_idx", "DROP TABLE IF EXISTS features_geometry_idx"),
        ("drop features", "DROP TABLE IF EXISTS features"),
        ("drop collections", "DROP TABLE IF EXISTS collections"),
        ("drop schema version", "DROP TABLE IF EXISTS geofeatures_schema_version"),
    ] {
        run_migration_step(&transaction, step, sql)?;
    }
    commit(transaction)?;
    info!("schema dropped");
    Ok(())
}

fn begin(connection: &mut Connection) -> Result<Transaction<'_>, SchemaError> {
    connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin schema transaction",
            source,
        })
}

fn commit(transaction: Transaction<'_>) -> Result<(), SchemaError> {
    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create collections",
        "CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL
        )",
    )?;
    // `fid` pins the rowid so the spatial index keys survive VACUUM.
    run_migration_step(
        transaction,
        "create features",
        "CREATE TABLE IF NOT EXISTS features (
            fid INTEGER PRIMARY KEY,
            id BLOB NOT NULL UNIQUE CHECK (length(id) = 16),
            collection_name TEXT NOT NULL REFERENCES collections(name),
            geometry BLOB NOT NULL,
            properties TEXT NOT NULL CHECK (json_type(properties) = 'object')
        )",
    )?;
    run_migration_step(
        transaction,
        "index features.collection_name",
        "CREATE INDEX IF NOT EXISTS features_collection_name_idx
            ON features(collection_name, id)",
    )
}

fn create_spatial_index(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create features_geometry_idx",
        "CREATE VIRTUAL TABLE IF NOT EXISTS features_geometry_idx
            USING rtree(id, min_x, max_x, min_y, max_y)",
    )?;
    run_migration_step(
        transaction,
        "create features_geometry_insert",
        "CREATE TRIGGER IF NOT EXISTS features_geometry_insert
            AFTER INSERT ON features
            WHEN ST_XMin(NEW.geometry) IS NOT NULL
        BEGIN
            INSERT INTO features_geometry_idx (id, min_x, max_x, min_y, max_y)
            VALUES (
                NEW.fid,
                ST_XMin(NEW.geometry), ST_XMax(NEW.geometry),
                ST_YMin(NEW.geometry), ST_YMax(NEW.geometry)
            );
        END",
    )?;
    run_migration_step(
        transaction,
        "create features_geometry_update",
        "CREATE TRIGGER IF NOT EXISTS features_geometry_update
            AFTER UPDATE OF geometry ON features
        BEGIN
            DELETE FROM features_geometry_idx WHERE id = OLD.fid;
            INSERT INTO features_geometry_idx (id, min_x, max_x, min_y, max_y)
            SELECT
                NEW.fid,
                ST_XMin(NEW.geometry), ST_XMax(NEW.geometry),
                ST_YMin(NEW.geometry), ST_YMax(NEW.geometry)
            WHERE ST_XMin(NEW.geometry) IS NOT NULL;
        END",
    )?;
    run_migration_step(
        transaction,
        "create features_geometry_delete",
        "CREATE TRIGGER IF NOT EXISTS features_geometry_delete
            AFTER DELETE ON features
        BEGIN
            DELETE FROM features_geometry_idx WHERE id = OLD.fid;
        END",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS geofeatures_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM geofeatures_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO geofeatures_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| SchemaError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration { step, source })
}
