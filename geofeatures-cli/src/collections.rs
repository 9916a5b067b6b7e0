//! `collections` subcommands.

use std::io::Write;

use clap::Subcommand;
use geofeatures_core::{Collection, CollectionQuery, delete, get, insert, query, update};
use log::info;
use rusqlite::Connection;

use crate::api::{CollectionInfo, CollectionList};
use crate::{CliError, write_json};

/// Collection operations.
#[derive(Debug, Clone, Subcommand)]
pub enum CollectionsCommand {
    /// Create a collection.
    Create {
        /// Unique collection name.
        name: String,
        /// Human-readable title.
        #[arg(long)]
        title: String,
        /// Human-readable description.
        #[arg(long)]
        description: String,
    },
    /// Show one collection.
    Get {
        /// Collection name.
        name: String,
    },
    /// List every collection by name.
    List,
    /// Replace the title and description of a collection.
    Update {
        /// Collection name.
        name: String,
        /// New title.
        #[arg(long)]
        title: String,
        /// New description.
        #[arg(long)]
        description: String,
    },
    /// Delete a collection that holds no features.
    Delete {
        /// Collection name.
        name: String,
    },
}

pub(crate) fn run(
    connection: &Connection,
    command: CollectionsCommand,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        CollectionsCommand::Create {
            name,
            title,
            description,
        } => {
            let info = CollectionInfo {
                name,
                title,
                description,
            };
            info.validate()?;
            let mut collection = Collection::from(info);
            insert(connection, &mut collection)?;
            info!("created collection {}", collection.name);
            write_json(writer, &CollectionInfo::from(collection))
        }
        CollectionsCommand::Get { name } => {
            let collection = stored_collection(connection, name)?;
            write_json(writer, &CollectionInfo::from(collection))
        }
        CollectionsCommand::List => {
            let mut collections: Vec<Collection> = Vec::new();
            query(connection, &mut collections, &CollectionQuery)?;
            let list = CollectionList {
                collections: collections.into_iter().map(CollectionInfo::from).collect(),
            };
            write_json(writer, &list)
        }
        CollectionsCommand::Update {
            name,
            title,
            description,
        } => {
            let info = CollectionInfo {
                name,
                title,
                description,
            };
            info.validate()?;
            stored_collection(connection, info.name.clone())?;
            let collection = Collection::from(info);
            update(connection, &collection)?;
            write_json(writer, &CollectionInfo::from(collection))
        }
        CollectionsCommand::Delete { name } => {
            let collection = stored_collection(connection, name)?;
            delete(connection, &collection)?;
            info!("deleted collection {}", collection.name);
            Ok(())
        }
    }
}

/// Load a collection, failing with `NotFound` when it is absent.
pub(crate) fn stored_collection(
    connection: &Connection,
    name: String,
) -> Result<Collection, CliError> {
    let mut collection = Collection::named(name);
    get(connection, &mut collection)?;
    Ok(collection)
}
