//! `features` subcommands.

use std::io::{BufReader, Write};

use camino::{Utf8Path, Utf8PathBuf};
use clap::Subcommand;
use geofeatures_core::{Feature, FeatureQuery, StoreError, bulk_insert, delete, get, query, update};
use log::{debug, info};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::api::{
    FeatureInfo, FeatureList, FeatureListQuery, NewFeatureInfo, NewFeatureList, ValidationError,
};
use crate::collections::stored_collection;
use crate::fs::open_utf8_file;
use crate::{CliError, write_json};

/// Feature operations.
#[derive(Debug, Clone, Subcommand)]
pub enum FeaturesCommand {
    /// Add every feature of a GeoJSON FeatureCollection file in one transaction.
    Add {
        /// Target collection.
        collection: String,
        /// Path to a GeoJSON FeatureCollection.
        #[arg(value_name = "path")]
        input: Utf8PathBuf,
    },
    /// Print one page of a collection's features.
    List {
        /// Collection to page through.
        collection: String,
        /// Paging options.
        #[command(flatten)]
        query: FeatureListQuery,
    },
    /// Show one feature.
    Get {
        /// Feature id.
        id: String,
    },
    /// Replace the geometry and properties of a feature.
    Update {
        /// Feature id.
        id: String,
        /// Path to a JSON object with `geometry` and `properties`.
        #[arg(value_name = "path")]
        input: Utf8PathBuf,
    },
    /// Delete one feature.
    Delete {
        /// Feature id.
        id: String,
    },
}

pub(crate) fn run(
    connection: &mut Connection,
    command: FeaturesCommand,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        FeaturesCommand::Add { collection, input } => {
            let list = add_features(connection, collection, &input)?;
            write_json(writer, &list)
        }
        FeaturesCommand::List { collection, query } => {
            let list = list_features(connection, collection, &query)?;
            write_json(writer, &list)
        }
        FeaturesCommand::Get { id } => {
            let feature = stored_feature(connection, &id)?;
            write_json(writer, &FeatureInfo::from(feature))
        }
        FeaturesCommand::Update { id, input } => {
            let mut feature = stored_feature(connection, &id)?;
            let replacement: NewFeatureInfo = load_json(&input)?;
            feature.geometry = replacement.geometry;
            feature.properties = replacement.properties;
            update(connection, &feature)?;
            write_json(writer, &FeatureInfo::from(feature))
        }
        FeaturesCommand::Delete { id } => {
            let feature = stored_feature(connection, &id)?;
            delete(connection, &feature)?;
            info!("deleted feature {}", feature.id);
            Ok(())
        }
    }
}

/// Insert a submitted batch with fresh ids; nothing is stored on failure.
pub(crate) fn add_features(
    connection: &mut Connection,
    collection: String,
    input: &Utf8Path,
) -> Result<FeatureList, CliError> {
    let collection = stored_collection(connection, collection)?;
    let submitted: NewFeatureList = load_json(input)?;
    submitted.validate()?;
    let mut features: Vec<Feature> = submitted
        .features
        .into_iter()
        .map(|info| info.into_feature(&collection.name))
        .collect();
    bulk_insert(connection, &mut features)?;
    info!(
        "added {} features to collection {}",
        features.len(),
        collection.name
    );
    Ok(FeatureList::new(features, false))
}

/// Fetch one page, validating the cursor against stored features.
pub(crate) fn list_features(
    connection: &Connection,
    collection: String,
    options: &FeatureListQuery,
) -> Result<FeatureList, CliError> {
    let collection = stored_collection(connection, collection)?;
    let mut feature_query = FeatureQuery::new(collection.name).with_limit(options.count);
    if let Some(after) = options.after_id()? {
        let mut cursor = Feature::with_id(after);
        match get(connection, &mut cursor) {
            Ok(()) => feature_query = feature_query.after(cursor.id),
            Err(StoreError::NotFound { .. }) => return Err(ValidationError::UnknownAfter.into()),
            Err(err) => return Err(err.into()),
        }
    }
    if let Some(bbox) = options.bbox_rect()? {
        feature_query = feature_query.within(bbox);
    }
    let mut features = Vec::new();
    let more = query(connection, &mut features, &feature_query)?;
    debug!(
        "listed {} features from {} (more: {more})",
        features.len(),
        feature_query.collection
    );
    Ok(FeatureList::new(features, more))
}

fn stored_feature(connection: &Connection, raw_id: &str) -> Result<Feature, CliError> {
    let id = Uuid::parse_str(raw_id).map_err(|_| ValidationError::InvalidId {
        value: raw_id.to_owned(),
    })?;
    let mut feature = Feature::with_id(id);
    get(connection, &mut feature)?;
    Ok(feature)
}

/// Load a JSON document from disk.
fn load_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<T, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::OpenInput {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|source| CliError::ParseInput {
        path: path.to_path_buf(),
        source,
    })
}
