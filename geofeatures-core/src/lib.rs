//! Record access and pagination for a geospatial feature store.
//!
//! Two record kinds live in a SQLite database: [`Collection`]s group
//! [`Feature`]s, and each feature carries a GeoJSON [`Geometry`] plus free-form
//! [`Properties`]. Records opt into operations through capability traits
//! ([`Gettable`], [`Insertable`], [`Updatable`], [`Deletable`],
//! [`Queryable`], [`BulkInsertable`]) and callers reach them through the
//! generic free functions re-exported here.
//!
//! ```
//! use geofeatures_core::{
//!     Collection, Feature, FeatureQuery, Geometry, Position, Properties, insert, migrate,
//!     open_in_memory, query,
//! };
//!
//! let mut conn = open_in_memory()?;
//! migrate(&mut conn)?;
//! insert(&conn, &mut Collection::new("parks", "Parks", "Green spaces"))?;
//!
//! let mut feature = Feature::new(
//!     "parks",
//!     Geometry::Point(Position::new(13.35, 52.51)),
//!     Properties::new(),
//! );
//! insert(&conn, &mut feature)?;
//!
//! let mut page: Vec<Feature> = Vec::new();
//! let more = query(&conn, &mut page, &FeatureQuery::new("parks"))?;
//! assert!(!more);
//! assert_eq!(page, vec![feature]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![forbid(unsafe_code)]

pub mod error;
pub mod geometry;
pub mod properties;
pub mod query;
pub mod record;
pub mod schema;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{ErrorKind, StoreError};
pub use geometry::{DecodeError, EncodeError, Geometry, Position};
pub use properties::Properties;
pub use query::Filter;
pub use record::{
    BulkInsertable, Collection, CollectionQuery, DEFAULT_FEATURE_LIMIT, Deletable, Feature,
    FeatureQuery, Gettable, Insertable, Queryable, Updatable, bulk_insert, delete, get, insert,
    query, update,
};
pub use schema::{
    SCHEMA_VERSION, SchemaError, drop_schema, migrate, open, open_in_memory, prepare_connection,
};
