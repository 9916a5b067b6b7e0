//! Facade crate for the geofeatures store.
//!
//! This crate re-exports the record access layer, the geometry codec and the
//! schema helpers from `geofeatures-core`.

#![forbid(unsafe_code)]

pub use geofeatures_core::{
    BulkInsertable, Collection, CollectionQuery, DEFAULT_FEATURE_LIMIT, DecodeError, Deletable,
    EncodeError, ErrorKind, Feature, FeatureQuery, Filter, Geometry, Gettable, Insertable,
    Position, Properties, Queryable, SCHEMA_VERSION, SchemaError, StoreError, Updatable,
    bulk_insert, delete, drop_schema, get, insert, migrate, open, open_in_memory,
    prepare_connection, query, update,
};
