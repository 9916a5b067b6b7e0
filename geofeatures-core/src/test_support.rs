//! Fixtures shared by unit and behaviour tests.
//!
//! Every helper panics on failure; they are meant for test setup only.

use rusqlite::Connection;
use uuid::Uuid;

use crate::{
    Collection, Feature, Geometry, Insertable, Position, Properties, migrate, open_in_memory,
};

/// An in-memory database with the schema applied.
#[must_use]
pub fn migrated_connection() -> Connection {
    let mut connection = open_in_memory().expect("open in-memory database");
    migrate(&mut connection).expect("apply schema");
    connection
}

/// Insert a collection named `name` titled `"{name} title"`.
pub fn seed_collection(connection: &Connection, name: &str) -> Collection {
    let mut collection = Collection::new(name, format!("{name} title"), format!("{name} description"));
    collection
        .insert(connection)
        .expect("insert seed collection");
    collection
}

/// An uninserted point feature with empty properties.
#[must_use]
pub fn point_feature(collection: &str, x: f64, y: f64) -> Feature {
    Feature::new(collection, Geometry::Point(Position::new(x, y)), Properties::new())
}

/// Insert `count` point features along the diagonal, returning their ids in
/// ascending order.
pub fn seed_features(connection: &Connection, collection: &str, count: u32) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = (0..count)
        .map(|index| {
            let offset = f64::from(index);
            let mut feature = point_feature(collection, offset, offset);
            feature.insert(connection).expect("insert seed feature");
            feature.id
        })
        .collect();
    ids.sort_unstable();
    ids
}
