//! Record capabilities and their generic entry points.
//!
//! Each entity opts into the operations it supports by implementing the
//! matching trait. The free functions ([`get`], [`insert`], ...) are the
//! surface collaborators call; they accept any record with the capability.

use log::{debug, warn};
use rusqlite::{Connection, Row};

use crate::error::StoreError;
use crate::query::{Filter, Statement};

mod collection;
mod feature;

pub use collection::{Collection, CollectionQuery};
pub use feature::{DEFAULT_FEATURE_LIMIT, Feature, FeatureQuery};

/// Records that can be loaded by natural key.
pub trait Gettable {
    /// Populate `self` from the row matching its key.
    ///
    /// Fails with [`StoreError::NotFound`] when no row matches.
    fn get(&mut self, connection: &Connection) -> Result<(), StoreError>;
}

/// Records that can be created.
pub trait Insertable {
    /// Persist `self`, updating any store-assigned fields.
    fn insert(&mut self, connection: &Connection) -> Result<(), StoreError>;
}

/// Records whose mutable fields can be rewritten.
pub trait Updatable {
    /// Overwrite the mutable fields of the row matching `self`'s key.
    ///
    /// Updating a missing row is not an error.
    fn update(&self, connection: &Connection) -> Result<(), StoreError>;
}

/// Records that can be removed by natural key.
pub trait Deletable {
    /// Delete the row matching `self`'s key.
    fn delete(&self, connection: &Connection) -> Result<(), StoreError>;
}

/// Record sets that can be filled from a query descriptor.
pub trait Queryable {
    /// Descriptor controlling the selection.
    type Query: Filter;

    /// Replace the contents of `self` with one page of matching records.
    ///
    /// Returns `true` when more records follow the page.
    fn query(&mut self, connection: &Connection, query: &Self::Query) -> Result<bool, StoreError>;
}

/// Record sets that can be inserted atomically.
pub trait BulkInsertable {
    /// Insert every record in one transaction.
    ///
    /// On failure nothing persists and the records keep the values they had
    /// before the call, store-assigned fields included.
    fn bulk_insert(&mut self, connection: &mut Connection) -> Result<(), StoreError>;
}

/// Load `record` by its natural key.
pub fn get<R: Gettable + ?Sized>(connection: &Connection, record: &mut R) -> Result<(), StoreError> {
    record.get(connection)
}

/// Create `record`.
pub fn insert<R: Insertable + ?Sized>(
    connection: &Connection,
    record: &mut R,
) -> Result<(), StoreError> {
    record.insert(connection)
}

/// Rewrite the mutable fields of `record`.
pub fn update<R: Updatable + ?Sized>(connection: &Connection, record: &R) -> Result<(), StoreError> {
    record.update(connection)
}

/// Remove `record`.
pub fn delete<R: Deletable + ?Sized>(connection: &Connection, record: &R) -> Result<(), StoreError> {
    record.delete(connection)
}

/// Fill `records` with the page selected by `query`, returning whether more
/// records are available.
///
/// # Examples
/// ```
/// use geofeatures_core::{Collection, CollectionQuery, insert, migrate, open_in_memory, query};
///
/// let mut conn = open_in_memory()?;
/// migrate(&mut conn)?;
/// insert(&conn, &mut Collection::new("parks", "Parks", "Green spaces"))?;
///
/// let mut collections: Vec<Collection> = Vec::new();
/// let more = query(&conn, &mut collections, &CollectionQuery::default())?;
/// assert!(!more);
/// assert_eq!(collections.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn query<R: Queryable + ?Sized>(
    connection: &Connection,
    records: &mut R,
    query: &R::Query,
) -> Result<bool, StoreError> {
    records.query(connection, query)
}

/// Insert every record in `records` inside one transaction.
pub fn bulk_insert<R: BulkInsertable + ?Sized>(
    connection: &mut Connection,
    records: &mut R,
) -> Result<(), StoreError> {
    records.bulk_insert(connection)
}

/// Inserts into copies so that ids assigned before a rollback never reach
/// the caller.
impl<T: Insertable + Clone> BulkInsertable for Vec<T> {
    fn bulk_insert(&mut self, connection: &mut Connection) -> Result<(), StoreError> {
        let transaction = connection
            .transaction()
            .map_err(StoreError::database("begin bulk insert"))?;
        let total = self.len();
        let mut inserted = self.clone();
        for (index, record) in inserted.iter_mut().enumerate() {
            if let Err(err) = record.insert(&transaction) {
                warn!("bulk insert rolled back at record {index} of {total}: {err}");
                return Err(err);
            }
        }
        transaction
            .commit()
            .map_err(StoreError::database("commit bulk insert"))?;
        *self = inserted;
        debug!("bulk inserted {total} records");
        Ok(())
    }
}

pub(crate) fn execute(
    connection: &Connection,
    statement: &Statement,
    operation: &'static str,
) -> Result<usize, rusqlite::Error> {
    debug!("{operation}: {}", statement.sql);
    connection.execute(&statement.sql, statement.params())
}

/// Run `statement` and decode every row with `decode`.
pub(crate) fn fetch_all<T>(
    connection: &Connection,
    statement: &Statement,
    operation: &'static str,
    mut decode: impl FnMut(&Row<'_>) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    debug!("{operation}: {}", statement.sql);
    let mut prepared = connection
        .prepare(&statement.sql)
        .map_err(StoreError::database(operation))?;
    let mut rows = prepared
        .query(statement.params())
        .map_err(StoreError::database(operation))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(StoreError::database(operation))? {
        records.push(decode(row)?);
    }
    Ok(records)
}
