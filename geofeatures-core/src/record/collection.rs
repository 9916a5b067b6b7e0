//! Named groupings of features.

use rusqlite::Connection;
use sea_query::{Expr, Order, Query, SelectStatement, SimpleExpr};
use serde::{Deserialize, Serialize};

use super::{Deletable, Gettable, Insertable, Queryable, Updatable, execute, fetch_all};
use crate::error::{StoreError, is_unique_violation};
use crate::query::{Collections, Filter, Statement, delete_where, update_where};

const ENTITY: &str = "collection";

/// A top-level grouping of features, keyed by `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Unique, immutable identifier.
    pub name: String,
    /// Human-readable title.
    pub title: String,
    /// Human-readable description.
    pub description: String,
}

impl Collection {
    /// Build a collection record.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: description.into(),
        }
    }

    /// A key-only record, ready for [`Gettable::get`] or [`Deletable::delete`].
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Lists every collection ordered by name.
// TODO: add keyset pagination on `name` once collection counts warrant it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionQuery;

impl Filter for CollectionQuery {
    fn apply(&self, mut select: SelectStatement) -> SelectStatement {
        select.order_by(Collections::Name, Order::Asc);
        select
    }
}

fn select() -> SelectStatement {
    Query::select()
        .columns([
            Collections::Name,
            Collections::Title,
            Collections::Description,
        ])
        .from(Collections::Table)
        .to_owned()
}

fn by_name(name: &str) -> SimpleExpr {
    Expr::col(Collections::Name).eq(name)
}

fn decode(row: &rusqlite::Row<'_>) -> Result<Collection, StoreError> {
    let read = |row: &rusqlite::Row<'_>| -> rusqlite::Result<Collection> {
        Ok(Collection {
            name: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
        })
    };
    read(row).map_err(StoreError::database("decode collection row"))
}

impl Gettable for Collection {
    fn get(&mut self, connection: &Connection) -> Result<(), StoreError> {
        let statement = Statement::build(select().and_where(by_name(&self.name)));
        let found = fetch_all(connection, &statement, "get collection", decode)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                entity: ENTITY,
                key: self.name.clone(),
            })?;
        *self = found;
        Ok(())
    }
}

impl Insertable for Collection {
    fn insert(&mut self, connection: &Connection) -> Result<(), StoreError> {
        let statement = Statement::build(
            Query::insert()
                .into_table(Collections::Table)
                .columns([
                    Collections::Name,
                    Collections::Title,
                    Collections::Description,
                ])
                .values([
                    self.name.as_str().into(),
                    self.title.as_str().into(),
                    self.description.as_str().into(),
                ])?,
        );
        execute(connection, &statement, "insert collection").map_err(|source| {
            if is_unique_violation(&source) {
                StoreError::Conflict {
                    entity: ENTITY,
                    key: self.name.clone(),
                }
            } else {
                StoreError::Database {
                    operation: "insert collection",
                    source,
                }
            }
        })?;
        self.get(connection)
    }
}

impl Updatable for Collection {
    fn update(&self, connection: &Connection) -> Result<(), StoreError> {
        let statement = Statement::build(&update_where(
            Collections::Table,
            [
                (Collections::Title, self.title.as_str().into()),
                (Collections::Description, self.description.as_str().into()),
            ],
            by_name(&self.name),
        ));
        execute(connection, &statement, "update collection")
            .map_err(StoreError::database("update collection"))?;
        Ok(())
    }
}

impl Deletable for Collection {
    fn delete(&self, connection: &Connection) -> Result<(), StoreError> {
        let statement = Statement::build(&delete_where(Collections::Table, by_name(&self.name)));
        execute(connection, &statement, "delete collection")
            .map_err(StoreError::database("delete collection"))?;
        Ok(())
    }
}

impl Queryable for Vec<Collection> {
    type Query = CollectionQuery;

    fn query(&mut self, connection: &Connection, query: &Self::Query) -> Result<bool, StoreError> {
        let statement = Statement::build(&query.apply(select()));
        *self = fetch_all(connection, &statement, "query collections", decode)?;
        Ok(false)
    }
}
