//! Georeferenced records with free-form properties.
//!
//! Features are listed with keyset pagination: pages are ordered by `id`
//! and the caller passes the last id of one page as the `after` cursor of
//! the next. Each page over-fetches one row to learn whether another page
//! exists.

use geo::Rect;
use log::debug;
use rusqlite::Connection;
use sea_query::{Alias, Expr, Func, Order, Query, SelectStatement, SimpleExpr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Deletable, Gettable, Insertable, Queryable, Updatable, execute, fetch_all};
use crate::error::StoreError;
use crate::geometry::{self, Geometry, SRID_WGS84, encode_to_string, to_ewkb};
use crate::properties::Properties;
use crate::query::{
    Features, FeaturesGeometryIdx, Filter, StAsGeoJson, StGeomFromGeoJson, StSetSrid, Statement,
    delete_where, update_where,
};

const ENTITY: &str = "feature";

/// Page size used when a [`FeatureQuery`] asks for zero features.
pub const DEFAULT_FEATURE_LIMIT: u64 = 500;

/// SQLite rejects `LIMIT` values beyond `i64::MAX`.
const MAX_SQL_LIMIT: u64 = i64::MAX.unsigned_abs();

/// A feature belonging to one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Store-assigned identifier; replaced on every successful insert.
    pub id: Uuid,
    /// Owning collection.
    pub collection_name: String,
    /// Location in WGS84 longitude/latitude.
    pub geometry: Geometry,
    /// Arbitrary JSON object.
    #[serde(default)]
    pub properties: Properties,
}

impl Feature {
    /// Build a feature ready for insertion into `collection_name`.
    #[must_use]
    pub fn new(
        collection_name: impl Into<String>,
        geometry: Geometry,
        properties: Properties,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            collection_name: collection_name.into(),
            geometry,
            properties,
        }
    }

    /// A key-only record, ready for [`Gettable::get`] or [`Deletable::delete`].
    ///
    /// The geometry is an empty multi-point until the record is loaded.
    #[must_use]
    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            collection_name: String::new(),
            geometry: Geometry::MultiPoint(Vec::new()),
            properties: Properties::new(),
        }
    }
}

/// Selects one page of a collection's features.
///
/// # Examples
/// ```
/// use geofeatures_core::{DEFAULT_FEATURE_LIMIT, FeatureQuery};
///
/// let query = FeatureQuery::new("parks");
/// assert_eq!(query.page_size(), DEFAULT_FEATURE_LIMIT);
/// assert_eq!(query.with_limit(10).page_size(), 10);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureQuery {
    /// Collection to list.
    pub collection: String,
    /// Maximum page size; zero selects [`DEFAULT_FEATURE_LIMIT`].
    pub limit: u64,
    /// Only return features whose id sorts after this cursor.
    pub after: Option<Uuid>,
    /// Only return features whose envelope intersects this rectangle.
    ///
    /// Boundaries are inclusive. The index stores envelopes at single
    /// precision rounded outward, so features within about 1e-7 degrees of
    /// an edge may also match.
    pub bbox: Option<Rect<f64>>,
}

impl FeatureQuery {
    /// First page of `collection` with the default page size.
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    /// Set the page size.
    #[must_use]
    pub const fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Continue after `id`.
    #[must_use]
    pub const fn after(mut self, id: Uuid) -> Self {
        self.after = Some(id);
        self
    }

    /// Restrict to features intersecting `bbox`.
    #[must_use]
    pub const fn within(mut self, bbox: Rect<f64>) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Effective page size.
    #[must_use]
    pub const fn page_size(&self) -> u64 {
        if self.limit == 0 {
            DEFAULT_FEATURE_LIMIT
        } else {
            self.limit
        }
    }
}

impl Filter for FeatureQuery {
    fn apply(&self, mut select: SelectStatement) -> SelectStatement {
        select.and_where(
            Expr::col((Features::Table, Features::CollectionName)).eq(self.collection.as_str()),
        );
        if let Some(after) = self.after {
            select.and_where(Expr::col((Features::Table, Features::Id)).gt(after));
        }
        if let Some(bbox) = self.bbox {
            select.and_where(
                Expr::col((Features::Table, Features::Fid)).in_subquery(envelope_matches(bbox)),
            );
        }
        select
            .order_by((Features::Table, Features::Id), Order::Asc)
            .limit(self.page_size().saturating_add(1).min(MAX_SQL_LIMIT));
        select
    }
}

/// Row keys whose indexed envelope intersects `bbox`, edges included.
fn envelope_matches(bbox: Rect<f64>) -> SelectStatement {
    Query::select()
        .column(FeaturesGeometryIdx::Id)
        .from(FeaturesGeometryIdx::Table)
        .and_where(Expr::col(FeaturesGeometryIdx::MaxX).gte(bbox.min().x))
        .and_where(Expr::col(FeaturesGeometryIdx::MinX).lte(bbox.max().x))
        .and_where(Expr::col(FeaturesGeometryIdx::MaxY).gte(bbox.min().y))
        .and_where(Expr::col(FeaturesGeometryIdx::MinY).lte(bbox.max().y))
        .to_owned()
}

fn select() -> SelectStatement {
    Query::select()
        .column((Features::Table, Features::Id))
        .column((Features::Table, Features::CollectionName))
        .expr_as(
            Func::cust(StAsGeoJson).arg(Expr::col((Features::Table, Features::Geometry))),
            Alias::new("geometry"),
        )
        .column((Features::Table, Features::Properties))
        .from(Features::Table)
        .to_owned()
}

fn by_id(id: Uuid) -> SimpleExpr {
    Expr::col((Features::Table, Features::Id)).eq(id)
}

fn decode(row: &rusqlite::Row<'_>) -> Result<Feature, StoreError> {
    let read = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(Uuid, String, String, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    };
    let (id, collection_name, geojson, properties) =
        read(row).map_err(StoreError::database("decode feature row"))?;
    Ok(Feature {
        id,
        collection_name,
        geometry: geometry::decode(geojson.as_bytes())?,
        properties: serde_json::from_str(&properties)
            .map_err(|source| StoreError::InvalidProperties { id, source })?,
    })
}

/// Geometry expression for writes, checked against the native encoding
/// first so unstorable positions surface as input errors.
fn geometry_expr(geometry: &Geometry) -> Result<SimpleExpr, StoreError> {
    let text = encode_to_string(geometry)?;
    to_ewkb(geometry, Some(SRID_WGS84))?;
    Ok(Func::cust(StSetSrid)
        .args([
            Func::cust(StGeomFromGeoJson).arg(text).into(),
            SRID_WGS84.into(),
        ])
        .into())
}

/// Insert statement for `feature` stored under `id`.
fn insert_statement(feature: &Feature, id: Uuid) -> Result<Statement, StoreError> {
    let geometry = geometry_expr(&feature.geometry)?;
    Ok(Statement::build(
        Query::insert()
            .into_table(Features::Table)
            .columns([
                Features::Id,
                Features::CollectionName,
                Features::Geometry,
                Features::Properties,
            ])
            .values([
                id.into(),
                feature.collection_name.as_str().into(),
                geometry,
                feature.properties.to_string().into(),
            ])?,
    ))
}

impl Gettable for Feature {
    fn get(&mut self, connection: &Connection) -> Result<(), StoreError> {
        let statement = Statement::build(select().and_where(by_id(self.id)));
        let found = fetch_all(connection, &statement, "get feature", decode)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                entity: ENTITY,
                key: self.id.to_string(),
            })?;
        *self = found;
        Ok(())
    }
}

impl Insertable for Feature {
    fn insert(&mut self, connection: &Connection) -> Result<(), StoreError> {
        let id = Uuid::now_v7();
        let statement = insert_statement(self, id)?;
        execute(connection, &statement, "insert feature")
            .map_err(StoreError::database("insert feature"))?;
        self.id = id;
        Ok(())
    }
}

impl Updatable for Feature {
    fn update(&self, connection: &Connection) -> Result<(), StoreError> {
        let statement = Statement::build(&update_where(
            Features::Table,
            [
                (Features::Geometry, geometry_expr(&self.geometry)?),
                (Features::Properties, self.properties.to_string().into()),
            ],
            by_id(self.id),
        ));
        execute(connection, &statement, "update feature")
            .map_err(StoreError::database("update feature"))?;
        Ok(())
    }
}

impl Deletable for Feature {
    fn delete(&self, connection: &Connection) -> Result<(), StoreError> {
        let statement = Statement::build(&delete_where(Features::Table, by_id(self.id)));
        execute(connection, &statement, "delete feature")
            .map_err(StoreError::database("delete feature"))?;
        Ok(())
    }
}

impl Queryable for Vec<Feature> {
    type Query = FeatureQuery;

    fn query(&mut self, connection: &Connection, query: &Self::Query) -> Result<bool, StoreError> {
        let statement = Statement::build(&query.apply(select()));
        let mut page = fetch_all(connection, &statement, "query features", decode)?;
        let page_size = usize::try_from(query.page_size()).unwrap_or(usize::MAX);
        let more = page.len() > page_size;
        page.truncate(page_size);
        debug!(
            "feature page for {}: {} rows, more = {more}",
            query.collection,
            page.len()
        );
        *self = page;
        Ok(more)
    }
}
