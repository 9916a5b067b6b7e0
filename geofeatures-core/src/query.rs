//! Statement construction on top of `sea_query`.
//!
//! Tables, columns and the spatial SQL functions are [`Iden`] types, so
//! every identifier in a statement is chosen here and every caller-supplied
//! value is bound as a `?` parameter. Statements render with the SQLite
//! backend into a [`Statement`], which binds its values through `rusqlite`.
//!
//! Updates and deletes are only reachable through [`update_where`] and
//! [`delete_where`], which take their condition as an argument.

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqliteValue};
use rusqlite::{ParamsFromIter, params_from_iter};
use sea_query::{
    DeleteStatement, Iden, IntoIden, IntoTableRef, Query, QueryStatementWriter, SelectStatement,
    SimpleExpr, SqliteQueryBuilder, UpdateStatement, Value, Values,
};

/// Columns of the `collections` table.
#[derive(Debug, Clone, Copy, Iden)]
pub enum Collections {
    /// The table itself.
    Table,
    /// Natural key.
    Name,
    /// Human-readable title.
    Title,
    /// Human-readable description.
    Description,
}

/// Columns of the `features` table.
#[derive(Debug, Clone, Copy, Iden)]
pub enum Features {
    /// The table itself.
    Table,
    /// Integer row key shared with the spatial index.
    Fid,
    /// Public UUID key.
    Id,
    /// Owning collection.
    CollectionName,
    /// EWKB geometry blob.
    Geometry,
    /// JSON property object.
    Properties,
}

/// Columns of the R*Tree envelope index over `features`.
#[derive(Debug, Clone, Copy, Iden)]
pub enum FeaturesGeometryIdx {
    /// The virtual table itself.
    Table,
    /// `features.fid` of the indexed row.
    Id,
    /// Envelope west edge.
    MinX,
    /// Envelope east edge.
    MaxX,
    /// Envelope south edge.
    MinY,
    /// Envelope north edge.
    MaxY,
}

/// `ST_GeomFromGeoJSON(text)`: GeoJSON to EWKB.
#[derive(Debug, Clone, Copy, Iden)]
#[iden = "ST_GeomFromGeoJSON"]
pub struct StGeomFromGeoJson;

/// `ST_SetSRID(geometry, srid)`: retag a geometry.
#[derive(Debug, Clone, Copy, Iden)]
#[iden = "ST_SetSRID"]
pub struct StSetSrid;

/// `ST_AsGeoJSON(geometry)`: EWKB to GeoJSON text.
#[derive(Debug, Clone, Copy, Iden)]
#[iden = "ST_AsGeoJSON"]
pub struct StAsGeoJson;

/// A query descriptor that narrows a base selection.
///
/// Implementations add conditions, ordering and limits; the base supplies
/// the table and output columns.
pub trait Filter {
    /// Return `select` restricted by this descriptor.
    fn apply(&self, select: SelectStatement) -> SelectStatement;
}

/// A rendered statement ready for execution.
///
/// # Examples
/// ```
/// use geofeatures_core::query::{Collections, Statement};
/// use sea_query::{Expr, Query};
///
/// let statement = Statement::build(
///     Query::select()
///         .column(Collections::Title)
///         .from(Collections::Table)
///         .and_where(Expr::col(Collections::Name).eq("parks")),
/// );
/// assert_eq!(
///     statement.sql,
///     r#"SELECT "title" FROM "collections" WHERE "name" = ?"#
/// );
/// assert_eq!(statement.values.0.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Values in placeholder order.
    pub values: Values,
}

impl Statement {
    /// Render `statement` for SQLite.
    #[must_use]
    pub fn build<S: QueryStatementWriter>(statement: &S) -> Self {
        let (sql, values) = statement.build(SqliteQueryBuilder);
        Self { sql, values }
    }

    /// Parameters for `rusqlite`, in placeholder order.
    #[must_use]
    pub fn params(&self) -> ParamsFromIter<impl Iterator<Item = Bind<'_>>> {
        params_from_iter(self.values.iter().map(Bind))
    }
}

/// Binds one `sea_query` value as a `rusqlite` parameter.
///
/// UUIDs bind as 16-byte blobs, matching how `rusqlite` stores them.
#[derive(Debug, Clone, Copy)]
pub struct Bind<'a>(pub &'a Value);

impl ToSql for Bind<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self.0 {
            Value::Bool(value) => value.map(SqliteValue::from),
            Value::TinyInt(value) => value.map(SqliteValue::from),
            Value::SmallInt(value) => value.map(SqliteValue::from),
            Value::Int(value) => value.map(SqliteValue::from),
            Value::BigInt(value) => value.map(SqliteValue::from),
            Value::TinyUnsigned(value) => value.map(SqliteValue::from),
            Value::SmallUnsigned(value) => value.map(SqliteValue::from),
            Value::Unsigned(value) => value.map(SqliteValue::from),
            Value::BigUnsigned(value) => value
                .map(|unsigned| {
                    i64::try_from(unsigned)
                        .map(SqliteValue::Integer)
                        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
                })
                .transpose()?,
            Value::Float(value) => value.map(SqliteValue::from),
            Value::Double(value) => value.map(SqliteValue::Real),
            Value::String(value) => value.as_deref().cloned().map(SqliteValue::Text),
            Value::Char(value) => value.map(|character| SqliteValue::Text(character.to_string())),
            Value::Bytes(value) => value.as_deref().cloned().map(SqliteValue::Blob),
            Value::Uuid(value) => value.as_deref().copied().map(SqliteValue::from),
        };
        Ok(ToSqlOutput::Owned(value.unwrap_or(SqliteValue::Null)))
    }
}

/// `UPDATE table SET ... WHERE condition`.
#[must_use]
pub fn update_where<T, C, I>(table: T, values: I, condition: SimpleExpr) -> UpdateStatement
where
    T: IntoTableRef,
    C: IntoIden,
    I: IntoIterator<Item = (C, SimpleExpr)>,
{
    Query::update()
        .table(table)
        .values(values)
        .and_where(condition)
        .to_owned()
}

/// `DELETE FROM table WHERE condition`.
#[must_use]
pub fn delete_where<T: IntoTableRef>(table: T, condition: SimpleExpr) -> DeleteStatement {
    Query::delete()
        .from_table(table)
        .and_where(condition)
        .to_owned()
}
