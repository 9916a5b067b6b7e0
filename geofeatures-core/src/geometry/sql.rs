//! SQLite adapters for [`Geometry`].
//!
//! Geometries cross the driver boundary as GeoJSON text. The spatial SQL
//! functions registered by [`register_spatial_functions`] convert that text
//! to and from the EWKB blobs held in the `geometry` column, so statements
//! read `ST_AsGeoJSON(geometry)` and write
//! `ST_SetSRID(ST_GeomFromGeoJSON(?), ?)` with the SRID bound.

use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, Error as SqliteError};

use super::{Geometry, decode, encode_to_string, from_ewkb, to_ewkb};

impl ToSql for Geometry {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let text = encode_to_string(self)
            .map_err(|err| SqliteError::ToSqlConversionFailure(Box::new(err)))?;
        Ok(ToSqlOutput::from(text))
    }
}

impl FromSql for Geometry {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(text) => decode(text).map_err(|err| FromSqlError::Other(Box::new(err))),
            ValueRef::Blob(bytes) => from_ewkb(bytes)
                .map(|(geometry, _)| geometry)
                .map_err(|err| FromSqlError::Other(Box::new(err))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn user_error(err: impl Into<BoxedError>) -> SqliteError {
    SqliteError::UserFunctionError(err.into())
}

fn geometry_arg(ctx: &Context<'_>, index: usize) -> rusqlite::Result<Option<(Geometry, Option<i32>)>> {
    let Some(bytes) = ctx.get::<Option<Vec<u8>>>(index)? else {
        return Ok(None);
    };
    from_ewkb(&bytes).map(Some).map_err(user_error)
}

fn envelope(ctx: &Context<'_>, pick: fn(geo::Rect<f64>) -> f64) -> rusqlite::Result<Option<f64>> {
    Ok(geometry_arg(ctx, 0)?
        .and_then(|(geometry, _)| geometry.bounding_rect())
        .map(pick))
}

/// Register the spatial SQL functions on `connection`.
///
/// Every function passes SQL `NULL` through unchanged. Malformed input is
/// reported as a user function error, which aborts the statement.
pub(crate) fn register_spatial_functions(connection: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8
        | FunctionFlags::SQLITE_DETERMINISTIC
        | FunctionFlags::SQLITE_INNOCUOUS;

    connection.create_scalar_function("ST_GeomFromGeoJSON", 1, flags, |ctx| {
        let Some(text) = ctx.get::<Option<String>>(0)? else {
            return Ok(None);
        };
        let geometry = decode(text.as_bytes()).map_err(user_error)?;
        to_ewkb(&geometry, None).map(Some).map_err(user_error)
    })?;

    connection.create_scalar_function("ST_SetSRID", 2, flags, |ctx| {
        let srid: i32 = ctx.get(1)?;
        match geometry_arg(ctx, 0)? {
            Some((geometry, _)) => to_ewkb(&geometry, Some(srid)).map(Some).map_err(user_error),
            None => Ok(None),
        }
    })?;

    connection.create_scalar_function("ST_AsGeoJSON", 1, flags, |ctx| {
        match geometry_arg(ctx, 0)? {
            Some((geometry, _)) => encode_to_string(&geometry).map(Some).map_err(user_error),
            None => Ok(None),
        }
    })?;

    connection.create_scalar_function("ST_SRID", 1, flags, |ctx| {
        Ok(geometry_arg(ctx, 0)?.map(|(_, srid)| srid.unwrap_or(0)))
    })?;

    connection.create_scalar_function("ST_XMin", 1, flags, |ctx| {
        envelope(ctx, |rect| rect.min().x)
    })?;
    connection.create_scalar_function("ST_XMax", 1, flags, |ctx| {
        envelope(ctx, |rect| rect.max().x)
    })?;
    connection.create_scalar_function("ST_YMin", 1, flags, |ctx| {
        envelope(ctx, |rect| rect.min().y)
    })?;
    connection.create_scalar_function("ST_YMax", 1, flags, |ctx| {
        envelope(ctx, |rect| rect.max().y)
    })?;

    Ok(())
}
