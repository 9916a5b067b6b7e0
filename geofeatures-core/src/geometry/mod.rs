//! GeoJSON geometry codec.
//!
//! [`Geometry`] mirrors the interchange shape exactly: a type discriminator
//! and nested coordinate arrays. Nothing is normalised on the way through, so
//! rings keep whatever closure and orientation the caller supplied and
//! coordinates are never reprojected. SRID assignment happens in the storage
//! layer (see [`SRID_WGS84`]).
//!
//! Ring lengths and ring closure are not checked here. A polygon ring with two
//! positions decodes, encodes and is stored as given.

use geo::{BoundingRect, Coord, Rect};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

mod sql;
mod wkb;

pub(crate) use sql::register_spatial_functions;
pub use wkb::{SRID_WGS84, WkbError, from_ewkb, to_ewkb};

/// Largest magnitude at which every integral `f64` is exactly representable
/// as an `i64`.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A coordinate tuple: longitude, latitude and an optional altitude.
///
/// The ordinates are kept verbatim. Arity is validated only when a position
/// is written to storage.
///
/// # Examples
/// ```
/// use geofeatures_core::Position;
///
/// let position = Position::new(13.4, 52.5);
/// assert_eq!(position.x(), Some(13.4));
/// assert_eq!(position.ordinates(), &[13.4, 52.5]);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Position(pub Vec<f64>);

impl Position {
    /// Construct a two-dimensional position.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self(vec![x, y])
    }

    /// Construct a position carrying an altitude.
    #[must_use]
    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self(vec![x, y, z])
    }

    /// Longitude, when present.
    #[must_use]
    pub fn x(&self) -> Option<f64> {
        self.0.first().copied()
    }

    /// Latitude, when present.
    #[must_use]
    pub fn y(&self) -> Option<f64> {
        self.0.get(1).copied()
    }

    /// All ordinates in input order.
    #[must_use]
    pub fn ordinates(&self) -> &[f64] {
        &self.0
    }

    fn coord(&self) -> Result<Coord<f64>, OrdinateCountError> {
        match (self.x(), self.y()) {
            (Some(x), Some(y)) => Ok(Coord { x, y }),
            _ => Err(OrdinateCountError {
                found: self.0.len(),
            }),
        }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|value| Ordinate(*value)))
    }
}

/// Serialises integral values without a fractional part so `[1,2]` stays
/// `[1,2]` rather than becoming `[1.0,2.0]`.
///
/// Negative zero has no integer form and is written as `-0.0`.
struct Ordinate(f64);

impl Serialize for Ordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.0;
        let negative_zero = value == 0.0 && value.is_sign_negative();
        if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER && !negative_zero {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "integral and within the exact integer range"
            )]
            let whole = value as i64;
            serializer.serialize_i64(whole)
        } else {
            serializer.serialize_f64(value)
        }
    }
}

/// A GeoJSON geometry.
///
/// # Examples
/// ```
/// use geofeatures_core::geometry::{decode, encode};
///
/// let input = br#"{"type":"Point","coordinates":[1,2]}"#;
/// let geometry = decode(input)?;
/// assert_eq!(encode(&geometry)?, input.to_vec());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single position.
    Point(Position),
    /// A sequence of positions.
    LineString(Vec<Position>),
    /// Linear rings; the first is the exterior.
    Polygon(Vec<Vec<Position>>),
    /// Independent positions.
    MultiPoint(Vec<Position>),
    /// Independent line strings.
    MultiLineString(Vec<Vec<Position>>),
    /// Independent polygons.
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

/// Geometry type names accepted by [`decode`].
pub const SUPPORTED_TYPES: [&str; 6] = [
    "Point",
    "LineString",
    "Polygon",
    "MultiPoint",
    "MultiLineString",
    "MultiPolygon",
];

impl Geometry {
    /// The GeoJSON discriminator for this geometry.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::LineString(_) => "LineString",
            Self::Polygon(_) => "Polygon",
            Self::MultiPoint(_) => "MultiPoint",
            Self::MultiLineString(_) => "MultiLineString",
            Self::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Iterate over every position in document order.
    #[must_use]
    pub fn positions(&self) -> Box<dyn Iterator<Item = &Position> + '_> {
        match self {
            Self::Point(position) => Box::new(std::iter::once(position)),
            Self::LineString(line) | Self::MultiPoint(line) => Box::new(line.iter()),
            Self::Polygon(rings) | Self::MultiLineString(rings) => {
                Box::new(rings.iter().flatten())
            }
            Self::MultiPolygon(polygons) => Box::new(polygons.iter().flatten().flatten()),
        }
    }

    /// Axis-aligned envelope of the geometry in lon/lat space.
    ///
    /// Returns `None` for empty geometries and for geometries holding a
    /// position with fewer than two ordinates.
    #[must_use]
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        geo::Geometry::try_from(self).ok()?.bounding_rect()
    }
}

impl<'de> Deserialize<'de> for Geometry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        decode_value(value).map_err(serde::de::Error::custom)
    }
}

/// Errors returned by [`decode`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload was not JSON.
    #[error("malformed geometry JSON: {0}")]
    Syntax(#[source] serde_json::Error),
    /// The `type` member was missing or named an unsupported geometry.
    #[error("unsupported geometry type {}", .found.as_deref().unwrap_or("<missing>"))]
    UnsupportedType {
        /// The discriminator found in the payload, if any.
        found: Option<String>,
    },
    /// `coordinates` did not have the nesting required by the type.
    #[error("invalid coordinates for {geometry_type}: {source}")]
    InvalidCoordinates {
        /// Discriminator of the geometry being decoded.
        geometry_type: String,
        /// Shape mismatch reported by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors returned by [`encode`].
#[derive(Debug, Error)]
pub enum EncodeError {
    /// JSON has no representation for NaN or infinities.
    #[error("ordinate {value} is not finite")]
    NonFinite {
        /// The offending ordinate.
        value: f64,
    },
    /// `serde_json` rejected the value.
    #[error("failed to serialise geometry: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// A position did not carry both longitude and latitude.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("position has {found} ordinates; at least two are required")]
pub struct OrdinateCountError {
    /// Number of ordinates present.
    pub found: usize,
}

/// Decode a GeoJSON geometry payload.
pub fn decode(bytes: &[u8]) -> Result<Geometry, DecodeError> {
    let value: Value = serde_json::from_slice(bytes).map_err(DecodeError::Syntax)?;
    decode_value(value)
}

/// Decode an already parsed GeoJSON geometry object.
pub fn decode_value(mut value: Value) -> Result<Geometry, DecodeError> {
    let Some(object) = value.as_object_mut() else {
        return Err(DecodeError::UnsupportedType { found: None });
    };
    let geometry_type = match object.get("type") {
        Some(Value::String(name)) => name.clone(),
        _ => return Err(DecodeError::UnsupportedType { found: None }),
    };
    let coordinates = object.remove("coordinates").unwrap_or(Value::Null);

    match geometry_type.as_str() {
        "Point" => coordinates_of(&geometry_type, coordinates).map(Geometry::Point),
        "LineString" => coordinates_of(&geometry_type, coordinates).map(Geometry::LineString),
        "Polygon" => coordinates_of(&geometry_type, coordinates).map(Geometry::Polygon),
        "MultiPoint" => coordinates_of(&geometry_type, coordinates).map(Geometry::MultiPoint),
        "MultiLineString" => {
            coordinates_of(&geometry_type, coordinates).map(Geometry::MultiLineString)
        }
        "MultiPolygon" => coordinates_of(&geometry_type, coordinates).map(Geometry::MultiPolygon),
        _ => Err(DecodeError::UnsupportedType {
            found: Some(geometry_type),
        }),
    }
}

fn coordinates_of<T: DeserializeOwned>(
    geometry_type: &str,
    coordinates: Value,
) -> Result<T, DecodeError> {
    serde_json::from_value(coordinates).map_err(|source| DecodeError::InvalidCoordinates {
        geometry_type: geometry_type.to_owned(),
        source,
    })
}

/// Encode a geometry as GeoJSON bytes.
pub fn encode(geometry: &Geometry) -> Result<Vec<u8>, EncodeError> {
    encode_to_string(geometry).map(String::into_bytes)
}

/// Encode a geometry as a GeoJSON string.
pub fn encode_to_string(geometry: &Geometry) -> Result<String, EncodeError> {
    if let Some(value) = geometry
        .positions()
        .flat_map(Position::ordinates)
        .find(|value| !value.is_finite())
    {
        return Err(EncodeError::NonFinite { value: *value });
    }
    serde_json::to_string(geometry).map_err(EncodeError::Serialize)
}

/// Whether the geometry survives [`encode`].
///
/// This is a structural check only; self-intersection and ring orientation
/// are not inspected.
#[must_use]
pub fn is_valid(geometry: &Geometry) -> bool {
    encode(geometry).is_ok()
}

fn line(positions: &[Position]) -> Result<geo::LineString<f64>, OrdinateCountError> {
    positions
        .iter()
        .map(Position::coord)
        .collect::<Result<Vec<_>, _>>()
        .map(geo::LineString::new)
}

fn polygon(rings: &[Vec<Position>]) -> Result<geo::Polygon<f64>, OrdinateCountError> {
    let mut rings = rings.iter().map(|ring| line(ring));
    let exterior = rings
        .next()
        .transpose()?
        .unwrap_or_else(|| geo::LineString::new(Vec::new()));
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(geo::Polygon::new(exterior, interiors))
}

/// Converts into `geo` types for use with `geo` algorithms.
///
/// `geo::Polygon` closes its rings, so the conversion is one-way.
impl TryFrom<&Geometry> for geo::Geometry<f64> {
    type Error = OrdinateCountError;

    fn try_from(geometry: &Geometry) -> Result<Self, Self::Error> {
        Ok(match geometry {
            Geometry::Point(position) => geo::Point::from(position.coord()?).into(),
            Geometry::LineString(positions) => line(positions)?.into(),
            Geometry::Polygon(rings) => polygon(rings)?.into(),
            Geometry::MultiPoint(positions) => positions
                .iter()
                .map(|position| position.coord().map(geo::Point::from))
                .collect::<Result<Vec<_>, _>>()
                .map(geo::MultiPoint::new)?
                .into(),
            Geometry::MultiLineString(lines) => lines
                .iter()
                .map(|positions| line(positions))
                .collect::<Result<Vec<_>, _>>()
                .map(geo::MultiLineString::new)?
                .into(),
            Geometry::MultiPolygon(polygons) => polygons
                .iter()
                .map(|rings| polygon(rings))
                .collect::<Result<Vec<_>, _>>()
                .map(geo::MultiPolygon::new)?
                .into(),
        })
    }
}
