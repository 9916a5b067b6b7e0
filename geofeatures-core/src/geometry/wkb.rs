//! Extended well-known binary, the stored geometry representation.
//!
//! Both directions run through `geozero`. [`Geometry`] replays its positions
//! into any `GeomProcessor`, which lets the EWKB writer serialise it, and
//! `GeometryBuilder` collects the events the EWKB reader emits. Writers emit
//! little-endian EWKB with the Z flag set for three-dimensional geometries.

use geozero::error::{GeozeroError, Result as GeozeroResult};
use geozero::wkb::process_ewkb_geom;
use geozero::{CoordDimensions, GeomProcessor, GeozeroGeometry, ToWkb};
use thiserror::Error;

use super::{Geometry, Position};

/// WGS84 longitude/latitude, the reference system of every stored geometry.
pub const SRID_WGS84: i32 = 4326;

/// Errors raised while converting between [`Geometry`] and EWKB.
#[derive(Debug, Error)]
pub enum WkbError {
    /// A position could not be stored with 2 or 3 ordinates.
    #[error("position has {found} ordinates; stored geometries need 2 or 3")]
    Dimension {
        /// Number of ordinates present.
        found: usize,
    },
    /// Positions within one geometry disagreed on their dimension.
    #[error("geometry mixes {expected}D and {found}D positions")]
    MixedDimensions {
        /// Dimension of the first position.
        expected: usize,
        /// Dimension of the offending position.
        found: usize,
    },
    /// Bytes remained after the geometry.
    #[error("{remaining} trailing bytes after WKB geometry")]
    TrailingBytes {
        /// Number of unread bytes.
        remaining: usize,
    },
    /// The reader or writer rejected the geometry.
    #[error("malformed WKB: {0}")]
    Format(#[from] GeozeroError),
}

/// Encode a geometry as EWKB, tagging it with `srid` when provided.
///
/// # Examples
/// ```
/// use geofeatures_core::{Geometry, Position};
/// use geofeatures_core::geometry::{SRID_WGS84, from_ewkb, to_ewkb};
///
/// let point = Geometry::Point(Position::new(1.0, 2.0));
/// let bytes = to_ewkb(&point, Some(SRID_WGS84))?;
/// assert_eq!(from_ewkb(&bytes)?, (point, Some(SRID_WGS84)));
/// # Ok::<(), geofeatures_core::geometry::WkbError>(())
/// ```
pub fn to_ewkb(geometry: &Geometry, srid: Option<i32>) -> Result<Vec<u8>, WkbError> {
    let dimensions = if dimension_of(geometry)? == 3 {
        CoordDimensions::xyz()
    } else {
        CoordDimensions::xy()
    };
    Ok(ToWkb::to_ewkb(geometry, dimensions, srid)?)
}

/// Decode EWKB (or plain two-dimensional WKB) into a geometry and its SRID.
pub fn from_ewkb(bytes: &[u8]) -> Result<(Geometry, Option<i32>), WkbError> {
    let mut unread = bytes;
    let mut builder = GeometryBuilder::default();
    process_ewkb_geom(&mut unread, &mut builder)?;
    if !unread.is_empty() {
        return Err(WkbError::TrailingBytes {
            remaining: unread.len(),
        });
    }
    let geometry = builder.geometry.ok_or(GeozeroError::GeometryFormat)?;
    Ok((geometry, builder.srid))
}

fn dimension_of(geometry: &Geometry) -> Result<usize, WkbError> {
    let mut positions = geometry.positions();
    let Some(first) = positions.next() else {
        return Ok(2);
    };
    let expected = first.ordinates().len();
    if !(2..=3).contains(&expected) {
        return Err(WkbError::Dimension { found: expected });
    }
    for position in positions {
        let found = position.ordinates().len();
        if found != expected {
            return Err(WkbError::MixedDimensions { expected, found });
        }
    }
    Ok(expected)
}

impl GeozeroGeometry for Geometry {
    fn process_geom<P: GeomProcessor>(&self, processor: &mut P) -> GeozeroResult<()> {
        match self {
            Self::Point(position) => {
                processor.point_begin(0)?;
                emit_position(position, 0, processor)?;
                processor.point_end(0)
            }
            Self::LineString(line) => emit_line(line, true, 0, processor),
            Self::Polygon(rings) => emit_polygon(rings, true, 0, processor),
            Self::MultiPoint(points) => {
                processor.multipoint_begin(points.len(), 0)?;
                for (idx, point) in points.iter().enumerate() {
                    emit_position(point, idx, processor)?;
                }
                processor.multipoint_end(0)
            }
            Self::MultiLineString(lines) => {
                processor.multilinestring_begin(lines.len(), 0)?;
                for (idx, line) in lines.iter().enumerate() {
                    emit_line(line, false, idx, processor)?;
                }
                processor.multilinestring_end(0)
            }
            Self::MultiPolygon(polygons) => {
                processor.multipolygon_begin(polygons.len(), 0)?;
                for (idx, rings) in polygons.iter().enumerate() {
                    emit_polygon(rings, false, idx, processor)?;
                }
                processor.multipolygon_end(0)
            }
        }
    }
}

fn emit_position<P: GeomProcessor>(
    position: &Position,
    idx: usize,
    processor: &mut P,
) -> GeozeroResult<()> {
    let (x, y, z) = match *position.ordinates() {
        [x, y] => (x, y, None),
        [x, y, z] => (x, y, Some(z)),
        _ => return Err(GeozeroError::Coord),
    };
    if processor.multi_dim() {
        processor.coordinate(x, y, z, None, None, None, idx)
    } else {
        processor.xy(x, y, idx)
    }
}

fn emit_line<P: GeomProcessor>(
    positions: &[Position],
    tagged: bool,
    idx: usize,
    processor: &mut P,
) -> GeozeroResult<()> {
    processor.linestring_begin(tagged, positions.len(), idx)?;
    for (position_idx, position) in positions.iter().enumerate() {
        emit_position(position, position_idx, processor)?;
    }
    processor.linestring_end(tagged, idx)
}

fn emit_polygon<P: GeomProcessor>(
    rings: &[Vec<Position>],
    tagged: bool,
    idx: usize,
    processor: &mut P,
) -> GeozeroResult<()> {
    processor.polygon_begin(tagged, rings.len(), idx)?;
    for (ring_idx, ring) in rings.iter().enumerate() {
        emit_line(ring, false, ring_idx, processor)?;
    }
    processor.polygon_end(tagged, idx)
}

/// Reassembles a [`Geometry`] from reader events.
///
/// `tagged` marks a top-level line string or polygon. Untagged ones are
/// members of a multi-geometry or rings of a polygon.
#[derive(Default)]
struct GeometryBuilder {
    srid: Option<i32>,
    positions: Vec<Position>,
    lines: Vec<Vec<Position>>,
    polygons: Vec<Vec<Vec<Position>>>,
    geometry: Option<Geometry>,
}

impl GeometryBuilder {
    fn unsupported(kind: &str) -> GeozeroError {
        GeozeroError::Geometry(format!("{kind} geometries cannot be stored"))
    }
}

impl GeomProcessor for GeometryBuilder {
    fn dimensions(&self) -> CoordDimensions {
        CoordDimensions::xyz()
    }

    fn srid(&mut self, srid: Option<i32>) -> GeozeroResult<()> {
        self.srid = srid;
        Ok(())
    }

    fn xy(&mut self, x: f64, y: f64, _idx: usize) -> GeozeroResult<()> {
        self.positions.push(Position::new(x, y));
        Ok(())
    }

    fn coordinate(
        &mut self,
        x: f64,
        y: f64,
        z: Option<f64>,
        _m: Option<f64>,
        _t: Option<f64>,
        _tm: Option<u64>,
        _idx: usize,
    ) -> GeozeroResult<()> {
        self.positions.push(match z {
            Some(z) => Position::with_z(x, y, z),
            None => Position::new(x, y),
        });
        Ok(())
    }

    fn point_end(&mut self, _idx: usize) -> GeozeroResult<()> {
        let position = self.positions.pop().ok_or(GeozeroError::Coord)?;
        self.geometry = Some(Geometry::Point(position));
        Ok(())
    }

    fn multipoint_end(&mut self, _idx: usize) -> GeozeroResult<()> {
        self.geometry = Some(Geometry::MultiPoint(std::mem::take(&mut self.positions)));
        Ok(())
    }

    fn linestring_end(&mut self, tagged: bool, _idx: usize) -> GeozeroResult<()> {
        let line = std::mem::take(&mut self.positions);
        if tagged {
            self.geometry = Some(Geometry::LineString(line));
        } else {
            self.lines.push(line);
        }
        Ok(())
    }

    fn multilinestring_end(&mut self, _idx: usize) -> GeozeroResult<()> {
        self.geometry = Some(Geometry::MultiLineString(std::mem::take(&mut self.lines)));
        Ok(())
    }

    fn polygon_end(&mut self, tagged: bool, _idx: usize) -> GeozeroResult<()> {
        let rings = std::mem::take(&mut self.lines);
        if tagged {
            self.geometry = Some(Geometry::Polygon(rings));
        } else {
            self.polygons.push(rings);
        }
        Ok(())
    }

    fn multipolygon_end(&mut self, _idx: usize) -> GeozeroResult<()> {
        self.geometry = Some(Geometry::MultiPolygon(std::mem::take(&mut self.polygons)));
        Ok(())
    }

    fn geometrycollection_begin(&mut self, _size: usize, _idx: usize) -> GeozeroResult<()> {
        Err(Self::unsupported("collection"))
    }

    fn circularstring_begin(&mut self, _size: usize, _idx: usize) -> GeozeroResult<()> {
        Err(Self::unsupported("curved"))
    }

    fn compoundcurve_begin(&mut self, _size: usize, _idx: usize) -> GeozeroResult<()> {
        Err(Self::unsupported("curved"))
    }

    fn curvepolygon_begin(&mut self, _size: usize, _idx: usize) -> GeozeroResult<()> {
        Err(Self::unsupported("curved"))
    }

    fn multicurve_begin(&mut self, _size: usize, _idx: usize) -> GeozeroResult<()> {
        Err(Self::unsupported("curved"))
    }

    fn multisurface_begin(&mut self, _size: usize, _idx: usize) -> GeozeroResult<()> {
        Err(Self::unsupported("curved"))
    }

    fn triangle_begin(&mut self, _tagged: bool, _size: usize, _idx: usize) -> GeozeroResult<()> {
        Err(Self::unsupported("triangle"))
    }

    fn polyhedralsurface_begin(&mut self, _size: usize, _idx: usize) -> GeozeroResult<()> {
        Err(Self::unsupported("polyhedral"))
    }

    fn tin_begin(&mut self, _size: usize, _idx: usize) -> GeozeroResult<()> {
        Err(Self::unsupported("TIN"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SRID_FLAG: u32 = 0x2000_0000;
    const Z_FLAG: u32 = 0x8000_0000;

    fn square() -> Vec<Position> {
        vec![
            Position::new(0.0, 0.0),
            Position::new(1.0, 0.0),
            Position::new(1.0, 1.0),
            Position::new(0.0, 1.0),
            Position::new(0.0, 0.0),
        ]
    }

    #[rstest]
    #[case(Geometry::Point(Position::new(1.0, 2.0)))]
    #[case(Geometry::Point(Position::with_z(1.0, 2.0, 3.5)))]
    #[case(Geometry::LineString(vec![Position::new(0.0, 0.0), Position::new(-1.5, 2.25)]))]
    #[case(Geometry::Polygon(vec![square()]))]
    #[case(Geometry::MultiPoint(vec![Position::new(0.0, 0.0), Position::new(3.0, 4.0)]))]
    #[case(Geometry::MultiLineString(vec![square(), vec![Position::new(9.0, 9.0)]]))]
    #[case(Geometry::MultiPolygon(vec![vec![square()], vec![square(), square()]]))]
    #[case(Geometry::LineString(Vec::new()))]
    fn stored_geometries_read_back_unchanged(#[case] geometry: Geometry) {
        let bytes = to_ewkb(&geometry, Some(SRID_WGS84)).expect("encode EWKB");
        let (decoded, srid) = from_ewkb(&bytes).expect("decode EWKB");
        assert_eq!(decoded, geometry);
        assert_eq!(srid, Some(SRID_WGS84));
    }

    #[rstest]
    #[expect(clippy::little_endian_bytes, reason = "EWKB fixtures are little-endian")]
    fn point_layout_matches_postgis() {
        let point = Geometry::Point(Position::new(1.0, 2.0));
        let bytes = to_ewkb(&point, Some(SRID_WGS84)).expect("encode EWKB");
        let mut expected = vec![1];
        expected.extend_from_slice(&(1 | SRID_FLAG).to_le_bytes());
        expected.extend_from_slice(&SRID_WGS84.to_le_bytes());
        expected.extend_from_slice(&1.0_f64.to_le_bytes());
        expected.extend_from_slice(&2.0_f64.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[rstest]
    fn untagged_geometries_have_no_srid() {
        let point = Geometry::Point(Position::new(1.0, 2.0));
        let bytes = to_ewkb(&point, None).expect("encode WKB");
        assert_eq!(bytes.len(), 21);
        assert_eq!(from_ewkb(&bytes).expect("decode WKB").1, None);
    }

    #[rstest]
    #[expect(clippy::big_endian_bytes, reason = "exercises the big-endian reader")]
    fn big_endian_z_input_is_accepted() {
        let mut bytes = vec![0];
        bytes.extend_from_slice(&(1 | Z_FLAG).to_be_bytes());
        for ordinate in [1.0_f64, 2.0, 3.0] {
            bytes.extend_from_slice(&ordinate.to_be_bytes());
        }
        let (geometry, srid) = from_ewkb(&bytes).expect("decode big-endian EWKB");
        assert_eq!(geometry, Geometry::Point(Position::with_z(1.0, 2.0, 3.0)));
        assert_eq!(srid, None);
    }

    #[rstest]
    #[case(Position(vec![1.0]), 1)]
    #[case(Position(vec![1.0, 2.0, 3.0, 4.0]), 4)]
    fn unsupported_dimensions_are_rejected(#[case] position: Position, #[case] found: usize) {
        let err = to_ewkb(&Geometry::Point(position), None).expect_err("bad dimension");
        assert!(
            matches!(err, WkbError::Dimension { found: actual } if actual == found),
            "unexpected {err:?}"
        );
    }

    #[rstest]
    fn mixed_dimensions_are_rejected() {
        let line = Geometry::LineString(vec![
            Position::new(0.0, 0.0),
            Position::with_z(1.0, 1.0, 1.0),
        ]);
        let err = to_ewkb(&line, None).expect_err("mixed dimensions");
        assert!(
            matches!(
                err,
                WkbError::MixedDimensions {
                    expected: 2,
                    found: 3
                }
            ),
            "unexpected {err:?}"
        );
    }

    #[rstest]
    fn truncated_input_is_rejected() {
        let point = Geometry::Point(Position::new(1.0, 2.0));
        let bytes = to_ewkb(&point, None).expect("encode WKB");
        let short = bytes.get(..bytes.len() - 1).expect("non-empty buffer");
        let err = from_ewkb(short).expect_err("truncated input");
        assert!(matches!(err, WkbError::Format(_)), "unexpected {err:?}");
    }

    #[rstest]
    fn trailing_bytes_are_rejected() {
        let point = Geometry::Point(Position::new(1.0, 2.0));
        let mut bytes = to_ewkb(&point, None).expect("encode WKB");
        bytes.push(0);
        let err = from_ewkb(&bytes).expect_err("trailing byte");
        assert!(
            matches!(err, WkbError::TrailingBytes { remaining: 1 }),
            "unexpected {err:?}"
        );
    }

    #[rstest]
    #[case::unknown_type(vec![1, 99, 0, 0, 0])]
    #[case::collection(vec![1, 7, 0, 0, 0, 0, 0, 0, 0])]
    #[case::empty(Vec::new())]
    fn unsupported_input_is_rejected(#[case] bytes: Vec<u8>) {
        let err = from_ewkb(&bytes).expect_err("unsupported input");
        assert!(matches!(err, WkbError::Format(_)), "unexpected {err:?}");
    }
}
