use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::{proj::Proj as Proj4, transform::transform};

use crate::error::GeometryError;
use crate::types::Crs;

/// A prepared transformation between two CRSs. Building the projections parses
/// PROJ.4 strings, so callers reprojecting many geometries should build one and reuse it.
pub struct Reprojection {
    from: Crs,
    to: Crs,
    src: Proj4,
    dst: Proj4,
}

impl Reprojection {
    pub fn new(from: Crs, to: Crs) -> Result<Self, GeometryError> {
        Ok(Self { from, to, src: build(from)?, dst: build(to)? })
    }

    #[inline] pub fn from(&self) -> Crs { self.from }

    #[inline] pub fn to(&self) -> Crs { self.to }

    /// Transform every coordinate of `geometry`, producing a new geometry.
    /// Geographic coordinates are degrees on both sides; proj4rs works in radians.
    pub fn apply(&self, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, GeometryError> {
        let (from_geog, to_geog) = (self.from.is_geographic(), self.to.is_geographic());

        geometry.try_map_coords(|coord: Coord<f64>| -> Result<Coord<f64>, GeometryError> {
            let mut point = if from_geog { (coord.x.to_radians(), coord.y.to_radians(), 0.0) }
                else { (coord.x, coord.y, 0.0) };

            transform(&self.src, &self.dst, &mut point).map_err(|e| GeometryError::Transform {
                from: self.from,
                to: self.to,
                reason: e.to_string(),
            })?;

            let out = if to_geog { Coord { x: point.0.to_degrees(), y: point.1.to_degrees() } }
                else { Coord { x: point.0, y: point.1 } };

            if out.x.is_finite() && out.y.is_finite() { Ok(out) }
            else {
                Err(GeometryError::Transform {
                    from: self.from,
                    to: self.to,
                    reason: format!("({}, {}) has no finite image", coord.x, coord.y),
                })
            }
        })
    }
}

/// Build the PROJ.4 projection for a CRS.
fn build(crs: Crs) -> Result<Proj4, GeometryError> {
    let definition = crs.proj4().ok_or(GeometryError::UnsupportedCrs(crs))?;
    Proj4::from_proj_string(&definition)
        .map_err(|e| GeometryError::Projection { definition, reason: e.to_string() })
}

/// Reproject a single geometry. Same-CRS requests return a copy without touching proj4rs.
pub fn reproject(geometry: &MultiPolygon<f64>, from: Crs, to: Crs) -> Result<MultiPolygon<f64>, GeometryError> {
    if from == to { return Ok(geometry.clone()) }
    Reprojection::new(from, to)?.apply(geometry)
}
