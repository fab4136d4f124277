use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

use crate::types::Crs;

/// Axis-aligned bounding rectangle of one or more geometries, tagged with its CRS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingExtent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub crs: Crs,
}

impl BoundingExtent {
    pub const fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64, crs: Crs) -> Self {
        Self { xmin, ymin, xmax, ymax, crs }
    }

    pub fn from_rect(rect: Rect<f64>, crs: Crs) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y, crs)
    }

    #[inline] pub fn width(&self) -> f64 { self.xmax - self.xmin }

    #[inline] pub fn height(&self) -> f64 { self.ymax - self.ymin }

    #[inline]
    pub fn center(&self) -> Coord<f64> {
        Coord { x: (self.xmin + self.xmax) / 2.0, y: (self.ymin + self.ymax) / 2.0 }
    }

    /// Smallest extent covering both. Associative and commutative, so folds
    /// over a set of extents agree regardless of order.
    pub fn union(&self, other: &Self) -> Self {
        Self::new(
            self.xmin.min(other.xmin),
            self.ymin.min(other.ymin),
            self.xmax.max(other.xmax),
            self.ymax.max(other.ymax),
            self.crs,
        )
    }

    /// Finite bounds, width and height above `epsilon`, every coordinate below `max_coord` in magnitude.
    pub fn is_valid(&self, epsilon: f64, max_coord: f64) -> bool {
        let bounds = [self.xmin, self.ymin, self.xmax, self.ymax];
        bounds.iter().all(|b| b.is_finite() && b.abs() < max_coord)
            && self.width() > epsilon
            && self.height() > epsilon
    }

    /// `[xmin, ymin, xmax, ymax]`, the GeoJSON `bbox` order.
    #[inline] pub fn to_array(&self) -> [f64; 4] { [self.xmin, self.ymin, self.xmax, self.ymax] }
}
