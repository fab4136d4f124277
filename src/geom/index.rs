use geo::{BoundingRect, MultiPolygon, Rect};
use rstar::{RTree, AABB};

use crate::geom::SourceEnvelope;

/// R-tree over source envelopes. Only prunes candidates; every candidate is still
/// tested exactly, so results match an exhaustive scan.
#[derive(Debug)]
pub(crate) struct SourceIndex {
    rtree: RTree<SourceEnvelope>,
}

impl SourceIndex {
    /// Index the geometries whose `usable` flag is set. Envelopes are only well
    /// formed for geometries that passed `check_geometry`.
    pub(crate) fn new<'g>(geoms: impl Iterator<Item = (&'g MultiPolygon<f64>, bool)>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                geoms.enumerate()
                    .filter(|(_, (_, usable))| *usable)
                    .filter_map(|(i, (geom, _))| geom.bounding_rect().map(|rect| SourceEnvelope::new(i, rect)))
                    .collect()
            ),
        }
    }

    /// Number of indexed sources.
    #[inline] pub(crate) fn len(&self) -> usize { self.rtree.size() }

    /// Indices of sources whose envelope intersects `rect`.
    #[inline]
    pub(crate) fn candidates(&self, rect: &Rect<f64>) -> impl Iterator<Item = usize> + '_ {
        let envelope = AABB::from_corners(rect.min().into(), rect.max().into());
        self.rtree.locate_in_envelope_intersecting(&envelope).map(SourceEnvelope::source)
    }
}
