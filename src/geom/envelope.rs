use geo::Rect;
use rstar::{RTreeObject, AABB};

/// Envelope of one usable source geometry, stored in the source R-tree.
///
/// Pair tests look a target's bounding rectangle up against these envelopes and
/// only run exact intersection on the sources whose envelopes it touches.
#[derive(Debug, Clone)]
pub(crate) struct SourceEnvelope {
    source: usize, // position in the source layer
    rect: Rect<f64>,
}

impl SourceEnvelope {
    pub(crate) fn new(source: usize, rect: Rect<f64>) -> Self {
        Self { source, rect }
    }

    #[inline] pub(crate) fn source(&self) -> usize { self.source }
}

impl RTreeObject for SourceEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.rect.min().into(), self.rect.max().into())
    }
}
