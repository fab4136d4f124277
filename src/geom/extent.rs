use ahash::AHashMap;
use geo::{BoundingRect, MultiPolygon};
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::types::{AggregatedFeature, BoundingExtent, Crs};

/// Bounding extent of a single geometry, if it has any coordinates.
pub fn extent_of(geometry: &MultiPolygon<f64>, crs: Crs) -> Option<BoundingExtent> {
    geometry.bounding_rect().map(|rect| BoundingExtent::from_rect(rect, crs))
}

/// Framing extent for a result set.
///
/// Per-feature extents that are non-finite, thinner than `extent_epsilon`, or
/// beyond `max_coord` are discarded, as are extents in a CRS other than the
/// dominant one (left behind by a failed reprojection). The rest are unioned.
/// With nothing left, the configured fallback region is returned; this never fails.
pub fn resolve_extent(features: &[AggregatedFeature], config: &AnalysisConfig) -> BoundingExtent {
    let Some(crs) = dominant_crs(features) else {
        debug!("no features, using fallback extent");
        return config.fallback_extent;
    };

    let mut discarded = 0usize;
    let extent = features.iter()
        .filter_map(|feature| {
            let extent = extent_of(feature.geometry(), feature.crs())
                .filter(|e| e.crs == crs && e.is_valid(config.extent_epsilon, config.max_coord));
            if extent.is_none() { discarded += 1 }
            extent
        })
        .reduce(|a, b| a.union(&b));

    if discarded > 0 {
        warn!(discarded, total = features.len(), "discarded degenerate feature extents");
    }

    match extent {
        Some(extent) => BoundingExtent { crs, ..extent },
        None => {
            warn!("no valid feature extent, using fallback extent");
            config.fallback_extent
        }
    }
}

/// Most frequent CRS among the features; ties go to the lower code so the choice
/// does not depend on feature order.
fn dominant_crs(features: &[AggregatedFeature]) -> Option<Crs> {
    let mut counts: AHashMap<Crs, usize> = AHashMap::new();
    for feature in features { *counts.entry(feature.crs()).or_default() += 1 }

    counts.into_iter()
        .max_by(|(a, na), (b, nb)| na.cmp(nb).then_with(|| b.canonical().cmp(&a.canonical())))
        .map(|(crs, _)| crs)
}
