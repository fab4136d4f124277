use std::borrow::Cow;

use ahash::AHashMap;
use geo::MultiPolygon;
use tracing::{debug, warn};

use crate::error::GeometryError;
use crate::geom::{reproject, Reprojection};
use crate::types::{Crs, SourceFeature, TargetFeature};

/// How a geometry reached the common CRS.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeOutcome {
    /// Already in the common CRS.
    Unchanged,
    /// Untagged; assumed to be in the common CRS already.
    Tagged,
    Reprojected,
    /// Reprojection failed; the original coordinates are kept, so any overlap
    /// computed against this geometry is approximate.
    Failed(GeometryError),
}

/// A geometry expressed in a common CRS. Borrows the caller's geometry when no
/// coordinates had to change.
#[derive(Debug, Clone)]
pub struct Normalized<'a> {
    pub geometry: Cow<'a, MultiPolygon<f64>>,
    pub crs: Crs,
    pub outcome: NormalizeOutcome,
}

impl<'a> Normalized<'a> {
    fn borrowed(geometry: &'a MultiPolygon<f64>, crs: Crs, outcome: NormalizeOutcome) -> Self {
        Self { geometry: Cow::Borrowed(geometry), crs, outcome }
    }

    #[inline] pub fn is_approximate(&self) -> bool { matches!(self.outcome, NormalizeOutcome::Failed(_)) }
}

/// Express one geometry in `target`. Never fails: reprojection errors are logged
/// and the original geometry is returned, tagged with its own CRS.
pub fn normalize(geometry: &MultiPolygon<f64>, crs: Option<Crs>, target: Crs) -> Normalized<'_> {
    match crs {
        None => Normalized::borrowed(geometry, target, NormalizeOutcome::Tagged),
        Some(crs) if crs == target => Normalized::borrowed(geometry, target, NormalizeOutcome::Unchanged),
        Some(crs) => match reproject(geometry, crs, target) {
            Ok(projected) => Normalized {
                geometry: Cow::Owned(projected),
                crs: target,
                outcome: NormalizeOutcome::Reprojected,
            },
            Err(e) => {
                warn!(from = %crs, to = %target, error = %e, "reprojection failed, keeping original coordinates");
                Normalized::borrowed(geometry, crs, NormalizeOutcome::Failed(e))
            }
        },
    }
}

/// Express two geometries in one CRS. A pair already sharing a tagged CRS is
/// returned as is; otherwise both are brought into `default`.
pub fn normalize_pair<'a, 'b>(
    a: (&'a MultiPolygon<f64>, Option<Crs>),
    b: (&'b MultiPolygon<f64>, Option<Crs>),
    default: Crs,
) -> (Normalized<'a>, Normalized<'b>) {
    match (a.1, b.1) {
        (Some(ca), Some(cb)) if ca == cb => (
            Normalized::borrowed(a.0, ca, NormalizeOutcome::Unchanged),
            Normalized::borrowed(b.0, cb, NormalizeOutcome::Unchanged),
        ),
        _ => (normalize(a.0, a.1, default), normalize(b.0, b.1, default)),
    }
}

/// Both layers of an analysis, in one CRS.
#[derive(Debug, Clone)]
pub struct NormalizedLayers<'a> {
    pub crs: Crs,
    pub sources: Vec<Normalized<'a>>,
    pub targets: Vec<Normalized<'a>>,
}

impl NormalizedLayers<'_> {
    /// Number of geometries whose reprojection failed.
    pub fn num_failed(&self) -> usize {
        self.sources.iter().chain(&self.targets).filter(|n| n.is_approximate()).count()
    }
}

/// Apply the pair rule once per geometry rather than once per (target, source) pair:
/// if every feature carries the same CRS nothing moves, otherwise everything is
/// brought into `default`. Projections are built once per distinct input CRS.
pub fn normalize_layers<'a>(
    sources: &'a [SourceFeature],
    targets: &'a [TargetFeature],
    default: Crs,
) -> NormalizedLayers<'a> {
    let tags = sources.iter().map(|s| s.crs).chain(targets.iter().map(|t| t.crs));
    let shared = tags.clone().next().flatten()
        .filter(|first| tags.clone().all(|crs| crs == Some(*first)));

    if let Some(crs) = shared {
        debug!(%crs, "all inputs share one CRS, skipping reprojection");
        return NormalizedLayers {
            crs,
            sources: sources.iter()
                .map(|s| Normalized::borrowed(&s.geometry, crs, NormalizeOutcome::Unchanged))
                .collect(),
            targets: targets.iter()
                .map(|t| Normalized::borrowed(&t.geometry, crs, NormalizeOutcome::Unchanged))
                .collect(),
        };
    }

    let mut projections: AHashMap<Crs, Result<Reprojection, GeometryError>> = AHashMap::new();
    let mut to_default = |geometry: &'a MultiPolygon<f64>, crs: Option<Crs>| -> Normalized<'a> {
        let Some(crs) = crs.filter(|&c| c != default) else { return normalize(geometry, crs, default) };

        let projected = match projections.entry(crs).or_insert_with(|| Reprojection::new(crs, default)) {
            Ok(projection) => projection.apply(geometry),
            Err(e) => Err(e.clone()),
        };
        match projected {
            Ok(projected) => Normalized {
                geometry: Cow::Owned(projected),
                crs: default,
                outcome: NormalizeOutcome::Reprojected,
            },
            Err(e) => {
                warn!(from = %crs, to = %default, error = %e, "reprojection failed, keeping original coordinates");
                Normalized::borrowed(geometry, crs, NormalizeOutcome::Failed(e))
            }
        }
    };

    let sources: Vec<_> = sources.iter().map(|s| to_default(&s.geometry, s.crs)).collect();
    let targets: Vec<_> = targets.iter().map(|t| to_default(&t.geometry, t.crs)).collect();

    let layers = NormalizedLayers { crs: default, sources, targets };
    debug!(crs = %default, failed = layers.num_failed(), "normalized layers");
    layers
}
