use std::ops::AddAssign;

use ahash::AHashMap;
use geo::{Area, BoundingRect, Intersects, MultiPolygon};
use rayon::prelude::*;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::geom::{check_geometry, intersection_area, normalize_layers, Normalized, NormalizedLayers, SourceIndex};
use crate::interp::{WeightedContribution, Weighting};
use crate::pipeline::validate_targets;
use crate::types::{FeatureId, SourceFeature, TargetFeature};

/// Contributions received by one target; most targets overlap only a few sources.
pub type Contributions = SmallVec<[WeightedContribution; 4]>;

/// Tally of what happened to every (target, source) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AllocationReport {
    /// Pairs that contributed a positive weight.
    pub succeeded: usize,
    /// Pairs whose geometries do not intersect.
    pub disjoint: usize,
    /// Pairs skipped as unusable: overlap collapsed to a line or point, zero-area
    /// denominator, or a non-numeric source value.
    pub skipped_invalid: usize,
    /// Pairs lost to overlay errors, plus whole targets whose geometry fails the
    /// sanity check (self-intersecting rings included).
    pub failed: usize,
    /// Sources excluded up front because their geometry failed the sanity check
    /// (self-intersecting rings included). Their pairs are not tested or counted.
    pub invalid_sources: usize,
    /// Targets that ended with zero total weight.
    pub unmatched_targets: usize,
}

impl AddAssign for AllocationReport {
    fn add_assign(&mut self, other: Self) {
        self.succeeded += other.succeeded;
        self.disjoint += other.disjoint;
        self.skipped_invalid += other.skipped_invalid;
        self.failed += other.failed;
        self.invalid_sources += other.invalid_sources;
        self.unmatched_targets += other.unmatched_targets;
    }
}

/// Contributions per target id. Targets with zero total weight have no entry.
#[derive(Debug, Clone, Default)]
pub struct Allocation {
    contributions: AHashMap<FeatureId, Contributions>,
    report: AllocationReport,
}

impl Allocation {
    /// Contributions received by `id`, if it overlapped any source.
    #[inline]
    pub fn get(&self, id: &str) -> Option<&[WeightedContribution]> {
        self.contributions.get(id).map(|c| c.as_slice())
    }

    /// Number of targets with at least one contribution.
    #[inline] pub fn len(&self) -> usize { self.contributions.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.contributions.is_empty() }

    #[inline] pub fn report(&self) -> &AllocationReport { &self.report }

    pub fn iter(&self) -> impl Iterator<Item = (&FeatureId, &[WeightedContribution])> {
        self.contributions.iter().map(|(id, c)| (id, c.as_slice()))
    }
}

/// Source layer prepared for repeated pair tests: values, areas, and an R-tree
/// over the sources that passed the sanity check.
struct SourceLayer<'l, 'a> {
    geoms: &'l [Normalized<'a>],
    values: Vec<f64>,
    areas: Vec<f64>,
    index: SourceIndex,
}

impl<'l, 'a> SourceLayer<'l, 'a> {
    fn new(sources: &[SourceFeature], geoms: &'l [Normalized<'a>]) -> (Self, usize) {
        let usable: Vec<bool> = geoms.iter().enumerate()
            .map(|(i, n)| match check_geometry(&n.geometry) {
                Ok(()) => true,
                Err(e) => {
                    warn!(source = i, error = %e, "excluding source with invalid geometry");
                    false
                }
            })
            .collect();
        let invalid = usable.iter().filter(|ok| !**ok).count();

        let layer = Self {
            geoms,
            values: sources.iter().map(|s| s.value).collect(),
            areas: geoms.iter().map(|n| n.geometry.unsigned_area()).collect(),
            index: SourceIndex::new(geoms.iter().zip(usable).map(|(n, ok)| (n.geometry.as_ref(), ok))),
        };
        (layer, invalid)
    }
}

/// For every target, the area-proportional weight of each intersecting source.
///
/// Validates the targets, brings both layers into one CRS, then runs the pair
/// tests. Geometry errors only drop the pair (or target) they occur in.
pub fn allocate(
    sources: &[SourceFeature],
    targets: &[TargetFeature],
    config: &AnalysisConfig,
) -> Result<Allocation, AnalysisError> {
    validate_targets(targets)?;
    let layers = normalize_layers(sources, targets, config.default_crs);
    allocate_normalized(sources, targets, &layers, config.weighting, config.parallel, None)
}

/// Allocation over layers that are already normalized. Targets are independent,
/// so with `parallel` set they are spread over the rayon pool and merged afterwards.
pub(crate) fn allocate_normalized(
    sources: &[SourceFeature],
    targets: &[TargetFeature],
    layers: &NormalizedLayers<'_>,
    weighting: Weighting,
    parallel: bool,
    cancel: Option<&CancelToken>,
) -> Result<Allocation, AnalysisError> {
    let (layer, invalid_sources) = SourceLayer::new(sources, &layers.sources);

    let per_target = |(target, geom): (&TargetFeature, &Normalized<'_>)| {
        if cancel.is_some_and(|c| c.is_cancelled()) { return Err(AnalysisError::Cancelled) }
        Ok(allocate_target(&target.id, &geom.geometry, &layer, weighting))
    };

    let results: Vec<(Contributions, AllocationReport)> = if parallel {
        targets.par_iter().zip(layers.targets.par_iter()).map(per_target).collect::<Result<_, _>>()?
    } else {
        targets.iter().zip(layers.targets.iter()).map(per_target).collect::<Result<_, _>>()?
    };

    let mut allocation = Allocation {
        contributions: AHashMap::with_capacity(results.len()),
        report: AllocationReport { invalid_sources, ..Default::default() },
    };
    for (target, (contributions, report)) in targets.iter().zip(results) {
        allocation.report += report;
        if contributions.is_empty() {
            allocation.report.unmatched_targets += 1;
        } else {
            allocation.contributions.insert(target.id.clone(), contributions);
        }
    }

    debug!(
        targets = targets.len(),
        matched = allocation.len(),
        report = ?allocation.report,
        "allocated source weights"
    );
    Ok(allocation)
}

/// Test one target against every candidate source.
fn allocate_target(
    id: &FeatureId,
    geom: &MultiPolygon<f64>,
    layer: &SourceLayer<'_, '_>,
    weighting: Weighting,
) -> (Contributions, AllocationReport) {
    let mut contributions = Contributions::new();
    let mut report = AllocationReport::default();

    if let Err(e) = check_geometry(geom) {
        warn!(target = %id, error = %e, "skipping target with invalid geometry");
        report.failed += 1;
        return (contributions, report);
    }
    let Some(rect) = geom.bounding_rect() else { return (contributions, report) };
    let target_area = geom.unsigned_area();

    let mut tested = 0usize;
    for j in layer.index.candidates(&rect) {
        tested += 1;

        let value = layer.values[j];
        if !value.is_finite() {
            report.skipped_invalid += 1;
            continue;
        }

        let source: &MultiPolygon<f64> = &layer.geoms[j].geometry;
        if !geom.intersects(source) {
            report.disjoint += 1;
            continue;
        }

        let overlap = match intersection_area(geom, source) {
            Ok(area) => area,
            Err(e) => {
                warn!(target = %id, source = j, error = %e, "skipping pair");
                report.failed += 1;
                continue;
            }
        };

        let denominator = match weighting {
            Weighting::Source => layer.areas[j],
            Weighting::Target => target_area,
        };
        if !(overlap > 0.0 && denominator > 0.0) {
            report.skipped_invalid += 1;
            continue;
        }

        contributions.push(WeightedContribution {
            target_id: id.clone(),
            source_index: j,
            source_value: value,
            weight: (overlap / denominator).clamp(0.0, 1.0),
        });
        report.succeeded += 1;
    }

    // Sources pruned by the R-tree are disjoint by construction.
    report.disjoint += layer.index.len() - tested;
    (contributions, report)
}

#[cfg(test)]
mod tests {
    use geo::polygon;
    use proptest::prelude::*;

    use super::*;
    use crate::interp::transfer;
    use crate::types::Crs;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)].into()
    }

    fn serial() -> AnalysisConfig { AnalysisConfig::default().with_parallel(false) }

    #[test]
    fn two_source_scenario() {
        // A: area 100, value 10. B: area 50, value 20. T overlaps half of A and all of B.
        let sources = vec![
            SourceFeature::new(rect(0.0, 0.0, 10.0, 10.0), 10.0),
            SourceFeature::new(rect(10.0, 0.0, 15.0, 10.0), 20.0),
        ];
        let targets = vec![TargetFeature::new("T", rect(5.0, 0.0, 15.0, 10.0), 1.0)];

        let allocation = allocate(&sources, &targets, &serial()).unwrap();
        let mut contributions = allocation.get("T").unwrap().to_vec();
        contributions.sort_by_key(|c| c.source_index);

        assert_eq!(contributions.len(), 2);
        assert!((contributions[0].weight - 0.5).abs() < 1e-6);
        assert!((contributions[1].weight - 1.0).abs() < 1e-6);
        assert!((transfer(&contributions).unwrap() - 25.0 / 1.5).abs() < 1e-6);
        assert_eq!(allocation.report().succeeded, 2);
    }

    #[test]
    fn identical_polygons_give_full_weight() {
        let sources = vec![SourceFeature::new(rect(0.0, 0.0, 3.0, 7.0), 123.25)];
        let targets = vec![TargetFeature::new("T", rect(0.0, 0.0, 3.0, 7.0), 1.0)];

        let allocation = allocate(&sources, &targets, &serial()).unwrap();
        let contributions = allocation.get("T").unwrap();
        assert_eq!(contributions.len(), 1);
        assert!((contributions[0].weight - 1.0).abs() < 1e-6);
        assert_eq!(transfer(contributions), Some(123.25));
    }

    #[test]
    fn disjoint_and_touching_targets_are_excluded() {
        let sources = vec![SourceFeature::new(rect(0.0, 0.0, 10.0, 10.0), 5.0)];
        let targets = vec![
            TargetFeature::new("far", rect(100.0, 100.0, 110.0, 110.0), 1.0),
            TargetFeature::new("touching", rect(10.0, 0.0, 20.0, 10.0), 1.0),
        ];

        let allocation = allocate(&sources, &targets, &serial()).unwrap();
        assert!(allocation.is_empty());
        assert_eq!(allocation.report().unmatched_targets, 2);
        assert_eq!(allocation.report().disjoint + allocation.report().skipped_invalid, 2);
    }

    #[test]
    fn non_numeric_sources_are_skipped() {
        let sources = vec![
            SourceFeature::new(rect(0.0, 0.0, 10.0, 10.0), f64::NAN),
            SourceFeature::new(rect(0.0, 0.0, 10.0, 10.0), 4.0),
        ];
        let targets = vec![TargetFeature::new("T", rect(0.0, 0.0, 10.0, 10.0), 1.0)];

        let allocation = allocate(&sources, &targets, &serial()).unwrap();
        assert_eq!(allocation.get("T").unwrap().len(), 1);
        assert_eq!(allocation.report().skipped_invalid, 1);
    }

    #[test]
    fn invalid_source_does_not_abort_others() {
        let sources = vec![
            SourceFeature::new(rect(0.0, 0.0, f64::INFINITY, 10.0), 1.0),
            SourceFeature::new(rect(0.0, 0.0, 10.0, 10.0), 2.0),
        ];
        let targets = vec![TargetFeature::new("T", rect(0.0, 0.0, 10.0, 10.0), 1.0)];

        let allocation = allocate(&sources, &targets, &serial()).unwrap();
        assert_eq!(allocation.report().invalid_sources, 1);
        assert_eq!(allocation.get("T").unwrap()[0].source_value, 2.0);
    }

    #[test]
    fn self_intersecting_geometries_are_isolated() {
        let bowtie: MultiPolygon<f64> =
            polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 10.0), (x: 10.0, y: 0.0), (x: 0.0, y: 10.0)].into();
        let mut sources = vec![SourceFeature::new(bowtie.clone(), 100.0)];
        sources.extend((0..4).map(|i| SourceFeature::new(rect(i as f64 * 10.0, 0.0, i as f64 * 10.0 + 10.0, 10.0), i as f64 + 1.0)));
        let targets = vec![
            TargetFeature::new("t0", rect(0.0, 0.0, 10.0, 10.0), 1.0),
            TargetFeature::new("t1", rect(10.0, 0.0, 20.0, 10.0), 1.0),
            TargetFeature::new("bowtie", bowtie, 1.0),
        ];

        let allocation = allocate(&sources, &targets, &serial()).unwrap();
        let report = allocation.report();
        assert_eq!(report.invalid_sources, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.unmatched_targets, 1);

        let t0 = allocation.get("t0").unwrap();
        assert_eq!(t0.len(), 1);
        assert_eq!(t0[0].source_index, 1);
        assert!((transfer(t0).unwrap() - 1.0).abs() < 1e-9);
        assert!(allocation.get("bowtie").is_none());
    }

    #[test]
    fn target_weighting_normalizes_by_target_area() {
        let sources = vec![SourceFeature::new(rect(0.0, 0.0, 100.0, 100.0), 7.0)];
        let targets = vec![TargetFeature::new("T", rect(0.0, 0.0, 10.0, 10.0), 1.0)];

        let by_source = allocate(&sources, &targets, &serial()).unwrap();
        assert!((by_source.get("T").unwrap()[0].weight - 0.01).abs() < 1e-6);

        let config = serial().with_weighting(Weighting::Target);
        let by_target = allocate(&sources, &targets, &config).unwrap();
        assert!((by_target.get("T").unwrap()[0].weight - 1.0).abs() < 1e-6);
    }

    #[test]
    fn parallel_matches_serial() {
        let sources: Vec<_> = (0..6)
            .map(|i| SourceFeature::new(rect(i as f64 * 10.0, 0.0, i as f64 * 10.0 + 10.0, 10.0), i as f64))
            .collect();
        let targets: Vec<_> = (0..4)
            .map(|i| TargetFeature::new(format!("t{i}"), rect(i as f64 * 15.0, 0.0, i as f64 * 15.0 + 15.0, 10.0), 0.0))
            .collect();

        let serial = allocate(&sources, &targets, &serial()).unwrap();
        let parallel = allocate(&sources, &targets, &AnalysisConfig::default()).unwrap();
        assert_eq!(serial.report(), parallel.report());
        for t in &targets {
            assert_eq!(transfer(serial.get(&t.id).unwrap()), transfer(parallel.get(&t.id).unwrap()));
        }
    }

    #[test]
    fn cancelled_token_stops_allocation() {
        let sources = vec![SourceFeature::new(rect(0.0, 0.0, 10.0, 10.0), 1.0)];
        let targets = vec![TargetFeature::new("T", rect(0.0, 0.0, 10.0, 10.0), 1.0)];
        let layers = normalize_layers(&sources, &targets, Crs::WEB_MERCATOR);

        let token = CancelToken::new();
        token.cancel();
        let result = allocate_normalized(&sources, &targets, &layers, Weighting::Source, false, Some(&token));
        assert_eq!(result.unwrap_err(), AnalysisError::Cancelled);
    }

    proptest! {
        #[test]
        fn weights_stay_in_unit_interval(
            boxes in prop::collection::vec((0.0..100.0f64, 0.0..100.0f64, 0.5..50.0f64, 0.5..50.0f64), 1..12),
            target in (0.0..100.0f64, 0.0..100.0f64, 0.5..80.0f64, 0.5..80.0f64),
        ) {
            let sources: Vec<_> = boxes.iter().enumerate()
                .map(|(i, &(x, y, w, h))| SourceFeature::new(rect(x, y, x + w, y + h), i as f64))
                .collect();
            let (x, y, w, h) = target;
            let targets = vec![TargetFeature::new("T", rect(x, y, x + w, y + h), 0.0)];

            let allocation = allocate(&sources, &targets, &serial()).unwrap();
            for (_, contributions) in allocation.iter() {
                for c in contributions {
                    prop_assert!((0.0..=1.0).contains(&c.weight));
                }
            }
        }
    }
}
