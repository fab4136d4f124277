use ahash::AHashSet;
use serde::Serialize;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::config::{AnalysisConfig, InsufficientPolicy, UnmatchedPolicy};
use crate::error::AnalysisError;
use crate::geom::{normalize_layers, resolve_extent};
use crate::interp::{allocate_normalized, transfer, AllocationReport};
use crate::stats::{correlate_with_min, CorrelationClass};
use crate::types::{AggregatedFeature, BoundingExtent, Crs, FeatureId, SourceFeature, TargetFeature};

/// Result of one analysis run.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Targets that received a non-zero total weight, in input order.
    pub features: Vec<AggregatedFeature>,
    /// Dataset-level Pearson coefficient; `None` only for an empty analysis.
    pub correlation: Option<f64>,
    pub extent: BoundingExtent,
    /// CRS of `extent` and of every feature whose own `crs()` does not say otherwise.
    /// A feature left in its source CRS by a failed reprojection keeps that CRS.
    pub crs: Crs,
    /// Targets with zero total weight, when `UnmatchedPolicy::Report` is set.
    pub unmatched: Vec<FeatureId>,
    pub report: AllocationReport,
}

impl Analysis {
    /// A renderable result with no features, framed by the fallback extent.
    pub fn empty(config: &AnalysisConfig) -> Self {
        Self {
            features: Vec::new(),
            correlation: None,
            extent: config.fallback_extent,
            crs: config.fallback_extent.crs,
            unmatched: Vec::new(),
            report: AllocationReport::default(),
        }
    }

    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    #[inline] pub fn correlation_class(&self) -> Option<CorrelationClass> {
        self.correlation.map(CorrelationClass::from_r)
    }

    /// Summary without geometry, for logs and API responses.
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            features: self.features.len(),
            correlation: self.correlation,
            correlation_class: self.correlation_class(),
            extent: self.extent,
            unmatched: self.unmatched.len(),
            report: self.report,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub features: usize,
    pub correlation: Option<f64>,
    pub correlation_class: Option<CorrelationClass>,
    pub extent: BoundingExtent,
    pub unmatched: usize,
    pub report: AllocationReport,
}

/// Every target must carry a non-empty, unique id and a non-empty geometry.
pub fn validate_targets(targets: &[TargetFeature]) -> Result<(), AnalysisError> {
    let mut seen: AHashSet<&str> = AHashSet::with_capacity(targets.len());
    for (index, target) in targets.iter().enumerate() {
        if target.id.trim().is_empty() {
            return Err(AnalysisError::MissingId { index });
        }
        if target.geometry.0.is_empty() {
            return Err(AnalysisError::MissingGeometry { id: target.id.to_string() });
        }
        if !seen.insert(&target.id) {
            return Err(AnalysisError::DuplicateId { id: target.id.to_string() });
        }
    }
    Ok(())
}

/// Transfer `sources`' values onto `targets`, correlate the transferred values
/// with the targets' own values, and frame the result.
pub fn analyze(
    sources: &[SourceFeature],
    targets: &[TargetFeature],
    config: &AnalysisConfig,
) -> Result<Analysis, AnalysisError> {
    run(sources, targets, config, None)
}

/// As `analyze`, checking `cancel` between targets.
pub fn analyze_with_cancel(
    sources: &[SourceFeature],
    targets: &[TargetFeature],
    config: &AnalysisConfig,
    cancel: &CancelToken,
) -> Result<Analysis, AnalysisError> {
    run(sources, targets, config, Some(cancel))
}

fn run(
    sources: &[SourceFeature],
    targets: &[TargetFeature],
    config: &AnalysisConfig,
    cancel: Option<&CancelToken>,
) -> Result<Analysis, AnalysisError> {
    config.validate()?;
    validate_targets(targets)?;
    debug!(sources = sources.len(), targets = targets.len(), "starting analysis");

    let layers = normalize_layers(sources, targets, config.default_crs);
    let allocation = allocate_normalized(sources, targets, &layers, config.weighting, config.parallel, cancel)?;

    // (target index, transferred value) for every target with a usable overlap.
    let mut transferred = Vec::with_capacity(allocation.len());
    let mut unmatched = Vec::new();
    for (i, target) in targets.iter().enumerate() {
        match allocation.get(&target.id).and_then(transfer) {
            Some(value) => transferred.push((i, value)),
            None => if config.unmatched == UnmatchedPolicy::Report { unmatched.push(target.id.clone()) },
        }
    }

    // Every target must be resolved before the dataset-level reduction.
    let pairs: Vec<(f64, f64)> = transferred.iter().map(|&(i, value)| (targets[i].value, value)).collect();
    let correlation = match correlate_with_min(&pairs, config.min_pairs) {
        Ok(r) => r,
        Err(e @ AnalysisError::InsufficientFeatures { .. }) if config.on_insufficient == InsufficientPolicy::Empty => {
            info!(error = %e, "returning empty analysis");
            return Ok(Analysis { unmatched, report: *allocation.report(), ..Analysis::empty(config) });
        }
        Err(e) => return Err(e),
    };

    let features: Vec<AggregatedFeature> = transferred.into_iter()
        .map(|(i, value)| AggregatedFeature::new(
            targets[i].id.clone(),
            layers.targets[i].geometry.clone().into_owned(),
            layers.targets[i].crs,
            targets[i].value,
            value,
            correlation,
        ))
        .collect();

    let extent = resolve_extent(&features, config);
    info!(features = features.len(), correlation, "analysis complete");

    Ok(Analysis {
        features,
        correlation: Some(correlation),
        crs: extent.crs,
        extent,
        unmatched,
        report: *allocation.report(),
    })
}
