use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::interp::Weighting;
use crate::types::{BoundingExtent, Crs};

/// Minimum number of (original, transferred) pairs a correlation is computed from.
pub const MIN_CORRELATION_PAIRS: usize = 3;

/// Coordinate magnitude bound for extents, consistent with Web Mercator's valid range.
pub const DEFAULT_MAX_COORD: f64 = 2.0e7;

/// Width/height below which an extent is considered degenerate.
pub const DEFAULT_EXTENT_EPSILON: f64 = 1e-9;

/// Extent returned when no feature has a usable extent: roughly North America,
/// in Web Mercator metres.
pub const FALLBACK_EXTENT: BoundingExtent =
    BoundingExtent::new(-15_500_000.0, 2_500_000.0, -5_500_000.0, 11_000_000.0, Crs::WEB_MERCATOR);

/// What to do with targets that intersect no source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedPolicy {
    /// Leave them out of the result entirely.
    #[default]
    Drop,
    /// Leave them out of the features but list their ids in `Analysis::unmatched`.
    Report,
}

/// What to do when fewer than `min_pairs` valid pairs remain for the correlation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsufficientPolicy {
    /// Return `AnalysisError::InsufficientFeatures`.
    #[default]
    Fail,
    /// Return an empty analysis framed by the fallback extent.
    Empty,
}

/// Parameters of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// CRS that untagged or mixed-CRS inputs are normalized into.
    pub default_crs: Crs,
    /// Which polygon's area normalizes the overlap weight.
    pub weighting: Weighting,
    pub min_pairs: usize,
    pub extent_epsilon: f64,
    pub max_coord: f64,
    pub fallback_extent: BoundingExtent,
    pub unmatched: UnmatchedPolicy,
    pub on_insufficient: InsufficientPolicy,
    /// Fan the allocator out over a thread pool.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_crs: Crs::WEB_MERCATOR,
            weighting: Weighting::Source,
            min_pairs: MIN_CORRELATION_PAIRS,
            extent_epsilon: DEFAULT_EXTENT_EPSILON,
            max_coord: DEFAULT_MAX_COORD,
            fallback_extent: FALLBACK_EXTENT,
            unmatched: UnmatchedPolicy::Drop,
            on_insufficient: InsufficientPolicy::Fail,
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: AnalysisConfig = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot honour.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.min_pairs < MIN_CORRELATION_PAIRS {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_pairs is {}, must be at least {MIN_CORRELATION_PAIRS}", self.min_pairs
            )));
        }
        if !(self.extent_epsilon.is_finite() && self.extent_epsilon > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "extent_epsilon must be a small positive number, got {}", self.extent_epsilon
            )));
        }
        if !(self.max_coord.is_finite() && self.max_coord > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "max_coord must be positive and finite, got {}", self.max_coord
            )));
        }
        if !self.fallback_extent.is_valid(self.extent_epsilon, self.max_coord) {
            return Err(AnalysisError::InvalidConfig(
                "fallback_extent must itself be a valid extent".into()
            ));
        }
        Ok(())
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
