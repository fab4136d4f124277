use thiserror::Error;

use crate::types::Crs;

/// Failures of a single geometry operation. These are recovered locally:
/// the offending pair or feature is skipped and processing continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("geometry is empty")]
    Empty,

    #[error("ring {ring} has {len} coordinates, at least 4 are required for a closed ring")]
    ShortRing { ring: usize, len: usize },

    #[error("geometry contains a non-finite coordinate ({x}, {y})")]
    NonFinite { x: f64, y: f64 },

    #[error("no PROJ.4 definition is known for {0}")]
    UnsupportedCrs(Crs),

    #[error("failed to build projection from `{definition}`: {reason}")]
    Projection { definition: String, reason: String },

    #[error("failed to transform coordinates from {from} to {to}: {reason}")]
    Transform { from: Crs, to: Crs, reason: String },

    #[error("ring {ring} intersects itself")]
    SelfIntersection { ring: usize },

    #[error("polygon intersection failed: {0}")]
    Intersection(String),
}

/// Errors surfaced to the caller. Each message names the violated precondition
/// so an interactive tool can explain to its user why no result is showing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("insufficient valid features for correlation analysis: found {found}, minimum required is {required}")]
    InsufficientFeatures { found: usize, required: usize },

    #[error("target feature {index} has no identifier")]
    MissingId { index: usize },

    #[error("feature {id} has no geometry")]
    MissingGeometry { id: String },

    #[error("target identifier {id} is not unique")]
    DuplicateId { id: String },

    #[error("feature {id} has geometry type {found}, a Polygon or MultiPolygon is required")]
    NotPolygon { id: String, found: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("correlation is undefined: a value series has no numerically resolvable variance")]
    DegenerateCorrelation,

    #[error("analysis was cancelled")]
    Cancelled,
}
