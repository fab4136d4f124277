#![doc = "Areal interpolation between non-aligning polygon partitions, and correlation of the transferred variable"]
mod cancel;
mod config;
mod error;
mod geom;
mod interp;
mod pipeline;
mod stats;
mod types;

pub mod io;

#[doc(inline)]
pub use cancel::CancelToken;

#[doc(inline)]
pub use config::{AnalysisConfig, InsufficientPolicy, UnmatchedPolicy, FALLBACK_EXTENT, MIN_CORRELATION_PAIRS};

#[doc(inline)]
pub use error::{AnalysisError, GeometryError};

#[doc(inline)]
pub use geom::{
    check_geometry, extent_of, intersection_area, normalize, normalize_layers, normalize_pair, reproject,
    resolve_extent, NormalizeOutcome, Normalized, NormalizedLayers, Reprojection,
};

#[doc(inline)]
pub use interp::{allocate, transfer, Allocation, AllocationReport, Contributions, WeightedContribution, Weighting};

#[doc(inline)]
pub use pipeline::{analyze, analyze_with_cancel, validate_targets, Analysis, AnalysisSummary};

#[doc(inline)]
pub use stats::{correlate, correlate_with_min, CorrelationClass};

#[doc(inline)]
pub use types::{AggregatedFeature, BoundingExtent, Crs, FeatureId, SourceFeature, TargetFeature};
