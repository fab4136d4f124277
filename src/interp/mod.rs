mod allocate;
mod transfer;

use serde::{Deserialize, Serialize};

use crate::types::FeatureId;

pub use allocate::{allocate, Allocation, AllocationReport, Contributions};
pub(crate) use allocate::allocate_normalized;
pub use transfer::transfer;

/// Which polygon's area normalizes the overlap weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// `area(T ∩ S) / area(S)`: the share of the source region falling in the target.
    /// Exact for extensive (additive) variables.
    #[default]
    Source,
    /// `area(T ∩ S) / area(T)`: the share of the target covered by the source.
    /// The usual choice for intensive variables (rates, averages).
    Target,
}

/// One source's share of a target, as produced by the allocator.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedContribution {
    pub target_id: FeatureId,
    pub source_index: usize, // Position of the source in the caller's slice
    pub source_value: f64,
    pub weight: f64,         // Always within [0, 1]
}
