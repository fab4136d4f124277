mod crs;
mod extent;
mod feature;

pub use crs::Crs;
pub use extent::BoundingExtent;
pub use feature::{AggregatedFeature, FeatureId, SourceFeature, TargetFeature};
