mod check;
mod envelope;
mod extent;
mod index;
mod normalize;
mod overlap;
mod proj;

pub use check::check_geometry;
pub(crate) use envelope::SourceEnvelope;
pub use extent::{extent_of, resolve_extent};
pub(crate) use index::SourceIndex;
pub use normalize::{normalize, normalize_layers, normalize_pair, NormalizeOutcome, Normalized, NormalizedLayers};
pub use overlap::intersection_area;
pub use proj::{reproject, Reprojection};
