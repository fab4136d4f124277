//! Reading feature collections and writing analysis results.
//!
//! GeoJSON is the interchange format with the data-loading and rendering layers.

pub mod geojson;

pub use geojson::{
    analysis_to_geojson, read_sources, read_sources_file, read_targets, read_targets_file, write_analysis, Loaded,
};
