use std::sync::Arc;

use geo::MultiPolygon;
use serde_json::{Map, Value};

use crate::stats::CorrelationClass;
use crate::types::Crs;

/// Stable target identifier. Shared between the input feature and its output row.
pub type FeatureId = Arc<str>;

/// A polygon of the source partition carrying the variable to transfer.
/// Owned by the caller; the engine only reads it.
#[derive(Debug, Clone)]
pub struct SourceFeature {
    pub geometry: MultiPolygon<f64>,
    pub crs: Option<Crs>, // None = untagged, treated as already in the default CRS
    pub value: f64,       // NaN when the designated attribute is missing or non-numeric
    pub attributes: Map<String, Value>,
}

impl SourceFeature {
    pub fn new(geometry: impl Into<MultiPolygon<f64>>, value: f64) -> Self {
        Self { geometry: geometry.into(), crs: None, value, attributes: Map::new() }
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Whether the value is usable as a contribution (numeric and finite).
    #[inline] pub fn has_value(&self) -> bool { self.value.is_finite() }
}

/// A polygon of the target partition, with its own native variable.
#[derive(Debug, Clone)]
pub struct TargetFeature {
    pub id: FeatureId,
    pub geometry: MultiPolygon<f64>,
    pub crs: Option<Crs>,
    pub value: f64,
    pub attributes: Map<String, Value>,
}

impl TargetFeature {
    pub fn new(id: impl Into<FeatureId>, geometry: impl Into<MultiPolygon<f64>>, value: f64) -> Self {
        Self { id: id.into(), geometry: geometry.into(), crs: None, value, attributes: Map::new() }
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }
}

/// One output row: a target polygon that received a non-zero total weight.
/// Immutable once built; `correlation_value` repeats the dataset-level coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedFeature {
    id: FeatureId,
    geometry: MultiPolygon<f64>,
    crs: Crs,
    original_value: f64,
    transferred_value: f64,
    correlation_value: f64,
}

impl AggregatedFeature {
    pub(crate) fn new(
        id: FeatureId,
        geometry: MultiPolygon<f64>,
        crs: Crs,
        original_value: f64,
        transferred_value: f64,
        correlation_value: f64,
    ) -> Self {
        Self { id, geometry, crs, original_value, transferred_value, correlation_value }
    }

    #[inline] pub fn id(&self) -> &str { &self.id }

    /// Geometry in the CRS the analysis ran in (see `crs`).
    #[inline] pub fn geometry(&self) -> &MultiPolygon<f64> { &self.geometry }

    #[inline] pub fn crs(&self) -> Crs { self.crs }

    #[inline] pub fn original_value(&self) -> f64 { self.original_value }

    #[inline] pub fn transferred_value(&self) -> f64 { self.transferred_value }

    #[inline] pub fn correlation_value(&self) -> f64 { self.correlation_value }

    /// Labeled band of the correlation coefficient, for choropleth rendering.
    #[inline] pub fn correlation_class(&self) -> CorrelationClass {
        CorrelationClass::from_r(self.correlation_value)
    }
}
