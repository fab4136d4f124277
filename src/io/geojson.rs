use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};

use crate::error::AnalysisError;
use crate::pipeline::Analysis;
use crate::types::{Crs, SourceFeature, TargetFeature};

/// Features read from a collection, plus the ones that were turned away and why.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub features: Vec<T>,
    pub rejected: Vec<AnalysisError>,
    /// CRS declared on the collection, if any.
    pub crs: Option<Crs>,
}

/// Read a source layer. `value_field` names the property holding the variable;
/// missing or non-numeric values become NaN and are treated as missing data.
pub fn read_sources(bytes: &[u8], value_field: &str) -> Result<Loaded<SourceFeature>> {
    let collection = parse_collection(bytes)?;
    let crs = collection_crs(&collection);

    let mut features = Vec::new();
    let mut rejected = Vec::new();
    for (index, feature) in features_of(&collection)?.iter().enumerate() {
        let properties = properties_of(feature);
        match feature_geometry(feature, &index.to_string()) {
            Ok(geometry) => {
                let mut source = SourceFeature::new(geometry, numeric(properties.get(value_field)))
                    .with_attributes(properties);
                source.crs = crs;
                features.push(source);
            }
            Err(e) => rejected.push(e),
        }
    }

    Ok(Loaded { features, rejected, crs })
}

/// Read a target layer. Features without a usable `id_field` or polygon geometry
/// are rejected individually; the rest are kept.
pub fn read_targets(bytes: &[u8], value_field: &str, id_field: &str) -> Result<Loaded<TargetFeature>> {
    let collection = parse_collection(bytes)?;
    let crs = collection_crs(&collection);

    let mut features = Vec::new();
    let mut rejected = Vec::new();
    for (index, feature) in features_of(&collection)?.iter().enumerate() {
        let properties = properties_of(feature);
        let Some(id) = identifier(properties.get(id_field)).or_else(|| identifier(feature.get("id"))) else {
            rejected.push(AnalysisError::MissingId { index });
            continue;
        };

        match feature_geometry(feature, &id) {
            Ok(geometry) => {
                let mut target = TargetFeature::new(id, geometry, numeric(properties.get(value_field)))
                    .with_attributes(properties);
                target.crs = crs;
                features.push(target);
            }
            Err(e) => rejected.push(e),
        }
    }

    Ok(Loaded { features, rejected, crs })
}

/// Read a source layer from a file.
pub fn read_sources_file(path: &Path, value_field: &str) -> Result<Loaded<SourceFeature>> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    read_sources(&bytes, value_field).with_context(|| format!("Failed to load sources from {}", path.display()))
}

/// Read a target layer from a file.
pub fn read_targets_file(path: &Path, value_field: &str, id_field: &str) -> Result<Loaded<TargetFeature>> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    read_targets(&bytes, value_field, id_field)
        .with_context(|| format!("Failed to load targets from {}", path.display()))
}

/// Export an analysis as a GeoJSON FeatureCollection. Each feature carries the
/// values a choropleth renderer classifies on; the collection carries the framing
/// `bbox`, the CRS and the dataset-level coefficient. A feature in a CRS other
/// than the collection's carries its own `crs` member.
pub fn analysis_to_geojson(analysis: &Analysis) -> Value {
    let features: Vec<Value> = analysis.features.iter().map(|feature| {
        let mut value = json!({
            "type": "Feature",
            "id": feature.id(),
            "geometry": multipolygon_to_geojson(feature.geometry()),
            "properties": {
                "id": feature.id(),
                "originalValue": finite(feature.original_value()),
                "transferredValue": finite(feature.transferred_value()),
                "correlationValue": finite(feature.correlation_value()),
                "correlationClass": feature.correlation_class().label(),
            },
        });
        if feature.crs() != analysis.crs {
            value["crs"] = crs_member(feature.crs());
        }
        value
    }).collect();

    json!({
        "type": "FeatureCollection",
        "crs": crs_member(analysis.crs),
        "bbox": analysis.extent.to_array(),
        "correlation": analysis.correlation,
        "correlationClass": analysis.correlation_class().map(|c| c.label()),
        "unmatched": analysis.unmatched.iter().map(|id| id.as_ref()).collect::<Vec<&str>>(),
        "features": features,
    })
}

/// Write an analysis to `path` as GeoJSON.
pub fn write_analysis(path: &Path, analysis: &Analysis) -> Result<()> {
    let bytes = serde_json::to_vec(&analysis_to_geojson(analysis))
        .context("Failed to serialize GeoJSON to bytes")?;
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

fn crs_member(crs: Crs) -> Value {
    json!({ "type": "name", "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", crs.code()) } })
}

fn parse_collection(bytes: &[u8]) -> Result<Value> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON bytes")?;
    if value["type"].as_str() != Some("FeatureCollection") {
        bail!("Expected a GeoJSON FeatureCollection, found type {}", value["type"]);
    }
    Ok(value)
}

fn features_of(collection: &Value) -> Result<&Vec<Value>> {
    collection["features"].as_array()
        .ok_or_else(|| anyhow!("FeatureCollection has no features array"))
}

fn properties_of(feature: &Value) -> Map<String, Value> {
    feature["properties"].as_object().cloned().unwrap_or_default()
}

/// Legacy GeoJSON `crs` member, or an Esri-style `spatialReference`.
fn collection_crs(collection: &Value) -> Option<Crs> {
    let crs = &collection["crs"];
    crs["properties"]["name"].as_str().and_then(Crs::parse)
        .or_else(|| crs.as_str().and_then(Crs::parse))
        .or_else(|| wkid(&crs["properties"]))
        .or_else(|| wkid(crs))
        .or_else(|| wkid(&collection["spatialReference"]))
}

fn wkid(value: &Value) -> Option<Crs> {
    value["latestWkid"].as_u64().or_else(|| value["wkid"].as_u64())
        .and_then(|code| u32::try_from(code).ok())
        .map(Crs::new)
}

/// Identifier from a string or numeric property. Blank strings do not count.
fn identifier(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric property value; numeric strings are accepted, anything else is NaN.
fn numeric(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

#[inline]
fn finite(value: f64) -> Value {
    if value.is_finite() { json!(value) } else { Value::Null }
}

/// Polygon or MultiPolygon geometry of a feature.
fn feature_geometry(feature: &Value, id: &str) -> Result<MultiPolygon<f64>, AnalysisError> {
    let geometry = &feature["geometry"];
    let missing = || AnalysisError::MissingGeometry { id: id.to_string() };
    if geometry.is_null() { return Err(missing()) }

    let kind = geometry["type"].as_str().unwrap_or("unknown");
    let coords = geometry["coordinates"].as_array().ok_or_else(missing)?;
    let not_polygon = |found: &str| AnalysisError::NotPolygon { id: id.to_string(), found: found.to_string() };

    let parsed = match kind {
        "Polygon" => parse_polygon(coords).map(|p| MultiPolygon(vec![p])),
        "MultiPolygon" => coords.iter()
            .map(|p| p.as_array().ok_or(()).and_then(|rings| parse_polygon(rings)))
            .collect::<Result<Vec<_>, ()>>()
            .map(MultiPolygon),
        other => return Err(not_polygon(other)),
    };

    match parsed {
        Ok(mp) if !mp.0.is_empty() => Ok(mp),
        Ok(_) => Err(missing()),
        Err(()) => Err(not_polygon(&format!("malformed {kind}"))),
    }
}

/// Parse `[exterior, hole, hole, ...]` rings.
fn parse_polygon(rings: &[Value]) -> Result<Polygon<f64>, ()> {
    let mut rings = rings.iter().map(|ring| ring.as_array().ok_or(()).and_then(|r| parse_ring(r)));
    let exterior = rings.next().ok_or(())??;
    let interiors = rings.collect::<Result<Vec<_>, ()>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Parse a ring `[[x, y], ...]`, closing it if needed.
fn parse_ring(coords: &[Value]) -> Result<LineString<f64>, ()> {
    let mut points = coords.iter()
        .map(|pair| {
            let x = pair.get(0).and_then(Value::as_f64).ok_or(())?;
            let y = pair.get(1).and_then(Value::as_f64).ok_or(())?;
            Ok(Coord { x, y })
        })
        .collect::<Result<Vec<_>, ()>>()?;

    // Ensure ring is closed (first point == last point)
    if !points.is_empty() && points[0] != points[points.len() - 1] {
        points.push(points[0]);
    }

    Ok(LineString(points))
}

/// Helper to convert a MultiPolygon to a serde_json::Value representing GeoJSON Geometry.
fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> Value {
    let polygons: Vec<Vec<Vec<[f64; 2]>>> = mp.0.iter()
        .map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors())
            .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
            .collect())
        .collect();

    json!({
        "type": "MultiPolygon",
        "coordinates": polygons,
    })
}
