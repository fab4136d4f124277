// Integration tests for the GeoJSON boundary: load both layers from disk,
// run the analysis, write the result and read it back as plain JSON.

use std::fs;

use arealcorr::{analyze, io, AnalysisConfig, Crs, SourceFeature, TargetFeature};
use geo::{polygon, MultiPolygon};
use serde_json::{json, Value};

fn cell(x0: f64, x1: f64) -> Value {
    json!({ "type": "Polygon", "coordinates": [[[x0, 0.0], [x1, 0.0], [x1, 10.0], [x0, 10.0], [x0, 0.0]]] })
}

fn collection(features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "EPSG:3857" } },
        "features": features,
    })
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("subdivisions.geojson");
    let target_path = dir.path().join("districts.geojson");
    let output_path = dir.path().join("result.geojson");

    let sources = collection((0..4).map(|i| json!({
        "type": "Feature",
        "properties": { "median_income": 40_000 + i * 5_000 },
        "geometry": cell(i as f64 * 10.0, i as f64 * 10.0 + 10.0),
    })).collect());
    let targets = collection(vec![
        json!({ "type": "Feature", "properties": { "ED": "west", "turnout": 0.52 }, "geometry": cell(0.0, 20.0) }),
        json!({ "type": "Feature", "properties": { "ED": "middle", "turnout": 0.55 }, "geometry": cell(10.0, 30.0) }),
        json!({ "type": "Feature", "properties": { "ED": "east", "turnout": 0.61 }, "geometry": cell(20.0, 40.0) }),
        json!({ "type": "Feature", "properties": { "turnout": 0.4 }, "geometry": cell(0.0, 5.0) }),
    ]);
    fs::write(&source_path, serde_json::to_vec(&sources).unwrap()).unwrap();
    fs::write(&target_path, serde_json::to_vec(&targets).unwrap()).unwrap();

    let sources = io::read_sources_file(&source_path, "median_income").unwrap();
    let targets = io::read_targets_file(&target_path, "turnout", "ED").unwrap();
    assert_eq!(sources.crs, Some(Crs::WEB_MERCATOR));
    assert_eq!(targets.features.len(), 3);
    assert_eq!(targets.rejected.len(), 1);

    let analysis = analyze(&sources.features, &targets.features, &AnalysisConfig::default()).unwrap();
    io::write_analysis(&output_path, &analysis).unwrap();

    let written: Value = serde_json::from_slice(&fs::read(&output_path).unwrap()).unwrap();
    assert_eq!(written["type"], "FeatureCollection");
    assert_eq!(written["bbox"], json!([0.0, 0.0, 40.0, 10.0]));
    assert_eq!(written["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::3857");

    let features = written["features"].as_array().unwrap();
    assert_eq!(features.len(), 3);
    assert_eq!(features[0]["id"], "west");
    assert_eq!(features[0]["geometry"]["type"], "MultiPolygon");

    // Each district averages the two cells it covers.
    let transferred: Vec<f64> = features.iter()
        .map(|f| f["properties"]["transferredValue"].as_f64().unwrap())
        .collect();
    for (value, expected) in transferred.iter().zip([42_500.0, 47_500.0, 52_500.0]) {
        assert!((value - expected).abs() < 1e-6, "{value} vs {expected}");
    }

    let r = written["correlation"].as_f64().unwrap();
    assert!(r > 0.9);
    assert!(features.iter().all(|f| f["properties"]["correlationValue"].as_f64() == Some(r)));
    assert_eq!(features[1]["properties"]["correlationClass"], "Strong Positive");
}

fn strip_sources() -> Vec<SourceFeature> {
    (0..4)
        .map(|i| SourceFeature::new(rect(i as f64 * 10.0, i as f64 * 10.0 + 10.0), i as f64 + 1.0))
        .collect()
}

fn rect(x0: f64, x1: f64) -> MultiPolygon<f64> {
    polygon![(x: x0, y: 0.0), (x: x1, y: 0.0), (x: x1, y: 10.0), (x: x0, y: 10.0)].into()
}

#[test]
fn unprojectable_target_layer_is_written_in_its_own_crs() {
    // EPSG:2263 has no built-in definition, so the targets keep their coordinates.
    let state_plane = Crs::new(2263);
    let targets: Vec<TargetFeature> = (0..4)
        .map(|i| TargetFeature::new(format!("t{i}"), rect(i as f64 * 10.0, i as f64 * 10.0 + 10.0), (i * i) as f64)
            .with_crs(state_plane))
        .collect();

    let analysis = analyze(&strip_sources(), &targets, &AnalysisConfig::default()).unwrap();
    assert_eq!(analysis.features.len(), 4);
    assert!(analysis.features.iter().all(|f| f.crs() == state_plane));
    assert_eq!(analysis.extent.crs, state_plane);
    assert_eq!(analysis.crs, state_plane);

    let written = io::analysis_to_geojson(&analysis);
    assert_eq!(written["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::2263");
    assert_eq!(written["bbox"], json!([0.0, 0.0, 40.0, 10.0]));
    assert!(written["features"].as_array().unwrap().iter().all(|f| f.get("crs").is_none()));
}

#[test]
fn feature_outside_collection_crs_carries_its_own() {
    let mut targets: Vec<TargetFeature> = (0..4)
        .map(|i| TargetFeature::new(format!("t{i}"), rect(i as f64 * 10.0, i as f64 * 10.0 + 10.0), (i * i) as f64))
        .collect();
    targets[3] = targets[3].clone().with_crs(Crs::new(2263));

    let analysis = analyze(&strip_sources(), &targets, &AnalysisConfig::default()).unwrap();
    assert_eq!(analysis.crs, Crs::WEB_MERCATOR);
    assert_eq!(analysis.extent.to_array(), [0.0, 0.0, 30.0, 10.0]);

    let written = io::analysis_to_geojson(&analysis);
    assert_eq!(written["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::3857");
    let features = written["features"].as_array().unwrap();
    assert_eq!(features.len(), 4);
    assert!(features[..3].iter().all(|f| f.get("crs").is_none()));
    assert_eq!(features[3]["id"], "t3");
    assert_eq!(features[3]["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::2263");
}
