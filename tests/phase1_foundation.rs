//! Phase 1 tests: data model, index building, duplicate check, configuration, geometry engine.

use geo::{polygon, MultiPolygon, Polygon, Rect};
use tempfile::NamedTempFile;

use sls_change::config::DetectorConfig;
use sls_change::geometry::{GeoEngine, GeometryEngine, Reproject};
use sls_change::index::{extract_records, DuplicateCheck, DuplicateValidator, FeatureIndex};
use sls_change::types::{
    AttrValue, ChangeOrigin, ChangeRecord, ChangeStatus, Crs, DetectError, FeatureKey,
    GeometryType, Layer, RawFeature, SpatialEngineError, SpatialSide,
};

fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
    Rect::new((x, y), (x + size, y + size)).to_polygon()
}

fn sls_layer(name: &str) -> Layer {
    Layer::new(name, Crs::WEB_MERCATOR).with_fields(&["idsubsls", "luas", "kdsubsls", "gid"])
}

fn feature(fid: i64, key: &str, area: f64, code: Option<&str>) -> RawFeature {
    RawFeature::new(fid)
        .attr("idsubsls", key)
        .attr("luas", area)
        .attr("kdsubsls", code)
}

fn by_id_change(status: ChangeStatus) -> ChangeRecord {
    ChangeRecord {
        key: FeatureKey::from("A"),
        status,
        boundary_changed: false,
        geometry_changed: false,
        area_changed: false,
        area_old: 0.0,
        area_new: 0.0,
        area_delta: 0.0,
        code_old: None,
        code_new: None,
        code_changed: false,
        origin: ChangeOrigin::ById,
        spatial_side: None,
        geometry: None,
        spatial_area: None,
    }
}

// ==================== Data Model Tests ====================

#[test]
fn test_feature_key_from_attr() {
    assert_eq!(
        FeatureKey::from_attr(&AttrValue::Int(7)),
        Some(FeatureKey::Int(7))
    );
    assert_eq!(
        FeatureKey::from_attr(&AttrValue::Real(12.0)),
        Some(FeatureKey::Int(12))
    );
    assert_eq!(
        FeatureKey::from_attr(&AttrValue::Text("3171010001000101".into())),
        Some(FeatureKey::Text("3171010001000101".into()))
    );
    assert_eq!(FeatureKey::from_attr(&AttrValue::Null), None);
}

#[test]
fn test_feature_key_ordering() {
    let mut keys = vec![
        FeatureKey::from("B"),
        FeatureKey::from(2),
        FeatureKey::from("A"),
        FeatureKey::from(1),
    ];
    keys.sort();
    assert_eq!(
        keys,
        vec![
            FeatureKey::Int(1),
            FeatureKey::Int(2),
            FeatureKey::from("A"),
            FeatureKey::from("B"),
        ]
    );
    assert_eq!(FeatureKey::from(42).to_string(), "42");
}

#[test]
fn test_attr_value_views() {
    assert_eq!(AttrValue::Text(" 12.5 ".into()).as_f64(), Some(12.5));
    assert_eq!(AttrValue::Text("abc".into()).as_f64(), None);
    assert_eq!(AttrValue::Int(3).as_f64(), Some(3.0));
    assert_eq!(AttrValue::Null.as_f64(), None);

    assert_eq!(AttrValue::Int(5).as_code(), Some("5".to_string()));
    assert_eq!(AttrValue::Text("001".into()).as_code(), Some("001".to_string()));
    assert_eq!(AttrValue::Null.as_code(), None);

    assert_eq!(AttrValue::from(None::<&str>), AttrValue::Null);
    assert_eq!(AttrValue::from(Some("X")), AttrValue::Text("X".into()));
}

#[test]
fn test_attr_value_from_json() {
    assert_eq!(AttrValue::from_json(&serde_json::json!(null)), AttrValue::Null);
    assert_eq!(AttrValue::from_json(&serde_json::json!(4)), AttrValue::Int(4));
    assert_eq!(AttrValue::from_json(&serde_json::json!(4.5)), AttrValue::Real(4.5));
    assert_eq!(AttrValue::from_json(&serde_json::json!("x")), AttrValue::Text("x".into()));
    assert_eq!(AttrValue::from_json(&serde_json::json!(true)), AttrValue::Int(1));
}

#[test]
fn test_change_status_labels() {
    for status in [
        ChangeStatus::Diubah,
        ChangeStatus::Ditambahkan,
        ChangeStatus::Dihapus,
        ChangeStatus::PerubahanSpasial,
    ] {
        assert_eq!(ChangeStatus::from_name(status.name()), Some(status));
        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            format!("\"{}\"", status.name())
        );
    }
    assert_eq!(ChangeStatus::from_name("diubah"), Some(ChangeStatus::Diubah));
    assert_eq!(ChangeStatus::from_name("UNKNOWN"), None);
    assert_eq!(ChangeOrigin::ById.name(), "by_id");
    assert_eq!(ChangeOrigin::Spatial.to_string(), "spatial");
}

#[test]
fn test_change_record_notes() {
    let mut change = by_id_change(ChangeStatus::Diubah);
    change.geometry_changed = true;
    change.area_changed = true;
    change.code_changed = true;
    assert_eq!(
        change.notes(),
        "Batas berubah (geometri); Batas berubah (luas); kdsubsls berubah"
    );

    let mut code_only = by_id_change(ChangeStatus::Diubah);
    code_only.code_changed = true;
    assert_eq!(code_only.notes(), "kdsubsls berubah");

    // Attribute-area change below the boundary threshold carries no reason.
    assert_eq!(by_id_change(ChangeStatus::Diubah).notes(), "");

    assert_eq!(by_id_change(ChangeStatus::Ditambahkan).notes(), "DITAMBAHKAN");
    assert_eq!(by_id_change(ChangeStatus::Dihapus).notes(), "DIHAPUS");

    let mut spatial = by_id_change(ChangeStatus::PerubahanSpasial);
    spatial.origin = ChangeOrigin::Spatial;
    spatial.spatial_side = Some(SpatialSide::Added);
    assert_eq!(
        spatial.notes(),
        "Perubahan batas spasial (symmetrical difference)"
    );
}

#[test]
fn test_change_record_json_skips_geometry() {
    let mut change = by_id_change(ChangeStatus::Ditambahkan);
    change.geometry = Some(square(0.0, 0.0, 1.0).into());
    let value = serde_json::to_value(&change).unwrap();
    assert!(value.get("geometry").is_none());
    assert_eq!(value["status"], "DITAMBAHKAN");
    assert_eq!(value["origin"], "by_id");
    assert_eq!(value["key"], "A");
}

#[test]
fn test_crs_parse() {
    assert_eq!(Crs::parse("EPSG:3857"), Crs::WEB_MERCATOR);
    assert_eq!(Crs::parse("urn:ogc:def:crs:EPSG::32748"), Crs::Epsg(32748));
    assert_eq!(Crs::parse("urn:ogc:def:crs:OGC:1.3:CRS84"), Crs::WGS84);
    assert_eq!(Crs::parse("LOCAL_CS"), Crs::Undefined);
    assert_eq!(Crs::from_srs_id(4326), Crs::WGS84);
    assert_eq!(Crs::from_srs_id(-1), Crs::Undefined);
    assert_eq!(Crs::from_srs_id(0), Crs::Undefined);
    assert_eq!(Crs::WEB_MERCATOR.to_string(), "EPSG:3857");
    assert!(!Crs::Undefined.is_valid());
    assert_eq!(Crs::Epsg(32748).epsg(), Some(32748));
    assert_eq!(Crs::Undefined.epsg(), None);
}

#[test]
fn test_geometry_type_from_name() {
    assert_eq!(GeometryType::from_name("MultiPolygon"), GeometryType::Polygon);
    assert_eq!(GeometryType::from_name("POLYGONZ"), GeometryType::Polygon);
    assert_eq!(GeometryType::from_name("MULTIPOLYGONZM"), GeometryType::Polygon);
    assert_eq!(GeometryType::from_name("Point"), GeometryType::Point);
    assert_eq!(GeometryType::from_name("LineString"), GeometryType::Line);
    assert_eq!(GeometryType::from_name("GEOMETRY"), GeometryType::Unknown);
}

#[test]
fn test_layer_push_extends_schema() {
    let mut layer = Layer::new("test", Crs::WGS84).with_fields(&["idsubsls"]);
    layer.push(RawFeature::new(1).attr("idsubsls", "A").attr("extra", 1));
    assert!(layer.has_field("extra"));
    assert_eq!(layer.fields, vec!["idsubsls".to_string(), "extra".to_string()]);
    assert_eq!(layer.feature_count(), 1);
    assert_eq!(layer.features[0].get("missing"), &AttrValue::Null);
}

// ==================== Index Tests ====================

#[test]
fn test_index_build_basic() {
    let mut layer = sls_layer("old");
    layer.push(feature(1, "B", 50.0, Some("X")).geometry(square(0.0, 0.0, 10.0)));
    layer.push(feature(2, "A", 100.0, None));

    let index = FeatureIndex::build(&layer, &DetectorConfig::default().fields);
    assert_eq!(index.len(), 2);
    let keys: Vec<String> = index.keys().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["A", "B"]);

    let b = index.get(&FeatureKey::from("B")).unwrap();
    assert_eq!(b.fid, 1);
    assert!((b.area - 50.0).abs() < 1e-12);
    assert_eq!(b.secondary_code.as_deref(), Some("X"));
    assert!(b.geometry.is_some());

    let a = index.get(&FeatureKey::from("A")).unwrap();
    assert_eq!(a.secondary_code, None);
    assert!(a.code_is_blank());
    assert!(a.geometry.is_none());
    assert_eq!(index.stats().features_read, 2);
}

#[test]
fn test_index_null_keys_and_bad_areas() {
    let mut layer = sls_layer("old");
    layer.push(RawFeature::new(1).attr("luas", 10.0));
    layer.push(RawFeature::new(2).attr("idsubsls", "A").attr("luas", "n/a"));
    layer.push(RawFeature::new(3).attr("idsubsls", "B").attr("luas", AttrValue::Null));
    layer.push(RawFeature::new(4).attr("idsubsls", "C").attr("luas", "42.5"));

    let index = FeatureIndex::build(&layer, &DetectorConfig::default().fields);
    let stats = index.stats();
    assert_eq!(stats.features_read, 4);
    assert_eq!(stats.null_keys, 1);
    assert_eq!(stats.bad_areas, 1);
    assert_eq!(index.len(), 3);
    assert_eq!(index.get(&FeatureKey::from("A")).unwrap().area, 0.0);
    assert_eq!(index.get(&FeatureKey::from("B")).unwrap().area, 0.0);
    assert_eq!(index.get(&FeatureKey::from("C")).unwrap().area, 42.5);
}

#[test]
fn test_index_last_write_wins() {
    let mut layer = sls_layer("old");
    layer.push(feature(1, "A", 10.0, Some("X")));
    layer.push(feature(2, "A", 20.0, Some("Y")));

    let index = FeatureIndex::build(&layer, &DetectorConfig::default().fields);
    assert_eq!(index.len(), 1);
    assert_eq!(index.stats().overwritten_keys, 1);
    let a = index.get(&FeatureKey::from("A")).unwrap();
    assert_eq!(a.fid, 2);
    assert_eq!(a.area, 20.0);
    assert_eq!(a.secondary_code.as_deref(), Some("Y"));
}

#[test]
fn test_index_code_field_absent() {
    let mut layer = Layer::new("old", Crs::WGS84).with_fields(&["idsubsls", "luas"]);
    layer.push(RawFeature::new(1).attr("idsubsls", 5).attr("luas", 1.0));
    let extracted = extract_records(&layer, &DetectorConfig::default().fields);
    assert_eq!(extracted.records.len(), 1);
    assert_eq!(extracted.records[0].key, FeatureKey::Int(5));
    assert_eq!(extracted.records[0].secondary_code, None);
    assert_eq!(extracted.records[0].grouping_key, None);
}

// ==================== Duplicate Check Tests ====================

#[test]
fn test_duplicates_flag_group_with_blank_code() {
    let fields = DetectorConfig::default().fields;
    let mut layer = sls_layer("new");
    layer.push(feature(1, "A", 1.0, Some("001")).attr("gid", 7));
    layer.push(feature(2, "B", 1.0, None).attr("gid", 7));
    layer.push(feature(3, "C", 1.0, Some("003")).attr("gid", 8));

    let flags = DuplicateValidator::new(&fields).check_layer(&layer).into_flags();
    assert_eq!(flags.len(), 2);
    assert!(flags.contains(&FeatureKey::from("A")));
    assert!(flags.contains(&FeatureKey::from("B")));
    assert!(!flags.contains(&FeatureKey::from("C")));
    assert_eq!(flags.groups().len(), 1);
    assert_eq!(flags.groups()[0].grouping_key, Some(FeatureKey::Int(7)));
}

#[test]
fn test_duplicates_blank_text_counts_as_missing() {
    let fields = DetectorConfig::default().fields;
    let mut layer = sls_layer("new");
    layer.push(feature(1, "A", 1.0, Some("  ")).attr("gid", 1));
    layer.push(feature(2, "B", 1.0, Some("002")).attr("gid", 1));

    let flags = DuplicateValidator::new(&fields).check_layer(&layer).into_flags();
    assert_eq!(flags.len(), 2);
}

#[test]
fn test_duplicates_not_flagged() {
    let fields = DetectorConfig::default().fields;
    let mut layer = sls_layer("new");
    // Group with complete codes.
    layer.push(feature(1, "A", 1.0, Some("001")).attr("gid", 1));
    layer.push(feature(2, "B", 1.0, Some("002")).attr("gid", 1));
    // Singleton with a blank code.
    layer.push(feature(3, "C", 1.0, None).attr("gid", 2));

    match DuplicateValidator::new(&fields).check_layer(&layer) {
        DuplicateCheck::Checked(flags) => assert!(flags.is_empty()),
        other => panic!("expected a completed check, got {:?}", other),
    }
}

#[test]
fn test_duplicates_null_grouping_key_forms_a_group() {
    let fields = DetectorConfig::default().fields;
    let mut layer = sls_layer("new");
    layer.push(feature(1, "A", 1.0, None));
    layer.push(feature(2, "B", 1.0, Some("002")));

    let flags = DuplicateValidator::new(&fields).check_layer(&layer).into_flags();
    assert_eq!(flags.len(), 2);
    assert_eq!(flags.groups()[0].grouping_key, None);
}

#[test]
fn test_duplicates_skipped_without_group_field() {
    let fields = DetectorConfig::default().fields;
    let mut layer = Layer::new("new", Crs::WGS84).with_fields(&["idsubsls", "luas", "kdsubsls"]);
    layer.push(feature(1, "A", 1.0, None));

    assert_eq!(
        DuplicateValidator::new(&fields).check_layer(&layer),
        DuplicateCheck::Skipped {
            missing_field: "gid".to_string()
        }
    );
}

// ==================== Configuration Tests ====================

#[test]
fn test_config_defaults() {
    let config = DetectorConfig::default();
    assert_eq!(config.fields.key, "idsubsls");
    assert_eq!(config.fields.area, "luas");
    assert_eq!(config.fields.code, "kdsubsls");
    assert_eq!(config.fields.group, "gid");
    assert_eq!(config.thresholds.geometry_tolerance, 0.001);
    assert_eq!(config.thresholds.area_threshold, 1.0);
    assert_eq!(config.thresholds.area_epsilon, 0.001);
    assert!(config.spatial.enabled);
    assert_eq!(config.spatial.placeholder_prefix, "SPASIAL_");
    assert_eq!(config.delimiter().unwrap(), b',');
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_save_and_load() {
    let mut config = DetectorConfig::default();
    config.thresholds.area_threshold = 2.5;
    config.spatial.enabled = false;
    config.export.delimiter = ";".to_string();

    let tmp = NamedTempFile::new().unwrap();
    config.save(tmp.path()).unwrap();
    let loaded = DetectorConfig::load(tmp.path()).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_partial_file_uses_defaults() {
    let tmp = NamedTempFile::new().unwrap();
    std::fs::write(tmp.path(), "[fields]\nkey = \"kode\"\n").unwrap();
    let config = DetectorConfig::load(tmp.path()).unwrap();
    assert_eq!(config.fields.key, "kode");
    assert_eq!(config.fields.area, "luas");
    assert_eq!(config.thresholds.area_threshold, 1.0);
}

#[test]
fn test_config_rejects_bad_values() {
    let mut config = DetectorConfig::default();
    config.thresholds.geometry_tolerance = -1.0;
    assert!(matches!(config.validate(), Err(DetectError::Config(_))));

    let mut config = DetectorConfig::default();
    config.export.delimiter = "::".to_string();
    assert!(matches!(config.validate(), Err(DetectError::Config(_))));

    let mut config = DetectorConfig::default();
    config.fields.key = String::new();
    assert!(matches!(config.validate(), Err(DetectError::Config(_))));

    let tmp = NamedTempFile::new().unwrap();
    std::fs::write(tmp.path(), "[thresholds\n").unwrap();
    assert!(matches!(
        DetectorConfig::load(tmp.path()),
        Err(DetectError::TomlDe(_))
    ));
}

// ==================== Geometry Engine Tests ====================

#[test]
fn test_engine_area_and_equality() {
    let engine = GeoEngine::new();
    let a: MultiPolygon<f64> = square(0.0, 0.0, 10.0).into();
    let b: MultiPolygon<f64> = square(0.0005, 0.0, 10.0).into();
    let c: MultiPolygon<f64> = square(1.0, 0.0, 10.0).into();

    assert!((engine.area(&a) - 100.0).abs() < 1e-9);
    assert!(engine.equals_with_tolerance(&a, &a, 0.0));
    assert!(engine.equals_with_tolerance(&a, &b, 0.001));
    assert!(!engine.equals_with_tolerance(&a, &c, 0.001));
}

#[test]
fn test_engine_validity() {
    let engine = GeoEngine::new();
    assert!(engine.is_valid(&square(0.0, 0.0, 1.0).into()));

    let bowtie: Polygon<f64> = geo::polygon![
        (x: 0.0, y: 0.0),
        (x: 2.0, y: 2.0),
        (x: 2.0, y: 0.0),
        (x: 0.0, y: 2.0),
        (x: 0.0, y: 0.0),
    ];
    assert!(!engine.is_valid(&bowtie.into()));

    let flat: Polygon<f64> = geo::polygon![
        (x: 0.0, y: 0.0),
        (x: 1.0, y: 0.0),
        (x: 2.0, y: 0.0),
        (x: 0.0, y: 0.0),
    ];
    assert!(!engine.is_valid(&flat.into()));
    assert!(!engine.is_valid(&MultiPolygon::new(Vec::new())));
}

#[test]
fn test_engine_overlay() {
    let engine = GeoEngine::new();
    let a: MultiPolygon<f64> = square(0.0, 0.0, 10.0).into();
    let b: MultiPolygon<f64> = square(5.0, 0.0, 10.0).into();
    let far: MultiPolygon<f64> = square(100.0, 100.0, 1.0).into();

    let union = engine.union_all(&[&a, &b]).unwrap();
    assert!((engine.area(&union) - 150.0).abs() < 1e-6);

    let diff = engine.difference(&a, &b).unwrap();
    assert!((engine.area(&diff) - 50.0).abs() < 1e-6);

    let sym = engine.symmetric_difference(&a, &b).unwrap();
    assert!((engine.area(&sym) - 100.0).abs() < 1e-6);

    assert_eq!(engine.difference(&a, &far).unwrap(), a);
    assert!(engine.intersects(&a, &b));
    assert!(!engine.intersects(&a, &far));
    assert!(engine.union_all(&[]).unwrap().0.is_empty());
}

#[test]
fn test_engine_reprojection() {
    let engine = GeoEngine::new();
    let lonlat: MultiPolygon<f64> = square(106.8, -6.2, 0.01).into();

    let same = engine.reproject(&lonlat, Crs::WGS84, Crs::WGS84).unwrap();
    assert_eq!(same, lonlat);

    let mercator = engine.reproject(&lonlat, Crs::WGS84, Crs::WEB_MERCATOR).unwrap();
    let ring = &mercator.0[0].exterior().0;
    let min_x = ring.iter().map(|c| c.x).fold(f64::INFINITY, f64::min);
    assert!((min_x - 11_888_921.6).abs() < 1.0);
    assert!(ring.iter().all(|c| c.y < 0.0));

    let back = engine.reproject(&mercator, Crs::WEB_MERCATOR, Crs::WGS84).unwrap();
    for (p, q) in back.0[0].exterior().0.iter().zip(lonlat.0[0].exterior().0.iter()) {
        assert!((p.x - q.x).abs() < 1e-9);
        assert!((p.y - q.y).abs() < 1e-9);
    }

    assert!(matches!(
        engine.reproject(&lonlat, Crs::WGS84, Crs::Epsg(32748)),
        Err(SpatialEngineError::Reprojection { .. })
    ));
}
