//! GeoJSON FeatureCollection loader.

use std::path::{Path, PathBuf};

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::types::{AttrValue, Crs, DetectError, DetectResult, GeometryType, Layer, RawFeature};

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    crs: Option<CrsMember>,
    #[serde(default)]
    features: Vec<FeatureObject>,
}

/// Legacy (2008) named CRS member.
#[derive(Deserialize)]
struct CrsMember {
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Deserialize)]
struct FeatureObject {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<GeometryObject>,
}

#[derive(Deserialize)]
struct GeometryObject {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

type RingCoords = Vec<Vec<f64>>;
type PolygonCoords = Vec<RingCoords>;

/// Reads GeoJSON files into layers.
pub struct GeoJsonReader;

impl GeoJsonReader {
    /// Read a FeatureCollection from a file.
    pub fn read_from_file(path: &Path) -> DetectResult<Layer> {
        let content = std::fs::read_to_string(path)?;
        let fallback = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "layer".to_string());
        Self::read_from_str(&content, &fallback).map_err(|e| match e {
            DetectError::InvalidDataset { reason, .. } => DetectError::InvalidDataset {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Read a FeatureCollection from text.
    ///
    /// Without a `crs` member the layer is WGS 84. The geometry family is taken
    /// from the first feature that has a geometry; non-polygonal geometries are
    /// kept as `None`.
    pub fn read_from_str(content: &str, default_name: &str) -> DetectResult<Layer> {
        let invalid = |reason: String| DetectError::InvalidDataset {
            path: PathBuf::from(default_name),
            reason,
        };
        let collection: FeatureCollection =
            serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;
        if collection.kind != "FeatureCollection" {
            return Err(invalid(format!(
                "expected a FeatureCollection, found '{}'",
                collection.kind
            )));
        }

        let crs = match &collection.crs {
            None => Crs::WGS84,
            Some(member) => member
                .properties
                .get("name")
                .and_then(Value::as_str)
                .map(Crs::parse)
                .unwrap_or(Crs::Undefined),
        };

        let name = collection
            .name
            .clone()
            .unwrap_or_else(|| default_name.to_string());
        let mut layer = Layer::new(name, crs);
        layer.geometry_type = GeometryType::Unknown;

        for (i, feature) in collection.features.into_iter().enumerate() {
            let fid = feature
                .id
                .as_ref()
                .and_then(Value::as_i64)
                .unwrap_or(i as i64 + 1);
            let mut raw = RawFeature::new(fid);

            if let Some(properties) = &feature.properties {
                for (key, value) in properties {
                    raw.attributes
                        .insert(key.clone(), AttrValue::from_json(value));
                }
            }

            if let Some(geometry) = &feature.geometry {
                let family = GeometryType::from_name(&geometry.kind);
                if layer.geometry_type == GeometryType::Unknown {
                    layer.geometry_type = family;
                }
                if family == GeometryType::Polygon {
                    raw.geometry = parse_polygonal(geometry).map_err(invalid)?;
                }
            }

            layer.push(raw);
        }

        Ok(layer)
    }
}

fn parse_polygonal(geometry: &GeometryObject) -> Result<Option<MultiPolygon<f64>>, String> {
    let coordinates = geometry.coordinates.clone();
    let polygons: Vec<PolygonCoords> = match geometry.kind.as_str() {
        "Polygon" => vec![serde_json::from_value(coordinates).map_err(|e| e.to_string())?],
        "MultiPolygon" => serde_json::from_value(coordinates).map_err(|e| e.to_string())?,
        other => {
            log::warn!("Unsupported polygonal geometry type '{}'", other);
            return Ok(None);
        }
    };

    let mut out = Vec::with_capacity(polygons.len());
    for rings in polygons {
        let mut rings = rings.into_iter().map(to_ring);
        let exterior = match rings.next() {
            Some(ring) => ring?,
            None => continue,
        };
        let interiors = rings.collect::<Result<Vec<_>, _>>()?;
        out.push(Polygon::new(exterior, interiors));
    }

    if out.is_empty() {
        Ok(None)
    } else {
        Ok(Some(MultiPolygon::new(out)))
    }
}

fn to_ring(points: RingCoords) -> Result<LineString<f64>, String> {
    points
        .into_iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(format!(
                "position needs at least two numbers, got {}",
                p.len()
            )),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}
