//! In-memory layers handed to the detector by the loaders.

use std::collections::BTreeMap;

use geo::MultiPolygon;

use super::{AttrValue, Crs, GeometryType};

/// A raw feature: attributes plus optional polygon geometry.
#[derive(Debug, Clone, Default)]
pub struct RawFeature {
    /// Feature id inside the source dataset.
    pub fid: i64,
    /// Attribute values by field name.
    pub attributes: BTreeMap<String, AttrValue>,
    /// Polygonal geometry, if present and polygonal.
    pub geometry: Option<MultiPolygon<f64>>,
}

impl RawFeature {
    /// Create an empty feature with the given id.
    pub fn new(fid: i64) -> Self {
        Self {
            fid,
            attributes: BTreeMap::new(),
            geometry: None,
        }
    }

    /// Set an attribute.
    pub fn attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Set the geometry.
    pub fn geometry(mut self, geometry: impl Into<MultiPolygon<f64>>) -> Self {
        self.geometry = Some(geometry.into());
        self
    }

    /// Attribute by name (missing attributes read as null).
    pub fn get(&self, name: &str) -> &AttrValue {
        self.attributes.get(name).unwrap_or(&AttrValue::Null)
    }
}

/// A polygon dataset: schema, reference frame and features.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Layer name.
    pub name: String,
    /// Coordinate reference system.
    pub crs: Crs,
    /// Declared geometry family.
    pub geometry_type: GeometryType,
    /// Field names in schema order.
    pub fields: Vec<String>,
    /// All features.
    pub features: Vec<RawFeature>,
}

impl Layer {
    /// Create an empty polygon layer.
    pub fn new(name: impl Into<String>, crs: Crs) -> Self {
        Self {
            name: name.into(),
            crs,
            geometry_type: GeometryType::Polygon,
            fields: Vec::new(),
            features: Vec::new(),
        }
    }

    /// Declare fields.
    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        for field in fields {
            self.add_field(field);
        }
        self
    }

    /// Declare a single field if not yet present.
    pub fn add_field(&mut self, name: &str) {
        if !self.has_field(name) {
            self.fields.push(name.to_string());
        }
    }

    /// Append a feature, extending the schema with any new attribute names.
    pub fn push(&mut self, feature: RawFeature) {
        for name in feature.attributes.keys() {
            if !self.fields.iter().any(|f| f == name) {
                self.fields.push(name.clone());
            }
        }
        self.features.push(feature);
    }

    /// Whether the schema contains a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    /// Number of features.
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }
}
