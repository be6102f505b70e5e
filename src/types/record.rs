//! Feature keys, attribute values and the per-feature record.

use std::collections::BTreeMap;

use geo::MultiPolygon;
use serde::Serialize;

/// Primary identifier of a feature. Integer keys order before text keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum FeatureKey {
    /// Integer identifier.
    Int(i64),
    /// Text identifier.
    Text(String),
}

impl FeatureKey {
    /// Derive a key from an attribute value. Null yields `None`.
    pub fn from_attr(value: &AttrValue) -> Option<Self> {
        match value {
            AttrValue::Null => None,
            AttrValue::Int(v) => Some(Self::Int(*v)),
            AttrValue::Real(v) if v.is_finite() && v.fract() == 0.0 => Some(Self::Int(*v as i64)),
            AttrValue::Real(v) => Some(Self::Text(v.to_string())),
            AttrValue::Text(s) => Some(Self::Text(s.clone())),
        }
    }
}

impl std::fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FeatureKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FeatureKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FeatureKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// A single attribute value as read from a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl AttrValue {
    /// Convert a JSON property value. Nested values are kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Int(i64::from(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }

    /// Whether the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the value. Text is parsed; null and unparseable text yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            Self::Int(v) => Some(*v as f64),
            Self::Real(v) => Some(*v),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Code view of the value: text as-is, numbers stringified, null as `None`.
    pub fn as_code(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Int(v) => Some(v.to_string()),
            Self::Real(v) => Some(v.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// One input feature after extraction of the fields the detector cares about.
///
/// Built once by the index builder and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Record {
    /// Feature id inside the source dataset.
    pub fid: i64,
    /// Primary identifier.
    pub key: FeatureKey,
    /// Polygon geometry, if the feature has one.
    pub geometry: Option<MultiPolygon<f64>>,
    /// Area attribute (0.0 when absent).
    pub area: f64,
    /// Secondary classification code.
    pub secondary_code: Option<String>,
    /// Grouping key used only by the duplicate validator.
    pub grouping_key: Option<FeatureKey>,
    /// All raw attributes of the feature.
    pub attributes: BTreeMap<String, AttrValue>,
}

impl Record {
    /// Whether the secondary code is missing or blank.
    pub fn code_is_blank(&self) -> bool {
        self.secondary_code
            .as_deref()
            .map(|c| c.trim().is_empty())
            .unwrap_or(true)
    }
}
