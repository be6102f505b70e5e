//! Detector configuration with TOML persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{
    DetectError, DetectResult, DEFAULT_AREA_EPSILON, DEFAULT_AREA_FIELD, DEFAULT_AREA_THRESHOLD,
    DEFAULT_CODE_FIELD, DEFAULT_GEOMETRY_TOLERANCE, DEFAULT_GROUP_FIELD, DEFAULT_KEY_FIELD,
    DEFAULT_PLACEHOLDER_PREFIX, NULL_TEXT,
};

/// Complete detector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DetectorConfig {
    /// Field names in the input datasets.
    pub fields: FieldConfig,

    /// Numeric tolerances.
    pub thresholds: ThresholdConfig,

    /// Spatial pass settings.
    pub spatial: SpatialConfig,

    /// Export settings.
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Primary identifier field (required)
    pub key: String,

    /// Area attribute field (required)
    pub area: String,

    /// Secondary classification code field
    pub code: String,

    /// Grouping field for the duplicate check
    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Linear tolerance for geometry equality
    pub geometry_tolerance: f64,

    /// Area delta that marks a boundary change
    pub area_threshold: f64,

    /// Area delta that makes a pair reportable
    pub area_epsilon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Run the symmetric-difference pass
    pub enabled: bool,

    /// Key prefix for regions that join to no new feature
    pub placeholder_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Column delimiter of the delimited report
    pub delimiter: String,

    /// Text written for null codes
    pub null_text: String,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY_FIELD.to_string(),
            area: DEFAULT_AREA_FIELD.to_string(),
            code: DEFAULT_CODE_FIELD.to_string(),
            group: DEFAULT_GROUP_FIELD.to_string(),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            geometry_tolerance: DEFAULT_GEOMETRY_TOLERANCE,
            area_threshold: DEFAULT_AREA_THRESHOLD,
            area_epsilon: DEFAULT_AREA_EPSILON,
        }
    }
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            placeholder_prefix: DEFAULT_PLACEHOLDER_PREFIX.to_string(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            null_text: NULL_TEXT.to_string(),
        }
    }
}

impl DetectorConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> DetectResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> DetectResult<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render as pretty TOML.
    pub fn to_toml(&self) -> DetectResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check tolerances and the export delimiter.
    pub fn validate(&self) -> DetectResult<()> {
        let t = &self.thresholds;
        for (name, value) in [
            ("geometry_tolerance", t.geometry_tolerance),
            ("area_threshold", t.area_threshold),
            ("area_epsilon", t.area_epsilon),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DetectError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.fields.key.is_empty() || self.fields.area.is_empty() {
            return Err(DetectError::Config(
                "key and area field names must not be empty".to_string(),
            ));
        }
        self.delimiter()?;
        Ok(())
    }

    /// The export delimiter as a single byte.
    pub fn delimiter(&self) -> DetectResult<u8> {
        match self.export.delimiter.as_bytes() {
            [b] if b.is_ascii() && *b != b'"' && *b != b'\n' && *b != b'\r' => Ok(*b),
            _ => Err(DetectError::Config(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.export.delimiter
            ))),
        }
    }
}
