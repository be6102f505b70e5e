//! Error types for the SLS change detector.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can abort a detection run or an export.
#[derive(Error, Debug)]
pub enum DetectError {
    /// Input file does not exist.
    #[error("Input file not found: {0}")]
    MissingInput(PathBuf),

    /// Input file exists but could not be read as a dataset.
    #[error("Invalid dataset {path}: {reason}")]
    InvalidDataset { path: PathBuf, reason: String },

    /// The requested layer is not present in the container.
    #[error("Layer '{layer}' not found in {path}")]
    LayerNotFound { path: PathBuf, layer: String },

    /// One or more schema preconditions failed.
    #[error("Schema validation failed: {}", join_violations(.0))]
    Schema(Vec<SchemaViolation>),

    /// Malformed geometry blob.
    #[error("Invalid geometry encoding: {0}")]
    Wkb(String),

    /// Configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Nothing to export.
    #[error("No change records to export")]
    EmptyReport,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error while reading or writing a GeoPackage.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error.
    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Convenience result type for detector operations.
pub type DetectResult<T> = Result<T, DetectError>;

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single failed schema precondition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// The CRS of a dataset is undefined.
    InvalidCrs { dataset: String },
    /// The two datasets carry different geometry types.
    GeometryTypeMismatch { old: String, new: String },
    /// A dataset is not polygonal.
    NotPolygonal { dataset: String, found: String },
    /// A required field is absent from a dataset.
    MissingField { dataset: String, field: String },
    /// A dataset has no features.
    EmptyLayer { dataset: String },
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCrs { dataset } => write!(f, "CRS of {} dataset is undefined", dataset),
            Self::GeometryTypeMismatch { old, new } => {
                write!(f, "Geometry types differ (old: {}, new: {})", old, new)
            }
            Self::NotPolygonal { dataset, found } => {
                write!(f, "{} dataset is not polygonal ({})", dataset, found)
            }
            Self::MissingField { dataset, field } => {
                write!(f, "Field '{}' not found in {} dataset", field, dataset)
            }
            Self::EmptyLayer { dataset } => write!(f, "{} dataset has no features", dataset),
        }
    }
}

/// Failures of the best-effort spatial stage. Never aborts a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpatialEngineError {
    /// The overlay operation failed.
    #[error("Overlay failed: {0}")]
    Overlay(String),

    /// No transformation between the two frames.
    #[error("Cannot reproject from {from} to {to}")]
    Reprojection { from: String, to: String },
}
