//! Dataset loaders and report exporters.

pub mod csv;
pub mod geojson;
pub mod gpkg;
pub mod wkb;

use std::path::Path;

use crate::engine::DetectionResult;
use crate::types::{DetectError, DetectResult, Layer};

pub use self::csv::{CsvReportWriter, CSV_HEADERS};
pub use geojson::GeoJsonReader;
pub use gpkg::{GpkgReader, GpkgReportWriter, REPORT_TABLE};
pub use wkb::{decode_gpkg_blob, decode_wkb, encode_gpkg_blob, encode_wkb};

/// Supported input container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    GeoPackage,
    GeoJson,
}

impl DatasetFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "gpkg" => Some(Self::GeoPackage),
            "geojson" | "json" => Some(Self::GeoJson),
            _ => None,
        }
    }

    /// Return a human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GeoPackage => "GeoPackage",
            Self::GeoJson => "GeoJSON",
        }
    }
}

/// Load a polygon layer, dispatching on the file extension.
///
/// `layer` selects a feature table inside a GeoPackage and is ignored for GeoJSON.
pub fn load_layer(path: &Path, layer: Option<&str>) -> DetectResult<Layer> {
    if !path.exists() {
        return Err(DetectError::MissingInput(path.to_path_buf()));
    }
    match DatasetFormat::from_path(path) {
        Some(DatasetFormat::GeoPackage) => GpkgReader::open(path)?.read_layer(layer),
        Some(DatasetFormat::GeoJson) => GeoJsonReader::read_from_file(path),
        None => Err(DetectError::InvalidDataset {
            path: path.to_path_buf(),
            reason: "unsupported file extension (expected .gpkg, .geojson or .json)".to_string(),
        }),
    }
}

/// Render a detection result as pretty JSON.
pub fn render_json(result: &DetectionResult) -> DetectResult<String> {
    Ok(serde_json::to_string_pretty(result)?)
}
