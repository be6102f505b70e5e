//! SLS change detector: compares two snapshots of a polygon dataset of
//! statistical sub-areas and reports what changed.
//!
//! Features are matched by primary key and classified as modified, added or
//! removed; a spatial symmetric-difference pass then finds boundary changes
//! the keys alone miss. Both lists are merged into one report that can be
//! exported as CSV or GeoPackage.

pub mod cli;
pub mod config;
pub mod engine;
pub mod format;
pub mod geometry;
pub mod index;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::DetectorConfig;
pub use engine::{
    detect, spawn_detection, Advisory, AdvisoryLevel, DetectionEngine, DetectionResult,
    DetectionSummary, Report, Stage,
};
pub use format::{load_layer, CsvReportWriter, GeoJsonReader, GpkgReader, GpkgReportWriter};
pub use geometry::{GeoEngine, GeometryEngine, Reproject};
pub use index::{DuplicateFlagSet, DuplicateValidator, FeatureIndex, IndexStats};
pub use types::{
    AttrValue, ChangeOrigin, ChangeRecord, ChangeStatus, Crs, DetectError, DetectResult,
    FeatureKey, GeometryType, Layer, RawFeature, Record, SchemaViolation, SpatialEngineError,
    SpatialSide,
};
