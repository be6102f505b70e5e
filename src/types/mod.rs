//! All data types for the SLS change detector.

pub mod change;
pub mod crs;
pub mod error;
pub mod layer;
pub mod record;

pub use change::{ChangeOrigin, ChangeRecord, ChangeStatus, SpatialSide};
pub use crs::{Crs, GeometryType};
pub use error::{DetectError, DetectResult, SchemaViolation, SpatialEngineError};
pub use layer::{Layer, RawFeature};
pub use record::{AttrValue, FeatureKey, Record};

/// Default primary identifier field.
pub const DEFAULT_KEY_FIELD: &str = "idsubsls";

/// Default numeric area field.
pub const DEFAULT_AREA_FIELD: &str = "luas";

/// Default secondary classification code field.
pub const DEFAULT_CODE_FIELD: &str = "kdsubsls";

/// Default grouping field used by the duplicate validator.
pub const DEFAULT_GROUP_FIELD: &str = "gid";

/// Linear tolerance for geometry equality (distance units of the layer CRS).
pub const DEFAULT_GEOMETRY_TOLERANCE: f64 = 0.001;

/// Area delta above which a boundary is considered changed (area units).
pub const DEFAULT_AREA_THRESHOLD: f64 = 1.0;

/// Area delta above which a pair is reported at all.
pub const DEFAULT_AREA_EPSILON: f64 = 0.001;

/// Prefix for spatial changes that join to no feature in the new dataset.
pub const DEFAULT_PLACEHOLDER_PREFIX: &str = "SPASIAL_";

/// Text written in place of a null code on export.
pub const NULL_TEXT: &str = "NULL";

/// Returns the current wall-clock time in UTC.
pub fn now_utc() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}
