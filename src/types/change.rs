//! Change records: one per detected event.

use geo::MultiPolygon;
use serde::Serialize;

use super::FeatureKey;

/// Change category of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChangeStatus {
    /// Key present in both datasets with a detected difference.
    #[serde(rename = "DIUBAH")]
    Diubah,
    /// Key present only in the new dataset.
    #[serde(rename = "DITAMBAHKAN")]
    Ditambahkan,
    /// Key present only in the old dataset.
    #[serde(rename = "DIHAPUS")]
    Dihapus,
    /// Region found by the symmetric-difference overlay.
    #[serde(rename = "PERUBAHAN_SPASIAL")]
    PerubahanSpasial,
}

impl ChangeStatus {
    /// Return the report label for this status.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Diubah => "DIUBAH",
            Self::Ditambahkan => "DITAMBAHKAN",
            Self::Dihapus => "DIHAPUS",
            Self::PerubahanSpasial => "PERUBAHAN_SPASIAL",
        }
    }

    /// Parse a status label.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "DIUBAH" => Some(Self::Diubah),
            "DITAMBAHKAN" => Some(Self::Ditambahkan),
            "DIHAPUS" => Some(Self::Dihapus),
            "PERUBAHAN_SPASIAL" => Some(Self::PerubahanSpasial),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which analysis produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    /// Identity-based pass (key matching).
    ById,
    /// Spatial pass (geometric overlay).
    Spatial,
}

impl ChangeOrigin {
    /// Return the report label for this origin.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ById => "by_id",
            Self::Spatial => "spatial",
        }
    }
}

impl std::fmt::Display for ChangeOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which dataset a symmetric-difference region belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialSide {
    /// Area present in the new dataset only.
    Added,
    /// Area present in the old dataset only.
    Removed,
}

/// A single detected change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    /// Primary identifier (or a placeholder for unmatched spatial regions).
    pub key: FeatureKey,
    /// Change category.
    pub status: ChangeStatus,
    /// Geometry or area changed beyond tolerance.
    pub boundary_changed: bool,
    /// Geometries differ beyond the linear tolerance (or one is invalid or missing).
    pub geometry_changed: bool,
    /// Area delta exceeds the boundary threshold.
    pub area_changed: bool,
    /// Area in the old dataset.
    pub area_old: f64,
    /// Area in the new dataset.
    pub area_new: f64,
    /// `area_old - area_new` for identity-based records.
    pub area_delta: f64,
    /// Secondary code in the old dataset.
    pub code_old: Option<String>,
    /// Secondary code in the new dataset.
    pub code_new: Option<String>,
    /// Secondary code differs.
    pub code_changed: bool,
    /// Which analysis produced the record.
    pub origin: ChangeOrigin,
    /// Side of the overlay (spatial records only).
    pub spatial_side: Option<SpatialSide>,
    /// Extent of the change for export.
    #[serde(skip_serializing)]
    pub geometry: Option<MultiPolygon<f64>>,
    /// Area of the difference polygon (spatial records only).
    pub spatial_area: Option<f64>,
}

impl ChangeRecord {
    /// Whether the record carries a geometry.
    pub fn has_geometry(&self) -> bool {
        self.geometry.is_some()
    }

    /// Human-readable notes column used by the delimited export.
    pub fn notes(&self) -> String {
        if self.origin == ChangeOrigin::Spatial {
            return "Perubahan batas spasial (symmetrical difference)".to_string();
        }
        if self.status != ChangeStatus::Diubah {
            return self.status.name().to_string();
        }
        let mut parts = Vec::new();
        if self.geometry_changed {
            parts.push("Batas berubah (geometri)");
        }
        if self.area_changed {
            parts.push("Batas berubah (luas)");
        }
        if self.code_changed {
            parts.push("kdsubsls berubah");
        }
        parts.join("; ")
    }
}
