//! Coordinate reference systems and layer geometry types.

use serde::Serialize;

/// Coordinate reference system of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Crs {
    /// An EPSG-registered system.
    Epsg(u32),
    /// No usable definition.
    Undefined,
}

impl Crs {
    /// WGS 84 geographic.
    pub const WGS84: Crs = Crs::Epsg(4326);
    /// WGS 84 / Pseudo-Mercator.
    pub const WEB_MERCATOR: Crs = Crs::Epsg(3857);

    /// Whether the CRS is defined.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Epsg(_))
    }

    /// EPSG code, if any.
    pub fn epsg(&self) -> Option<u32> {
        match self {
            Self::Epsg(code) => Some(*code),
            Self::Undefined => None,
        }
    }

    /// Parse `EPSG:3857`, `urn:ogc:def:crs:EPSG::3857` or the OGC CRS84 urn.
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        let upper = name.to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Self::WGS84;
        }
        if !upper.contains("EPSG") {
            return Self::Undefined;
        }
        name.rsplit(':')
            .next()
            .and_then(|code| code.trim().parse::<u32>().ok())
            .map(Self::Epsg)
            .unwrap_or(Self::Undefined)
    }

    /// Map a GeoPackage `srs_id` (negative and zero ids are the undefined systems).
    pub fn from_srs_id(srs_id: i64) -> Self {
        if srs_id > 0 {
            Self::Epsg(srs_id as u32)
        } else {
            Self::Undefined
        }
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Epsg(code) => write!(f, "EPSG:{}", code),
            Self::Undefined => write!(f, "undefined"),
        }
    }
}

/// Geometry family of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GeometryType {
    Point,
    Line,
    Polygon,
    Unknown,
}

impl GeometryType {
    /// Classify a GeoJSON or GeoPackage geometry type name.
    pub fn from_name(name: &str) -> Self {
        let upper = name.to_ascii_uppercase();
        let base = upper
            .trim_end_matches("ZM")
            .trim_end_matches('Z')
            .trim_end_matches('M')
            .trim();
        match base {
            "POINT" | "MULTIPOINT" => Self::Point,
            "LINESTRING" | "MULTILINESTRING" | "CURVE" | "MULTICURVE" => Self::Line,
            "POLYGON" | "MULTIPOLYGON" | "SURFACE" | "MULTISURFACE" | "CURVEPOLYGON" => {
                Self::Polygon
            }
            _ => Self::Unknown,
        }
    }

    /// Return a human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Line => "line",
            Self::Polygon => "polygon",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
