//! Reprojection between reference frames.

use geo::{Coord, MapCoords, MultiPolygon};

use crate::types::{Crs, SpatialEngineError};

use super::GeoEngine;

/// Semi-major axis of WGS 84, used by the spherical Mercator projection.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the Pseudo-Mercator projection.
const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// Moves polygon sets from one reference frame into another.
pub trait Reproject {
    /// Reproject a geometry from `from` into `to`.
    fn reproject(
        &self,
        geometry: &MultiPolygon<f64>,
        from: Crs,
        to: Crs,
    ) -> Result<MultiPolygon<f64>, SpatialEngineError>;
}

impl Reproject for GeoEngine {
    fn reproject(
        &self,
        geometry: &MultiPolygon<f64>,
        from: Crs,
        to: Crs,
    ) -> Result<MultiPolygon<f64>, SpatialEngineError> {
        match (from, to) {
            (a, b) if a == b => Ok(geometry.clone()),
            (Crs::WGS84, Crs::WEB_MERCATOR) => Ok(geometry.map_coords(lonlat_to_mercator)),
            (Crs::WEB_MERCATOR, Crs::WGS84) => Ok(geometry.map_coords(mercator_to_lonlat)),
            (from, to) => Err(SpatialEngineError::Reprojection {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }
}

fn lonlat_to_mercator(c: Coord<f64>) -> Coord<f64> {
    let lat = c.y.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
    Coord {
        x: EARTH_RADIUS * c.x.to_radians(),
        y: EARTH_RADIUS * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln(),
    }
}

fn mercator_to_lonlat(c: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (c.x / EARTH_RADIUS).to_degrees(),
        y: (2.0 * (c.y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees(),
    }
}
