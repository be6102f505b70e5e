//! Geometry capability surface used by the detector.
//!
//! The detector only talks to the [`GeometryEngine`] and [`Reproject`] traits;
//! [`GeoEngine`] is the default implementation on top of the `geo` crate.

pub mod engine;
pub mod reproject;
pub mod validity;

pub use engine::{GeoEngine, GeometryEngine};
pub use reproject::{Reproject, EARTH_RADIUS};
pub use validity::is_valid_multipolygon;
