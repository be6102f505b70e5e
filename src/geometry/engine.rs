//! Overlay, predicates and measures.

use std::panic::{catch_unwind, AssertUnwindSafe};

use geo::{Area, BooleanOps, BoundingRect, HausdorffDistance, Intersects, MultiPolygon, Rect};

use crate::types::SpatialEngineError;

use super::validity::is_valid_multipolygon;

/// Geometry operations the detector needs from a geometry engine.
pub trait GeometryEngine {
    /// Whether two geometries are equal within a linear tolerance.
    fn equals_with_tolerance(
        &self,
        a: &MultiPolygon<f64>,
        b: &MultiPolygon<f64>,
        tolerance: f64,
    ) -> bool;

    /// Planar area.
    fn area(&self, geometry: &MultiPolygon<f64>) -> f64;

    /// Validity check (closed, simple rings with non-zero area).
    fn is_valid(&self, geometry: &MultiPolygon<f64>) -> bool;

    /// Union of a set of polygons.
    fn union_all(&self, geometries: &[&MultiPolygon<f64>])
        -> Result<MultiPolygon<f64>, SpatialEngineError>;

    /// `a` minus `b`.
    fn difference(
        &self,
        a: &MultiPolygon<f64>,
        b: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, SpatialEngineError>;

    /// Intersects predicate.
    fn intersects(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool;

    /// Region belonging to exactly one of `a` and `b`.
    fn symmetric_difference(
        &self,
        a: &MultiPolygon<f64>,
        b: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, SpatialEngineError> {
        let only_a = self.difference(a, b)?;
        let only_b = self.difference(b, a)?;
        self.union_all(&[&only_a, &only_b])
    }
}

/// Default geometry engine backed by the `geo` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoEngine;

impl GeoEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self
    }
}

/// Run an overlay, converting a panic inside `geo` into an engine error.
fn guarded<F>(op: &str, f: F) -> Result<MultiPolygon<f64>, SpatialEngineError>
where
    F: FnOnce() -> MultiPolygon<f64>,
{
    catch_unwind(AssertUnwindSafe(f))
        .map_err(|_| SpatialEngineError::Overlay(format!("{} panicked inside geometry engine", op)))
}

/// Bounding rectangles of two geometries overlap (touching counts).
pub(crate) fn rects_overlap(a: &Option<Rect<f64>>, b: &Option<Rect<f64>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            a.min().x <= b.max().x
                && b.min().x <= a.max().x
                && a.min().y <= b.max().y
                && b.min().y <= a.max().y
        }
        _ => false,
    }
}

impl GeometryEngine for GeoEngine {
    fn equals_with_tolerance(
        &self,
        a: &MultiPolygon<f64>,
        b: &MultiPolygon<f64>,
        tolerance: f64,
    ) -> bool {
        match (a.0.is_empty(), b.0.is_empty()) {
            (true, true) => true,
            (false, false) => a.hausdorff_distance(b) <= tolerance,
            _ => false,
        }
    }

    fn area(&self, geometry: &MultiPolygon<f64>) -> f64 {
        geometry.unsigned_area()
    }

    fn is_valid(&self, geometry: &MultiPolygon<f64>) -> bool {
        is_valid_multipolygon(geometry)
    }

    fn union_all(
        &self,
        geometries: &[&MultiPolygon<f64>],
    ) -> Result<MultiPolygon<f64>, SpatialEngineError> {
        // Pairwise reduction keeps operands balanced in size.
        let mut layer: Vec<MultiPolygon<f64>> = geometries
            .iter()
            .filter(|g| !g.0.is_empty())
            .map(|g| (*g).clone())
            .collect();
        if layer.is_empty() {
            return Ok(MultiPolygon::new(Vec::new()));
        }
        while layer.len() > 1 {
            let mut next = Vec::with_capacity(layer.len() / 2 + 1);
            let mut iter = layer.into_iter();
            while let Some(first) = iter.next() {
                match iter.next() {
                    Some(second) => next.push(guarded("union", || first.union(&second))?),
                    None => next.push(first),
                }
            }
            layer = next;
        }
        Ok(layer.pop().unwrap_or_else(|| MultiPolygon::new(Vec::new())))
    }

    fn difference(
        &self,
        a: &MultiPolygon<f64>,
        b: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, SpatialEngineError> {
        if a.0.is_empty() || b.0.is_empty() || !rects_overlap(&a.bounding_rect(), &b.bounding_rect())
        {
            return Ok(a.clone());
        }
        guarded("difference", || a.difference(b))
    }

    fn intersects(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
        rects_overlap(&a.bounding_rect(), &b.bounding_rect()) && a.intersects(b)
    }
}
