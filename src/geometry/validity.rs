//! Polygon validity check.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, Line, LineString, MultiPolygon, Polygon};

/// Whether every polygon has closed, simple rings and a non-zero area.
///
/// Repeated consecutive vertices are tolerated.
pub fn is_valid_multipolygon(geometry: &MultiPolygon<f64>) -> bool {
    !geometry.0.is_empty() && geometry.0.iter().all(is_valid_polygon)
}

fn is_valid_polygon(polygon: &Polygon<f64>) -> bool {
    if polygon.unsigned_area() <= 0.0 {
        return false;
    }
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .all(is_simple_ring)
}

fn is_simple_ring(ring: &LineString<f64>) -> bool {
    let coords = &ring.0;
    if coords.len() < 4 || coords.first() != coords.last() {
        return false;
    }
    if coords.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return false;
    }

    let segments: Vec<Line<f64>> = ring.lines().filter(|l| l.start != l.end).collect();
    let n = segments.len();
    if n < 3 {
        return false;
    }

    // Sweep over segments sorted by their left edge.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| min_x(&segments[a]).total_cmp(&min_x(&segments[b])));

    for (pos, &i) in order.iter().enumerate() {
        let right = max_x(&segments[i]);
        for &j in &order[pos + 1..] {
            if min_x(&segments[j]) > right {
                break;
            }
            let (lo, hi) = if i < j { (i, j) } else { (j, i) };
            let adjacent = hi == lo + 1 || (lo == 0 && hi == n - 1);
            match line_intersection(segments[lo], segments[hi]) {
                None => {}
                Some(LineIntersection::Collinear { .. }) => return false,
                Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
                Some(LineIntersection::SinglePoint { .. }) => return false,
            }
        }
    }
    true
}

fn min_x(line: &Line<f64>) -> f64 {
    line.start.x.min(line.end.x)
}

fn max_x(line: &Line<f64>) -> f64 {
    line.start.x.max(line.end.x)
}
