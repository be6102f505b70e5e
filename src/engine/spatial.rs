//! Spatial differ: the geometry-only pass.
//!
//! Computes the feature-wise symmetric difference between the two polygon
//! sets, independent of key matching, then joins every resulting region back
//! to the new dataset with an intersects predicate to recover a key.

use geo::{BoundingRect, MultiPolygon, Rect};

use crate::config::SpatialConfig;
use crate::geometry::engine::rects_overlap;
use crate::geometry::{GeometryEngine, Reproject};
use crate::types::{
    ChangeOrigin, ChangeRecord, ChangeStatus, Crs, FeatureKey, Layer, SpatialEngineError,
    SpatialSide,
};

/// A region present in exactly one of the two datasets.
#[derive(Debug, Clone)]
pub struct DifferencePiece {
    /// 1-based position of the piece in the overlay output.
    pub ordinal: usize,
    /// Which dataset the region belongs to.
    pub side: SpatialSide,
    /// The region itself.
    pub geometry: MultiPolygon<f64>,
    /// Its area.
    pub area: f64,
}

/// Result of a successful spatial pass.
#[derive(Debug, Clone, Default)]
pub struct SpatialDiffOutcome {
    /// One change record per (piece, matching new feature) pair.
    pub changes: Vec<ChangeRecord>,
    /// Number of overlay pieces before the join.
    pub pieces: usize,
    /// Pieces that matched no new feature and received a placeholder key.
    pub unmatched: usize,
    /// Whether the new dataset was reprojected into the old frame.
    pub reprojected: bool,
}

impl SpatialDiffOutcome {
    /// Sum of `spatial_area` over all change records.
    pub fn total_area(&self) -> f64 {
        self.changes.iter().filter_map(|c| c.spatial_area).sum()
    }
}

/// A keyed polygon of the new dataset, ready for the join.
struct JoinTarget {
    key: FeatureKey,
    fid: i64,
    geometry: MultiPolygon<f64>,
    bbox: Option<Rect<f64>>,
}

/// Runs the overlay and the join.
pub struct SpatialDiffer<'a, E: GeometryEngine + Reproject + ?Sized> {
    engine: &'a E,
    config: &'a SpatialConfig,
    key_field: &'a str,
}

impl<'a, E: GeometryEngine + Reproject + ?Sized> SpatialDiffer<'a, E> {
    /// Create a differ. `key_field` names the primary key in the new layer.
    pub fn new(engine: &'a E, config: &'a SpatialConfig, key_field: &'a str) -> Self {
        Self {
            engine,
            config,
            key_field,
        }
    }

    /// Diff two full layers. The result is expressed in the old layer's frame.
    pub fn diff(&self, old: &Layer, new: &Layer) -> Result<SpatialDiffOutcome, SpatialEngineError> {
        let reprojected = old.crs != new.crs;
        if reprojected {
            log::info!("CRS differs ({} vs {}); reprojecting new layer", old.crs, new.crs);
        }
        let new_geometries = self.geometries_in_frame(new, new.crs, old.crs)?;
        let old_geometries = self.geometries_in_frame(old, old.crs, old.crs)?;

        let pieces = self.symmetric_difference(&old_geometries, &new_geometries)?;
        let targets = self.join_targets(new, &new_geometries);

        let mut outcome = SpatialDiffOutcome {
            pieces: pieces.len(),
            reprojected,
            ..Default::default()
        };

        for piece in &pieces {
            let matches = self.join(piece, &targets);
            if matches.is_empty() {
                outcome.unmatched += 1;
                let key = FeatureKey::Text(format!(
                    "{}{}",
                    self.config.placeholder_prefix, piece.ordinal
                ));
                outcome.changes.push(spatial_change(key, piece));
            } else {
                for key in matches {
                    outcome.changes.push(spatial_change(key, piece));
                }
            }
        }

        log::info!(
            "Spatial pass: {} region(s), {} change record(s), total area {:.4}",
            outcome.pieces,
            outcome.changes.len(),
            outcome.total_area()
        );
        Ok(outcome)
    }

    /// Every geometry of a layer in the target frame, paired with its feature position.
    fn geometries_in_frame(
        &self,
        layer: &Layer,
        from: Crs,
        to: Crs,
    ) -> Result<Vec<(usize, MultiPolygon<f64>)>, SpatialEngineError> {
        layer
            .features
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.geometry.as_ref().map(|g| (i, g)))
            .map(|(i, g)| Ok((i, self.engine.reproject(g, from, to)?)))
            .collect()
    }

    /// New-minus-old pieces followed by old-minus-new pieces, empty ones dropped.
    pub fn symmetric_difference(
        &self,
        old: &[(usize, MultiPolygon<f64>)],
        new: &[(usize, MultiPolygon<f64>)],
    ) -> Result<Vec<DifferencePiece>, SpatialEngineError> {
        let old_refs: Vec<&MultiPolygon<f64>> = old.iter().map(|(_, g)| g).collect();
        let new_refs: Vec<&MultiPolygon<f64>> = new.iter().map(|(_, g)| g).collect();
        let old_union = self.engine.union_all(&old_refs)?;
        let new_union = self.engine.union_all(&new_refs)?;

        let mut pieces = Vec::new();
        let sides = [
            (SpatialSide::Added, &new_refs, &old_union),
            (SpatialSide::Removed, &old_refs, &new_union),
        ];
        for (side, sources, overlay) in sides {
            for source in sources.iter() {
                let geometry = self.engine.difference(source, overlay)?;
                let area = self.engine.area(&geometry);
                if geometry.0.is_empty() || area <= 0.0 {
                    continue;
                }
                pieces.push(DifferencePiece {
                    ordinal: pieces.len() + 1,
                    side,
                    geometry,
                    area,
                });
            }
        }
        Ok(pieces)
    }

    fn join_targets(
        &self,
        new: &Layer,
        geometries: &[(usize, MultiPolygon<f64>)],
    ) -> Vec<JoinTarget> {
        let mut targets: Vec<JoinTarget> = geometries
            .iter()
            .filter_map(|(i, geometry)| {
                let feature = &new.features[*i];
                FeatureKey::from_attr(feature.get(self.key_field)).map(|key| JoinTarget {
                    key,
                    fid: feature.fid,
                    bbox: geometry.bounding_rect(),
                    geometry: geometry.clone(),
                })
            })
            .collect();
        targets.sort_by(|a, b| a.key.cmp(&b.key).then(a.fid.cmp(&b.fid)));
        targets
    }

    /// Keys of every new feature the piece intersects (one-to-many).
    fn join(&self, piece: &DifferencePiece, targets: &[JoinTarget]) -> Vec<FeatureKey> {
        let bbox = piece.geometry.bounding_rect();
        targets
            .iter()
            .filter(|t| rects_overlap(&bbox, &t.bbox))
            .filter(|t| self.engine.intersects(&piece.geometry, &t.geometry))
            .map(|t| t.key.clone())
            .collect()
    }
}

fn spatial_change(key: FeatureKey, piece: &DifferencePiece) -> ChangeRecord {
    ChangeRecord {
        key,
        status: ChangeStatus::PerubahanSpasial,
        boundary_changed: true,
        geometry_changed: true,
        area_changed: false,
        area_old: 0.0,
        area_new: piece.area,
        area_delta: piece.area,
        code_old: None,
        code_new: None,
        code_changed: false,
        origin: ChangeOrigin::Spatial,
        spatial_side: Some(piece.side),
        geometry: Some(piece.geometry.clone()),
        spatial_area: Some(piece.area),
    }
}
