//! Pairwise change classifier: the identity-based pass.

use geo::MultiPolygon;

use crate::config::ThresholdConfig;
use crate::geometry::GeometryEngine;
use crate::index::FeatureIndex;
use crate::types::{ChangeOrigin, ChangeRecord, ChangeStatus, FeatureKey, Record};

/// Compares two feature indices key by key.
pub struct PairwiseClassifier<'a, E: GeometryEngine + ?Sized> {
    engine: &'a E,
    thresholds: &'a ThresholdConfig,
}

impl<'a, E: GeometryEngine + ?Sized> PairwiseClassifier<'a, E> {
    /// Create a classifier using the given engine and tolerances.
    pub fn new(engine: &'a E, thresholds: &'a ThresholdConfig) -> Self {
        Self { engine, thresholds }
    }

    /// Classify every key of both indices.
    ///
    /// Output order: changed pairs, then additions, then removals, each in
    /// ascending key order. Unchanged pairs are not emitted.
    pub fn classify(&self, old: &FeatureIndex, new: &FeatureIndex) -> Vec<ChangeRecord> {
        let mut changes = Vec::new();

        for (key, old_record) in old.iter() {
            if let Some(new_record) = new.get(key) {
                if let Some(change) = self.compare_pair(old_record, new_record) {
                    changes.push(change);
                }
            }
        }

        for (key, new_record) in new.iter() {
            if !old.contains(key) {
                changes.push(added(new_record));
            }
        }

        for (key, old_record) in old.iter() {
            if !new.contains(key) {
                changes.push(removed(old_record));
            }
        }

        changes
    }

    /// Compare the two records of one key. Returns `None` when nothing changed.
    pub fn compare_pair(&self, old: &Record, new: &Record) -> Option<ChangeRecord> {
        let geometry_changed =
            self.geometry_changed(&old.key, old.geometry.as_ref(), new.geometry.as_ref());
        let area_delta = old.area - new.area;
        let area_changed = area_delta.abs() > self.thresholds.area_threshold;
        let boundary_changed = geometry_changed || area_changed;
        let code_changed = old.secondary_code != new.secondary_code;

        if !(boundary_changed || code_changed || area_delta.abs() > self.thresholds.area_epsilon) {
            return None;
        }

        Some(ChangeRecord {
            key: new.key.clone(),
            status: ChangeStatus::Diubah,
            boundary_changed,
            geometry_changed,
            area_changed,
            area_old: old.area,
            area_new: new.area,
            area_delta,
            code_old: old.secondary_code.clone(),
            code_new: new.secondary_code.clone(),
            code_changed,
            origin: ChangeOrigin::ById,
            spatial_side: None,
            geometry: new.geometry.clone(),
            spatial_area: None,
        })
    }

    /// Geometry inequality beyond tolerance. Missing or invalid geometry counts as changed.
    fn geometry_changed(
        &self,
        key: &FeatureKey,
        old: Option<&MultiPolygon<f64>>,
        new: Option<&MultiPolygon<f64>>,
    ) -> bool {
        match (old, new) {
            (None, None) => false,
            (Some(_), None) | (None, Some(_)) => true,
            (Some(a), Some(b)) => {
                if !self.engine.is_valid(a) || !self.engine.is_valid(b) {
                    log::warn!("Invalid geometry for {}; treating boundary as changed", key);
                    return true;
                }
                !self
                    .engine
                    .equals_with_tolerance(a, b, self.thresholds.geometry_tolerance)
            }
        }
    }
}

fn added(new: &Record) -> ChangeRecord {
    ChangeRecord {
        key: new.key.clone(),
        status: ChangeStatus::Ditambahkan,
        boundary_changed: false,
        geometry_changed: false,
        area_changed: false,
        area_old: 0.0,
        area_new: new.area,
        area_delta: -new.area,
        code_old: None,
        code_new: new.secondary_code.clone(),
        code_changed: false,
        origin: ChangeOrigin::ById,
        spatial_side: None,
        geometry: new.geometry.clone(),
        spatial_area: None,
    }
}

fn removed(old: &Record) -> ChangeRecord {
    ChangeRecord {
        key: old.key.clone(),
        status: ChangeStatus::Dihapus,
        boundary_changed: false,
        geometry_changed: false,
        area_changed: false,
        area_old: old.area,
        area_new: 0.0,
        area_delta: old.area,
        code_old: old.secondary_code.clone(),
        code_new: None,
        code_changed: false,
        origin: ChangeOrigin::ById,
        spatial_side: None,
        geometry: None,
        spatial_area: None,
    }
}
