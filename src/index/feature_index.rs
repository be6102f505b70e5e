//! Feature index: maps each primary key to its record.

use std::collections::btree_map::{self, BTreeMap};

use serde::Serialize;

use crate::config::FieldConfig;
use crate::types::{FeatureKey, Layer, Record};

/// Counters collected while building an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Features read from the layer.
    pub features_read: usize,
    /// Features skipped because their key was null.
    pub null_keys: usize,
    /// Features whose area could not be parsed (treated as 0.0).
    pub bad_areas: usize,
    /// Features that replaced an earlier record with the same key.
    pub overwritten_keys: usize,
}

/// Maps each primary key to the record that carries it. Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct FeatureIndex {
    records: BTreeMap<FeatureKey, Record>,
    stats: IndexStats,
}

impl FeatureIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from every feature of a layer.
    ///
    /// A later feature with the same key replaces the earlier one.
    pub fn build(layer: &Layer, fields: &FieldConfig) -> Self {
        let records = extract_records(layer, fields);
        let mut index = Self::from_records(records.records);
        index.stats.features_read = layer.feature_count();
        index.stats.null_keys = records.null_keys;
        index.stats.bad_areas = records.bad_areas;

        if index.stats.overwritten_keys > 0 {
            log::warn!(
                "{}: {} feature(s) share a primary key with an earlier feature; last one kept",
                layer.name,
                index.stats.overwritten_keys
            );
        }
        if index.stats.null_keys > 0 {
            log::warn!(
                "{}: {} feature(s) without '{}' skipped",
                layer.name,
                index.stats.null_keys,
                fields.key
            );
        }
        index
    }

    /// Build an index directly from records (last write wins).
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.stats.features_read += 1;
            if index.records.insert(record.key.clone(), record).is_some() {
                index.stats.overwritten_keys += 1;
            }
        }
        index
    }

    /// Get a record by key.
    pub fn get(&self, key: &FeatureKey) -> Option<&Record> {
        self.records.get(key)
    }

    /// Whether the index contains a key.
    pub fn contains(&self, key: &FeatureKey) -> bool {
        self.records.contains_key(key)
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> btree_map::Keys<'_, FeatureKey, Record> {
        self.records.keys()
    }

    /// Records in ascending key order.
    pub fn iter(&self) -> btree_map::Iter<'_, FeatureKey, Record> {
        self.records.iter()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Build statistics.
    pub fn stats(&self) -> IndexStats {
        self.stats
    }
}

/// Records extracted from a layer, before indexing.
pub struct ExtractedRecords {
    /// Every feature with a non-null key, in layer order.
    pub records: Vec<Record>,
    /// Features skipped for a null key.
    pub null_keys: usize,
    /// Features whose area could not be parsed.
    pub bad_areas: usize,
}

/// Extract one record per feature with a non-null key.
///
/// Missing area reads as 0.0; a code field absent from the schema reads as `None`.
pub fn extract_records(layer: &Layer, fields: &FieldConfig) -> ExtractedRecords {
    let has_code = layer.has_field(&fields.code);
    let has_group = layer.has_field(&fields.group);
    let mut records = Vec::with_capacity(layer.feature_count());
    let mut null_keys = 0;
    let mut bad_areas = 0;

    for feature in &layer.features {
        let key = match FeatureKey::from_attr(feature.get(&fields.key)) {
            Some(key) => key,
            None => {
                null_keys += 1;
                continue;
            }
        };

        let raw_area = feature.get(&fields.area);
        let area = match raw_area.as_f64() {
            Some(area) if area.is_finite() => area,
            _ => {
                if !raw_area.is_null() {
                    bad_areas += 1;
                    log::warn!(
                        "{}: unreadable '{}' for {} ({:?}); using 0.0",
                        layer.name,
                        fields.area,
                        key,
                        raw_area
                    );
                }
                0.0
            }
        };

        let secondary_code = if has_code {
            feature.get(&fields.code).as_code()
        } else {
            None
        };
        let grouping_key = if has_group {
            FeatureKey::from_attr(feature.get(&fields.group))
        } else {
            None
        };

        records.push(Record {
            fid: feature.fid,
            key,
            geometry: feature.geometry.clone(),
            area,
            secondary_code,
            grouping_key,
            attributes: feature.attributes.clone(),
        });
    }

    ExtractedRecords {
        records,
        null_keys,
        bad_areas,
    }
}
