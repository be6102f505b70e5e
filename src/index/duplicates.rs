//! Duplicate/anomaly validator for the new dataset.
//!
//! Flags primary keys that share a grouping key with another feature when at
//! least one member of that group has a missing or blank secondary code. The
//! result is advisory only: flagged keys stay in the classification.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::FieldConfig;
use crate::types::{FeatureKey, Layer, Record};

use super::extract_records;

/// One group of features sharing a grouping key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// The shared grouping key (`None` when the grouping value itself is null).
    pub grouping_key: Option<FeatureKey>,
    /// Primary keys of every member, in layer order.
    pub members: Vec<FeatureKey>,
}

/// Keys of the new dataset identified as likely-incomplete duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateFlagSet {
    keys: BTreeSet<FeatureKey>,
    groups: Vec<DuplicateGroup>,
}

impl DuplicateFlagSet {
    /// Create an empty flag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a key is flagged.
    pub fn contains(&self, key: &FeatureKey) -> bool {
        self.keys.contains(key)
    }

    /// Flagged keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &FeatureKey> {
        self.keys.iter()
    }

    /// The offending groups.
    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    /// Number of distinct flagged keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether nothing was flagged.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn add_group(&mut self, group: DuplicateGroup) {
        self.keys.extend(group.members.iter().cloned());
        self.groups.push(group);
    }
}

/// Outcome of the duplicate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateCheck {
    /// The check ran.
    Checked(DuplicateFlagSet),
    /// The grouping or code field is missing; the check did not run.
    Skipped { missing_field: String },
}

impl DuplicateCheck {
    /// The flag set, empty when the check was skipped.
    pub fn into_flags(self) -> DuplicateFlagSet {
        match self {
            Self::Checked(flags) => flags,
            Self::Skipped { .. } => DuplicateFlagSet::new(),
        }
    }
}

/// Detects placeholder/incomplete entries in the new dataset.
pub struct DuplicateValidator<'a> {
    fields: &'a FieldConfig,
}

impl<'a> DuplicateValidator<'a> {
    /// Create a validator reading the given fields.
    pub fn new(fields: &'a FieldConfig) -> Self {
        Self { fields }
    }

    /// Run the check over every feature of a layer (not over the deduplicated index).
    pub fn check_layer(&self, layer: &Layer) -> DuplicateCheck {
        for field in [&self.fields.group, &self.fields.code] {
            if !layer.has_field(field) {
                log::info!(
                    "{}: field '{}' not present, duplicate check skipped",
                    layer.name,
                    field
                );
                return DuplicateCheck::Skipped {
                    missing_field: field.clone(),
                };
            }
        }
        let records = extract_records(layer, self.fields).records;
        DuplicateCheck::Checked(self.check_records(&records))
    }

    /// Run the check over already-extracted records.
    pub fn check_records(&self, records: &[Record]) -> DuplicateFlagSet {
        let mut groups: BTreeMap<Option<FeatureKey>, Vec<&Record>> = BTreeMap::new();
        for record in records {
            groups
                .entry(record.grouping_key.clone())
                .or_default()
                .push(record);
        }

        let mut flags = DuplicateFlagSet::new();
        for (grouping_key, members) in groups {
            if members.len() < 2 || !members.iter().any(|r| r.code_is_blank()) {
                continue;
            }
            flags.add_group(DuplicateGroup {
                grouping_key,
                members: members.iter().map(|r| r.key.clone()).collect(),
            });
        }

        if !flags.is_empty() {
            log::warn!(
                "{} key(s) in {} group(s) share a grouping key with a blank code",
                flags.len(),
                flags.groups().len()
            );
        }
        flags
    }
}
