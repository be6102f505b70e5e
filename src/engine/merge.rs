//! Report merger.

use serde::Serialize;

use crate::types::{ChangeOrigin, ChangeRecord};

/// Ordered change report: identity-based entries first, then spatial entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Report {
    entries: Vec<ChangeRecord>,
    #[serde(skip)]
    by_id_len: usize,
}

impl Report {
    /// All entries in report order.
    pub fn entries(&self) -> &[ChangeRecord] {
        &self.entries
    }

    /// The identity-based half.
    pub fn by_id(&self) -> &[ChangeRecord] {
        &self.entries[..self.by_id_len]
    }

    /// The spatial half.
    pub fn spatial(&self) -> &[ChangeRecord] {
        &self.entries[self.by_id_len..]
    }

    /// Entries carrying a geometry (the ones a container export can write).
    pub fn with_geometry(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.entries.iter().filter(|c| c.has_geometry())
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> std::slice::Iter<'_, ChangeRecord> {
        self.entries.iter()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the report is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a ChangeRecord;
    type IntoIter = std::slice::Iter<'a, ChangeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Concatenate the two change streams: `by_id ++ spatial`.
///
/// No deduplication: a key may legitimately appear in both halves.
pub fn merge(by_id: Vec<ChangeRecord>, spatial: Vec<ChangeRecord>) -> Report {
    debug_assert!(by_id.iter().all(|c| c.origin == ChangeOrigin::ById));
    debug_assert!(spatial.iter().all(|c| c.origin == ChangeOrigin::Spatial));
    let by_id_len = by_id.len();
    let mut entries = by_id;
    entries.extend(spatial);
    Report { entries, by_id_len }
}
