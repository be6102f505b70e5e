//! Index structures built once per detection run.

pub mod duplicates;
pub mod feature_index;

pub use duplicates::{DuplicateCheck, DuplicateFlagSet, DuplicateGroup, DuplicateValidator};
pub use feature_index::{extract_records, ExtractedRecords, FeatureIndex, IndexStats};
