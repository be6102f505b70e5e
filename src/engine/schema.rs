//! Schema preconditions checked before any index is built.

use crate::config::FieldConfig;
use crate::types::{GeometryType, Layer, SchemaViolation};

/// Collect every failed precondition for an old/new layer pair.
///
/// An empty result means the run may proceed.
pub fn validate_layers(old: &Layer, new: &Layer, fields: &FieldConfig) -> Vec<SchemaViolation> {
    let mut violations = Vec::new();
    let datasets = [("old", old), ("new", new)];

    for (dataset, layer) in datasets {
        if !layer.crs.is_valid() {
            violations.push(SchemaViolation::InvalidCrs {
                dataset: dataset.to_string(),
            });
        }
    }

    if old.geometry_type != new.geometry_type {
        violations.push(SchemaViolation::GeometryTypeMismatch {
            old: old.geometry_type.to_string(),
            new: new.geometry_type.to_string(),
        });
    } else if old.geometry_type != GeometryType::Polygon {
        violations.push(SchemaViolation::NotPolygonal {
            dataset: "old".to_string(),
            found: old.geometry_type.to_string(),
        });
    }

    for field in [&fields.key, &fields.area] {
        for (dataset, layer) in datasets {
            if !layer.has_field(field) {
                violations.push(SchemaViolation::MissingField {
                    dataset: dataset.to_string(),
                    field: field.clone(),
                });
            }
        }
    }

    for (dataset, layer) in datasets {
        if layer.feature_count() == 0 {
            violations.push(SchemaViolation::EmptyLayer {
                dataset: dataset.to_string(),
            });
        }
    }

    violations
}
