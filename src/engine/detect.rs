//! The detection pipeline.
//!
//! `Load → Validate schema → Build indices → Duplicate check → Classify pairs →
//! Spatial diff → Merge → Render/Export`. Schema failures end the run with no
//! report; duplicate-check and spatial failures are degraded to advisories.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::DetectorConfig;
use crate::geometry::{GeoEngine, GeometryEngine, Reproject};
use crate::index::{DuplicateCheck, DuplicateFlagSet, DuplicateValidator, FeatureIndex, IndexStats};
use crate::types::{now_utc, ChangeStatus, Crs, DetectError, DetectResult, Layer};

use super::classify::PairwiseClassifier;
use super::merge::{merge, Report};
use super::schema::validate_layers;
use super::spatial::SpatialDiffer;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stage {
    Load,
    ValidateSchema,
    BuildIndices,
    DuplicateCheck,
    ClassifyPairs,
    SpatialDiff,
    Merge,
    Render,
}

impl Stage {
    /// Progress percentage reached when the stage starts.
    pub fn percent(&self) -> u8 {
        match self {
            Self::Load => 10,
            Self::ValidateSchema => 20,
            Self::BuildIndices => 30,
            Self::DuplicateCheck => 40,
            Self::ClassifyPairs => 50,
            Self::SpatialDiff => 70,
            Self::Merge => 80,
            Self::Render => 90,
        }
    }

    /// Return a human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::ValidateSchema => "validate schema",
            Self::BuildIndices => "build indices",
            Self::DuplicateCheck => "duplicate check",
            Self::ClassifyPairs => "classify pairs",
            Self::SpatialDiff => "spatial diff",
            Self::Merge => "merge",
            Self::Render => "render",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Severity of an advisory note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryLevel {
    Info,
    Warning,
}

/// A non-blocking message surfaced to the user alongside the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub level: AdvisoryLevel,
    pub message: String,
}

impl Advisory {
    /// An informational note (also logged).
    pub fn info(message: impl Into<String>) -> Self {
        let message = message.into();
        log::info!("{}", message);
        Self {
            level: AdvisoryLevel::Info,
            message,
        }
    }

    /// A warning (also logged).
    pub fn warning(message: impl Into<String>) -> Self {
        let message = message.into();
        log::warn!("{}", message);
        Self {
            level: AdvisoryLevel::Warning,
            message,
        }
    }
}

/// Headline counts of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionSummary {
    /// Distinct keys in the old dataset.
    pub total_old: usize,
    /// Distinct keys in the new dataset.
    pub total_new: usize,
    /// DIUBAH records with a boundary change.
    pub boundary_changed: usize,
    /// DIUBAH records with a code change.
    pub code_changed: usize,
    /// DITAMBAHKAN records.
    pub added: usize,
    /// DIHAPUS records.
    pub removed: usize,
    /// All identity-based records.
    pub by_id_total: usize,
    /// All spatial records.
    pub spatial_total: usize,
    /// Sum of spatial record areas.
    pub spatial_area: f64,
    /// Length of the merged report.
    pub merged_total: usize,
    /// Keys flagged by the duplicate check.
    pub duplicates: usize,
}

impl DetectionSummary {
    fn from_report(old: &FeatureIndex, new: &FeatureIndex, report: &Report, dups: usize) -> Self {
        let by_id = report.by_id();
        let count = |status: ChangeStatus| by_id.iter().filter(|c| c.status == status).count();
        Self {
            total_old: old.len(),
            total_new: new.len(),
            boundary_changed: by_id
                .iter()
                .filter(|c| c.status == ChangeStatus::Diubah && c.boundary_changed)
                .count(),
            code_changed: by_id
                .iter()
                .filter(|c| c.status == ChangeStatus::Diubah && c.code_changed)
                .count(),
            added: count(ChangeStatus::Ditambahkan),
            removed: count(ChangeStatus::Dihapus),
            by_id_total: by_id.len(),
            spatial_total: report.spatial().len(),
            spatial_area: report.spatial().iter().filter_map(|c| c.spatial_area).sum(),
            merged_total: report.len(),
            duplicates: dups,
        }
    }

    /// Render the summary as plain text.
    pub fn render(&self, analysed_at: &DateTime<Utc>) -> String {
        let mut out = String::new();
        out.push_str("CHANGE SUMMARY (by key)\n");
        out.push_str(&format!("  Features in old dataset: {}\n", self.total_old));
        out.push_str(&format!("  Features in new dataset: {}\n", self.total_new));
        out.push_str(&format!("  Boundary changed: {}\n", self.boundary_changed));
        out.push_str(&format!("  Code changed: {}\n", self.code_changed));
        out.push_str(&format!("  Added: {}\n", self.added));
        out.push_str(&format!("  Removed: {}\n", self.removed));
        out.push_str(&format!("  Total changed (by key): {}\n", self.by_id_total));
        out.push_str("SPATIAL SUMMARY\n");
        out.push_str(&format!(
            "  Symmetric-difference records: {} (area {:.4})\n",
            self.spatial_total, self.spatial_area
        ));
        out.push_str(&format!("MERGED REPORT: {} entries\n", self.merged_total));
        if self.duplicates > 0 {
            out.push_str(&format!(
                "DUPLICATES IN NEW DATASET: {} key(s)\n",
                self.duplicates
            ));
        }
        out.push_str(&format!(
            "Analysed at: {}\n",
            analysed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out
    }
}

/// Immutable outcome of one detection run.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    /// Merged change report.
    pub report: Report,
    /// Keys of the new dataset flagged as likely-incomplete duplicates.
    pub duplicates: DuplicateFlagSet,
    /// Headline counts.
    pub summary: DetectionSummary,
    /// Advisory notes collected during the run.
    pub notes: Vec<Advisory>,
    /// Old index build statistics.
    pub old_stats: IndexStats,
    /// New index build statistics.
    pub new_stats: IndexStats,
    /// Frame of the spatial results (the old dataset's CRS).
    pub crs: Crs,
    /// When the run finished.
    pub analysed_at: DateTime<Utc>,
}

impl DetectionResult {
    /// Whether any advisory is a warning.
    pub fn has_warnings(&self) -> bool {
        self.notes.iter().any(|n| n.level == AdvisoryLevel::Warning)
    }
}

/// Runs the detection pipeline with a given geometry engine.
pub struct DetectionEngine<E = GeoEngine> {
    config: DetectorConfig,
    geometry: E,
}

impl DetectionEngine<GeoEngine> {
    /// Create an engine using the default `geo`-backed geometry engine.
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            geometry: GeoEngine::new(),
        }
    }
}

impl<E: GeometryEngine + Reproject> DetectionEngine<E> {
    /// Create an engine with a custom geometry engine.
    pub fn with_geometry(config: DetectorConfig, geometry: E) -> Self {
        Self { config, geometry }
    }

    /// The configuration in use.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Run the pipeline on two loaded layers.
    pub fn run(&self, old: &Layer, new: &Layer) -> DetectResult<DetectionResult> {
        self.run_with_progress(old, new, |_| {})
    }

    /// Run the pipeline, reporting each stage as it starts.
    pub fn run_with_progress(
        &self,
        old: &Layer,
        new: &Layer,
        mut on_stage: impl FnMut(Stage),
    ) -> DetectResult<DetectionResult> {
        let fields = &self.config.fields;
        let mut notes = Vec::new();

        on_stage(Stage::ValidateSchema);
        self.config.validate()?;
        let violations = validate_layers(old, new, fields);
        if !violations.is_empty() {
            return Err(DetectError::Schema(violations));
        }

        on_stage(Stage::BuildIndices);
        let old_index = FeatureIndex::build(old, fields);
        let new_index = FeatureIndex::build(new, fields);
        for (dataset, stats) in [("old", old_index.stats()), ("new", new_index.stats())] {
            if stats.overwritten_keys > 0 {
                notes.push(Advisory::warning(format!(
                    "{} dataset: {} feature(s) repeat an earlier '{}'; the last one is used",
                    dataset, stats.overwritten_keys, fields.key
                )));
            }
            if stats.null_keys > 0 {
                notes.push(Advisory::warning(format!(
                    "{} dataset: {} feature(s) without '{}' were skipped",
                    dataset, stats.null_keys, fields.key
                )));
            }
            if stats.bad_areas > 0 {
                notes.push(Advisory::warning(format!(
                    "{} dataset: {} unreadable '{}' value(s) treated as 0.0",
                    dataset, stats.bad_areas, fields.area
                )));
            }
        }

        on_stage(Stage::DuplicateCheck);
        let duplicates = match DuplicateValidator::new(fields).check_layer(new) {
            DuplicateCheck::Checked(flags) => {
                if !flags.is_empty() {
                    let examples: Vec<String> =
                        flags.keys().take(5).map(|k| k.to_string()).collect();
                    notes.push(Advisory::warning(format!(
                        "{} duplicate '{}' value(s) in new dataset (same '{}' with a blank '{}'), e.g. {}",
                        flags.len(),
                        fields.key,
                        fields.group,
                        fields.code,
                        examples.join(", ")
                    )));
                }
                flags
            }
            DuplicateCheck::Skipped { missing_field } => {
                notes.push(Advisory::info(format!(
                    "Field '{}' not found in new dataset; duplicate check skipped",
                    missing_field
                )));
                DuplicateFlagSet::new()
            }
        };

        on_stage(Stage::ClassifyPairs);
        let classifier = PairwiseClassifier::new(&self.geometry, &self.config.thresholds);
        let by_id = classifier.classify(&old_index, &new_index);
        log::info!("Identity pass: {} change record(s)", by_id.len());

        on_stage(Stage::SpatialDiff);
        let spatial = if self.config.spatial.enabled {
            let differ = SpatialDiffer::new(&self.geometry, &self.config.spatial, &fields.key);
            match differ.diff(old, new) {
                Ok(outcome) => {
                    if outcome.reprojected {
                        notes.push(Advisory::info(format!(
                            "CRS differs; new dataset reprojected from {} to {}",
                            new.crs, old.crs
                        )));
                    }
                    if outcome.changes.is_empty() {
                        notes.push(Advisory::info("No spatial boundary changes detected"));
                    }
                    outcome.changes
                }
                Err(e) => {
                    notes.push(Advisory::warning(format!(
                        "Spatial analysis skipped: {}",
                        e
                    )));
                    Vec::new()
                }
            }
        } else {
            notes.push(Advisory::info("Spatial analysis disabled"));
            Vec::new()
        };

        on_stage(Stage::Merge);
        let report = merge(by_id, spatial);
        let summary = DetectionSummary::from_report(&old_index, &new_index, &report, duplicates.len());

        Ok(DetectionResult {
            report,
            duplicates,
            summary,
            notes,
            old_stats: old_index.stats(),
            new_stats: new_index.stats(),
            crs: old.crs,
            analysed_at: now_utc(),
        })
    }
}

/// Run a detection with the default geometry engine.
pub fn detect(old: &Layer, new: &Layer, config: &DetectorConfig) -> DetectResult<DetectionResult> {
    DetectionEngine::new(config.clone()).run(old, new)
}
