//! CLI command implementations.

use std::path::{Path, PathBuf};

use crate::config::DetectorConfig;
use crate::engine::{spawn_detection, validate_layers, DetectionResult, Stage};
use crate::format::{load_layer, CsvReportWriter, DatasetFormat, GpkgReportWriter};
use crate::index::{DuplicateCheck, DuplicateValidator};
use crate::types::{DetectError, DetectResult, Layer};

/// Input datasets of a two-snapshot command.
pub struct DatasetPair<'a> {
    pub old: &'a Path,
    pub new: &'a Path,
    pub old_layer: Option<&'a str>,
    pub new_layer: Option<&'a str>,
}

impl DatasetPair<'_> {
    fn load(&self) -> DetectResult<(Layer, Layer)> {
        log::info!("[{:>3}%] {}", Stage::Load.percent(), Stage::Load);
        let old = load_layer(self.old, self.old_layer)?;
        let new = load_layer(self.new, self.new_layer)?;
        Ok((old, new))
    }
}

/// Run change detection and optionally export the report.
pub fn cmd_detect(
    inputs: &DatasetPair<'_>,
    config: &DetectorConfig,
    csv: Option<&Path>,
    gpkg: Option<&Path>,
    json: bool,
) -> DetectResult<()> {
    let (old, new) = inputs.load()?;
    let handle = spawn_detection(old, new, config.clone());
    for stage in handle.progress.iter() {
        log::info!("[{:>3}%] {}", stage.percent(), stage);
    }
    let result = handle.join()?;

    let csv_written = match csv {
        Some(path) => export_csv(&result, &with_extension(path, "csv"), config)?,
        None => None,
    };
    let gpkg_written = match gpkg {
        Some(path) => export_gpkg(&result, path, config)?,
        None => None,
    };

    if json {
        let out = serde_json::json!({
            "old": inputs.old.display().to_string(),
            "new": inputs.new.display().to_string(),
            "result": result,
            "exports": {
                "csv": csv_written.map(|(p, n)| serde_json::json!({"path": p.display().to_string(), "rows": n})),
                "gpkg": gpkg_written.map(|(p, n)| serde_json::json!({"path": p.display().to_string(), "features": n})),
            }
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print!("{}", result.summary.render(&result.analysed_at));
        if !result.notes.is_empty() {
            println!();
            println!("Notes:");
            for note in &result.notes {
                println!("  [{:?}] {}", note.level, note.message);
            }
        }
        if !result.report.is_empty() {
            println!();
            println!(
                "  {:<24} {:<18} {:<8} {:>14}  Notes",
                config.fields.key, "Status", "Type", "Area delta"
            );
            for change in &result.report {
                println!(
                    "  {:<24} {:<18} {:<8} {:>+14.4}  {}",
                    change.key.to_string(),
                    change.status.name(),
                    change.origin.name(),
                    change.area_delta,
                    change.notes()
                );
            }
        }
        if let Some((path, rows)) = csv_written {
            println!("Exported {} row(s) to {}", rows, path.display());
        }
        if let Some((path, features)) = gpkg_written {
            println!("Exported {} feature(s) to {}", features, path.display());
        }
    }
    Ok(())
}

/// Append `ext` when the path does not already carry it.
fn with_extension(path: &Path, ext: &str) -> PathBuf {
    let has_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false);
    if has_ext {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(ext);
        PathBuf::from(name)
    }
}

fn export_csv(
    result: &DetectionResult,
    path: &Path,
    config: &DetectorConfig,
) -> DetectResult<Option<(PathBuf, usize)>> {
    let writer = CsvReportWriter::from_config(config)?;
    match writer.write_to_file(result, path) {
        Ok(rows) => Ok(Some((path.to_path_buf(), rows))),
        Err(DetectError::EmptyReport) => {
            log::warn!("No change records; {} not written", path.display());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn export_gpkg(
    result: &DetectionResult,
    path: &Path,
    config: &DetectorConfig,
) -> DetectResult<Option<(PathBuf, usize)>> {
    let writer = GpkgReportWriter::default().with_null_text(config.export.null_text.clone());
    match writer.write_to_file(result, path) {
        Ok(features) => Ok(Some((path.to_path_buf(), features))),
        Err(DetectError::EmptyReport) => {
            log::warn!("No change records with geometry; {} not written", path.display());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Check schema preconditions and duplicates without classifying.
pub fn cmd_validate(inputs: &DatasetPair<'_>, config: &DetectorConfig, json: bool) -> DetectResult<()> {
    config.validate()?;
    let (old, new) = inputs.load()?;
    let violations = validate_layers(&old, &new, &config.fields);
    let duplicates = DuplicateValidator::new(&config.fields).check_layer(&new);

    if json {
        let (checked, keys) = match &duplicates {
            DuplicateCheck::Checked(flags) => (
                true,
                flags.keys().map(|k| k.to_string()).collect::<Vec<_>>(),
            ),
            DuplicateCheck::Skipped { .. } => (false, Vec::new()),
        };
        let out = serde_json::json!({
            "valid": violations.is_empty(),
            "violations": violations.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
            "duplicate_check": checked,
            "duplicates": keys,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        if violations.is_empty() {
            println!("Schema: OK");
        } else {
            println!("Schema: {} problem(s)", violations.len());
            for v in &violations {
                println!("  - {}", v);
            }
        }
        match &duplicates {
            DuplicateCheck::Checked(flags) if flags.is_empty() => println!("Duplicates: none"),
            DuplicateCheck::Checked(flags) => {
                println!("Duplicates: {} key(s)", flags.len());
                for group in flags.groups() {
                    let members: Vec<String> = group.members.iter().map(|k| k.to_string()).collect();
                    let group_key = group
                        .grouping_key
                        .as_ref()
                        .map(|k| k.to_string())
                        .unwrap_or_else(|| "NULL".to_string());
                    println!("  {} = {}: {}", config.fields.group, group_key, members.join(", "));
                }
            }
            DuplicateCheck::Skipped { missing_field } => {
                println!("Duplicates: skipped ('{}' not found)", missing_field)
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(DetectError::Schema(violations))
    }
}

/// Describe a dataset.
pub fn cmd_info(path: &Path, layer: Option<&str>, json: bool) -> DetectResult<()> {
    let data = load_layer(path, layer)?;
    let format = DatasetFormat::from_path(path)
        .map(|f| f.name())
        .unwrap_or("unknown");
    let with_geometry = data.features.iter().filter(|f| f.geometry.is_some()).count();

    if json {
        let info = serde_json::json!({
            "file": path.display().to_string(),
            "format": format,
            "layer": data.name,
            "crs": data.crs.to_string(),
            "geometry_type": data.geometry_type.name(),
            "features": data.feature_count(),
            "features_with_geometry": with_geometry,
            "fields": data.fields,
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("File: {}", path.display());
        println!("Format: {}", format);
        println!("Layer: {}", data.name);
        println!("CRS: {}", data.crs);
        println!("Geometry type: {}", data.geometry_type);
        println!("Features: {} ({} with geometry)", data.feature_count(), with_geometry);
        println!("Fields: {}", data.fields.join(", "));
    }
    Ok(())
}

/// Print the effective configuration.
pub fn cmd_config(config: &DetectorConfig, json: bool) -> DetectResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", config.to_toml()?);
    }
    Ok(())
}
