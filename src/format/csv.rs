//! Delimited (CSV) export of the merged report.

use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::DetectorConfig;
use crate::engine::DetectionResult;
use crate::types::{ChangeOrigin, ChangeRecord, DetectError, DetectResult, NULL_TEXT};

/// Column headers, in output order.
pub const CSV_HEADERS: [&str; 13] = [
    "idsubsls",
    "Status",
    "Tipe_Perubahan",
    "Perubahan_Batas_SLS",
    "Luas_Lama",
    "Luas_Baru",
    "Selisih_Luas",
    "Luas_Perubahan_Spasial",
    "kdsubsls_Lama",
    "kdsubsls_Baru",
    "Perubahan_kdsubsls",
    "Duplikat_File_Baru",
    "Catatan",
];

/// Writes one row per report entry.
pub struct CsvReportWriter {
    delimiter: u8,
    null_text: String,
}

impl Default for CsvReportWriter {
    fn default() -> Self {
        Self {
            delimiter: b',',
            null_text: NULL_TEXT.to_string(),
        }
    }
}

impl CsvReportWriter {
    /// Create a writer with an explicit delimiter and null marker.
    pub fn new(delimiter: u8, null_text: impl Into<String>) -> Self {
        Self {
            delimiter,
            null_text: null_text.into(),
        }
    }

    /// Create a writer from the `[export]` configuration.
    pub fn from_config(config: &DetectorConfig) -> DetectResult<Self> {
        Ok(Self::new(config.delimiter()?, config.export.null_text.clone()))
    }

    /// Write the report to a file. Returns the number of data rows.
    pub fn write_to_file(&self, result: &DetectionResult, path: &Path) -> DetectResult<usize> {
        if result.report.is_empty() {
            return Err(DetectError::EmptyReport);
        }
        let file = std::fs::File::create(path)?;
        let mut writer = BufWriter::new(file);
        let rows = self.write_to(result, &mut writer)?;
        writer.flush()?;
        log::info!("Wrote {} row(s) to {}", rows, path.display());
        Ok(rows)
    }

    /// Write the report to any writer. Returns the number of data rows.
    pub fn write_to<W: Write>(&self, result: &DetectionResult, out: &mut W) -> DetectResult<usize> {
        if result.report.is_empty() {
            return Err(DetectError::EmptyReport);
        }
        self.write_row(out, CSV_HEADERS.iter().map(|h| h.to_string()))?;
        for change in &result.report {
            let duplicate = result.duplicates.contains(&change.key);
            self.write_row(out, self.cells(change, duplicate))?;
        }
        Ok(result.report.len())
    }

    /// Render a record as its thirteen cells.
    pub fn cells(&self, change: &ChangeRecord, duplicate: bool) -> Vec<String> {
        let spatial = change.origin == ChangeOrigin::Spatial;
        let by_id_area = |value: String| if spatial { String::new() } else { value };
        let code = |code: &Option<String>| code.clone().unwrap_or_else(|| self.null_text.clone());

        vec![
            change.key.to_string(),
            change.status.name().to_string(),
            change.origin.name().to_string(),
            yes_no(change.boundary_changed).to_string(),
            by_id_area(format!("{:.4}", change.area_old)),
            by_id_area(format!("{:.4}", change.area_new)),
            by_id_area(format!("{:+.4}", change.area_delta)),
            change
                .spatial_area
                .filter(|_| spatial)
                .map(|a| format!("{:.4}", a))
                .unwrap_or_default(),
            code(&change.code_old),
            code(&change.code_new),
            yes_no(change.code_changed).to_string(),
            yes_no(duplicate).to_string(),
            change.notes(),
        ]
    }

    fn write_row<W: Write>(&self, out: &mut W, cells: impl IntoIterator<Item = String>) -> DetectResult<()> {
        let mut line = String::new();
        for (i, cell) in cells.into_iter().enumerate() {
            if i > 0 {
                line.push(self.delimiter as char);
            }
            line.push_str(&self.escape(&cell));
        }
        line.push_str("\r\n");
        out.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Quote a cell when it contains the delimiter, a quote or a line break.
    fn escape(&self, cell: &str) -> String {
        let needs_quotes = cell
            .chars()
            .any(|c| c == self.delimiter as char || c == '"' || c == '\n' || c == '\r');
        if needs_quotes {
            format!("\"{}\"", cell.replace('"', "\"\""))
        } else {
            cell.to_string()
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Ya"
    } else {
        "Tidak"
    }
}
