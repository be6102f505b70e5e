//! GeoPackage reader and report writer (SQLite container via `rusqlite`).

use std::path::{Path, PathBuf};

use geo::{BoundingRect, Rect};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::engine::DetectionResult;
use crate::types::{AttrValue, Crs, DetectError, DetectResult, GeometryType, Layer, RawFeature};

use super::wkb::{decode_gpkg_blob, encode_gpkg_blob};

/// `GPKG` in ASCII, stored in the SQLite header.
const GPKG_APPLICATION_ID: i32 = 0x4750_4B47;
/// GeoPackage 1.3.
const GPKG_USER_VERSION: i32 = 10300;

/// Default name of the exported feature table.
pub const REPORT_TABLE: &str = "sls_changes";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Reads feature tables from a GeoPackage file.
pub struct GpkgReader {
    conn: Connection,
    path: PathBuf,
}

/// Geometry column registration of a feature table.
struct GeometryColumn {
    column: String,
    type_name: String,
    srs_id: i64,
}

impl GpkgReader {
    /// Open a GeoPackage read-only.
    pub fn open(path: &Path) -> DetectResult<Self> {
        if !path.exists() {
            return Err(DetectError::MissingInput(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    fn invalid(&self, reason: impl std::fmt::Display) -> DetectError {
        DetectError::InvalidDataset {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    /// Names of all feature tables, in registration order.
    pub fn layer_names(&self) -> DetectResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT table_name FROM gpkg_contents WHERE data_type = 'features' ORDER BY rowid")
            .map_err(|e| self.invalid(e))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| self.invalid(e))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn geometry_column(&self, table: &str) -> DetectResult<Option<GeometryColumn>> {
        let column = self
            .conn
            .query_row(
                "SELECT column_name, geometry_type_name, srs_id FROM gpkg_geometry_columns WHERE table_name = ?1",
                params![table],
                |row| {
                    Ok(GeometryColumn {
                        column: row.get(0)?,
                        type_name: row.get(1)?,
                        srs_id: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(column)
    }

    /// Primary-key column of a table, if it has an integer one.
    fn primary_key(&self, table: &str) -> DetectResult<Option<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let name: String = row.get(1)?;
            let pk: i64 = row.get(5)?;
            if pk == 1 {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    /// Read a feature table into a layer (the first one when `name` is `None`).
    pub fn read_layer(&self, name: Option<&str>) -> DetectResult<Layer> {
        let names = self.layer_names()?;
        let table = match name {
            Some(name) => names
                .into_iter()
                .find(|n| n == name)
                .ok_or_else(|| DetectError::LayerNotFound {
                    path: self.path.clone(),
                    layer: name.to_string(),
                })?,
            None => names
                .into_iter()
                .next()
                .ok_or_else(|| self.invalid("no feature table registered in gpkg_contents"))?,
        };

        let geometry = self.geometry_column(&table)?;
        let pk = self.primary_key(&table)?;
        let crs = geometry
            .as_ref()
            .map(|g| Crs::from_srs_id(g.srs_id))
            .unwrap_or(Crs::Undefined);

        let mut layer = Layer::new(table.clone(), crs);
        layer.geometry_type = geometry
            .as_ref()
            .map(|g| GeometryType::from_name(&g.type_name))
            .unwrap_or(GeometryType::Unknown);

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_ident(&table)))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let geometry_index = geometry
            .as_ref()
            .and_then(|g| columns.iter().position(|c| *c == g.column));
        let pk_index = pk.as_ref().and_then(|pk| columns.iter().position(|c| c == pk));

        for (i, column) in columns.iter().enumerate() {
            if Some(i) != geometry_index {
                layer.add_field(column);
            }
        }

        let polygonal = layer.geometry_type == GeometryType::Polygon;
        let mut rows = stmt.query([])?;
        let mut ordinal = 0i64;
        while let Some(row) = rows.next()? {
            ordinal += 1;
            let fid = match pk_index.map(|i| row.get_ref(i)).transpose()? {
                Some(ValueRef::Integer(v)) => v,
                _ => ordinal,
            };
            let mut feature = RawFeature::new(fid);

            for (i, column) in columns.iter().enumerate() {
                let value = row.get_ref(i)?;
                if Some(i) == geometry_index {
                    if let (true, ValueRef::Blob(blob)) = (polygonal, value) {
                        feature.geometry = match decode_gpkg_blob(blob) {
                            Ok(geometry) => geometry,
                            Err(e) => {
                                log::warn!("{}: feature {} has an unreadable geometry: {}", table, fid, e);
                                None
                            }
                        };
                    }
                    continue;
                }
                feature.attributes.insert(column.clone(), attr_from_sql(value));
            }
            layer.features.push(feature);
        }

        log::debug!(
            "Read {} feature(s) from {}:{} ({})",
            layer.feature_count(),
            self.path.display(),
            table,
            layer.crs
        );
        Ok(layer)
    }
}

fn attr_from_sql(value: ValueRef<'_>) -> AttrValue {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => AttrValue::Null,
        ValueRef::Integer(v) => AttrValue::Int(v),
        ValueRef::Real(v) => AttrValue::Real(v),
        ValueRef::Text(bytes) => AttrValue::Text(String::from_utf8_lossy(bytes).into_owned()),
    }
}

const WGS84_WKT: &str = "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563,AUTHORITY[\"EPSG\",\"7030\"]],AUTHORITY[\"EPSG\",\"6326\"]],PRIMEM[\"Greenwich\",0,AUTHORITY[\"EPSG\",\"8901\"]],UNIT[\"degree\",0.0174532925199433,AUTHORITY[\"EPSG\",\"9122\"]],AUTHORITY[\"EPSG\",\"4326\"]]";

const WEB_MERCATOR_WKT: &str = "PROJCS[\"WGS 84 / Pseudo-Mercator\",GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563,AUTHORITY[\"EPSG\",\"7030\"]],AUTHORITY[\"EPSG\",\"6326\"]],PRIMEM[\"Greenwich\",0,AUTHORITY[\"EPSG\",\"8901\"]],UNIT[\"degree\",0.0174532925199433,AUTHORITY[\"EPSG\",\"9122\"]],AUTHORITY[\"EPSG\",\"4326\"]],PROJECTION[\"Mercator_1SP\"],PARAMETER[\"central_meridian\",0],PARAMETER[\"scale_factor\",1],PARAMETER[\"false_easting\",0],PARAMETER[\"false_northing\",0],UNIT[\"metre\",1,AUTHORITY[\"EPSG\",\"9001\"]],AUTHORITY[\"EPSG\",\"3857\"]]";

const CORE_TABLES: &str = "
CREATE TABLE gpkg_spatial_ref_sys (
    srs_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL PRIMARY KEY,
    organization TEXT NOT NULL,
    organization_coordsys_id INTEGER NOT NULL,
    definition TEXT NOT NULL,
    description TEXT
);
CREATE TABLE gpkg_contents (
    table_name TEXT NOT NULL PRIMARY KEY,
    data_type TEXT NOT NULL,
    identifier TEXT UNIQUE,
    description TEXT DEFAULT '',
    last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    min_x DOUBLE, min_y DOUBLE, max_x DOUBLE, max_y DOUBLE,
    srs_id INTEGER,
    CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
CREATE TABLE gpkg_geometry_columns (
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    geometry_type_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL,
    z TINYINT NOT NULL,
    m TINYINT NOT NULL,
    CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
    CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
    CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys (srs_id)
);
INSERT INTO gpkg_spatial_ref_sys VALUES
    ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined', 'undefined cartesian coordinate reference system'),
    ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined', 'undefined geographic coordinate reference system');
";

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Ya"
    } else {
        "Tidak"
    }
}

/// Writes the geometry-bearing records of a report into a fresh GeoPackage.
pub struct GpkgReportWriter {
    table: String,
    null_text: String,
}

impl Default for GpkgReportWriter {
    fn default() -> Self {
        Self::new(REPORT_TABLE)
    }
}

impl GpkgReportWriter {
    /// Create a writer for the given feature table name.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            null_text: crate::types::NULL_TEXT.to_string(),
        }
    }

    /// Text written for null codes.
    pub fn with_null_text(mut self, null_text: impl Into<String>) -> Self {
        self.null_text = null_text.into();
        self
    }

    /// Write the report, replacing any existing file. Returns the feature count.
    pub fn write_to_file(&self, result: &DetectionResult, path: &Path) -> DetectResult<usize> {
        let records: Vec<_> = result.report.with_geometry().collect();
        if records.is_empty() {
            return Err(DetectError::EmptyReport);
        }
        if path.exists() {
            std::fs::remove_file(path)?;
        }

        let srs_id = result.crs.epsg().map_or(-1, i64::from);

        let mut conn = Connection::open(path)?;
        conn.pragma_update(None, "application_id", GPKG_APPLICATION_ID)?;
        conn.pragma_update(None, "user_version", GPKG_USER_VERSION)?;

        let tx = conn.transaction()?;
        tx.execute_batch(CORE_TABLES)?;
        register_srs(&tx, result.crs)?;

        let table = quote_ident(&self.table);
        tx.execute_batch(&format!(
            "CREATE TABLE {} (
                fid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                geom MULTIPOLYGON,
                idsubsls TEXT,
                status TEXT,
                tipe_perubahan TEXT,
                batas_berubah TEXT,
                luas_lama REAL,
                luas_baru REAL,
                selisih_luas REAL,
                kdsubsls_lama TEXT,
                kdsubsls_baru TEXT,
                kdsubsls_changed TEXT,
                duplikat TEXT
            );",
            table
        ))?;

        let mut extent: Option<Rect<f64>> = None;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (geom, idsubsls, status, tipe_perubahan, batas_berubah, luas_lama, luas_baru, \
                 selisih_luas, kdsubsls_lama, kdsubsls_baru, kdsubsls_changed, duplikat) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                table
            ))?;
            for change in &records {
                let Some(geometry) = change.geometry.as_ref() else {
                    continue;
                };
                if let Some(rect) = geometry.bounding_rect() {
                    extent = Some(match extent {
                        None => rect,
                        Some(e) => Rect::new(
                            (e.min().x.min(rect.min().x), e.min().y.min(rect.min().y)),
                            (e.max().x.max(rect.max().x), e.max().y.max(rect.max().y)),
                        ),
                    });
                }
                stmt.execute(params![
                    encode_gpkg_blob(geometry, srs_id as i32),
                    change.key.to_string(),
                    change.status.name(),
                    change.origin.name(),
                    yes_no(change.boundary_changed),
                    change.area_old,
                    change.area_new,
                    change.area_delta,
                    change.code_old.as_deref().unwrap_or(self.null_text.as_str()),
                    change.code_new.as_deref().unwrap_or(self.null_text.as_str()),
                    yes_no(change.code_changed),
                    yes_no(result.duplicates.contains(&change.key)),
                ])?;
            }
        }

        let (min_x, min_y, max_x, max_y) = match extent {
            Some(r) => (Some(r.min().x), Some(r.min().y), Some(r.max().x), Some(r.max().y)),
            None => (None, None, None, None),
        };
        tx.execute(
            "INSERT INTO gpkg_contents (table_name, data_type, identifier, min_x, min_y, max_x, max_y, srs_id) \
             VALUES (?1, 'features', ?1, ?2, ?3, ?4, ?5, ?6)",
            params![self.table, min_x, min_y, max_x, max_y, srs_id],
        )?;
        tx.execute(
            "INSERT INTO gpkg_geometry_columns VALUES (?1, 'geom', 'MULTIPOLYGON', ?2, 0, 0)",
            params![self.table, srs_id],
        )?;
        tx.commit()?;

        log::info!(
            "Wrote {} feature(s) to {}:{}",
            records.len(),
            path.display(),
            self.table
        );
        Ok(records.len())
    }
}

fn register_srs(tx: &rusqlite::Transaction<'_>, crs: Crs) -> DetectResult<()> {
    let mut insert = tx.prepare(
        "INSERT OR IGNORE INTO gpkg_spatial_ref_sys VALUES (?1, ?2, 'EPSG', ?2, ?3, NULL)",
    )?;
    insert.execute(params!["WGS 84 geodetic", 4326, WGS84_WKT])?;
    insert.execute(params!["WGS 84 / Pseudo-Mercator", 3857, WEB_MERCATOR_WKT])?;
    if let Some(code) = crs.epsg() {
        insert.execute(params![format!("EPSG:{}", code), code, "undefined"])?;
    }
    Ok(())
}
