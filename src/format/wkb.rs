//! Well-known binary and GeoPackage geometry blob codec (polygonal types only).

use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon};

use crate::types::{DetectError, DetectResult};

const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOLYGON: u32 = 6;

const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;

/// GeoPackage blob magic.
const GPKG_MAGIC: [u8; 2] = *b"GP";

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> DetectResult<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.data.len());
        match end {
            Some(end) => {
                let bytes = &self.data[self.pos..end];
                self.pos = end;
                Ok(bytes)
            }
            None => Err(DetectError::Wkb(format!(
                "truncated at offset {} (need {} bytes)",
                self.pos, n
            ))),
        }
    }

    fn u8(&mut self) -> DetectResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self, little: bool) -> DetectResult<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(if little {
            u32::from_le_bytes(buf)
        } else {
            u32::from_be_bytes(buf)
        })
    }

    fn f64(&mut self, little: bool) -> DetectResult<f64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(if little {
            f64::from_le_bytes(buf)
        } else {
            f64::from_be_bytes(buf)
        })
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

/// Header of a WKB geometry: byte order, base type and extra ordinates.
struct WkbHeader {
    little: bool,
    base: u32,
    extra_dims: usize,
}

fn read_header(cur: &mut Cursor<'_>) -> DetectResult<WkbHeader> {
    let little = match cur.u8()? {
        0 => false,
        1 => true,
        other => return Err(DetectError::Wkb(format!("invalid byte order {}", other))),
    };
    let raw = cur.u32(little)?;
    let mut extra_dims = 0;
    if raw & EWKB_Z != 0 {
        extra_dims += 1;
    }
    if raw & EWKB_M != 0 {
        extra_dims += 1;
    }
    if raw & EWKB_SRID != 0 {
        cur.u32(little)?;
    }
    let code = raw & 0x0FFF_FFFF;
    let base = code % 1000;
    extra_dims += match code / 1000 {
        0 => 0,
        1 | 2 => 1,
        3 => 2,
        other => return Err(DetectError::Wkb(format!("invalid dimension code {}", other))),
    };
    Ok(WkbHeader {
        little,
        base,
        extra_dims,
    })
}

fn read_ring(cur: &mut Cursor<'_>, header: &WkbHeader) -> DetectResult<LineString<f64>> {
    let count = cur.u32(header.little)? as usize;
    let mut coords = Vec::with_capacity(count.min(cur.rest().len() / 16));
    for _ in 0..count {
        let x = cur.f64(header.little)?;
        let y = cur.f64(header.little)?;
        for _ in 0..header.extra_dims {
            cur.f64(header.little)?;
        }
        coords.push(Coord { x, y });
    }
    Ok(LineString::new(coords))
}

fn read_polygon_body(cur: &mut Cursor<'_>, header: &WkbHeader) -> DetectResult<Option<Polygon<f64>>> {
    let rings = cur.u32(header.little)? as usize;
    if rings == 0 {
        return Ok(None);
    }
    let exterior = read_ring(cur, header)?;
    // Each ring needs at least its 4-byte point count.
    let mut interiors = Vec::with_capacity((rings - 1).min(cur.rest().len() / 4));
    for _ in 1..rings {
        interiors.push(read_ring(cur, header)?);
    }
    Ok(Some(Polygon::new(exterior, interiors)))
}

/// Decode a WKB geometry.
///
/// Returns `Ok(None)` for empty or non-polygonal geometries.
pub fn decode_wkb(data: &[u8]) -> DetectResult<Option<MultiPolygon<f64>>> {
    let mut cur = Cursor::new(data);
    let header = read_header(&mut cur)?;
    match header.base {
        WKB_POLYGON => Ok(read_polygon_body(&mut cur, &header)?.map(|p| MultiPolygon::new(vec![p]))),
        WKB_MULTIPOLYGON => {
            let count = cur.u32(header.little)? as usize;
            let mut polygons = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                let part = read_header(&mut cur)?;
                if part.base != WKB_POLYGON {
                    return Err(DetectError::Wkb(format!(
                        "multipolygon member of type {}",
                        part.base
                    )));
                }
                if let Some(polygon) = read_polygon_body(&mut cur, &part)? {
                    polygons.push(polygon);
                }
            }
            if polygons.is_empty() {
                Ok(None)
            } else {
                Ok(Some(MultiPolygon::new(polygons)))
            }
        }
        _ => Ok(None),
    }
}

fn write_ring(out: &mut Vec<u8>, ring: &LineString<f64>) {
    out.extend_from_slice(&(ring.0.len() as u32).to_le_bytes());
    for c in &ring.0 {
        out.extend_from_slice(&c.x.to_le_bytes());
        out.extend_from_slice(&c.y.to_le_bytes());
    }
}

/// Encode a multipolygon as little-endian 2D WKB.
pub fn encode_wkb(geometry: &MultiPolygon<f64>) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(1);
    out.extend_from_slice(&WKB_MULTIPOLYGON.to_le_bytes());
    out.extend_from_slice(&(geometry.0.len() as u32).to_le_bytes());
    for polygon in &geometry.0 {
        out.push(1);
        out.extend_from_slice(&WKB_POLYGON.to_le_bytes());
        out.extend_from_slice(&(1 + polygon.interiors().len() as u32).to_le_bytes());
        write_ring(&mut out, polygon.exterior());
        for interior in polygon.interiors() {
            write_ring(&mut out, interior);
        }
    }
    out
}

/// Decode a GeoPackage geometry blob (header, optional envelope, WKB).
pub fn decode_gpkg_blob(data: &[u8]) -> DetectResult<Option<MultiPolygon<f64>>> {
    let mut cur = Cursor::new(data);
    if cur.take(2)? != GPKG_MAGIC {
        return Err(DetectError::Wkb("missing GeoPackage magic".to_string()));
    }
    let _version = cur.u8()?;
    let flags = cur.u8()?;
    let little = flags & 0x01 != 0;
    let envelope_len = match (flags >> 1) & 0x07 {
        0 => 0,
        1 => 32,
        2 | 3 => 48,
        4 => 64,
        other => return Err(DetectError::Wkb(format!("invalid envelope indicator {}", other))),
    };
    let _srs_id = cur.u32(little)?;
    cur.take(envelope_len)?;
    if flags & 0x10 != 0 {
        return Ok(None);
    }
    decode_wkb(cur.rest())
}

/// Encode a GeoPackage geometry blob with an XY envelope.
pub fn encode_gpkg_blob(geometry: &MultiPolygon<f64>, srs_id: i32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&GPKG_MAGIC);
    out.push(0);
    match geometry.bounding_rect() {
        Some(rect) => {
            out.push(0x03);
            out.extend_from_slice(&srs_id.to_le_bytes());
            for v in [rect.min().x, rect.max().x, rect.min().y, rect.max().y] {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        None => {
            out.push(0x11);
            out.extend_from_slice(&srs_id.to_le_bytes());
        }
    }
    out.extend_from_slice(&encode_wkb(geometry));
    out
}
