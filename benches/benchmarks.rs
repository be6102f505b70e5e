//! Criterion benchmarks for the SLS change detector.

use criterion::{criterion_group, criterion_main, Criterion};
use geo::{BoundingRect, MultiPolygon, Rect};
use rand::Rng;
use tempfile::NamedTempFile;

use sls_change::config::DetectorConfig;
use sls_change::engine::{detect, PairwiseClassifier, SpatialDiffer};
use sls_change::format::{decode_gpkg_blob, encode_gpkg_blob, CsvReportWriter, GpkgReportWriter};
use sls_change::geometry::GeoEngine;
use sls_change::index::FeatureIndex;
use sls_change::types::{Crs, Layer, RawFeature};

const CELL: f64 = 100.0;

/// Build a `side` x `side` grid of square features.
fn make_grid(side: usize) -> Layer {
    let mut layer =
        Layer::new("grid", Crs::WEB_MERCATOR).with_fields(&["idsubsls", "luas", "kdsubsls", "gid"]);
    for row in 0..side {
        for col in 0..side {
            let i = row * side + col;
            let (x, y) = (col as f64 * CELL, row as f64 * CELL);
            layer.push(
                RawFeature::new(i as i64 + 1)
                    .attr("idsubsls", format!("3171{:08}", i))
                    .attr("luas", CELL * CELL)
                    .attr("kdsubsls", format!("{:03}", i % 1000))
                    .attr("gid", i as i64)
                    .geometry(Rect::new((x, y), (x + CELL, y + CELL)).to_polygon()),
            );
        }
    }
    layer
}

/// Perturb a grid: shrink some cells, recode some, drop some.
fn perturb(grid: &Layer, rate: f64) -> Layer {
    let mut rng = rand::thread_rng();
    let mut layer = Layer::new("perturbed", grid.crs).with_fields(&["idsubsls", "luas", "kdsubsls", "gid"]);
    for feature in &grid.features {
        let roll: f64 = rng.gen_range(0.0..1.0);
        if roll < rate / 3.0 {
            continue;
        }
        let mut feature = feature.clone();
        if roll < 2.0 * rate / 3.0 {
            let shrink = rng.gen_range(1.0..10.0);
            let (x, y) = match feature.geometry.as_ref().and_then(|g| g.bounding_rect()) {
                Some(rect) => (rect.min().x, rect.min().y),
                None => continue,
            };
            feature = feature
                .geometry(Rect::new((x, y), (x + CELL - shrink, y + CELL)).to_polygon())
                .attr("luas", (CELL - shrink) * CELL);
        } else if roll < rate {
            feature = feature.attr("kdsubsls", "999");
        }
        layer.push(feature);
    }
    layer
}

fn bench_index_build_10k(c: &mut Criterion) {
    let grid = make_grid(100);
    let config = DetectorConfig::default();

    c.bench_function("index_build_10k", |b| {
        b.iter(|| {
            let _ = FeatureIndex::build(&grid, &config.fields);
        })
    });
}

fn bench_classify_10k(c: &mut Criterion) {
    let old = make_grid(100);
    let new = perturb(&old, 0.1);
    let config = DetectorConfig::default();
    let engine = GeoEngine::new();
    let old_index = FeatureIndex::build(&old, &config.fields);
    let new_index = FeatureIndex::build(&new, &config.fields);
    let classifier = PairwiseClassifier::new(&engine, &config.thresholds);

    c.bench_function("classify_10k", |b| {
        b.iter(|| {
            let _ = classifier.classify(&old_index, &new_index);
        })
    });
}

fn bench_spatial_diff_400(c: &mut Criterion) {
    let old = make_grid(20);
    let new = perturb(&old, 0.1);
    let config = DetectorConfig::default();
    let engine = GeoEngine::new();
    let differ = SpatialDiffer::new(&engine, &config.spatial, &config.fields.key);

    c.bench_function("spatial_diff_400", |b| {
        b.iter(|| {
            let _ = differ.diff(&old, &new);
        })
    });
}

fn bench_detect_2500(c: &mut Criterion) {
    let old = make_grid(50);
    let new = perturb(&old, 0.05);
    let config = DetectorConfig::default();

    c.bench_function("detect_2500", |b| {
        b.iter(|| {
            let _ = detect(&old, &new, &config).unwrap();
        })
    });
}

fn bench_csv_export(c: &mut Criterion) {
    let old = make_grid(50);
    let new = perturb(&old, 0.2);
    let result = detect(&old, &new, &DetectorConfig::default()).unwrap();
    let writer = CsvReportWriter::default();

    c.bench_function("csv_export", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(64 * 1024);
            writer.write_to(&result, &mut out).unwrap();
        })
    });
}

fn bench_gpkg_export(c: &mut Criterion) {
    let old = make_grid(50);
    let new = perturb(&old, 0.2);
    let result = detect(&old, &new, &DetectorConfig::default()).unwrap();
    let writer = GpkgReportWriter::default();

    c.bench_function("gpkg_export", |b| {
        b.iter(|| {
            let tmp = NamedTempFile::new().unwrap();
            writer.write_to_file(&result, tmp.path()).unwrap();
        })
    });
}

fn bench_gpkg_blob_codec(c: &mut Criterion) {
    let grid = make_grid(10);
    let geometries: Vec<&MultiPolygon<f64>> =
        grid.features.iter().filter_map(|f| f.geometry.as_ref()).collect();

    c.bench_function("gpkg_blob_codec_100", |b| {
        b.iter(|| {
            for geometry in &geometries {
                let blob = encode_gpkg_blob(geometry, 3857);
                let _ = decode_gpkg_blob(&blob).unwrap();
            }
        })
    });
}

criterion_group!(
    benches,
    bench_index_build_10k,
    bench_classify_10k,
    bench_spatial_diff_400,
    bench_detect_2500,
    bench_csv_export,
    bench_gpkg_export,
    bench_gpkg_blob_codec,
);
criterion_main!(benches);
