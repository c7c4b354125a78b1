//! Performance benchmarks for geoshape-lib
//!
//! Run with: cargo bench --package geoshape-lib

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use geoshape_lib::dbf::{DbfWriter, FieldDescriptor};
use geoshape_lib::{
    IndexConfig, MapProjection, PointD, RecordSource, RectD, SpatialIndex, SphericalMercator,
    TilePyramid,
};
use std::hint::black_box;
use std::io::Cursor;

fn world() -> RectD {
    RectD::new(-180.0, -90.0, 360.0, 180.0)
}

/// Deterministic pseudo-random points spread over the world
fn generate_points(n: usize) -> Vec<PointD> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            PointD::new(
                ((t * 0.618_033_988_75).fract() * 360.0) - 180.0,
                ((t * 0.414_213_562_37).fract() * 180.0) - 90.0,
            )
        })
        .collect()
}

/// Small extents like building footprints or road segments
fn generate_extents(n: usize) -> Vec<RectD> {
    generate_points(n)
        .into_iter()
        .map(|p| {
            RectD::new(
                p.x.min(179.0),
                p.y.min(89.0),
                0.05 + (p.x.abs() % 1.0),
                0.05 + (p.y.abs() % 0.5),
            )
        })
        .collect()
}

// ============================================================================
// Index construction
// ============================================================================

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");
    group.sample_size(20);

    for &n in &[10_000usize, 100_000] {
        let points = generate_points(n);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("points_sequential", n), &points, |b, pts| {
            let config = IndexConfig {
                parallel_threshold: usize::MAX,
                ..IndexConfig::default()
            };
            b.iter(|| SpatialIndex::build(RecordSource::Points(pts), world(), &config).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("points_parallel", n), &points, |b, pts| {
            let config = IndexConfig {
                parallel_threshold: 1_000,
                ..IndexConfig::default()
            };
            b.iter(|| SpatialIndex::build(RecordSource::Points(pts), world(), &config).unwrap());
        });
    }

    let extents = generate_extents(50_000);
    group.throughput(Throughput::Elements(extents.len() as u64));
    group.bench_function("extents_50k", |b| {
        let config = IndexConfig::default();
        b.iter(|| SpatialIndex::build(RecordSource::Extents(&extents), world(), &config).unwrap());
    });

    group.finish();
}

// ============================================================================
// Queries
// ============================================================================

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    let points = generate_points(100_000);
    let index =
        SpatialIndex::build(RecordSource::Points(&points), world(), &IndexConfig::default())
            .unwrap();
    let probes = generate_points(1_000);

    group.throughput(Throughput::Elements(probes.len() as u64));
    group.bench_function("point_1k_probes", |b| {
        b.iter(|| {
            probes
                .iter()
                .map(|p| index.query_point(*p).map_or(0, |hits| hits.len()))
                .sum::<usize>()
        });
    });

    group.bench_function("rect_city_sized", |b| {
        let rect = RectD::new(-0.5, 51.0, 1.0, 1.0);
        b.iter(|| index.query_rect(black_box(rect)));
    });

    group.bench_function("radius_5deg", |b| {
        b.iter(|| index.query_radius(black_box(PointD::new(10.0, 45.0)), 5.0));
    });

    group.finish();
}

// ============================================================================
// Projection and tile math
// ============================================================================

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");

    let points = generate_points(100_000);
    group.throughput(Throughput::Elements(points.len() as u64));
    group.bench_function("mercator_in_place_100k", |b| {
        b.iter_batched(
            || points.clone(),
            |mut pts| {
                SphericalMercator.to_projected_in_place(&mut pts);
                pts
            },
            criterion::BatchSize::LargeInput,
        );
    });

    let pyramid = TilePyramid::default();
    group.bench_function("tile_from_geodetic_1k", |b| {
        b.iter(|| {
            points[..1_000]
                .iter()
                .filter_map(|p| pyramid.tile_from_geodetic(*p, 14).ok())
                .count()
        });
    });

    group.finish();
}

// ============================================================================
// Attribute table
// ============================================================================

fn bench_dbf(c: &mut Criterion) {
    let mut group = c.benchmark_group("dbf");
    group.sample_size(20);

    let rows: Vec<[String; 3]> = (0..10_000)
        .map(|i| [format!("Feature {i}"), format!("{}", i * 37), "residential".to_string()])
        .collect();

    group.throughput(Throughput::Elements(rows.len() as u64));
    group.bench_function("write_10k_rows", |b| {
        b.iter(|| {
            let fields = vec![
                FieldDescriptor::character("NAME", 24).unwrap(),
                FieldDescriptor::number("CODE", 10, 0).unwrap(),
                FieldDescriptor::character("KIND", 16).unwrap(),
            ];
            let mut writer = DbfWriter::new(Cursor::new(Vec::new()), fields).unwrap();
            for row in &rows {
                writer.write_row(row).unwrap();
            }
            writer.close().unwrap().into_inner().len()
        });
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_construction,
    bench_queries,
    bench_projection,
    bench_dbf,
);

criterion_main!(benches);
