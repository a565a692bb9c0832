//! Benchmarks pour la construction et la simplification de topologie

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geo::{Coord, Geometry, LineString, Polygon};
use regions_topology::{presimplify, InputFeature, TopologyBuilder, WeightSystem};

/// Grille de `side` × `side` cellules aux bords dentelés (déterministe)
fn grid(side: usize, points_per_edge: usize) -> Vec<InputFeature> {
    let size = 1.0;
    let jitter = |i: usize, j: usize, k: usize| {
        let seed = (i * 7919 + j * 104_729 + k * 31) % 97;
        (seed as f64 / 97.0 - 0.5) * size / points_per_edge as f64
    };
    // Bord horizontal (i, j) → (i + 1, j), partagé par les cellules voisines
    let horizontal = |i: usize, j: usize| -> Vec<Coord> {
        (0..=points_per_edge)
            .map(|k| {
                let t = k as f64 / points_per_edge as f64;
                let dy = if k == 0 || k == points_per_edge { 0.0 } else { jitter(i, j, k) };
                Coord {
                    x: (i as f64 + t) * size,
                    y: j as f64 * size + dy,
                }
            })
            .collect()
    };
    let vertical = |i: usize, j: usize| -> Vec<Coord> {
        (0..=points_per_edge)
            .map(|k| {
                let t = k as f64 / points_per_edge as f64;
                let dx = if k == 0 || k == points_per_edge { 0.0 } else { jitter(j, i, k + 1) };
                Coord {
                    x: i as f64 * size + dx,
                    y: (j as f64 + t) * size,
                }
            })
            .collect()
    };

    let mut features = Vec::with_capacity(side * side);
    for i in 0..side {
        for j in 0..side {
            // Sens horaire: ouest (montant), nord, est (descendant), sud
            let mut ring = vertical(i, j);
            ring.pop();
            ring.extend(horizontal(i, j + 1));
            ring.pop();
            let mut east = vertical(i + 1, j);
            east.reverse();
            ring.extend(east);
            ring.pop();
            let mut south = horizontal(i, j);
            south.reverse();
            ring.extend(south);

            features.push(InputFeature {
                id: Some(format!("Q{}", i * side + j + 1)),
                properties: Default::default(),
                geometry: Some(Geometry::Polygon(Polygon::new(LineString::new(ring), vec![]))),
            });
        }
    }
    features
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for side in [4, 16] {
        let features = grid(side, 50);
        group.throughput(Throughput::Elements((side * side) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(side), &features, |b, features| {
            b.iter(|| {
                let topology = TopologyBuilder::new()
                    .build("data", black_box(features.clone()))
                    .unwrap();
                black_box(topology)
            })
        });
    }
    group.finish();
}

fn bench_presimplify(c: &mut Criterion) {
    let topology = TopologyBuilder::new().build("data", grid(16, 50)).unwrap();

    let mut group = c.benchmark_group("presimplify");
    group.throughput(Throughput::Elements(topology.point_count() as u64));
    for system in [WeightSystem::Spherical, WeightSystem::Planar] {
        group.bench_function(system.name(), |b| {
            b.iter(|| {
                let presimplified = presimplify(black_box(topology.clone()), system);
                let threshold = presimplified.quantile(0.07);
                black_box(presimplified.simplify(threshold))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_presimplify);
criterion_main!(benches);
