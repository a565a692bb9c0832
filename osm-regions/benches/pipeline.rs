//! Benchmarks du rendu d'une FeatureCollection (topologie, simplification, sérialisation)

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use osm_regions::assemble::FeatureCollection;
use osm_regions::identity::PropertyBag;
use osm_regions::params;
use osm_regions::pipeline::render;
use osm_regions::store::GeometryRecord;

/// Rangée de `count` régions voisines aux bords nord et sud ondulés
fn collection(count: usize, points_per_edge: usize) -> FeatureCollection {
    let records = (0..count)
        .map(|i| {
            let x0 = i as f64;
            let mut ring = Vec::with_capacity(2 * points_per_edge + 3);
            ring.push([x0, 0.0]);
            ring.push([x0, 1.0]);
            for k in 1..points_per_edge {
                let t = k as f64 / points_per_edge as f64;
                ring.push([x0 + t, 1.0 + 0.05 * (t * 17.0 + x0).sin()]);
            }
            ring.push([x0 + 1.0, 1.0]);
            ring.push([x0 + 1.0, 0.0]);
            for k in (1..points_per_edge).rev() {
                let t = k as f64 / points_per_edge as f64;
                ring.push([x0 + t, -0.05 * (t * 13.0 + x0).cos()]);
            }
            ring.push([x0, 0.0]);

            let data = serde_json::json!({"type": "MultiPolygon", "coordinates": [[ring]]});
            GeometryRecord {
                id: format!("Q{}", i + 1).parse().unwrap(),
                data: data.to_string(),
            }
        })
        .collect();
    FeatureCollection::assemble(records, &PropertyBag::new())
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let fc = collection(20, 200);
    let ids = (1..=20).map(|i| format!("Q{}", i)).collect::<Vec<_>>().join(",");

    let cases = [
        ("geojson_verbatim", "geojson.json", "1"),
        ("geojson_default", "geojson.json", "0.07"),
        ("topojson_default", "topojson.json", "0.07"),
    ];
    for (name, format, quantile) in cases {
        let query: HashMap<String, String> = [
            ("ids".to_string(), ids.clone()),
            ("sphericalQuantile".to_string(), quantile.to_string()),
        ]
        .into_iter()
        .collect();
        let request = params::resolve(format, &query).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(name), &request, |b, request| {
            b.iter(|| render(black_box(request), fc.clone()).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
