use criterion::{Criterion, criterion_group, criterion_main};
use glam::DVec3;
use obj_tiles::math::MinMax;
use obj_tiles::tiling::sort_trees;
use obj_tiles::types::{BoundingVolume, Face, FaceVertex, Geometry, Mesh, Tile, Triangle};

/// `n`³ small tetrahedra on a lattice, one geometry each.
fn make_lattice(n: usize) -> Mesh {
    let mut mesh = Mesh {
        name: "lattice".into(),
        ..Default::default()
    };
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let o = DVec3::new(x as f64, y as f64, z as f64) * 10.0;
                let base = mesh.vertices.len() as u32;
                mesh.vertices.extend([
                    o,
                    o + DVec3::X,
                    o + DVec3::Y,
                    o + DVec3::Z,
                ]);
                let fv = |i: u32| FaceVertex::new(base + i + 1, 0, 0);
                let triangles = vec![
                    Triangle::new(fv(0), fv(2), fv(1)),
                    Triangle::new(fv(0), fv(1), fv(3)),
                    Triangle::new(fv(0), fv(3), fv(2)),
                    Triangle::new(fv(1), fv(2), fv(3)),
                ];
                mesh.geometries.push(Geometry {
                    id: format!("g{x}_{y}_{z}"),
                    faces: vec![Face {
                        mat_name: String::new(),
                        triangles,
                    }],
                });
            }
        }
    }
    mesh
}

/// Concentric and scattered tiles so the comparator sees every outcome.
fn make_tiles(n: usize) -> Vec<Tile> {
    (0..n)
        .map(|i| {
            let o = (i % 16) as f64 * 50.0;
            let s = (i / 16) as f64 * 3.0;
            Tile {
                bounding_volume: BoundingVolume::Region([0.0; 6]),
                original_x: MinMax::new(o - s, o + 10.0 + s),
                original_y: MinMax::new(-s, 10.0 + s),
                original_z: MinMax::new(o - s, o + 10.0 + s),
                ..Default::default()
            }
        })
        .collect()
}

fn bench_split(c: &mut Criterion) {
    // 8000 geometries into 64 cells
    let mesh = make_lattice(20);

    c.bench_function("mesh_split_level4_8k", |b| {
        b.iter(|| mesh.split(4));
    });
}

fn bench_sort_trees(c: &mut Criterion) {
    let tiles = make_tiles(256);

    c.bench_function("sort_trees_256", |b| {
        b.iter(|| sort_trees(tiles.clone()));
    });
}

criterion_group!(benches, bench_split, bench_sort_trees);
criterion_main!(benches);
