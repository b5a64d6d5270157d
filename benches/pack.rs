use criterion::{Criterion, criterion_group, criterion_main};
use glam::{DVec2, DVec3};
use obj_tiles::encoder::{Converter, GltfOptions, pack_face_set};
use obj_tiles::types::{Face, FaceVertex, Geometry, Mesh, Triangle};

/// `n`x`n` grid in the XZ plane with per-vertex normals and UVs.
fn make_grid(n: usize) -> Mesh {
    let verts = n + 1;
    let mut mesh = Mesh {
        name: "grid".into(),
        ..Default::default()
    };
    for z in 0..verts {
        for x in 0..verts {
            let fx = x as f64 / n as f64;
            let fz = z as f64 / n as f64;
            mesh.vertices.push(DVec3::new(fx * 100.0, (fx * fz).sin(), -fz * 100.0));
            mesh.normals.push(DVec3::Y);
            mesh.uvs.push(DVec2::new(fx, fz));
        }
    }

    let fv = |i: usize| {
        let i = i as u32 + 1;
        FaceVertex::new(i, i, i)
    };
    let mut triangles = Vec::with_capacity(2 * n * n);
    for z in 0..n {
        for x in 0..n {
            let tl = z * verts + x;
            let tr = tl + 1;
            let bl = tl + verts;
            let br = bl + 1;
            triangles.push(Triangle::new(fv(tl), fv(bl), fv(tr)));
            triangles.push(Triangle::new(fv(tr), fv(bl), fv(br)));
        }
    }
    mesh.geometries.push(Geometry {
        id: "grid".into(),
        faces: vec![Face {
            mat_name: String::new(),
            triangles,
        }],
    });
    mesh
}

fn bench_pack_face_set(c: &mut Criterion) {
    // 80K triangles, 40K unique vertices
    let mesh = make_grid(200);
    let triangles = &mesh.geometries[0].faces[0].triangles;

    c.bench_function("pack_face_set_80k", |b| {
        b.iter(|| pack_face_set(&mesh, triangles));
    });
}

fn bench_convert(c: &mut Criterion) {
    let mesh = make_grid(200);

    c.bench_function("convert_glb_80k", |b| {
        b.iter(|| {
            let options = GltfOptions {
                binary: true,
                with_batch_table: true,
                ..Default::default()
            };
            Converter::new(&mesh, ".", options).run()
        });
    });
}

criterion_group!(benches, bench_pack_face_set, bench_convert);
criterion_main!(benches);
