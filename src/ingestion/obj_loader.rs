use std::cell::RefCell;
use std::io::Cursor;
use std::path::Path;

use glam::{DVec2, DVec3};
use tracing::{debug, warn};

use super::decode_text;
use crate::config::TextEncoding;
use crate::error::{ObjTilesError, Result};
use crate::types::{
    Color, Dissolve, Face, FaceVertex, Geometry, Material, Mesh, Reflectivity, Transparency,
    Triangle,
};

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Parse OBJ text into a [`Mesh`]. Material libraries and textures are
/// resolved against `obj_dir`.
pub fn parse_obj(text: &str, name: &str, obj_dir: &Path, encoding: TextEncoding) -> Result<Mesh> {
    let mtl_name: RefCell<Option<String>> = RefCell::new(None);
    let mut reader = Cursor::new(text.as_bytes());

    let (models, materials_result) = tobj::load_obj_buf(&mut reader, &load_options(), |p| {
        mtl_name.borrow_mut().get_or_insert_with(|| p.to_string_lossy().into_owned());
        let path = obj_dir.join(p);
        let bytes = std::fs::read(&path).map_err(|_| tobj::LoadError::OpenFileFailed)?;
        let text = decode_text(&bytes, encoding).map_err(|_| tobj::LoadError::ReadError)?;
        tobj::load_mtl_buf(&mut Cursor::new(text.as_bytes()))
    })
    .map_err(|e| ObjTilesError::Input(format!("{name}: failed to parse OBJ: {e}")))?;

    let mat_filename = mtl_name.into_inner();
    let tobj_materials = match materials_result {
        Ok(mats) => mats,
        Err(e) => {
            if let Some(file) = &mat_filename {
                warn!(mtl = %file, "Failed to load MTL: {e}");
            }
            Vec::new()
        }
    };
    let mtl_dir = mat_filename
        .as_deref()
        .and_then(|f| Path::new(f).parent())
        .unwrap_or(Path::new(""));
    let materials: Vec<Material> = tobj_materials
        .iter()
        .map(|m| convert_material(m, obj_dir, mtl_dir))
        .collect();

    let attributes = face_attributes(text);
    let mut next_triangle = 0;
    let mut mesh = Mesh {
        name: name.to_string(),
        mat_filename,
        ..Default::default()
    };
    for model in models {
        let mat_name = model
            .mesh
            .material_id
            .and_then(|id| materials.get(id))
            .map(|m| m.name.clone())
            .unwrap_or_default();
        let rest = attributes.get(next_triangle..).unwrap_or_default();
        let face = append_model(&mut mesh, &model.mesh, mat_name, rest);
        next_triangle += model.mesh.indices.len() / 3;
        match mesh.geometries.last_mut() {
            Some(g) if g.id == model.name => g.faces.push(face),
            _ => mesh.geometries.push(Geometry {
                id: model.name,
                faces: vec![face],
            }),
        }
    }
    mesh.materials = materials;

    debug!(
        mesh = %mesh.name,
        vertices = mesh.vertices.len(),
        geometries = mesh.geometries.len(),
        triangles = mesh.triangle_count(),
        "Parsed OBJ"
    );
    Ok(mesh)
}

/// Which attributes a triangulated face carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FaceAttributes {
    texcoord: bool,
    normal: bool,
}

/// Per-triangle attribute presence, in file order.
///
/// tobj fills in a placeholder texcoord or normal index for face corners
/// written without one, so absence has to be read from the face lines.
fn face_attributes(text: &str) -> Vec<FaceAttributes> {
    let mut out = Vec::new();
    for line in text.lines() {
        let mut words = line.split_whitespace();
        if words.next() != Some("f") {
            continue;
        }
        let corners: Vec<&str> = words.collect();
        if corners.len() < 3 {
            continue;
        }
        let slot = |k: usize| {
            corners
                .iter()
                .all(|c| c.split('/').nth(k).is_some_and(|s| !s.is_empty()))
        };
        let attrs = FaceAttributes {
            texcoord: slot(1),
            normal: slot(2),
        };
        // Fan triangulation
        out.extend(std::iter::repeat(attrs).take(corners.len() - 2));
    }
    out
}

/// Append one tobj model's attributes to the mesh's global arrays and
/// return its triangles as a face with 1-based indices. `attributes` starts
/// at the model's first triangle.
fn append_model(
    mesh: &mut Mesh,
    m: &tobj::Mesh,
    mat_name: String,
    attributes: &[FaceAttributes],
) -> Face {
    let v_base = mesh.vertices.len() as u32;
    let t_base = mesh.uvs.len() as u32;
    let n_base = mesh.normals.len() as u32;

    mesh.vertices
        .extend(m.positions.chunks_exact(3).map(|p| DVec3::new(p[0], p[1], p[2])));
    mesh.normals
        .extend(m.normals.chunks_exact(3).map(|n| DVec3::new(n[0], n[1], n[2])));
    mesh.uvs
        .extend(m.texcoords.chunks_exact(2).map(|t| DVec2::new(t[0], t[1])));

    let has_uv = !m.texcoords.is_empty() && m.texcoord_indices.len() == m.indices.len();
    let has_normal = !m.normals.is_empty() && m.normal_indices.len() == m.indices.len();

    let corner = |k: usize| {
        let attrs = attributes.get(k / 3).copied().unwrap_or(FaceAttributes {
            texcoord: true,
            normal: true,
        });
        FaceVertex {
            v: v_base + m.indices[k] + 1,
            t: if has_uv && attrs.texcoord { t_base + m.texcoord_indices[k] + 1 } else { 0 },
            n: if has_normal && attrs.normal { n_base + m.normal_indices[k] + 1 } else { 0 },
        }
    };
    let triangles = (0..m.indices.len() / 3)
        .map(|i| Triangle::new(corner(3 * i), corner(3 * i + 1), corner(3 * i + 2)))
        .collect();

    Face {
        mat_name,
        triangles,
    }
}

fn color(rgb: Option<[f64; 3]>) -> Option<Reflectivity> {
    rgb.map(|c| Reflectivity::Color(Color::new(c[0], c[1], c[2])))
}

/// Keep a texture only if the file exists; returns its path relative to
/// the OBJ folder.
fn texture_path(file: Option<&String>, obj_dir: &Path, mtl_dir: &Path) -> Option<String> {
    let file = file?;
    let rel = mtl_dir.join(file);
    if obj_dir.join(&rel).is_file() {
        Some(rel.to_string_lossy().replace('\\', "/"))
    } else {
        warn!(texture = %file, "Texture file not found, dropping it");
        None
    }
}

fn convert_material(m: &tobj::Material, obj_dir: &Path, mtl_dir: &Path) -> Material {
    let transparency = m
        .unknown_param
        .get("Tr")
        .and_then(|v| v.trim().parse::<f64>().ok())
        .map(|factor| Transparency { factor });
    let dissolve = m.dissolve.map(|d| Dissolve {
        // `d 0` in the wild means "not set"
        factor: if d == 0.0 { 1.0 } else { d },
        halo: false,
    });

    Material {
        name: m.name.clone(),
        ambient: color(m.ambient),
        diffuse: color(m.diffuse),
        specular: color(m.specular),
        emissive: color(m.emissive),
        diffuse_texture: texture_path(m.diffuse_texture.as_ref(), obj_dir, mtl_dir),
        ambient_texture: texture_path(m.ambient_texture.as_ref(), obj_dir, mtl_dir),
        dissolve,
        transparency,
        specular_exponent: m.shininess.map_or(0, |s| s.round() as i32),
        optical_density: m.optical_density,
        illumination: m.illumination_model,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CUBE_CORNER: &str = "\
mtllib scene.mtl
o wall
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl brick
f 1/1/1 2/2/1 3/3/1 4/4/1
usemtl glass
f 1/1/1 3/3/1 4/4/1
o roof
v 0 0 1
v 1 0 1
v 0 1 1
f 5 6 7
";

    const SCENE_MTL: &str = "\
newmtl brick
Ka 0.1 0.1 0.1
Kd 0.8 0.2 0.1
Ks 0.05 0.05 0.05
Ns 250
map_Kd brick.png
newmtl glass
Kd 0.6 0.7 0.9
d 0.5
Ke 1 0.5 0
Tr 0.25
map_Kd missing.png
";

    fn write_scene(dir: &Path) {
        fs::write(dir.join("scene.mtl"), SCENE_MTL).unwrap();
        fs::write(dir.join("brick.png"), [0u8; 4]).unwrap();
    }

    #[test]
    fn models_group_by_name_and_material() {
        let dir = tempfile::tempdir().unwrap();
        write_scene(dir.path());
        let mesh = parse_obj(CUBE_CORNER, "scene", dir.path(), TextEncoding::Utf8).unwrap();

        assert_eq!(mesh.mat_filename.as_deref(), Some("scene.mtl"));
        assert_eq!(mesh.geometries.len(), 2);
        let wall = &mesh.geometries[0];
        assert_eq!(wall.id, "wall");
        assert_eq!(wall.faces.len(), 2);
        assert_eq!(wall.faces[0].mat_name, "brick");
        // Quad triangulated
        assert_eq!(wall.faces[0].triangles.len(), 2);
        assert_eq!(wall.faces[1].mat_name, "glass");
        assert_eq!(mesh.geometries[1].id, "roof");
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.triangle_count(), 4);
    }

    #[test]
    fn corners_keep_texcoord_and_normal_indices() {
        let dir = tempfile::tempdir().unwrap();
        write_scene(dir.path());
        let mesh = parse_obj(CUBE_CORNER, "scene", dir.path(), TextEncoding::Utf8).unwrap();

        let tri = mesh.geometries[0].faces[0].triangles[0];
        assert!(tri.v1.t > 0);
        assert!(tri.v1.n > 0);
        assert_eq!(mesh.normal(tri.v1.n), Some(DVec3::Z));
        let p = mesh.position(tri.v1.v).unwrap();
        let uv = mesh.uv(tri.v1.t).unwrap();
        assert_eq!((p.x, p.y), (uv.x, uv.y));

        // Roof has positions only
        let roof = mesh.geometries[1].faces[0].triangles[0];
        assert_eq!((roof.v1.t, roof.v1.n), (0, 0));
        assert_eq!(mesh.position(roof.v1.v), Some(DVec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn faces_without_normals_stay_unset_beside_faces_with_them() {
        let obj = "\
o lit
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vn 0 0 1
f 1//1 2//1 3//1
f 1 3 4
o bare
v 0 0 2
v 1 0 2
v 0 1 2
v 1 1 2
f 5/1 6/1 8/1 7/1
";
        let dir = tempfile::tempdir().unwrap();
        let mesh = parse_obj(obj, "mixed", dir.path(), TextEncoding::Utf8).unwrap();

        let lit = &mesh.geometries[0].faces[0].triangles;
        assert_eq!(lit.len(), 2);
        assert!(lit[0].corners().iter().all(|c| c.t == 0 && c.n > 0));
        assert!(lit[1].corners().iter().all(|c| c.t == 0 && c.n == 0));

        // Quad keeps its texcoords in both halves, and gains no normal
        let bare = &mesh.geometries[1].faces[0].triangles;
        assert_eq!(bare.len(), 2);
        assert!(bare.iter().flat_map(|t| t.corners()).all(|c| c.t > 0 && c.n == 0));
    }

    #[test]
    fn face_attributes_follow_fan_triangulation() {
        let attrs = face_attributes("f 1/1 2/2 3/3 4/4 5/5\nl 1 2\nf 1//1 2//1 3//1\n# f 1 2 3\n");
        assert_eq!(attrs.len(), 4);
        assert!(attrs[..3].iter().all(|a| a.texcoord && !a.normal));
        assert!(!attrs[3].texcoord && attrs[3].normal);
    }

    #[test]
    fn mtl_fields_map_onto_material() {
        let dir = tempfile::tempdir().unwrap();
        write_scene(dir.path());
        let mesh = parse_obj(CUBE_CORNER, "scene", dir.path(), TextEncoding::Utf8).unwrap();

        let brick = mesh.material("brick").unwrap();
        assert_eq!(brick.specular_exponent, 250);
        assert_eq!(brick.diffuse_texture.as_deref(), Some("brick.png"));
        assert_eq!(
            brick.diffuse.as_ref().and_then(Reflectivity::color),
            Some(Color::new(0.8, 0.2, 0.1))
        );

        let glass = mesh.material("glass").unwrap();
        assert_eq!(glass.dissolve.map(|d| d.factor), Some(0.5));
        assert_eq!(glass.transparency.map(|t| t.factor), Some(0.25));
        assert_eq!(
            glass.emissive.as_ref().and_then(Reflectivity::color),
            Some(Color::new(1.0, 0.5, 0.0))
        );
        // Missing texture file is dropped
        assert!(glass.diffuse_texture.is_none());
    }

    #[test]
    fn zero_dissolve_means_opaque() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("z.mtl"), "newmtl z\nKd 1 1 1\nd 0\n").unwrap();
        let obj = "mtllib z.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl z\nf 1 2 3\n";
        let mesh = parse_obj(obj, "z", dir.path(), TextEncoding::Utf8).unwrap();
        let z = mesh.material("z").unwrap();
        assert_eq!(z.dissolve.map(|d| d.factor), Some(1.0));
        assert_eq!(z.alpha(), 1.0);
    }

    #[test]
    fn missing_mtl_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let obj = "mtllib nowhere.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl any\nf 1 2 3\n";
        let mesh = parse_obj(obj, "lonely", dir.path(), TextEncoding::Utf8).unwrap();
        assert!(mesh.materials.is_empty());
        assert_eq!(mesh.geometries[0].faces[0].mat_name, "");
        assert_eq!(mesh.triangle_count(), 1);
    }
}
