use std::collections::{HashMap, HashSet};

use glam::{DVec2, DVec3};

use super::material::Material;
use crate::error::{ObjTilesError, Result};
use crate::math::BoundingBox;

/// One corner of a triangle: 1-based indices into the mesh's position,
/// texcoord and normal arrays. Zero means "absent".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FaceVertex {
    pub v: u32,
    pub t: u32,
    pub n: u32,
}

impl FaceVertex {
    pub fn new(v: u32, t: u32, n: u32) -> Self {
        Self { v, t, n }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub v1: FaceVertex,
    pub v2: FaceVertex,
    pub v3: FaceVertex,
}

impl Triangle {
    pub fn new(v1: FaceVertex, v2: FaceVertex, v3: FaceVertex) -> Self {
        Self { v1, v2, v3 }
    }

    pub fn corners(&self) -> [FaceVertex; 3] {
        [self.v1, self.v2, self.v3]
    }
}

/// A run of triangles sharing one material. An empty name means the
/// default material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Face {
    pub mat_name: String,
    pub triangles: Vec<Triangle>,
}

/// A named group (`o` / `g`) of faces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub id: String,
    pub faces: Vec<Face>,
}

impl Geometry {
    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(|f| f.triangles.len()).sum()
    }
}

/// Parsed polygon mesh: shared attribute arrays plus grouped faces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub name: String,
    /// MTL library file name, relative to the OBJ folder.
    pub mat_filename: Option<String>,
    pub vertices: Vec<DVec3>,
    pub normals: Vec<DVec3>,
    pub uvs: Vec<DVec2>,
    pub geometries: Vec<Geometry>,
    pub materials: Vec<Material>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.geometries.iter().map(|g| g.triangle_count()).sum()
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name == name)
    }

    /// 1-based position lookup; `None` for 0 or out of range.
    pub fn position(&self, v: u32) -> Option<DVec3> {
        (v as usize).checked_sub(1).and_then(|i| self.vertices.get(i).copied())
    }

    pub fn normal(&self, n: u32) -> Option<DVec3> {
        (n as usize).checked_sub(1).and_then(|i| self.normals.get(i).copied())
    }

    pub fn uv(&self, t: u32) -> Option<DVec2> {
        (t as usize).checked_sub(1).and_then(|i| self.uvs.get(i).copied())
    }

    /// Check that every corner resolves inside its attribute array.
    pub fn validate(&self) -> Result<()> {
        for g in &self.geometries {
            for f in &g.faces {
                for tri in &f.triangles {
                    for c in tri.corners() {
                        if c.v == 0 || c.v as usize > self.vertices.len() {
                            return Err(ObjTilesError::Input(format!(
                                "{}: vertex index {} out of range (1..={})",
                                g.id,
                                c.v,
                                self.vertices.len()
                            )));
                        }
                        if c.t as usize > self.uvs.len() {
                            return Err(ObjTilesError::Input(format!(
                                "{}: texcoord index {} out of range (0..={})",
                                g.id,
                                c.t,
                                self.uvs.len()
                            )));
                        }
                        if c.n as usize > self.normals.len() {
                            return Err(ObjTilesError::Input(format!(
                                "{}: normal index {} out of range (0..={})",
                                g.id,
                                c.n,
                                self.normals.len()
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Per-axis extents of all vertices.
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bb = BoundingBox::default();
        for v in &self.vertices {
            bb.update(*v);
        }
        bb
    }

    /// Mean of the distinct positions a geometry references.
    fn geometry_center(&self, g: &Geometry) -> Option<DVec3> {
        let mut seen = HashSet::new();
        let points: Vec<DVec3> = g
            .faces
            .iter()
            .flat_map(|f| &f.triangles)
            .flat_map(|tri| tri.corners())
            .filter(|c| seen.insert(c.v))
            .filter_map(|c| self.position(c.v))
            .collect();
        if points.is_empty() {
            return None;
        }
        Some(points.iter().copied().sum::<DVec3>() / points.len() as f64)
    }

    /// Partition geometries into `level³` spatial cells.
    ///
    /// Each geometry lands in the first cell containing its vertex centroid.
    /// Every non-empty cell becomes a compact sub-mesh named `{name}_{k}`
    /// sharing this mesh's materials.
    pub fn split(&self, level: usize) -> Vec<Mesh> {
        if level <= 1 {
            return vec![self.clone()];
        }
        let boxes = self.bounding_box().split(level);
        let mut cells: Vec<SplitCell> = (0..boxes.len()).map(|_| SplitCell::default()).collect();

        for g in &self.geometries {
            let Some(center) = self.geometry_center(g) else {
                continue;
            };
            let index = boxes
                .iter()
                .position(|b| b.contains_point(center))
                .unwrap_or(boxes.len() - 1);
            let rebased = cells[index].rebase(g);
            cells[index].geometries.push(rebased);
        }

        let mut out = Vec::new();
        for cell in cells {
            if cell.geometries.is_empty() {
                continue;
            }
            out.push(Mesh {
                name: format!("{}_{}", self.name, out.len()),
                mat_filename: self.mat_filename.clone(),
                vertices: cell.positions.order.iter().filter_map(|&v| self.position(v)).collect(),
                normals: cell.normals.order.iter().filter_map(|&n| self.normal(n)).collect(),
                uvs: cell.uvs.order.iter().filter_map(|&t| self.uv(t)).collect(),
                geometries: cell.geometries,
                materials: self.materials.clone(),
            });
        }
        out
    }
}

/// First-use renumbering of one attribute array.
#[derive(Default)]
struct Remap {
    order: Vec<u32>,
    lookup: HashMap<u32, u32>,
}

impl Remap {
    fn get(&mut self, old: u32) -> u32 {
        if old == 0 {
            return 0;
        }
        if let Some(&new) = self.lookup.get(&old) {
            return new;
        }
        self.order.push(old);
        let new = self.order.len() as u32;
        self.lookup.insert(old, new);
        new
    }
}

#[derive(Default)]
struct SplitCell {
    geometries: Vec<Geometry>,
    positions: Remap,
    normals: Remap,
    uvs: Remap,
}

impl SplitCell {
    fn corner(&mut self, c: FaceVertex) -> FaceVertex {
        FaceVertex::new(self.positions.get(c.v), self.uvs.get(c.t), self.normals.get(c.n))
    }

    fn rebase(&mut self, g: &Geometry) -> Geometry {
        let mut faces = Vec::with_capacity(g.faces.len());
        for f in &g.faces {
            let mut triangles = Vec::with_capacity(f.triangles.len());
            for t in &f.triangles {
                let v1 = self.corner(t.v1);
                let v2 = self.corner(t.v2);
                let v3 = self.corner(t.v3);
                triangles.push(Triangle::new(v1, v2, v3));
            }
            faces.push(Face {
                mat_name: f.mat_name.clone(),
                triangles,
            });
        }
        Geometry {
            id: g.id.clone(),
            faces,
        }
    }
}
