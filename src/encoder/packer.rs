use std::collections::{BTreeMap, HashMap, HashSet};

use glam::DVec3;
use gltf_json::accessor::{ComponentType, GenericComponentType, Type as AccessorType};
use gltf_json::buffer::{Stride, Target};
use gltf_json::mesh::{Mode, Primitive, Semantic};
use gltf_json::validation::{Checked, USize64};
use gltf_json::{Index, Root};
use serde_json::json;

use super::batch_table::BatchTable;
use super::materials::MaterialCache;
use super::pad_to_boundary;
use crate::error::{ObjTilesError, Result};
use crate::math::{BoundingBox, MinMax};
use crate::types::{Face, FaceVertex, Geometry, Mesh, Triangle};

/// Meshes with more positions than this get 32-bit indices.
pub const MAX_U16_VERTICES: usize = 65534;

/// Index width for every primitive of `mesh`: 32-bit when the position
/// count, or the distinct `(v, t, n)` corners of any material group, would
/// overflow a 16-bit index.
pub fn requires_u32_indices(mesh: &Mesh) -> bool {
    if mesh.vertices.len() > MAX_U16_VERTICES {
        return true;
    }
    mesh.geometries.iter().any(|geometry| {
        merge_faces_by_material(&geometry.faces).iter().any(|face| {
            let corners: HashSet<FaceVertex> =
                face.triangles.iter().flat_map(|t| t.corners()).collect();
            corners.len() > usize::from(u16::MAX)
        })
    })
}

/// Merge faces sharing a material, keeping first-appearance order, and drop
/// the ones left without triangles.
pub fn merge_faces_by_material(faces: &[Face]) -> Vec<Face> {
    let mut merged: Vec<Face> = Vec::new();
    for face in faces {
        match merged.iter_mut().find(|m| m.mat_name == face.mat_name) {
            Some(m) => m.triangles.extend_from_slice(&face.triangles),
            None => merged.push(face.clone()),
        }
    }
    merged.retain(|f| !f.triangles.is_empty());
    merged
}

/// Whether `(a, b, c)` already faces along `normal`.
pub fn winding_matches(a: DVec3, b: DVec3, c: DVec3, normal: DVec3) -> bool {
    (b - a).cross(c - a).dot(normal) > 0.0
}

/// De-duplicated vertex streams for one material group.
#[derive(Debug, Default)]
pub struct FaceSetBuffers {
    pub positions: Vec<u8>,
    pub normals: Vec<u8>,
    pub uvs: Vec<u8>,
    pub indices: Vec<u32>,
    pub vertex_count: usize,
    pub normal_count: usize,
    pub uv_count: usize,
    pub position_bounds: BoundingBox,
    pub normal_bounds: BoundingBox,
    pub uv_bounds: [MinMax; 2],
}

fn push_f32(buf: &mut Vec<u8>, v: f64) {
    buf.extend_from_slice(&(v as f32).to_le_bytes());
}

/// Round-trip through f32 so accessor bounds match the stored values.
fn stored(v: DVec3) -> DVec3 {
    v.as_vec3().as_dvec3()
}

/// Emit one vertex per distinct `(v, t, n)` corner and an index list with
/// every triangle wound to agree with its first corner's normal.
///
/// Texture V is flipped into glTF's top-left origin.
pub fn pack_face_set(mesh: &Mesh, triangles: &[Triangle]) -> FaceSetBuffers {
    let mut out = FaceSetBuffers::default();
    let mut cache: HashMap<FaceVertex, u32> = HashMap::new();

    for tri in triangles {
        let corners = tri.corners();
        let positions = corners.map(|c| stored(mesh.position(c.v).unwrap_or_default()));
        let normals = corners.map(|c| stored(mesh.normal(c.n).unwrap_or_default()));
        let uvs = corners.map(|c| {
            let uv = mesh.uv(c.t).unwrap_or_default();
            [uv.x as f32 as f64, (1.0 - uv.y) as f32 as f64]
        });

        for p in positions {
            out.position_bounds.update(p);
        }
        for (c, n) in corners.iter().zip(normals) {
            if c.n > 0 {
                out.normal_bounds.update(n);
            }
        }
        for (c, uv) in corners.iter().zip(uvs) {
            if c.t > 0 {
                out.uv_bounds[0].update(uv[0]);
                out.uv_bounds[1].update(uv[1]);
            }
        }

        let mut index = [0u32; 3];
        for (k, corner) in corners.into_iter().enumerate() {
            index[k] = match cache.get(&corner) {
                Some(&i) => i,
                None => {
                    let i = out.vertex_count as u32;
                    cache.insert(corner, i);
                    out.vertex_count += 1;
                    for axis in positions[k].to_array() {
                        push_f32(&mut out.positions, axis);
                    }
                    if corner.n > 0 {
                        for axis in normals[k].to_array() {
                            push_f32(&mut out.normals, axis);
                        }
                        out.normal_count += 1;
                    }
                    if corner.t > 0 {
                        push_f32(&mut out.uvs, uvs[k][0]);
                        push_f32(&mut out.uvs, uvs[k][1]);
                        out.uv_count += 1;
                    }
                    i
                }
            };
        }

        let [a, b, c] = positions;
        if winding_matches(a, b, c, normals[0]) {
            out.indices.extend_from_slice(&[index[0], index[1], index[2]]);
        } else {
            out.indices.extend_from_slice(&[index[0], index[2], index[1]]);
        }
    }
    out
}

fn accessor(
    count: usize,
    component: ComponentType,
    type_: AccessorType,
    min: serde_json::Value,
    max: serde_json::Value,
    name: String,
) -> gltf_json::Accessor {
    gltf_json::Accessor {
        buffer_view: None,
        byte_offset: None,
        count: USize64::from(count),
        component_type: Checked::Valid(GenericComponentType(component)),
        type_: Checked::Valid(type_),
        min: Some(min),
        max: Some(max),
        name: Some(name),
        normalized: false,
        sparse: None,
        extensions: Default::default(),
        extras: Default::default(),
    }
}

/// Bytes waiting to be laid out in a bufferView, tagged with their accessor.
#[derive(Debug)]
struct Chunk {
    accessor: Index<gltf_json::Accessor>,
    bytes: Vec<u8>,
}

/// Accumulates primitives for one mesh, then lays every stream out in a
/// single binary buffer.
pub(crate) struct Packer<'a> {
    mesh: &'a Mesh,
    u32_indices: bool,
    batch_table: Option<BatchTable>,
    next_batch_id: usize,
    positions: Vec<Chunk>,
    normals: Vec<Chunk>,
    uvs: Vec<Chunk>,
    indices: Vec<Chunk>,
    batch_ids: Vec<Chunk>,
}

impl<'a> Packer<'a> {
    pub fn new(mesh: &'a Mesh, with_batch_table: bool) -> Self {
        Self {
            mesh,
            u32_indices: requires_u32_indices(mesh),
            batch_table: with_batch_table.then(BatchTable::default),
            next_batch_id: 0,
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
            batch_ids: Vec::new(),
        }
    }

    /// One primitive per material group of `geometry`.
    pub fn add_geometry(
        &mut self,
        root: &mut Root,
        materials: &mut MaterialCache,
        geometry: &Geometry,
    ) -> Result<Vec<Primitive>> {
        let faces = merge_faces_by_material(&geometry.faces);
        let mut primitives = Vec::with_capacity(faces.len());
        for (k, face) in faces.iter().enumerate() {
            let face_name = if k == 0 {
                geometry.id.clone()
            } else {
                format!("{}_{k}", geometry.id)
            };
            primitives.push(self.add_face_set(root, materials, face, &face_name)?);
        }
        Ok(primitives)
    }

    fn add_face_set(
        &mut self,
        root: &mut Root,
        materials: &mut MaterialCache,
        face: &Face,
        face_name: &str,
    ) -> Result<Primitive> {
        let material = materials.get_or_add(root, self.mesh, &face.mat_name);
        let data = pack_face_set(self.mesh, &face.triangles);
        let mut attributes = BTreeMap::new();

        let bounds = &data.position_bounds;
        let min = [bounds.x.min, bounds.y.min, bounds.z.min];
        let max = [bounds.x.max, bounds.y.max, bounds.z.max];
        let position = root.push(accessor(
            data.vertex_count,
            ComponentType::F32,
            AccessorType::Vec3,
            json!(min),
            json!(max),
            format!("{face_name}_positions"),
        ));
        self.positions.push(Chunk {
            accessor: position,
            bytes: data.positions,
        });
        attributes.insert(Checked::Valid(Semantic::Positions), position);

        if data.normal_count > 0 {
            let nb = &data.normal_bounds;
            let normal = root.push(accessor(
                data.normal_count,
                ComponentType::F32,
                AccessorType::Vec3,
                json!([nb.x.min, nb.y.min, nb.z.min]),
                json!([nb.x.max, nb.y.max, nb.z.max]),
                format!("{face_name}_normals"),
            ));
            self.normals.push(Chunk {
                accessor: normal,
                bytes: data.normals,
            });
            attributes.insert(Checked::Valid(Semantic::Normals), normal);
        }

        if data.uv_count > 0 {
            let [u, v] = &data.uv_bounds;
            let texcoord = root.push(accessor(
                data.uv_count,
                ComponentType::F32,
                AccessorType::Vec2,
                json!([u.min, v.min]),
                json!([u.max, v.max]),
                format!("{face_name}_texcoords"),
            ));
            self.uvs.push(Chunk {
                accessor: texcoord,
                bytes: data.uvs,
            });
            attributes.insert(Checked::Valid(Semantic::TexCoords(0)), texcoord);
        } else if let Some(m) = root.materials.get_mut(material.value()) {
            // A texture with nothing to sample it
            m.pbr_metallic_roughness.base_color_texture = None;
        }

        if let Some(batch_table) = self.batch_table.as_mut() {
            let batch_id = u16::try_from(self.next_batch_id).map_err(|_| {
                ObjTilesError::Encoding(format!(
                    "{}: more than {} batched primitives",
                    self.mesh.name,
                    u16::MAX
                ))
            })?;
            self.next_batch_id += 1;
            batch_table.push(batch_id, face_name, min, max);

            let ids = root.push(accessor(
                data.vertex_count,
                ComponentType::U16,
                AccessorType::Scalar,
                json!([batch_id]),
                json!([batch_id]),
                format!("{face_name}_batchId"),
            ));
            let bytes = batch_id.to_le_bytes().repeat(data.vertex_count);
            self.batch_ids.push(Chunk { accessor: ids, bytes });
            attributes.insert(Checked::Valid(Semantic::Extras("BATCHID".into())), ids);
        }

        let (component, bytes) = if self.u32_indices {
            let bytes = data.indices.iter().flat_map(|i| i.to_le_bytes()).collect();
            (ComponentType::U32, bytes)
        } else {
            let bytes = data.indices.iter().flat_map(|&i| (i as u16).to_le_bytes()).collect();
            (ComponentType::U16, bytes)
        };
        let index_min = data.indices.iter().min().copied().unwrap_or(0);
        let index_max = data.indices.iter().max().copied().unwrap_or(0);
        let indices = root.push(accessor(
            data.indices.len(),
            component,
            AccessorType::Scalar,
            json!([index_min]),
            json!([index_max]),
            format!("{face_name}_indices"),
        ));
        self.indices.push(Chunk {
            accessor: indices,
            bytes,
        });

        Ok(Primitive {
            attributes,
            indices: Some(indices),
            material: Some(material),
            mode: Checked::Valid(Mode::Triangles),
            targets: None,
            extensions: Default::default(),
            extras: Default::default(),
        })
    }

    /// Lay out one bufferView per stream kind and point every accessor at
    /// its slice. Returns the 4-byte padded buffer and the batch table.
    pub fn finish(self, root: &mut Root) -> (Vec<u8>, Option<BatchTable>) {
        let mut buffer = Vec::new();
        let streams = [
            (self.positions, Some(12), Target::ArrayBuffer),
            (self.normals, Some(12), Target::ArrayBuffer),
            (self.uvs, Some(8), Target::ArrayBuffer),
            (self.indices, None, Target::ElementArrayBuffer),
            (self.batch_ids, None, Target::ArrayBuffer),
        ];
        for (chunks, stride, target) in streams {
            add_buffer_view(root, &mut buffer, chunks, stride, target);
        }
        pad_to_boundary(&mut buffer, 4, 0);
        (buffer, self.batch_table)
    }
}

fn add_buffer_view(
    root: &mut Root,
    buffer: &mut Vec<u8>,
    chunks: Vec<Chunk>,
    stride: Option<usize>,
    target: Target,
) {
    if chunks.is_empty() {
        return;
    }
    let view_index = root.buffer_views.len();
    let view = Index::new(view_index as u32);
    let view_offset = buffer.len();
    let mut length = 0;
    for chunk in chunks {
        if let Some(a) = root.accessors.get_mut(chunk.accessor.value()) {
            a.buffer_view = Some(view);
            a.byte_offset = Some(USize64::from(length));
        }
        length += chunk.bytes.len();
        buffer.extend_from_slice(&chunk.bytes);
    }
    root.push(gltf_json::buffer::View {
        buffer: Index::new(0),
        byte_length: USize64::from(length),
        byte_offset: Some(USize64::from(view_offset)),
        byte_stride: stride.map(Stride),
        name: Some(format!("bufferView_{view_index}")),
        target: Some(Checked::Valid(target)),
        extensions: Default::default(),
        extras: Default::default(),
    });
}
