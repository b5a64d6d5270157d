//! OBJ mesh to glTF 2.0 scene encoding.
//!
//! [`Converter`] turns one [`Mesh`] into a `gltf_json::Root` plus a single
//! binary buffer. In binary mode the pair is framed as GLB; otherwise the
//! buffer is embedded as a base64 data URI.

pub mod batch_table;
pub mod materials;
pub mod packer;

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use gltf_json::texture::{MagFilter, MinFilter, Sampler, WrappingMode};
use gltf_json::validation::{Checked, USize64};
use gltf_json::Root;
use tracing::{debug, info};

pub use batch_table::BatchTable;
pub use packer::{merge_faces_by_material, pack_face_set, requires_u32_indices};

use crate::config::TextEncoding;
use crate::error::{ObjTilesError, Result};
use crate::tiling::glb_writer;
use crate::types::Mesh;
use materials::MaterialCache;
use packer::Packer;

/// Append `fill` bytes until `bytes.len()` is a multiple of `boundary`.
pub fn pad_to_boundary(bytes: &mut Vec<u8>, boundary: usize, fill: u8) {
    let remainder = bytes.len() % boundary;
    if remainder != 0 {
        bytes.resize(bytes.len() + boundary - remainder, fill);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GltfOptions {
    /// Buffer name and default output file stem.
    pub name: String,
    pub binary: bool,
    pub with_batch_table: bool,
    /// Character encoding of the OBJ and MTL text.
    pub encoding: TextEncoding,
}

impl Default for GltfOptions {
    fn default() -> Self {
        Self {
            name: "Untitled".into(),
            binary: false,
            with_batch_table: false,
            encoding: TextEncoding::default(),
        }
    }
}

/// Everything one conversion produces.
#[derive(Debug)]
pub struct SceneOutput {
    pub root: Root,
    /// Geometry followed by embedded images, 4-byte aligned.
    pub buffer: Vec<u8>,
    /// Framed GLB, present in binary mode.
    pub glb: Option<Vec<u8>>,
    pub batch_table: Option<BatchTable>,
}

impl SceneOutput {
    pub fn to_json(&self) -> Result<String> {
        gltf_json::serialize::to_string_pretty(&self.root)
            .map_err(|e| ObjTilesError::Encoding(format!("glTF JSON: {e}")))
    }

    /// Write the GLB bytes, or the JSON document when not in binary mode.
    pub fn write(&self, path: &Path) -> Result<()> {
        match &self.glb {
            Some(glb) => fs::write(path, glb),
            None => fs::write(path, self.to_json()?),
        }
        .map_err(|e| ObjTilesError::Output(format!("{}: {e}", path.display())))
    }
}

/// Encodes one mesh. Texture files are resolved against `folder`.
#[derive(Debug)]
pub struct Converter<'a> {
    mesh: &'a Mesh,
    folder: PathBuf,
    options: GltfOptions,
}

impl<'a> Converter<'a> {
    pub fn new(mesh: &'a Mesh, folder: impl Into<PathBuf>, options: GltfOptions) -> Self {
        Self {
            mesh,
            folder: folder.into(),
            options,
        }
    }

    pub fn run(&self) -> Result<SceneOutput> {
        self.mesh.validate()?;

        let mut root = Root {
            asset: gltf_json::Asset {
                version: "2.0".into(),
                generator: Some(env!("CARGO_PKG_NAME").into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let scene = root.push(gltf_json::Scene {
            nodes: Vec::new(),
            name: None,
            extensions: Default::default(),
            extras: Default::default(),
        });
        root.scene = Some(scene);

        let mut materials = MaterialCache::default();
        let mut packer = Packer::new(self.mesh, self.options.with_batch_table);
        let mut primitive_count = 0;

        for geometry in &self.mesh.geometries {
            let primitives = packer.add_geometry(&mut root, &mut materials, geometry)?;
            if primitives.is_empty() {
                debug!(geometry = %geometry.id, "Skipping geometry without triangles");
                continue;
            }
            primitive_count += primitives.len();
            let mesh = root.push(gltf_json::Mesh {
                primitives,
                weights: None,
                name: Some(geometry.id.clone()),
                extensions: Default::default(),
                extras: Default::default(),
            });
            let node = root.push(gltf_json::Node {
                mesh: Some(mesh),
                name: Some(geometry.id.clone()),
                ..Default::default()
            });
            root.scenes[0].nodes.push(node);
        }

        if materials.has_images() {
            root.push(Sampler {
                mag_filter: Some(Checked::Valid(MagFilter::Linear)),
                min_filter: Some(Checked::Valid(MinFilter::NearestMipmapLinear)),
                wrap_s: Checked::Valid(WrappingMode::Repeat),
                wrap_t: Checked::Valid(WrappingMode::Repeat),
                name: None,
                extensions: Default::default(),
                extras: Default::default(),
            });
        }

        let (mut buffer, batch_table) = packer.finish(&mut root);
        root.push(gltf_json::Buffer {
            byte_length: USize64(0),
            uri: None,
            name: Some(self.options.name.clone()),
            extensions: Default::default(),
            extras: Default::default(),
        });
        materials.fill_image_buffers(&mut root, &mut buffer, &self.folder)?;
        root.buffers[0].byte_length = USize64::from(buffer.len());

        let glb = if self.options.binary {
            Some(glb_writer::write_glb(&root, &buffer)?)
        } else {
            root.buffers[0].uri = Some(format!(
                "data:application/octet-stream;base64,{}",
                BASE64_STANDARD.encode(&buffer)
            ));
            None
        };

        info!(
            mesh = %self.mesh.name,
            primitives = primitive_count,
            bytes = buffer.len(),
            "Encoded glTF scene"
        );
        Ok(SceneOutput {
            root,
            buffer,
            glb,
            batch_table,
        })
    }
}
