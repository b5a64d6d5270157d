use std::collections::HashMap;
use std::fs;
use std::path::Path;

use gltf_json::material::{AlphaMode, EmissiveFactor, PbrBaseColorFactor, PbrMetallicRoughness, StrengthFactor};
use gltf_json::validation::{Checked, USize64};
use gltf_json::{Index, Root};
use image::ImageFormat;
use tracing::debug;

use super::pad_to_boundary;
use crate::error::{ObjTilesError, Result};
use crate::types::{Material, Mesh};

pub const DEFAULT_MATERIAL: &str = "default";

/// Grey, fully metallic, perfectly smooth. Used for faces whose material
/// is missing from the library.
pub fn default_material(name: &str) -> gltf_json::Material {
    gltf_json::Material {
        name: Some(name.to_string()),
        alpha_mode: Checked::Valid(AlphaMode::Opaque),
        pbr_metallic_roughness: PbrMetallicRoughness {
            base_color_factor: PbrBaseColorFactor([0.5, 0.5, 0.5, 1.0]),
            metallic_factor: StrengthFactor(1.0),
            roughness_factor: StrengthFactor(0.0),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Blinn-Phong shininess and specular intensity folded into a
/// metallic-roughness roughness factor.
pub fn roughness_factor(mat: &Material) -> f64 {
    let mut roughness = (1.0 - f64::from(mat.specular_exponent) / 1000.0).clamp(0.0, 1.0);
    if let Some(specular) = mat.specular.as_ref().and_then(|s| s.color()) {
        let intensity = specular.luminance();
        // Dim highlights read as rough even with a high exponent
        if intensity < 0.1 {
            roughness *= 1.0 - intensity;
        }
    }
    roughness
}

/// Base color: diffuse, else ambient, else light grey, with the derived alpha.
pub fn base_color(mat: &Material) -> [f64; 4] {
    let alpha = mat.alpha();
    mat.diffuse
        .as_ref()
        .and_then(|r| r.color())
        .or_else(|| mat.ambient.as_ref().and_then(|r| r.color()))
        .map(|c| c.to_rgba(alpha))
        .unwrap_or([0.7, 0.7, 0.7, alpha])
}

/// MIME type for the image formats a glTF viewer is expected to decode.
pub fn mime_type(file: &str) -> Option<&'static str> {
    match ImageFormat::from_path(file).ok()? {
        format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif) => {
            Some(format.to_mime_type())
        }
        _ => None,
    }
}

/// Convert one MTL material into a glTF material.
pub fn convert_material(
    mat: &Material,
    texture: Option<Index<gltf_json::Texture>>,
) -> gltf_json::Material {
    let alpha = mat.alpha();
    let color = base_color(mat).map(|c| c as f32);
    let emissive = mat
        .emissive
        .as_ref()
        .and_then(|r| r.color())
        .map(|c| c.to_array().map(|v| v as f32))
        .unwrap_or([0.0; 3]);

    let blend = alpha < 1.0;
    gltf_json::Material {
        name: Some(mat.name.clone()),
        alpha_mode: Checked::Valid(if blend {
            AlphaMode::Blend
        } else {
            AlphaMode::Opaque
        }),
        double_sided: blend,
        pbr_metallic_roughness: PbrMetallicRoughness {
            base_color_factor: PbrBaseColorFactor(color),
            metallic_factor: StrengthFactor(0.0),
            roughness_factor: StrengthFactor(roughness_factor(mat) as f32),
            base_color_texture: texture.map(|index| gltf_json::texture::Info {
                index,
                tex_coord: 0,
                extensions: Default::default(),
                extras: Default::default(),
            }),
            ..Default::default()
        },
        emissive_factor: EmissiveFactor(emissive),
        ..Default::default()
    }
}

/// Name-keyed material and texture registry for one conversion.
#[derive(Debug, Default)]
pub(crate) struct MaterialCache {
    materials: HashMap<String, Index<gltf_json::Material>>,
    textures: HashMap<String, Index<gltf_json::Texture>>,
    /// Texture file per glTF image, in image index order.
    image_files: Vec<String>,
}

impl MaterialCache {
    /// Index of the glTF material for `mat_name`, creating it on first use.
    pub fn get_or_add(
        &mut self,
        root: &mut Root,
        mesh: &Mesh,
        mat_name: &str,
    ) -> Index<gltf_json::Material> {
        let name = if mat_name.is_empty() {
            DEFAULT_MATERIAL
        } else {
            mat_name
        };
        if let Some(&index) = self.materials.get(name) {
            return index;
        }

        let gltf_mat = match mesh.material(name) {
            Some(mat) => {
                let texture = mat
                    .diffuse_texture
                    .as_deref()
                    .map(|file| self.texture(root, file));
                convert_material(mat, texture)
            }
            None => {
                debug!(material = name, "Material not in library, using default");
                default_material(DEFAULT_MATERIAL)
            }
        };
        let index = root.push(gltf_mat);
        self.materials.insert(name.to_string(), index);
        index
    }

    /// Texture for `file`, shared across materials.
    fn texture(&mut self, root: &mut Root, file: &str) -> Index<gltf_json::Texture> {
        if let Some(&index) = self.textures.get(file) {
            return index;
        }
        let image = root.push(gltf_json::Image {
            buffer_view: None,
            mime_type: mime_type(file).map(|m| gltf_json::image::MimeType(m.to_string())),
            uri: None,
            name: Some(file.to_string()),
            extensions: Default::default(),
            extras: Default::default(),
        });
        self.image_files.push(file.to_string());
        let index = root.push(gltf_json::Texture {
            sampler: Some(Index::new(0)),
            source: image,
            name: Some(file.to_string()),
            extensions: Default::default(),
            extras: Default::default(),
        });
        self.textures.insert(file.to_string(), index);
        index
    }

    pub fn has_images(&self) -> bool {
        !self.image_files.is_empty()
    }

    /// Append every referenced image file to `buffer`, one bufferView each,
    /// then re-pad the buffer to 4 bytes.
    pub fn fill_image_buffers(
        &self,
        root: &mut Root,
        buffer: &mut Vec<u8>,
        folder: &Path,
    ) -> Result<()> {
        for (i, file) in self.image_files.iter().enumerate() {
            let path = folder.join(file);
            let bytes = fs::read(&path).map_err(|e| {
                ObjTilesError::Input(format!("cannot read texture {}: {e}", path.display()))
            })?;
            let view = root.push(gltf_json::buffer::View {
                buffer: Index::new(0),
                byte_length: USize64::from(bytes.len()),
                byte_offset: Some(USize64::from(buffer.len())),
                byte_stride: None,
                name: None,
                target: None,
                extensions: Default::default(),
                extras: Default::default(),
            });
            root.images[i].buffer_view = Some(view);
            buffer.extend_from_slice(&bytes);
        }
        pad_to_boundary(buffer, 4, 0);
        Ok(())
    }
}
