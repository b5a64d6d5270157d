use std::borrow::Cow;

use gltf::binary::Glb;
use gltf_json::Root;

use crate::encoder::pad_to_boundary;
use crate::error::{ObjTilesError, Result};

/// Pad JSON text with trailing spaces so that `offset + len` lands on a
/// multiple of `boundary`.
pub fn json_padded(json: &[u8], boundary: usize, offset: usize) -> Vec<u8> {
    let mut bytes = json.to_vec();
    let remainder = (offset + bytes.len()) % boundary;
    if remainder != 0 {
        bytes.resize(bytes.len() + boundary - remainder, b' ');
    }
    bytes
}

/// Frame a glTF document and its buffer as GLB.
///
/// When the document's buffer already points at an external URI the BIN
/// chunk is left out entirely rather than written empty. [`Converter`]
/// never produces such a buffer in binary mode.
///
/// [`Converter`]: crate::encoder::Converter
pub fn write_glb(root: &Root, bin: &[u8]) -> Result<Vec<u8>> {
    let json_string = gltf_json::serialize::to_string(root)
        .map_err(|e| ObjTilesError::Encoding(format!("glTF JSON: {e}")))?;
    let json_bytes = json_padded(json_string.as_bytes(), 4, 0);

    let external = root.buffers.first().is_some_and(|b| b.uri.is_some());
    let bin = if external {
        None
    } else {
        let mut data = bin.to_vec();
        pad_to_boundary(&mut data, 4, 0);
        Some(data)
    };

    let length = 12 + 8 + json_bytes.len() + bin.as_ref().map_or(0, |b| 8 + b.len());
    let glb = Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length: length as u32,
        },
        json: Cow::Owned(json_bytes),
        bin: bin.map(Cow::Owned),
    };

    glb.to_vec()
        .map_err(|e| ObjTilesError::Encoding(format!("GLB framing: {e}")))
}
