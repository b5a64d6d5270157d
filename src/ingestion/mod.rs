//! OBJ/MTL ingestion into the in-memory [`Mesh`] model.

pub mod obj_loader;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::TextEncoding;
use crate::error::{ObjTilesError, Result};
use crate::types::Mesh;

pub use obj_loader::parse_obj;

/// Decode OBJ/MTL bytes. A UTF-8 byte-order mark is dropped.
pub fn decode_text(bytes: &[u8], encoding: TextEncoding) -> Result<String> {
    match encoding {
        TextEncoding::Utf8 => {
            let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            String::from_utf8(bytes.to_vec()).map_err(|e| {
                ObjTilesError::Input(format!(
                    "text is not valid UTF-8 ({e}); try --encoding latin1"
                ))
            })
        }
        TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Load an OBJ file and its material library.
pub fn load_mesh(path: &Path, encoding: TextEncoding) -> Result<Mesh> {
    if !path.is_file() {
        return Err(ObjTilesError::Input(format!(
            "Input file not found: {}",
            path.display()
        )));
    }
    let bytes = std::fs::read(path)?;
    let text = decode_text(&bytes, encoding)
        .map_err(|e| ObjTilesError::Input(format!("{}: {e}", path.display())))?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let folder = path.parent().unwrap_or(Path::new(""));
    let mesh = parse_obj(&text, &name, folder, encoding)?;

    info!(
        path = %path.display(),
        vertices = mesh.vertices.len(),
        triangles = mesh.triangle_count(),
        materials = mesh.materials.len(),
        "Loaded OBJ"
    );
    Ok(mesh)
}

/// `*.obj` files directly inside `folder`, sorted by path.
pub fn find_obj_files(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(ObjTilesError::Input(format!(
            "Input folder not found: {}",
            folder.display()
        )));
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        let is_obj = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("obj"));
        if is_obj && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    debug!(folder = %folder.display(), count = files.len(), "Found OBJ files");
    Ok(files)
}
