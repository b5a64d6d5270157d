use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use super::b3dm::B3dm;
use super::comparator::sort_trees;
use super::single_tileset::{TilesetCreationOptions, create_single_tileset};
use crate::config::{BoundingVolumeKind, GisPosition, TextEncoding};
use crate::encoder::{Converter, GltfOptions};
use crate::error::{ObjTilesError, Result};
use crate::ingestion::load_mesh;
use crate::transform::wgs84_transform;
use crate::types::{BoundingVolume, Mesh, Refine, Tile, TileContent, Tileset, TilesetAsset};

/// Folder holding merged payloads, relative to the output root.
pub const BATCHED_MODELS: &str = "BatchedModels";
/// Document error of merged and combined tilesets.
pub const MERGED_GEOMETRIC_ERROR: f64 = 500.0;

/// A mesh to tile: either an OBJ on disk or one already in memory.
#[derive(Debug, Clone)]
pub enum MeshSource {
    File(PathBuf),
    /// `folder` resolves the mesh's texture files.
    Loaded { mesh: Mesh, folder: PathBuf },
}

impl MeshSource {
    pub fn name(&self) -> String {
        match self {
            MeshSource::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            MeshSource::Loaded { mesh, .. } => mesh.name.clone(),
        }
    }

    fn load(&self, encoding: TextEncoding) -> Result<(Cow<'_, Mesh>, PathBuf)> {
        match self {
            MeshSource::File(path) => {
                let folder = path.parent().map(Path::to_path_buf).unwrap_or_default();
                Ok((Cow::Owned(load_mesh(path, encoding)?), folder))
            }
            MeshSource::Loaded { mesh, folder } => Ok((Cow::Borrowed(mesh), folder.clone())),
        }
    }
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| ObjTilesError::Output(format!("{}: {e}", path.display())))
}

/// Write a tileset document, pretty-printed or compact.
pub fn write_tileset_json(path: &Path, tileset: &Tileset, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(tileset)?
    } else {
        serde_json::to_string(tileset)?
    };
    fs::write(path, json).map_err(|e| ObjTilesError::Output(format!("{}: {e}", path.display())))
}

/// Encode `mesh` with a batch table, frame it as b3dm at `path`, and derive
/// the tile placement from the batch extents.
pub fn write_b3dm(mesh: &Mesh, folder: &Path, path: &Path) -> Result<TilesetCreationOptions> {
    let options = GltfOptions {
        name: mesh.name.clone(),
        binary: true,
        with_batch_table: true,
        ..Default::default()
    };
    let scene = Converter::new(mesh, folder, options).run()?;
    let batch_table = scene
        .batch_table
        .ok_or_else(|| ObjTilesError::Tiling(format!("{}: no batch table", mesh.name)))?;
    let (min, max) = batch_table
        .extents()
        .ok_or_else(|| ObjTilesError::Tiling(format!("{}: mesh has no triangles", mesh.name)))?;
    let glb = scene
        .glb
        .ok_or_else(|| ObjTilesError::Encoding(format!("{}: GLB not produced", mesh.name)))?;

    let bytes = B3dm::new(glb, Some(batch_table)).to_vec()?;
    fs::write(path, &bytes)
        .map_err(|e| ObjTilesError::Output(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Wrote b3dm");

    Ok(TilesetCreationOptions::from_extents(min, max))
}

/// Write `{name}.b3dm` into `output_dir` and return its one-tile tileset.
pub fn write_tileset(
    mesh: &Mesh,
    folder: &Path,
    output_dir: &Path,
    position: Option<&GisPosition>,
    bounding_volume: BoundingVolumeKind,
) -> Result<Tileset> {
    let b3dm_name = format!("{}.b3dm", mesh.name);
    let mut options = write_b3dm(mesh, folder, &output_dir.join(&b3dm_name))?;
    if let Some(p) = position {
        options.set_position(p);
    }
    options.bounding_volume = bounding_volume;
    create_single_tileset(&b3dm_name, &options)
}

/// [`write_tileset`] plus a pretty `tileset.json` next to the payload.
pub fn write_tileset_file(
    mesh: &Mesh,
    folder: &Path,
    output_dir: &Path,
    position: Option<&GisPosition>,
    bounding_volume: BoundingVolumeKind,
) -> Result<PathBuf> {
    create_dir(output_dir)?;
    let tileset = write_tileset(mesh, folder, output_dir, position, bounding_volume)?;
    let path = output_dir.join("tileset.json");
    write_tileset_json(&path, &tileset, true)?;
    info!(path = %path.display(), "Wrote tileset.json");
    Ok(path)
}

/// Running union of region bounding volumes.
#[derive(Debug, Clone, Copy)]
struct RegionBounds([f64; 6]);

impl Default for RegionBounds {
    fn default() -> Self {
        Self([f64::MAX, f64::MAX, f64::MIN, f64::MIN, f64::MAX, f64::MIN])
    }
}

impl RegionBounds {
    fn update(&mut self, bv: &BoundingVolume) {
        if let Some(r) = bv.region() {
            let b = &mut self.0;
            b[0] = b[0].min(r[0]);
            b[1] = b[1].min(r[1]);
            b[2] = b[2].max(r[2]);
            b[3] = b[3].max(r[3]);
            b[4] = b[4].min(r[4]);
            b[5] = b[5].max(r[5]);
        }
    }
}

/// Largest original extent over 10, or a quarter of `fallback` when the
/// tile carries no extents.
fn extent_error(tile: &Tile, fallback: f64) -> f64 {
    [tile.original_x, tile.original_y, tile.original_z]
        .iter()
        .filter(|m| m.is_valid())
        .map(|m| m.extent() / 10.0)
        .reduce(f64::max)
        .unwrap_or(fallback / 4.0)
}

fn max_extent(tile: &Tile) -> f64 {
    tile.original_x
        .extent()
        .max(tile.original_y.extent())
        .max(tile.original_z.extent())
}

/// Convert every source in parallel into `{name}.b3dm` under `out_dir`.
fn convert_all(
    sources: &[MeshSource],
    out_dir: &Path,
    position: &GisPosition,
    encoding: TextEncoding,
) -> Result<Vec<Tileset>> {
    sources
        .par_iter()
        .map(|source| {
            let (mesh, folder) = source.load(encoding)?;
            write_tileset(&mesh, &folder, out_dir, Some(position), BoundingVolumeKind::Region)
        })
        .collect()
}

fn merge(
    sources: &[MeshSource],
    output: &Path,
    position: &GisPosition,
    write_child_tileset: bool,
    lod: bool,
    encoding: TextEncoding,
) -> Result<PathBuf> {
    if sources.is_empty() {
        return Err(ObjTilesError::Tiling("no meshes to merge".into()));
    }
    let data_dir = output.join(BATCHED_MODELS);
    create_dir(&data_dir)?;

    let tilesets = convert_all(sources, &data_dir, position, encoding)?;
    info!(tiles = tilesets.len(), lod, "Converted meshes to b3dm");

    let mut bounds = RegionBounds::default();
    let mut children = Vec::with_capacity(tilesets.len());
    let mut prepared = Vec::with_capacity(tilesets.len());
    for tileset in &tilesets {
        let root = &tileset.root;
        bounds.update(&root.bounding_volume);
        let Some(content) = root.content.as_ref() else {
            continue;
        };
        let url = format!("{BATCHED_MODELS}/{}", content.url);

        if write_child_tileset {
            let stem = Path::new(&content.url)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            write_tileset_json(&data_dir.join(format!("{stem}.json")), tileset, true)?;
        }

        let tile = Tile {
            transform: None,
            bounding_volume: root.bounding_volume,
            geometric_error: 0.0,
            refine: None,
            content: Some(TileContent {
                bounding_volume: Some(root.bounding_volume),
                url,
            }),
            children: Vec::new(),
            original_x: root.original_x,
            original_y: root.original_y,
            original_z: root.original_z,
        };
        if lod {
            prepared.push(Tile {
                geometric_error: max_extent(&tile) / 20.0,
                ..tile
            });
        } else {
            children.push(Tile {
                geometric_error: extent_error(&tile, tileset.geometric_error),
                ..tile
            });
        }
    }
    if lod {
        children = sort_trees(prepared);
    }

    let mut merged = Tileset {
        asset: TilesetAsset {
            gltf_up_axis: None,
            ..Default::default()
        },
        properties: None,
        geometric_error: MERGED_GEOMETRIC_ERROR,
        root: Tile {
            transform: Some(wgs84_transform(
                position.longitude,
                position.latitude,
                position.trans_height.unwrap_or(0.0),
            )),
            bounding_volume: BoundingVolume::Region(bounds.0),
            geometric_error: MERGED_GEOMETRIC_ERROR / 2.0,
            refine: Some(Refine::Add),
            children,
            ..Default::default()
        },
    };
    merged.reset_geometric_errors(2.0);

    let path = output.join("tileset.json");
    write_tileset_json(&path, &merged, false)?;
    info!(
        path = %path.display(),
        tiles = merged.root.count() - 1,
        "Wrote merged tileset.json"
    );
    Ok(path)
}

/// Every mesh becomes a direct child of one root.
pub fn merge_flat(
    sources: &[MeshSource],
    output: &Path,
    position: &GisPosition,
    write_child_tileset: bool,
    encoding: TextEncoding,
) -> Result<PathBuf> {
    merge(sources, output, position, write_child_tileset, false, encoding)
}

/// Meshes nest by spatial containment under one root.
pub fn merge_hierarchical(
    sources: &[MeshSource],
    output: &Path,
    position: &GisPosition,
    write_child_tileset: bool,
    encoding: TextEncoding,
) -> Result<PathBuf> {
    merge(sources, output, position, write_child_tileset, true, encoding)
}

/// Forward-slash path of `path` relative to `base`.
fn relative_url(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Each mesh gets its own `Batched{name}/tileset.json`; the parent document
/// only references them.
pub fn combine_by_reference(
    sources: &[MeshSource],
    output: &Path,
    position: &GisPosition,
    encoding: TextEncoding,
) -> Result<PathBuf> {
    if sources.is_empty() {
        return Err(ObjTilesError::Tiling("no meshes to combine".into()));
    }
    create_dir(output)?;

    let files: Vec<PathBuf> = sources
        .par_iter()
        .map(|source| {
            let (mesh, folder) = source.load(encoding)?;
            let dir = output.join(format!("Batched{}", mesh.name));
            write_tileset_file(&mesh, &folder, &dir, Some(position), BoundingVolumeKind::Region)
        })
        .collect::<Result<_>>()?;

    let mut bounds = RegionBounds::default();
    let mut children = Vec::with_capacity(files.len());
    for file in &files {
        let text = fs::read_to_string(file)?;
        let tileset: Tileset = serde_json::from_str(&text)?;
        bounds.update(&tileset.root.bounding_volume);
        children.push(Tile {
            bounding_volume: tileset.root.bounding_volume,
            geometric_error: tileset.geometric_error,
            refine: tileset.root.refine,
            content: Some(TileContent {
                bounding_volume: None,
                url: relative_url(file, output),
            }),
            ..Default::default()
        });
    }

    let combined = Tileset {
        asset: TilesetAsset {
            gltf_up_axis: None,
            ..Default::default()
        },
        properties: None,
        geometric_error: MERGED_GEOMETRIC_ERROR,
        root: Tile {
            bounding_volume: BoundingVolume::Region(bounds.0),
            geometric_error: MERGED_GEOMETRIC_ERROR,
            refine: Some(Refine::Add),
            children,
            ..Default::default()
        },
    };
    let path = output.join("tileset.json");
    write_tileset_json(&path, &combined, true)?;
    info!(path = %path.display(), tiles = files.len(), "Wrote combined tileset.json");
    Ok(path)
}
