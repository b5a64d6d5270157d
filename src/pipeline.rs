use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::{OutputFormat, PipelineConfig};
use crate::encoder::{Converter, GltfOptions};
use crate::error::{ObjTilesError, Result};
use crate::ingestion::{self, load_mesh};
use crate::tiling::tileset_writer::{self, MeshSource};

/// Summary of a completed pipeline run.
#[derive(Debug)]
pub struct ProcessingResult {
    /// Scene files, b3dm payloads or tiles written.
    pub tile_count: usize,
    /// The top-level file of each output.
    pub outputs: Vec<PathBuf>,
    pub duration: Duration,
}

/// Pipeline orchestrator: resolves inputs, then encodes or tiles them.
pub struct Pipeline;

impl Pipeline {
    pub fn run(config: &PipelineConfig) -> Result<ProcessingResult> {
        let start = Instant::now();
        info!(
            input = %config.input.display(),
            output = %config.output.display(),
            format = %config.format,
            "Starting pipeline"
        );

        info!("Stage 1/2: Ingestion");
        let files = Self::input_files(&config.input)?;
        info!(files = files.len(), "Resolved input");

        fs::create_dir_all(&config.output)
            .map_err(|e| ObjTilesError::Output(format!("{}: {e}", config.output.display())))?;

        let (tile_count, outputs) = match config.format {
            OutputFormat::Gltf | OutputFormat::Glb => {
                info!("Stage 2/2: Encoding glTF");
                Self::encode_scenes(config, &files)?
            }
            OutputFormat::B3dm => {
                info!("Stage 2/2: Encoding b3dm");
                Self::encode_b3dm(config, &files)?
            }
            OutputFormat::Tiles => {
                info!("Stage 2/2: Tiling");
                Self::tile(config, &files)?
            }
        };

        let duration = start.elapsed();
        info!(tiles = tile_count, elapsed = ?duration, "Pipeline complete");

        Ok(ProcessingResult {
            tile_count,
            outputs,
            duration,
        })
    }

    /// A single OBJ file, or every OBJ file in a folder.
    fn input_files(input: &Path) -> Result<Vec<PathBuf>> {
        if input.is_dir() {
            let files = ingestion::find_obj_files(input)?;
            if files.is_empty() {
                return Err(ObjTilesError::Input(format!(
                    "no OBJ files in {}",
                    input.display()
                )));
            }
            Ok(files)
        } else if input.is_file() {
            Ok(vec![input.to_path_buf()])
        } else {
            Err(ObjTilesError::Input(format!(
                "Input not found: {}",
                input.display()
            )))
        }
    }

    fn encode_scenes(config: &PipelineConfig, files: &[PathBuf]) -> Result<(usize, Vec<PathBuf>)> {
        let ext = if config.gltf.binary { "glb" } else { "gltf" };
        let outputs = files
            .par_iter()
            .map(|path| {
                let mesh = load_mesh(path, config.gltf.encoding)?;
                let options = GltfOptions {
                    name: mesh.name.clone(),
                    ..config.gltf.clone()
                };
                let scene = Converter::new(&mesh, folder_of(path), options).run()?;
                let out = config.output.join(format!("{}.{ext}", mesh.name));
                scene.write(&out)?;
                debug!(path = %out.display(), "Wrote scene");
                Ok(out)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((outputs.len(), outputs))
    }

    fn encode_b3dm(config: &PipelineConfig, files: &[PathBuf]) -> Result<(usize, Vec<PathBuf>)> {
        let outputs = files
            .par_iter()
            .map(|path| {
                let mesh = load_mesh(path, config.gltf.encoding)?;
                let out = config.output.join(format!("{}.b3dm", mesh.name));
                tileset_writer::write_b3dm(&mesh, folder_of(path), &out)?;
                Ok(out)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((outputs.len(), outputs))
    }

    fn tile(config: &PipelineConfig, files: &[PathBuf]) -> Result<(usize, Vec<PathBuf>)> {
        let opts = &config.tileset;
        let encoding = config.gltf.encoding;

        // Folders always merge or combine, however many files they hold
        let sources: Vec<MeshSource> = match files {
            [path] if !config.input.is_dir() && opts.split_level > 1 => {
                let mesh = load_mesh(path, encoding)?;
                let folder = folder_of(path).to_path_buf();
                let parts = mesh.split(opts.split_level);
                info!(mesh = %mesh.name, parts = parts.len(), "Split mesh");
                parts
                    .into_iter()
                    .map(|mesh| MeshSource::Loaded {
                        mesh,
                        folder: folder.clone(),
                    })
                    .collect()
            }
            [path] if !config.input.is_dir() => {
                let mesh = load_mesh(path, encoding)?;
                let out = tileset_writer::write_tileset_file(
                    &mesh,
                    folder_of(path),
                    &config.output,
                    Some(&config.position),
                    opts.bounding_volume,
                )?;
                return Ok((1, vec![out]));
            }
            many => many.iter().cloned().map(MeshSource::File).collect(),
        };

        let out = if !opts.merge {
            tileset_writer::combine_by_reference(&sources, &config.output, &config.position, encoding)?
        } else if opts.lod {
            tileset_writer::merge_hierarchical(
                &sources,
                &config.output,
                &config.position,
                opts.write_child_tileset,
                encoding,
            )?
        } else {
            tileset_writer::merge_flat(
                &sources,
                &config.output,
                &config.position,
                opts.write_child_tileset,
                encoding,
            )?
        };
        Ok((sources.len(), vec![out]))
    }
}

fn folder_of(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new(""))
}
