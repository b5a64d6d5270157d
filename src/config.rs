use std::path::PathBuf;

use clap::Parser;

use crate::encoder::GltfOptions;

/// Anchor longitude (radians) used when none is given.
pub const DEFAULT_LONGITUDE: f64 = 2.119_659_998_099_6;
/// Anchor latitude (radians) used when none is given.
pub const DEFAULT_LATITUDE: f64 = 0.543_224_178_326_409;

/// What the pipeline writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[value(name = "gltf")]
    Gltf,
    #[value(name = "glb")]
    Glb,
    #[value(name = "b3dm")]
    B3dm,
    #[default]
    #[value(name = "tiles")]
    Tiles,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Gltf => write!(f, "gltf"),
            OutputFormat::Glb => write!(f, "glb"),
            OutputFormat::B3dm => write!(f, "b3dm"),
            OutputFormat::Tiles => write!(f, "tiles"),
        }
    }
}

/// Bounding volume written for a single-file tileset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BoundingVolumeKind {
    #[default]
    #[value(name = "region")]
    Region,
    #[value(name = "box")]
    Box,
    #[value(name = "sphere")]
    Sphere,
}

impl std::fmt::Display for BoundingVolumeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundingVolumeKind::Region => write!(f, "region"),
            BoundingVolumeKind::Box => write!(f, "box"),
            BoundingVolumeKind::Sphere => write!(f, "sphere"),
        }
    }
}

/// Character encoding of OBJ/MTL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TextEncoding {
    #[default]
    #[value(name = "utf8")]
    Utf8,
    #[value(name = "latin1")]
    Latin1,
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextEncoding::Utf8 => write!(f, "utf8"),
            TextEncoding::Latin1 => write!(f, "latin1"),
        }
    }
}

/// Geodetic anchor for the tileset root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GisPosition {
    /// Radians.
    pub longitude: f64,
    /// Radians.
    pub latitude: f64,
    /// Metres; `None` keeps the per-tile height derived from the mesh.
    pub trans_height: Option<f64>,
}

impl Default for GisPosition {
    fn default() -> Self {
        Self {
            longitude: DEFAULT_LONGITUDE,
            latitude: DEFAULT_LATITUDE,
            trans_height: None,
        }
    }
}

/// How multiple meshes become one tileset.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetOptions {
    /// Batch every mesh under one root (`true`) or reference per-mesh
    /// tilesets (`false`).
    pub merge: bool,
    pub write_child_tileset: bool,
    /// Containment tree instead of flat siblings.
    pub lod: bool,
    pub bounding_volume: BoundingVolumeKind,
    /// Split a single mesh into up to `split_level³` tiles.
    pub split_level: usize,
}

impl Default for TilesetOptions {
    fn default() -> Self {
        Self {
            merge: true,
            write_child_tileset: true,
            lod: false,
            bounding_volume: BoundingVolumeKind::Region,
            split_level: 1,
        }
    }
}

/// Fully resolved pipeline configuration (constructed from CLI args).
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub gltf: GltfOptions,
    pub position: GisPosition,
    pub tileset: TilesetOptions,
    pub verbose: bool,
    pub threads: Option<usize>,
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "obj-tiles",
    about = "Wavefront OBJ to glTF, GLB and Cesium 3D Tiles converter",
    version
)]
pub struct CliArgs {
    /// Input OBJ file, or a folder of OBJ files
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Output directory
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "tiles")]
    pub format: OutputFormat,

    /// Write a batch table (gltf and glb only; b3dm and tiles always batch)
    #[arg(long)]
    pub batch_table: bool,

    /// Reference one standalone tileset per mesh instead of merging
    #[arg(long)]
    pub combine: bool,

    /// Do not keep per-tile tileset documents when merging
    #[arg(long)]
    pub no_child_tileset: bool,

    /// Nest tiles by spatial containment
    #[arg(long)]
    pub lod: bool,

    /// Anchor longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    /// Anchor latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    /// Translation height in metres
    #[arg(long, allow_negative_numbers = true)]
    pub trans_height: Option<f64>,

    /// Bounding volume for single-file tilesets
    #[arg(long, value_enum, default_value = "region")]
    pub bounding_volume: BoundingVolumeKind,

    /// Split a single mesh into up to n³ tiles
    #[arg(long, default_value_t = 1)]
    pub split: usize,

    /// OBJ/MTL text encoding
    #[arg(long, value_enum, default_value = "utf8")]
    pub encoding: TextEncoding,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Worker thread count (default: all cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,
}

impl From<CliArgs> for PipelineConfig {
    fn from(args: CliArgs) -> Self {
        let name = args
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| GltfOptions::default().name);

        let defaults = GisPosition::default();
        let position = GisPosition {
            longitude: args.longitude.map_or(defaults.longitude, f64::to_radians),
            latitude: args.latitude.map_or(defaults.latitude, f64::to_radians),
            trans_height: args.trans_height,
        };

        PipelineConfig {
            input: args.input,
            output: args.output,
            format: args.format,
            gltf: GltfOptions {
                name,
                binary: args.format == OutputFormat::Glb,
                with_batch_table: args.batch_table,
                encoding: args.encoding,
            },
            position,
            tileset: TilesetOptions {
                merge: !args.combine,
                write_child_tileset: !args.no_child_tileset,
                lod: args.lod,
                bounding_volume: args.bounding_volume,
                split_level: args.split.max(1),
            },
            verbose: args.verbose,
            threads: args.threads,
        }
    }
}
