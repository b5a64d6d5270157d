//! 3D Tiles output: binary framing, tileset documents and the spatial
//! containment tree.

pub mod b3dm;
pub mod comparator;
pub mod glb_writer;
pub mod single_tileset;
pub mod tileset_writer;

pub use b3dm::{B3dm, B3dmHeader, FeatureTable};
pub use comparator::{compare_tiles, sort_trees};
pub use single_tileset::{TilesetCreationOptions, create_single_tileset};
pub use tileset_writer::{
    MeshSource, combine_by_reference, merge_flat, merge_hierarchical, write_b3dm, write_tileset,
    write_tileset_file,
};
