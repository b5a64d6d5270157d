pub mod material;
pub mod mesh;
pub mod tile;

pub use material::{Color, Dissolve, Material, Reflectivity, Spectral, Transparency, Xyz};
pub use mesh::{Face, FaceVertex, Geometry, Mesh, Triangle};
pub use tile::{BoundingVolume, Refine, Tile, TileContent, Tileset, TilesetAsset};
