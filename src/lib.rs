pub mod config;
pub mod encoder;
pub mod error;
pub mod ingestion;
pub mod math;
pub mod pipeline;
pub mod tiling;
pub mod transform;
pub mod types;

pub use config::{GisPosition, OutputFormat, PipelineConfig, TilesetOptions};
pub use encoder::{Converter, GltfOptions};
pub use error::{ObjTilesError, Result};
pub use pipeline::Pipeline;
