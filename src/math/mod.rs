//! Vector, matrix and interval helpers shared by the encoder and tiler.
//!
//! Vector and matrix arithmetic comes from `glam`'s double-precision types;
//! this module adds the pieces glam does not ship.

pub mod interval;
pub mod obb;
pub mod rotation;

pub use interval::{BoundingBox, MinMax};
pub use obb::{
    OrientedBoundingBox, PlanarAxis, compute_project_to_2d_arguments, project_points_to_2d,
};
pub use rotation::{HeadingPitchRoll, to_column_major, translation_rotation_scale};
