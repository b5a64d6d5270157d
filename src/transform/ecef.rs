use glam::{DMat4, DVec3, DVec4};

use super::ellipsoid::{Cartographic, Ellipsoid};
use crate::math::{HeadingPitchRoll, to_column_major, translation_rotation_scale};

const POLE_EPSILON: f64 = 1e-14;

/// Geodetic (radians, metres) to WGS84 ECEF.
pub fn from_radians(longitude: f64, latitude: f64, height: f64) -> DVec3 {
    Ellipsoid::wgs84().cartographic_to_cartesian(Cartographic {
        longitude,
        latitude,
        height,
    })
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Local East-North-Up frame at `origin` as a column-major 4×4 matrix.
///
/// Columns are east, north, up and the origin itself. On the polar axis the
/// east direction is undefined and a fixed frame is used instead.
pub fn east_north_up_to_fixed_frame(origin: DVec3, ellipsoid: &Ellipsoid) -> DMat4 {
    let (east, north, up) = if origin.x.abs() < POLE_EPSILON && origin.y.abs() < POLE_EPSILON {
        let s = sign(origin.z);
        (
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(-1.0, 0.0, 0.0) * s,
            DVec3::new(0.0, 0.0, 1.0) * s,
        )
    } else {
        let up = (origin * ellipsoid.one_over_radii_squared).normalize();
        let east = DVec3::new(-origin.y, origin.x, 0.0).normalize();
        let north = up.cross(east);
        (east, north, up)
    };

    DMat4::from_cols(
        east.extend(0.0),
        north.extend(0.0),
        up.extend(0.0),
        DVec4::new(origin.x, origin.y, origin.z, 1.0),
    )
}

/// ENU frame at `origin` rotated by `hpr`.
pub fn heading_pitch_roll_to_fixed_frame(
    origin: DVec3,
    hpr: HeadingPitchRoll,
    ellipsoid: &Ellipsoid,
) -> DMat4 {
    let rotation = translation_rotation_scale(DVec3::ZERO, hpr.to_quaternion(), DVec3::ONE);
    east_north_up_to_fixed_frame(origin, ellipsoid) * rotation
}

/// Column-major tile transform placing local ENU axes at a WGS84 position.
///
/// `longitude` and `latitude` are radians, `height` metres.
pub fn wgs84_transform(longitude: f64, latitude: f64, height: f64) -> [f64; 16] {
    let origin = from_radians(longitude, latitude, height);
    let m = heading_pitch_roll_to_fixed_frame(
        origin,
        HeadingPitchRoll::default(),
        &Ellipsoid::wgs84(),
    );
    to_column_major(&m)
}

/// Return the 4×4 identity matrix (column-major).
pub fn identity_transform() -> [f64; 16] {
    DMat4::IDENTITY.to_cols_array()
}
