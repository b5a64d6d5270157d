//! WGS84 geodesy: metre/angle conversions, ellipsoid projections and the
//! local-to-ECEF transforms written into `tileset.json`.

pub mod ecef;
pub mod ellipsoid;

pub use ecef::{
    east_north_up_to_fixed_frame, from_radians, heading_pitch_roll_to_fixed_frame,
    identity_transform, wgs84_transform,
};
pub use ellipsoid::{Cartographic, Ellipsoid};

/// Radians of longitude per metre at the equator.
const LON_PER_METER: f64 = 0.000_000_156_785;
/// Radians of latitude per metre.
const LAT_PER_METER: f64 = 0.000_000_157_891;

/// Longitude extent (radians) covered by `meters` at `latitude` (radians).
pub fn meters_to_longitude(meters: f64, latitude: f64) -> f64 {
    meters * LON_PER_METER / latitude.cos()
}

/// Latitude extent (radians) covered by `meters`.
pub fn meters_to_latitude(meters: f64) -> f64 {
    meters * LAT_PER_METER
}

pub fn longitude_to_meters(lon_diff: f64, latitude: f64) -> f64 {
    lon_diff / LON_PER_METER * latitude.cos()
}

pub fn latitude_to_meters(lat_diff: f64) -> f64 {
    lat_diff / LAT_PER_METER
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn latitude_is_linear_in_metres() {
        assert_relative_eq!(meters_to_latitude(200.0), 200.0 * 0.000000157891);
        assert_relative_eq!(latitude_to_meters(meters_to_latitude(123.0)), 123.0);
    }

    #[test]
    fn longitude_widens_away_from_equator() {
        let at_equator = meters_to_longitude(200.0, 0.0);
        let at_60 = meters_to_longitude(200.0, 60f64.to_radians());
        assert_relative_eq!(at_equator, 200.0 * 0.000000156785);
        assert_relative_eq!(at_60, 2.0 * at_equator, max_relative = 1e-12);
    }

    #[test]
    fn transform_translation_recovers_position() {
        let e = Ellipsoid::wgs84();
        for &lon in &[-3.0, -1.2, 0.0, 0.7, 2.119_659_998_099_6, 3.1] {
            for &lat in &[-1.5, -0.6, 0.0, 0.543_224_178_326_409, 1.2, 1.5] {
                for &h in &[0.0, 125.5, 10_000.0] {
                    let m = wgs84_transform(lon, lat, h);
                    let c = e
                        .cartesian_to_cartographic(glam::DVec3::new(m[12], m[13], m[14]))
                        .unwrap();
                    assert_abs_diff_eq!(c.longitude, lon, epsilon = 1e-6);
                    assert_abs_diff_eq!(c.latitude, lat, epsilon = 1e-6);
                    assert_abs_diff_eq!(c.height, h, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn longitude_round_trip() {
        let lat = 0.543_224_178_326_409;
        let d = meters_to_longitude(87.5, lat);
        assert_relative_eq!(longitude_to_meters(d, lat), 87.5, max_relative = 1e-12);
    }
}
