use glam::{DMat4, DQuat, DVec3};

/// Orientation angles in radians.
///
/// Heading turns about the local -Z axis, pitch about -Y and roll about +X,
/// matching the Cesium convention used for tile transforms.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeadingPitchRoll {
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl HeadingPitchRoll {
    pub fn new(heading: f64, pitch: f64, roll: f64) -> Self {
        Self {
            heading,
            pitch,
            roll,
        }
    }

    /// Compose `heading * (pitch * roll)` as a unit quaternion.
    pub fn to_quaternion(self) -> DQuat {
        let roll = DQuat::from_axis_angle(DVec3::X, self.roll);
        let pitch = DQuat::from_axis_angle(DVec3::Y, -self.pitch);
        let heading = DQuat::from_axis_angle(DVec3::Z, -self.heading);
        heading * (pitch * roll)
    }
}

/// Column-major translation * rotation * scale matrix.
pub fn translation_rotation_scale(translation: DVec3, rotation: DQuat, scale: DVec3) -> DMat4 {
    DMat4::from_scale_rotation_translation(scale, rotation, translation)
}

/// Flatten a matrix into the 16-element column-major array used by
/// `tileset.json` `transform`.
pub fn to_column_major(m: &DMat4) -> [f64; 16] {
    m.to_cols_array()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn zero_angles_give_identity() {
        let q = HeadingPitchRoll::default().to_quaternion();
        assert_abs_diff_eq!(q.w, 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(q.x, 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(q.y, 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(q.z, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn heading_turns_clockwise_about_z() {
        let q = HeadingPitchRoll::new(FRAC_PI_2, 0.0, 0.0).to_quaternion();
        let v = q * DVec3::X;
        assert_abs_diff_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.y, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn pitch_raises_x_towards_z() {
        let q = HeadingPitchRoll::new(0.0, FRAC_PI_2, 0.0).to_quaternion();
        let v = q * DVec3::X;
        assert_abs_diff_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn roll_turns_y_towards_z() {
        let q = HeadingPitchRoll::new(0.0, 0.0, FRAC_PI_2).to_quaternion();
        let v = q * DVec3::Y;
        assert_abs_diff_eq!(v.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn trs_layout_is_column_major() {
        let m = translation_rotation_scale(
            DVec3::new(10.0, 20.0, 30.0),
            DQuat::IDENTITY,
            DVec3::new(2.0, 3.0, 4.0),
        );
        let a = to_column_major(&m);
        assert_eq!(a[0], 2.0);
        assert_eq!(a[5], 3.0);
        assert_eq!(a[10], 4.0);
        assert_eq!(&a[12..16], &[10.0, 20.0, 30.0, 1.0]);
    }
}
