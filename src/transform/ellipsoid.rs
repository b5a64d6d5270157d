use glam::DVec3;

/// WGS84 semi-major axis in metres.
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 semi-minor axis in metres.
pub const WGS84_B: f64 = 6_356_752.314_245_179_3;

const CENTER_TOLERANCE_SQUARED: f64 = 0.1;
const NEWTON_EPSILON: f64 = 1e-12;
const MAX_NEWTON_ITERATIONS: usize = 64;
const ZERO_EPSILON: f64 = 1e-14;

/// Geodetic position: longitude/latitude in radians, height in metres.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cartographic {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
}

/// Triaxial ellipsoid with the precomputed reciprocals used by the
/// surface projections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub radii: DVec3,
    pub radii_squared: DVec3,
    pub one_over_radii: DVec3,
    pub one_over_radii_squared: DVec3,
}

impl Ellipsoid {
    pub fn new(radii: DVec3) -> Self {
        Self {
            radii,
            radii_squared: radii * radii,
            one_over_radii: DVec3::ONE / radii,
            one_over_radii_squared: DVec3::ONE / (radii * radii),
        }
    }

    pub fn wgs84() -> Self {
        Self::new(DVec3::new(WGS84_A, WGS84_A, WGS84_B))
    }

    /// Outward normal of the ellipsoid surface through `p`.
    pub fn geodetic_surface_normal(&self, p: DVec3) -> Option<DVec3> {
        if p.abs().max_element() < ZERO_EPSILON {
            return None;
        }
        Some((p * self.one_over_radii_squared).normalize())
    }

    /// Geodetic (radians, metres) to Earth-fixed cartesian.
    pub fn cartographic_to_cartesian(&self, c: Cartographic) -> DVec3 {
        let cos_lat = c.latitude.cos();
        let n = DVec3::new(
            cos_lat * c.longitude.cos(),
            cos_lat * c.longitude.sin(),
            c.latitude.sin(),
        )
        .normalize();
        let k = self.radii_squared * n;
        let gamma = n.dot(k).sqrt();
        k / gamma + n * c.height
    }

    /// Project `p` onto the surface along the geodetic normal.
    ///
    /// Returns `None` for points at the ellipsoid center or when Newton's
    /// iteration fails to converge.
    pub fn scale_to_geodetic_surface(&self, p: DVec3) -> Option<DVec3> {
        let p2 = p * p * self.one_over_radii * self.one_over_radii;
        let squared_norm = p2.x + p2.y + p2.z;
        let ratio = (1.0 / squared_norm).sqrt();
        let intersection = p * ratio;

        if squared_norm < CENTER_TOLERANCE_SQUARED {
            return ratio.is_finite().then_some(intersection);
        }

        let gradient = intersection * self.one_over_radii_squared * 2.0;
        let mut lambda = (1.0 - ratio) * p.length() / (0.5 * gradient.length());
        let mut correction = 0.0;

        for _ in 0..MAX_NEWTON_ITERATIONS {
            lambda -= correction;
            let multiplier = DVec3::ONE / (DVec3::ONE + self.one_over_radii_squared * lambda);
            let m2 = multiplier * multiplier;
            let m3 = m2 * multiplier;

            let func = p2.x * m2.x + p2.y * m2.y + p2.z * m2.z - 1.0;
            if func.abs() <= NEWTON_EPSILON {
                return Some(p * multiplier);
            }

            let denominator = p2.x * m3.x * self.one_over_radii_squared.x
                + p2.y * m3.y * self.one_over_radii_squared.y
                + p2.z * m3.z * self.one_over_radii_squared.z;
            let derivative = -2.0 * denominator;
            correction = func / derivative;
            if !correction.is_finite() {
                return None;
            }
        }
        None
    }

    /// Earth-fixed cartesian to geodetic; `None` near the center.
    pub fn cartesian_to_cartographic(&self, p: DVec3) -> Option<Cartographic> {
        let surface = self.scale_to_geodetic_surface(p)?;
        let n = self.geodetic_surface_normal(surface)?;
        let h = p - surface;
        let sign = h.dot(p).signum();
        let height = if h.dot(p) == 0.0 { 0.0 } else { sign * h.length() };
        Some(Cartographic {
            longitude: n.y.atan2(n.x),
            latitude: n.z.asin(),
            height,
        })
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::wgs84()
    }
}
