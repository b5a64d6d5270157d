use glam::{DMat3, DVec2, DVec3};

const SHUR_TOLERANCE: f64 = 1e-15;
const EIGEN_TOLERANCE: f64 = 1e-20;
const MAX_SWEEPS: usize = 10;

/// Oriented bounding box: `center` plus three half-axis columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBoundingBox {
    pub center: DVec3,
    pub half_axes: DMat3,
}

/// Origin and in-plane axes for flattening a near-planar point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarAxis {
    pub center: DVec3,
    pub axis1: DVec3,
    pub axis2: DVec3,
}

impl PlanarAxis {
    /// Project a point onto the plane's 2D frame.
    pub fn project(&self, p: DVec3) -> DVec2 {
        let v = p - self.center;
        DVec2::new(self.axis1.dot(v), self.axis2.dot(v))
    }
}

/// Symmetric eigen decomposition result: `unitary` columns are the
/// eigenvectors, the diagonal of `diagonal` holds the eigenvalues.
#[derive(Debug, Clone, Copy)]
pub struct EigenDecomposition {
    pub unitary: DMat3,
    pub diagonal: DMat3,
}

fn element(m: &DMat3, col: usize, row: usize) -> f64 {
    m.col(col)[row]
}

fn set_element(m: &mut DMat3, col: usize, row: usize, value: f64) {
    m.col_mut(col)[row] = value;
}

fn frobenius_norm(m: &DMat3) -> f64 {
    m.to_cols_array().iter().map(|v| v * v).sum::<f64>().sqrt()
}

const ROW_VAL: [usize; 3] = [1, 0, 0];
const COL_VAL: [usize; 3] = [2, 2, 1];

fn off_diagonal_frobenius_norm(m: &DMat3) -> f64 {
    let mut norm = 0.0;
    for i in 0..3 {
        let v = element(m, COL_VAL[i], ROW_VAL[i]);
        norm += 2.0 * v * v;
    }
    norm.sqrt()
}

/// One Jacobi rotation zeroing the largest off-diagonal entry.
fn shur_decomposition(m: &DMat3) -> DMat3 {
    let mut max_diagonal = 0.0;
    let mut rot_axis = 1;
    for i in 0..3 {
        let v = element(m, COL_VAL[i], ROW_VAL[i]).abs();
        if v > max_diagonal {
            rot_axis = i;
            max_diagonal = v;
        }
    }

    let p = ROW_VAL[rot_axis];
    let q = COL_VAL[rot_axis];
    let mut c = 1.0;
    let mut s = 0.0;

    if element(m, q, p).abs() > SHUR_TOLERANCE {
        let qq = element(m, q, q);
        let pp = element(m, p, p);
        let qp = element(m, q, p);
        let tau = (qq - pp) / 2.0 / qp;
        let t = if tau < 0.0 {
            -1.0 / (-tau + (1.0 + tau * tau).sqrt())
        } else {
            1.0 / (tau + (1.0 + tau * tau).sqrt())
        };
        c = 1.0 / (1.0 + t * t).sqrt();
        s = t * c;
    }

    let mut r = DMat3::IDENTITY;
    set_element(&mut r, p, p, c);
    set_element(&mut r, q, q, c);
    set_element(&mut r, q, p, s);
    set_element(&mut r, p, q, -s);
    r
}

/// Cyclic Jacobi eigen decomposition of a symmetric 3x3 matrix.
pub fn eigen_decomposition(m: &DMat3) -> EigenDecomposition {
    let mut unitary = DMat3::IDENTITY;
    let mut diagonal = *m;
    let epsilon = EIGEN_TOLERANCE * frobenius_norm(&diagonal);

    let mut count = 0;
    let mut sweep = 0;
    while sweep < MAX_SWEEPS && off_diagonal_frobenius_norm(&diagonal) > epsilon {
        let j = shur_decomposition(&diagonal);
        diagonal = j.transpose() * (diagonal * j);
        unitary *= j;
        count += 1;
        if count > 2 {
            sweep += 1;
            count = 0;
        }
    }

    EigenDecomposition { unitary, diagonal }
}

impl OrientedBoundingBox {
    /// Fit a box to `points` along the principal axes of their covariance.
    pub fn from_points(points: &[DVec3]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let mean = points.iter().copied().sum::<DVec3>() / n;

        let (mut xx, mut xy, mut xz, mut yy, mut yz, mut zz) = (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        for p in points {
            let d = *p - mean;
            xx += d.x * d.x;
            xy += d.x * d.y;
            xz += d.x * d.z;
            yy += d.y * d.y;
            yz += d.y * d.z;
            zz += d.z * d.z;
        }
        let covariance = DMat3::from_cols(
            DVec3::new(xx, xy, xz) / n,
            DVec3::new(xy, yy, yz) / n,
            DVec3::new(xz, yz, zz) / n,
        );

        let rotation = eigen_decomposition(&covariance).unitary;
        let axes = [rotation.x_axis, rotation.y_axis, rotation.z_axis];

        let mut lo = DVec3::splat(f64::MAX);
        let mut hi = DVec3::splat(f64::MIN);
        for p in points {
            let proj = DVec3::new(axes[0].dot(*p), axes[1].dot(*p), axes[2].dot(*p));
            lo = lo.min(proj);
            hi = hi.max(proj);
        }

        let mid = (lo + hi) * 0.5;
        let center = rotation * mid;
        let scale = DMat3::from_diagonal((hi - lo) * 0.5);

        Some(Self {
            center,
            half_axes: rotation * scale,
        })
    }

    /// Pick two in-plane axes, dropping the thinnest one.
    ///
    /// Returns `None` when the box collapses to a line or a point.
    pub fn planar_axis(&self) -> Option<PlanarAxis> {
        let x_axis = self.half_axes.x_axis;
        let y_axis = self.half_axes.y_axis;
        let z_axis = self.half_axes.z_axis;
        let x_mag = x_axis.length();
        let y_mag = y_axis.length();
        let z_mag = z_axis.length();

        let eps = x_mag.max(y_mag).max(z_mag) * 1e-12;
        let flat = |m: f64| m <= eps;
        if (flat(x_mag) && (flat(y_mag) || flat(z_mag))) || (flat(y_mag) && flat(z_mag)) {
            return None;
        }

        let min = x_mag.min(y_mag).min(z_mag);
        let mut axis1 = x_axis;
        let mut axis2 = y_axis;
        if min == y_mag || min == z_mag {
            axis1 = x_axis;
        }
        if min == x_mag {
            axis1 = y_axis;
        } else if min == z_mag {
            axis2 = y_axis;
        }
        if min == x_mag || min == y_mag {
            axis2 = z_axis;
        }

        Some(PlanarAxis {
            center: self.center,
            axis1,
            axis2,
        })
    }
}

/// Best-fit plane frame for `points`; `None` when they are collinear or
/// coincident.
pub fn compute_project_to_2d_arguments(points: &[DVec3]) -> Option<PlanarAxis> {
    OrientedBoundingBox::from_points(points)?.planar_axis()
}

/// Flatten `points` onto their best-fit plane.
pub fn project_points_to_2d(points: &[DVec3]) -> Option<Vec<DVec2>> {
    let axis = compute_project_to_2d_arguments(points)?;
    Some(points.iter().map(|p| axis.project(*p)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn eigen_of_diagonal_matrix_is_trivial() {
        let m = DMat3::from_diagonal(DVec3::new(3.0, 2.0, 1.0));
        let e = eigen_decomposition(&m);
        assert_eq!(e.unitary, DMat3::IDENTITY);
        assert_eq!(e.diagonal, m);
    }

    #[test]
    fn eigen_reconstructs_symmetric_matrix() {
        let m = DMat3::from_cols(
            DVec3::new(4.0, 1.0, 0.5),
            DVec3::new(1.0, 3.0, 0.25),
            DVec3::new(0.5, 0.25, 2.0),
        );
        let e = eigen_decomposition(&m);
        let rebuilt = e.unitary * e.diagonal * e.unitary.transpose();
        for (a, b) in rebuilt.to_cols_array().iter().zip(m.to_cols_array()) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-9);
        }
        assert!(off_diagonal_frobenius_norm(&e.diagonal) < 1e-9);
    }

    #[test]
    fn axis_aligned_box_is_recovered() {
        let mut points = Vec::new();
        for x in [-2.0, 2.0] {
            for y in [-1.0, 1.0] {
                for z in [9.5, 10.5] {
                    points.push(DVec3::new(x, y, z));
                }
            }
        }
        let obb = OrientedBoundingBox::from_points(&points).unwrap();
        assert_abs_diff_eq!(obb.center.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(obb.center.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(obb.center.z, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(obb.half_axes.x_axis.length(), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(obb.half_axes.y_axis.length(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(obb.half_axes.z_axis.length(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn planar_square_projects_to_2d() {
        let points = [
            DVec3::new(0.0, 0.0, 5.0),
            DVec3::new(2.0, 0.0, 5.0),
            DVec3::new(2.0, 2.0, 5.0),
            DVec3::new(0.0, 2.0, 5.0),
        ];
        let flat = project_points_to_2d(&points).unwrap();
        assert_eq!(flat.len(), 4);
        // Side lengths survive projection onto an orthogonal frame
        let side = (flat[1] - flat[0]).length();
        let diag = (flat[2] - flat[0]).length();
        assert!(side > 0.0);
        assert_abs_diff_eq!(diag / side, 2.0_f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn collinear_points_have_no_plane() {
        let points = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(2.0, 0.0, 0.0),
        ];
        assert!(compute_project_to_2d_arguments(&points).is_none());
        assert!(project_points_to_2d(&points).is_none());
        assert!(OrientedBoundingBox::from_points(&[]).is_none());
    }
}
