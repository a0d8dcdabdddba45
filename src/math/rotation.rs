use super::{Point3, Vector3, TOLERANCE};

/// Rotates `point` by `angle` radians about the axis through `origin` along
/// `axis` (Rodrigues formula). A zero-length axis leaves the point unchanged.
#[must_use]
#[allow(clippy::many_single_char_names)]
pub fn rotate_about_axis(point: &Point3, origin: &Point3, axis: &Vector3, angle: f64) -> Point3 {
    let len = axis.norm();
    if len < TOLERANCE {
        return *point;
    }
    let k = axis / len;
    let v = point - origin;
    let (s, c) = angle.sin_cos();
    let rotated = v * c + k.cross(&v) * s + k * (k.dot(&v) * (1.0 - c));
    origin + rotated
}

/// Unit freestream direction for angle of attack `alpha` and sideslip `beta`,
/// both in radians, in body axes (x aft, y starboard, z up).
#[must_use]
pub fn wind_direction(alpha: f64, beta: f64) -> Vector3 {
    let (sa, ca) = alpha.sin_cos();
    let (sb, cb) = beta.sin_cos();
    Vector3::new(ca * cb, -sb, sa * cb)
}

/// Drag, side and lift unit directions for the given wind angles.
#[must_use]
pub fn wind_axes(alpha: f64, beta: f64) -> (Vector3, Vector3, Vector3) {
    let drag = wind_direction(alpha, beta);
    let (sa, ca) = alpha.sin_cos();
    let lift = Vector3::new(-sa, 0.0, ca);
    let side = lift.cross(&drag);
    (drag, side, lift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn quarter_turn_about_z() {
        let p = Point3::new(2.0, 1.0, 0.0);
        let o = Point3::new(1.0, 1.0, 0.0);
        let r = rotate_about_axis(&p, &o, &Vector3::z(), FRAC_PI_2);
        assert_abs_diff_eq!(r.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn wind_axes_are_orthonormal() {
        let (d, s, l) = wind_axes(0.2, -0.1);
        assert_abs_diff_eq!(d.norm(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.norm(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d.dot(&l), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d.dot(&s), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(l.dot(&s), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_angles_give_body_axes() {
        let (d, s, l) = wind_axes(0.0, 0.0);
        assert_abs_diff_eq!(d, Vector3::x(), epsilon = 1e-12);
        assert_abs_diff_eq!(s, Vector3::y(), epsilon = 1e-12);
        assert_abs_diff_eq!(l, Vector3::z(), epsilon = 1e-12);
    }
}
