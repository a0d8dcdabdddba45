use crate::math::{Point3, Vector3, FOUR_PI};

/// Velocity induced at `point` by a straight vortex filament of unit
/// circulation running from `a` to `b`.
///
/// Inside `core_radius` of the filament line the ideal Biot-Savart value is
/// scaled by `h²/core²` (Rankine core), so the velocity falls linearly to
/// zero on the axis instead of diverging.
#[must_use]
pub fn segment_velocity(a: &Point3, b: &Point3, point: &Point3, core_radius: f64) -> Vector3 {
    let r0 = b - a;
    let r1 = point - a;
    let r2 = point - b;
    let (n1, n2) = (r1.norm(), r2.norm());
    let len2 = r0.norm_squared();
    if n1 < f64::EPSILON || n2 < f64::EPSILON || len2 < f64::EPSILON {
        return Vector3::zeros();
    }
    let cross = r1.cross(&r2);
    let cross2 = cross.norm_squared();
    let h2 = cross2 / len2;
    if h2 < f64::EPSILON * len2 {
        return Vector3::zeros();
    }
    let scale = r0.dot(&(r1 / n1 - r2 / n2)) / (FOUR_PI * cross2);
    let velocity = cross * scale;
    let core2 = core_radius * core_radius;
    if h2 < core2 {
        velocity * (h2 / core2)
    } else {
        velocity
    }
}

/// Velocity of a closed polygonal vortex ring of unit circulation traversed
/// in the given corner order.
#[must_use]
pub fn ring_velocity(corners: &[Point3], point: &Point3, core_radius: f64) -> Vector3 {
    let n = corners.len();
    (0..n)
        .map(|k| segment_velocity(&corners[k], &corners[(k + 1) % n], point, core_radius))
        .sum()
}
