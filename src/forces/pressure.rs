use crate::math::{Point3, Vector3, TOLERANCE};
use crate::mesh::{NeighborSlot, PanelMesh};

/// Surface gradient of the doublet strength on panel `index`, by least
/// squares over the neighbouring centroids in the panel's tangent plane.
///
/// With a single usable direction the gradient is taken along it only; an
/// isolated panel has zero gradient.
#[must_use]
pub fn doublet_gradient(mesh: &PanelMesh, index: usize, doublets: &[f64]) -> Vector3 {
    let panel = mesh.panel(index);
    let (l, m, _) = panel.frame(mesh.nodes());
    let (mut sxx, mut sxy, mut syy, mut bx, mut by) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for slot in NeighborSlot::ALL {
        let Some(j) = panel.neighbor(slot) else {
            continue;
        };
        let d = mesh.panel(j).centroid - panel.centroid;
        let (x, y) = (d.dot(&l), d.dot(&m));
        let dmu = doublets[j] - doublets[index];
        sxx += x * x;
        sxy += x * y;
        syy += y * y;
        bx += x * dmu;
        by += y * dmu;
    }
    let det = sxx * syy - sxy * sxy;
    let scale = (sxx + syy).max(TOLERANCE);
    if det.abs() > 1e-9 * scale * scale {
        let gx = (syy * bx - sxy * by) / det;
        let gy = (sxx * by - sxy * bx) / det;
        return l * gx + m * gy;
    }
    if sxx + syy < TOLERANCE {
        return Vector3::zeros();
    }
    // All neighbours on one line through the centroid.
    let direction = l * sxx.sqrt() * bx.signum() + m * syy.sqrt() * by.signum();
    let along = direction.try_normalize(TOLERANCE).unwrap_or_else(Vector3::zeros);
    let (ax, ay) = (along.dot(&l), along.dot(&m));
    let sum = ax * bx + ay * by;
    let norm = ax * ax * sxx + 2.0 * ax * ay * sxy + ay * ay * syy;
    if norm < TOLERANCE {
        Vector3::zeros()
    } else {
        along * (sum / norm)
    }
}

/// Exact in-plane gradient of a field varying linearly over a triangle with
/// vertex values `values`.
#[must_use]
pub fn triangle_gradient(vertices: &[Point3], values: [f64; 3], normal: &Vector3, area: f64) -> Vector3 {
    if area < TOLERANCE {
        return Vector3::zeros();
    }
    let (p0, p1, p2) = (vertices[0], vertices[1], vertices[2]);
    (normal.cross(&(p0 - p2)) * (values[1] - values[0]) + normal.cross(&(p1 - p0)) * (values[2] - values[0]))
        / (2.0 * area)
}

/// Surface velocity and pressure coefficient of a thick panel from the
/// tangential relative wind and the doublet gradient.
#[must_use]
pub fn thick_panel_pressure(normal: &Vector3, wind: &Vector3, gradient: &Vector3, speed: f64) -> (Vector3, f64) {
    let tangential = wind - normal * wind.dot(normal) + gradient;
    let cp = if speed > 0.0 {
        1.0 - tangential.norm_squared() / (speed * speed)
    } else {
        0.0
    };
    (tangential, cp)
}

/// Kutta-Joukowski force on a bound vortex segment `a -> b` of circulation
/// `gamma` in local velocity `velocity`.
#[must_use]
pub fn bound_vortex_force(density: f64, gamma: f64, velocity: &Vector3, a: &Point3, b: &Point3) -> Vector3 {
    velocity.cross(&(b - a)) * (density * gamma)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::{BuildPanelMesh, PanelShapePolicy};
    use crate::testing::{plate_store, thick_wing_store};
    use approx::assert_relative_eq;

    #[test]
    fn gradient_of_linear_field_is_exact() {
        let mesh = BuildPanelMesh::new(&plate_store(2.0, 4.0, 4, 4), PanelShapePolicy::Quads)
            .execute()
            .unwrap();
        let mu: Vec<f64> = mesh.panels().iter().map(|p| 3.0 * p.centroid.x - 2.0 * p.centroid.y).collect();
        for i in 0..mesh.len() {
            let g = doublet_gradient(&mesh, i, &mu);
            assert_relative_eq!(g, Vector3::new(3.0, -2.0, 0.0), epsilon = 1e-9);
        }
    }

    #[test]
    fn uniform_field_has_zero_gradient() {
        let mesh = BuildPanelMesh::new(&thick_wing_store(6, 4), PanelShapePolicy::Quads)
            .execute()
            .unwrap();
        let mu = vec![1.5; mesh.len()];
        for i in 0..mesh.len() {
            assert_relative_eq!(doublet_gradient(&mesh, i, &mu).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn triangle_gradient_recovers_plane() {
        let v = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let f = |p: &Point3| 1.0 + 0.5 * p.x + 4.0 * p.y;
        let g = triangle_gradient(&v, [f(&v[0]), f(&v[1]), f(&v[2])], &Vector3::z(), 1.0);
        assert_relative_eq!(g, Vector3::new(0.5, 4.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn stagnation_and_freestream_pressure() {
        let n = Vector3::new(-1.0, 0.0, 0.0);
        let (_, cp) = thick_panel_pressure(&n, &Vector3::new(10.0, 0.0, 0.0), &Vector3::zeros(), 10.0);
        assert_relative_eq!(cp, 1.0);
        let (v, cp) = thick_panel_pressure(&Vector3::z(), &Vector3::new(10.0, 0.0, 0.0), &Vector3::zeros(), 10.0);
        assert_relative_eq!(cp, 0.0);
        assert_relative_eq!(v.x, 10.0);
    }

    #[test]
    fn kutta_joukowski_lifts_with_positive_circulation() {
        let f = bound_vortex_force(
            1.225,
            2.0,
            &Vector3::new(10.0, 0.0, 0.0),
            &Point3::new(0.0, -1.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(f, Vector3::new(0.0, 0.0, 1.225 * 2.0 * 10.0 * 2.0));
    }
}
