//! Uniform-density source and doublet panels.
//!
//! Sign conventions: a unit source has potential `-1/(4πr)`, a unit doublet
//! sheet has potential `Ω/(4π)` where `Ω` is the solid angle subtended by
//! the panel, positive on the side the normal points to. The doublet jump
//! `φ(+n) - φ(-n)` therefore equals the strength.

use crate::math::{Point3, Vector3, FOUR_PI, TOLERANCE};
use crate::mesh::Panel;

use super::{ring_velocity, KernelParams};

/// Solid angle of triangle `abc` seen from `p` (Van Oosterom and
/// Strackee), positive when `p` lies on the side of `(b - a) x (c - a)`.
#[must_use]
pub fn triangle_solid_angle(a: &Point3, b: &Point3, c: &Point3, p: &Point3) -> f64 {
    let r1 = a - p;
    let r2 = b - p;
    let r3 = c - p;
    let (l1, l2, l3) = (r1.norm(), r2.norm(), r3.norm());
    let numerator = r1.dot(&r2.cross(&r3));
    let denominator = l1 * l2 * l3 + r1.dot(&r2) * l3 + r1.dot(&r3) * l2 + r2.dot(&r3) * l1;
    -2.0 * numerator.atan2(denominator)
}

/// Solid angle of a planar or mildly warped polygon, by fan triangulation.
#[must_use]
pub fn solid_angle(vertices: &[Point3], p: &Point3) -> f64 {
    (1..vertices.len().saturating_sub(1))
        .map(|k| triangle_solid_angle(&vertices[0], &vertices[k], &vertices[k + 1], p))
        .sum()
}

/// Panel vertices projected on the plane through the centroid normal to the
/// panel normal.
fn projected_vertices(panel: &Panel, nodes: &[Point3]) -> Vec<Point3> {
    panel
        .vertices(nodes)
        .into_iter()
        .map(|v| v - panel.normal * (v - panel.centroid).dot(&panel.normal))
        .collect()
}

fn is_far(panel: &Panel, point: &Point3, params: &KernelParams) -> bool {
    (point - panel.centroid).norm() > params.far_field_factor * panel.max_size
}

/// Potential of a unit-strength doublet panel at `point`. When `is_self` the
/// point is the panel's own collocation point approached from inside.
#[must_use]
pub fn doublet_potential(
    panel: &Panel,
    nodes: &[Point3],
    point: &Point3,
    is_self: bool,
    params: &KernelParams,
) -> f64 {
    if is_self {
        return -0.5;
    }
    if is_far(panel, point, params) {
        let r = point - panel.centroid;
        let d = r.norm();
        return panel.area * panel.normal.dot(&r) / (FOUR_PI * d * d * d);
    }
    solid_angle(&panel.vertices(nodes), point) / FOUR_PI
}

/// Velocity of a unit-strength doublet panel, through its equivalent vortex
/// ring traversed against the node order.
#[must_use]
pub fn doublet_velocity(
    panel: &Panel,
    nodes: &[Point3],
    point: &Point3,
    params: &KernelParams,
) -> Vector3 {
    let (mut corners, area, center) = match &panel.ring {
        Some(ring) => (ring.corners.to_vec(), ring.vector_area(), ring.center()),
        None => (panel.vertices(nodes), panel.normal * panel.area, panel.centroid),
    };
    let r = point - center;
    if r.norm() > params.far_field_factor * panel.max_size {
        return point_doublet_velocity(&area, &r);
    }
    corners.reverse();
    ring_velocity(&corners, point, params.core_radius)
}

/// Velocity of a point doublet of vector moment `moment` at offset `r`.
#[must_use]
pub fn point_doublet_velocity(moment: &Vector3, r: &Vector3) -> Vector3 {
    let d2 = r.norm_squared();
    let d = d2.sqrt();
    if d < TOLERANCE {
        return Vector3::zeros();
    }
    (moment * d2 - r * (3.0 * moment.dot(r))) / (FOUR_PI * d2 * d2 * d)
}

struct EdgeTerms {
    /// `Σ a_k L_k`: in-plane distances times edge log terms.
    distance_sum: f64,
    /// `Σ L_k m_k`: outward edge normals times edge log terms.
    normal_sum: Vector3,
}

/// Edge logarithms of a planar polygon source, `L_k = ln((r_k + r_k+1 + d_k)
/// / (r_k + r_k+1 - d_k))`. Edges on which the point lies are skipped.
fn edge_terms(vertices: &[Point3], normal: &Vector3, point: &Point3) -> EdgeTerms {
    let n = vertices.len();
    let foot = point - normal * (point - vertices[0]).dot(normal);
    let mut distance_sum = 0.0;
    let mut normal_sum = Vector3::zeros();
    for k in 0..n {
        let (a, b) = (&vertices[k], &vertices[(k + 1) % n]);
        let edge = b - a;
        let d = edge.norm();
        if d < TOLERANCE {
            continue;
        }
        let outward = edge.cross(normal) / d;
        let (ra, rb) = ((point - a).norm(), (point - b).norm());
        let below = ra + rb - d;
        if below < TOLERANCE * d {
            continue;
        }
        let log = ((ra + rb + d) / below).ln();
        distance_sum += (a - foot).dot(&outward) * log;
        normal_sum += outward * log;
    }
    EdgeTerms {
        distance_sum,
        normal_sum,
    }
}

/// Potential of a unit-strength source panel at `point`. When `is_self` the
/// point is taken in the panel plane.
#[must_use]
pub fn source_potential(
    panel: &Panel,
    nodes: &[Point3],
    point: &Point3,
    is_self: bool,
    params: &KernelParams,
) -> f64 {
    if !is_self && is_far(panel, point, params) {
        return -panel.area / (FOUR_PI * (point - panel.centroid).norm());
    }
    let vertices = projected_vertices(panel, nodes);
    let terms = edge_terms(&vertices, &panel.normal, point);
    if is_self {
        return -terms.distance_sum / FOUR_PI;
    }
    let height = (point - panel.centroid).dot(&panel.normal);
    let omega = solid_angle(&vertices, point);
    -(terms.distance_sum - height * omega) / FOUR_PI
}

/// Velocity of a unit-strength source panel at `point`. When `is_self` the
/// normal component takes its limit on the outer side, `n/2`.
#[must_use]
pub fn source_velocity(
    panel: &Panel,
    nodes: &[Point3],
    point: &Point3,
    is_self: bool,
    params: &KernelParams,
) -> Vector3 {
    if !is_self && is_far(panel, point, params) {
        let r = point - panel.centroid;
        let d = r.norm();
        return r * (panel.area / (FOUR_PI * d * d * d));
    }
    let vertices = projected_vertices(panel, nodes);
    let terms = edge_terms(&vertices, &panel.normal, point);
    let omega = if is_self {
        0.5 * FOUR_PI
    } else {
        solid_angle(&vertices, point)
    };
    (terms.normal_sum + panel.normal * omega) / FOUR_PI
}
