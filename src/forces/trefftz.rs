//! Far-field induced drag from the trailing vortices of the wake, seen in a
//! plane normal to the freestream far downstream.

use std::f64::consts::PI;

use crate::math::{Point3, Vector3, TOLERANCE};
use crate::mesh::WakeMesh;

/// Orthonormal in-plane axes of the Trefftz plane.
#[derive(Debug, Clone, Copy)]
struct TrefftzPlane {
    /// Spanwise axis.
    e1: Vector3,
    /// Normal-to-span axis, up for a wing at small incidence.
    e2: Vector3,
}

impl TrefftzPlane {
    fn new(freestream: &Vector3) -> Option<Self> {
        let d = freestream.try_normalize(TOLERANCE)?;
        let e2 = d
            .cross(&Vector3::y())
            .try_normalize(TOLERANCE)
            .or_else(|| d.cross(&Vector3::z()).try_normalize(TOLERANCE))?;
        let e1 = e2.cross(&d).normalize();
        Some(Self { e1, e2 })
    }

    fn project(&self, p: &Point3) -> (f64, f64) {
        (p.coords.dot(&self.e1), p.coords.dot(&self.e2))
    }
}

/// Induced drag and the downwash at each wake column's midpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrefftzDrag {
    /// Induced drag force, N.
    pub drag: f64,
    /// Normal wash at each column, positive along the column's left-hand
    /// normal. Negative behind a lifting wing.
    pub downwash: Vec<f64>,
}

/// Computes the Trefftz-plane induced drag of the wake column strengths
/// `strengths`.
///
/// Each column is a pair of semi-infinite trailing vortices, `-Γ` at its left
/// edge and `+Γ` at its right edge. They cross the plane where the column
/// ends, so a relaxed wake is measured after its roll-up.
#[must_use]
pub fn trefftz_drag(
    wake: &WakeMesh,
    strengths: &[f64],
    freestream: &Vector3,
    density: f64,
    core_radius: f64,
) -> TrefftzDrag {
    let Some(plane) = TrefftzPlane::new(freestream) else {
        return TrefftzDrag {
            drag: 0.0,
            downwash: vec![0.0; strengths.len()],
        };
    };
    let segments: Vec<((f64, f64), (f64, f64))> = (0..strengths.len())
        .map(|c| {
            let (l, r) = wake.end_points(c);
            (plane.project(&l), plane.project(&r))
        })
        .collect();

    let core2 = core_radius * core_radius;
    let velocity = |y: f64, z: f64| -> (f64, f64) {
        let mut v = (0.0, 0.0);
        for (&(left, right), &gamma) in segments.iter().zip(strengths) {
            for (point, kappa) in [(left, -gamma), (right, gamma)] {
                let (ry, rz) = (y - point.0, z - point.1);
                let factor = kappa / (2.0 * PI * (ry * ry + rz * rz + core2));
                v.0 -= factor * rz;
                v.1 += factor * ry;
            }
        }
        v
    };

    let mut drag = 0.0;
    let mut downwash = Vec::with_capacity(segments.len());
    for (&(left, right), &gamma) in segments.iter().zip(strengths) {
        let (dy, dz) = (right.0 - left.0, right.1 - left.1);
        let ds = dy.hypot(dz);
        if ds < TOLERANCE {
            downwash.push(0.0);
            continue;
        }
        let (ty, tz) = (dy / ds, dz / ds);
        let v = velocity(0.5 * (left.0 + right.0), 0.5 * (left.1 + right.1));
        let w = -v.0 * tz + v.1 * ty;
        downwash.push(w);
        drag -= 0.5 * density * gamma * w * ds;
    }
    TrefftzDrag { drag, downwash }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::{BuildPanelMesh, GenerateWake, PanelShapePolicy, WakeParams};
    use crate::testing::plate_store;
    use approx::assert_relative_eq;

    fn plate_wake(span_panels: usize) -> WakeMesh {
        wake_of_span(8.0, span_panels)
    }

    fn wake_of_span(span: f64, span_panels: usize) -> WakeMesh {
        let mesh = BuildPanelMesh::new(&plate_store(1.0, span, 1, span_panels), PanelShapePolicy::Quads)
            .execute()
            .unwrap();
        GenerateWake::new(&mesh, WakeParams::default()).execute().unwrap()
    }

    #[test]
    fn elliptic_loading_matches_theory() {
        let wake = plate_wake(64);
        let (speed, b, gamma0) = (10.0, 8.0, 2.0);
        let strengths: Vec<f64> = (0..wake.columns().len())
            .map(|c| {
                let (l, r) = wake.trailing_points(c);
                let y = 0.5 * (l.y + r.y) / (0.5 * b);
                gamma0 * (1.0 - y * y).max(0.0).sqrt()
            })
            .collect();
        let result = trefftz_drag(&wake, &strengths, &Vector3::new(speed, 0.0, 0.0), 1.0, 1e-4);
        // D = π ρ Γ0² / 8 for an elliptic distribution.
        let exact = PI * gamma0 * gamma0 / 8.0;
        assert_relative_eq!(result.drag, exact, max_relative = 0.05);
        // Twice the downwash at the wing.
        let w0 = -gamma0 / b;
        let mid = result.downwash.len() / 2;
        assert_relative_eq!(result.downwash[mid], w0, max_relative = 0.08);
    }

    #[test]
    fn zero_circulation_has_no_drag() {
        let wake = plate_wake(8);
        let result = trefftz_drag(&wake, &vec![0.0; 8], &Vector3::x(), 1.225, 1e-4);
        assert_eq!(result.drag, 0.0);
        assert!(result.downwash.iter().all(|w| *w == 0.0));
    }

    #[test]
    fn vortices_are_cut_at_the_wake_end() {
        let mut wake = plate_wake(16);
        let strengths = vec![1.0; 16];
        let flat = trefftz_drag(&wake, &strengths, &Vector3::x(), 1.0, 1e-4).drag;

        // Lifting the whole far end leaves the cut unchanged.
        let ends: Vec<usize> = wake.chains().map(|(nodes, _)| nodes[nodes.len() - 1]).collect();
        let mut nodes = wake.nodes().to_vec();
        for &n in &ends {
            nodes[n].z += 0.5;
        }
        wake.set_nodes(nodes.clone()).unwrap();
        let lifted = trefftz_drag(&wake, &strengths, &Vector3::x(), 1.0, 1e-4).drag;
        assert_relative_eq!(lifted, flat, max_relative = 1e-12);

        // A far wake contracted to half span is seen as a half-span wing.
        for &n in &ends {
            nodes[n].y *= 0.5;
        }
        wake.set_nodes(nodes).unwrap();
        let contracted = trefftz_drag(&wake, &strengths, &Vector3::x(), 1.0, 1e-4).drag;
        let narrow = trefftz_drag(&wake_of_span(4.0, 16), &strengths, &Vector3::x(), 1.0, 1e-4).drag;
        assert_relative_eq!(contracted, narrow, max_relative = 1e-9);
        assert!((contracted - flat).abs() > 1e-3 * flat);
    }

    #[test]
    fn sign_of_circulation_does_not_change_drag() {
        let wake = plate_wake(8);
        let up = vec![1.0; 8];
        let down = vec![-1.0; 8];
        let a = trefftz_drag(&wake, &up, &Vector3::x(), 1.225, 1e-4);
        let b = trefftz_drag(&wake, &down, &Vector3::x(), 1.225, 1e-4);
        assert!(a.drag > 0.0);
        assert_relative_eq!(a.drag, b.drag, max_relative = 1e-12);
    }
}
