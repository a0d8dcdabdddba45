use crate::math::{Point3, Vector3};
use crate::mesh::{PanelMesh, WakeMesh};

use super::{
    doublet_potential, doublet_velocity, source_potential, source_velocity, InfluenceStrategy,
    KernelParams,
};

/// Adds the mirror-image contribution of `eval` to `row` when a ground or
/// free-surface image is configured.
/// The closure receives the evaluation point, the image sign and whether the
/// point is the real one.
fn with_image<T>(
    params: &KernelParams,
    point: &Point3,
    row: &mut [T],
    mut eval: impl FnMut(&Point3, f64, bool, &mut [T]),
) {
    eval(point, 1.0, true, row);
    if let Some(image) = &params.ground {
        eval(&image.mirror(point), image.coefficient(), false, row);
    }
}

fn with_image_velocity(
    params: &KernelParams,
    point: &Point3,
    len: usize,
    mut eval: impl FnMut(&Point3, bool, &mut [Vector3]),
) -> Vec<Vector3> {
    let mut row = vec![Vector3::zeros(); len];
    eval(point, true, &mut row);
    if let Some(image) = &params.ground {
        let mut mirrored = vec![Vector3::zeros(); len];
        eval(&image.mirror(point), false, &mut mirrored);
        let coefficient = image.coefficient();
        for (out, v) in row.iter_mut().zip(&mirrored) {
            *out += image.mirror_velocity(v) * coefficient;
        }
    }
    row
}

/// Doublet potential of every body panel unknown at `point`.
#[must_use]
pub fn body_potential_row(
    strategy: &dyn InfluenceStrategy,
    mesh: &PanelMesh,
    point: &Point3,
    own: Option<usize>,
) -> Vec<f64> {
    let mut row = vec![0.0; mesh.len()];
    with_image(strategy.params(), point, &mut row, |p, scale, real, row| {
        let own = if real { own } else { None };
        strategy.add_doublet_potentials(mesh, p, own, scale, row);
    });
    row
}

/// Doublet velocity of every body panel unknown at `point`.
#[must_use]
pub fn body_velocity_row(strategy: &dyn InfluenceStrategy, mesh: &PanelMesh, point: &Point3) -> Vec<Vector3> {
    with_image_velocity(strategy.params(), point, mesh.len(), |p, _, row| {
        strategy.add_doublet_velocities(mesh, p, 1.0, row);
    })
}

/// Source potential of every body panel at `point`. Thin panels carry no
/// source and get zero.
#[must_use]
pub fn source_potential_row(mesh: &PanelMesh, params: &KernelParams, point: &Point3, own: Option<usize>) -> Vec<f64> {
    let nodes = mesh.nodes();
    let mut row = vec![0.0; mesh.len()];
    with_image(params, point, &mut row, |p, scale, real, row| {
        let own = if real { own } else { None };
        for (j, (panel, out)) in mesh.panels().iter().zip(row.iter_mut()).enumerate() {
            if !panel.is_thin() {
                *out += scale * source_potential(panel, nodes, p, own == Some(j), params);
            }
        }
    });
    row
}

/// Source velocity of every body panel at `point`.
#[must_use]
pub fn source_velocity_row(
    mesh: &PanelMesh,
    params: &KernelParams,
    point: &Point3,
    own: Option<usize>,
) -> Vec<Vector3> {
    let nodes = mesh.nodes();
    with_image_velocity(params, point, mesh.len(), |p, real, row| {
        let own = if real { own } else { None };
        for (j, (panel, out)) in mesh.panels().iter().zip(row.iter_mut()).enumerate() {
            if !panel.is_thin() {
                *out += source_velocity(panel, nodes, p, own == Some(j), params);
            }
        }
    })
}

/// Doublet potential at `point` of each wake column at unit strength.
#[must_use]
pub fn wake_potential_row(wake: &WakeMesh, params: &KernelParams, point: &Point3) -> Vec<f64> {
    let nodes = wake.nodes();
    let panels = wake.panels();
    let mut row = vec![0.0; wake.columns().len()];
    with_image(params, point, &mut row, |p, scale, _, row| {
        for (column, out) in wake.columns().iter().zip(row.iter_mut()) {
            *out += scale
                * column
                    .panels
                    .iter()
                    .map(|&w| doublet_potential(&panels[w], nodes, p, false, params))
                    .sum::<f64>();
        }
    });
    row
}

/// Doublet velocity at `point` of each wake column at unit strength.
#[must_use]
pub fn wake_velocity_row(wake: &WakeMesh, params: &KernelParams, point: &Point3) -> Vec<Vector3> {
    let nodes = wake.nodes();
    let panels = wake.panels();
    with_image_velocity(params, point, wake.columns().len(), |p, _, row| {
        for (column, out) in wake.columns().iter().zip(row.iter_mut()) {
            for &w in &column.panels {
                *out += doublet_velocity(&panels[w], nodes, p, params);
            }
        }
    })
}

/// Perturbation velocity field of a solved body and wake, evaluated at
/// arbitrary points.
pub struct InducedField<'a> {
    strategy: &'a dyn InfluenceStrategy,
    mesh: &'a PanelMesh,
    wake: &'a WakeMesh,
    doublets: &'a [f64],
    sources: &'a [f64],
    wake_strengths: &'a [f64],
}

impl<'a> InducedField<'a> {
    #[must_use]
    pub fn new(
        strategy: &'a dyn InfluenceStrategy,
        mesh: &'a PanelMesh,
        wake: &'a WakeMesh,
        doublets: &'a [f64],
        sources: &'a [f64],
        wake_strengths: &'a [f64],
    ) -> Self {
        Self {
            strategy,
            mesh,
            wake,
            doublets,
            sources,
            wake_strengths,
        }
    }

    /// Velocity induced at `point` by all body and wake singularities.
    #[must_use]
    pub fn velocity(&self, point: &Point3) -> Vector3 {
        let params = self.strategy.params();
        let dot = |row: Vec<Vector3>, strengths: &[f64]| -> Vector3 {
            row.iter().zip(strengths).map(|(v, s)| v * *s).sum()
        };
        dot(body_velocity_row(self.strategy, self.mesh, point), self.doublets)
            + dot(source_velocity_row(self.mesh, params, point, None), self.sources)
            + dot(wake_velocity_row(self.wake, params, point), self.wake_strengths)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kernel::{GroundImage, UniformDensity};
    use crate::mesh::{BuildPanelMesh, GenerateWake, PanelShapePolicy, WakeParams};
    use crate::testing::{cube_mesh, plate_store};
    use approx::assert_relative_eq;

    #[test]
    fn closed_body_row_sums_to_minus_one() {
        let mesh = cube_mesh();
        let strategy = UniformDensity::new(KernelParams::default());
        for (i, panel) in mesh.panels().iter().enumerate() {
            let row = body_potential_row(&strategy, &mesh, &panel.collocation, Some(i));
            assert_relative_eq!(row.iter().sum::<f64>(), -1.0, epsilon = 1e-10);
            assert_relative_eq!(row[i], -0.5);
        }
    }

    #[test]
    fn closed_body_row_vanishes_outside() {
        let mesh = cube_mesh();
        let strategy = UniformDensity::new(KernelParams::default());
        let row = body_potential_row(&strategy, &mesh, &Point3::new(2.5, 0.3, -0.7), None);
        assert_relative_eq!(row.iter().sum::<f64>(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn ground_image_cancels_normal_velocity_on_plane() {
        let store = plate_store(1.0, 4.0, 2, 4);
        let mesh = BuildPanelMesh::new(&store, PanelShapePolicy::Quads).execute().unwrap();
        let params = KernelParams {
            ground: Some(GroundImage::ground(0.5)),
            ..KernelParams::default()
        };
        let strategy = UniformDensity::new(params);
        let row = body_velocity_row(&strategy, &mesh, &Point3::new(0.4, 0.3, -0.5));
        for v in &row {
            assert_relative_eq!(v.z, 0.0, epsilon = 1e-12);
        }
        let free = UniformDensity::new(KernelParams {
            ground: Some(GroundImage::free_surface(0.5)),
            ..KernelParams::default()
        });
        let row = body_potential_row(&free, &mesh, &Point3::new(0.4, 0.3, -0.5), None);
        for phi in &row {
            assert_relative_eq!(*phi, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn equal_strength_wake_continues_the_body_sheet() {
        // The trailing segment of the plate ring cancels the leading segment
        // of the wake, leaving one long ring.
        let store = plate_store(1.0, 4.0, 1, 1);
        let mesh = BuildPanelMesh::new(&store, PanelShapePolicy::Quads).execute().unwrap();
        let wake = GenerateWake::new(&mesh, WakeParams { panels: 3, ..WakeParams::default() })
            .execute()
            .unwrap();
        let params = KernelParams {
            far_field_factor: f64::INFINITY,
            ..KernelParams::default()
        };
        let strategy = UniformDensity::new(params);
        let field = InducedField::new(&strategy, &mesh, &wake, &[1.0], &[0.0], &[1.0]);
        let point = Point3::new(1.0, 0.3, 0.05);
        let mut corners = [
            Point3::new(0.25, -2.0, 0.0),
            Point3::new(31.0, -2.0, 0.0),
            Point3::new(31.0, 2.0, 0.0),
            Point3::new(0.25, 2.0, 0.0),
        ];
        corners.reverse();
        let expected = crate::kernel::ring_velocity(&corners, &point, params.core_radius);
        let v = field.velocity(&point);
        assert_relative_eq!((v - expected).norm(), 0.0, epsilon = 1e-9 * expected.norm());
    }
}
