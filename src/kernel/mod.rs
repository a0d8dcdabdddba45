//! Influence of unit-strength singularities on points in space.
//!
//! Panels carry source and doublet sheets of uniform or linearly varying
//! strength; vortex segments and rings are the velocity counterpart of
//! doublet panels. All functions here are pure and safe to call from any
//! number of threads.

mod field;
mod linear;
mod singularity;
mod strategy;
mod vortex;

pub use field::{
    body_potential_row, body_velocity_row, source_potential_row, source_velocity_row,
    wake_potential_row, wake_velocity_row, InducedField,
};
pub use linear::{basis_potentials, NodeAverage};
pub use singularity::{
    doublet_potential, doublet_velocity, point_doublet_velocity, solid_angle, source_potential,
    source_velocity, triangle_solid_angle,
};
pub use strategy::{LinearDensity, UniformDensity};
pub use vortex::{ring_velocity, segment_velocity};

use crate::error::{KernelError, Result};
use crate::math::{Point3, Vector3};
use crate::mesh::PanelMesh;

/// Whether the mirror plane is a rigid ground or a free surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Rigid wall: the image has the same sign, normal velocity vanishes.
    Ground,
    /// Free surface: the image has the opposite sign, potential vanishes.
    FreeSurface,
}

/// Horizontal mirror plane at `z = -height` in body axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundImage {
    pub height: f64,
    pub kind: ImageKind,
}

impl GroundImage {
    #[must_use]
    pub fn ground(height: f64) -> Self {
        Self {
            height,
            kind: ImageKind::Ground,
        }
    }

    #[must_use]
    pub fn free_surface(height: f64) -> Self {
        Self {
            height,
            kind: ImageKind::FreeSurface,
        }
    }

    /// Sign applied to the image contribution.
    #[must_use]
    pub fn coefficient(&self) -> f64 {
        match self.kind {
            ImageKind::Ground => 1.0,
            ImageKind::FreeSurface => -1.0,
        }
    }

    /// Reflection of `point` about the plane.
    #[must_use]
    pub fn mirror(&self, point: &Point3) -> Point3 {
        Point3::new(point.x, point.y, -point.z - 2.0 * self.height)
    }

    /// Reflection of a velocity vector about the plane.
    #[must_use]
    pub fn mirror_velocity(&self, v: &Vector3) -> Vector3 {
        Vector3::new(v.x, v.y, -v.z)
    }
}

/// Numerical settings shared by every influence evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelParams {
    /// Rankine core radius of vortex segments, metres.
    pub core_radius: f64,
    /// Distance, in panel sizes, beyond which panels act as point singularities.
    pub far_field_factor: f64,
    pub ground: Option<GroundImage>,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            core_radius: 1e-4,
            far_field_factor: 10.0,
            ground: None,
        }
    }
}

impl KernelParams {
    /// # Errors
    ///
    /// Returns [`KernelError::NonPositive`] for a non-positive core radius,
    /// far-field factor or ground height.
    pub fn validate(&self) -> Result<()> {
        let mut checks = vec![
            ("core_radius", self.core_radius),
            ("far_field_factor", self.far_field_factor),
        ];
        if let Some(ground) = &self.ground {
            checks.push(("ground height", ground.height));
        }
        for (parameter, value) in checks {
            if value.is_nan() || value <= 0.0 {
                return Err(KernelError::NonPositive { parameter, value }.into());
            }
        }
        Ok(())
    }
}

/// How doublet strength varies over a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DensityKind {
    Uniform,
    /// Linear over triangles, interpolated from node-averaged panel values.
    Linear,
}

/// Maps the per-panel doublet unknowns of a mesh to influences at a point.
///
/// Implementations accumulate `scale` times the influence of each unknown
/// into `row`, which has one entry per panel.
pub trait InfluenceStrategy: Send + Sync {
    fn density(&self) -> DensityKind;

    fn params(&self) -> &KernelParams;

    /// Adds doublet potentials at `point`. `own` names the panel whose
    /// collocation point `point` is, for the inside self-influence limit.
    fn add_doublet_potentials(
        &self,
        mesh: &PanelMesh,
        point: &Point3,
        own: Option<usize>,
        scale: f64,
        row: &mut [f64],
    );

    /// Adds doublet velocities at `point`.
    fn add_doublet_velocities(&self, mesh: &PanelMesh, point: &Point3, scale: f64, row: &mut [Vector3]);
}

/// Picks the strategy for `density`.
///
/// # Errors
///
/// Returns [`KernelError::LinearOnQuad`] when linear density is requested on
/// a mesh containing quads, and [`KernelError::NonPositive`] for invalid
/// parameters.
pub fn make_strategy(
    density: DensityKind,
    mesh: &PanelMesh,
    params: KernelParams,
) -> Result<Box<dyn InfluenceStrategy>> {
    params.validate()?;
    Ok(match density {
        DensityKind::Uniform => Box::new(UniformDensity::new(params)),
        DensityKind::Linear => Box::new(LinearDensity::new(mesh, params)?),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn image_reflects_about_plane() {
        let image = GroundImage::ground(2.0);
        let p = image.mirror(&Point3::new(1.0, 2.0, 0.5));
        assert_eq!(p, Point3::new(1.0, 2.0, -4.5));
        assert_eq!(image.mirror(&p), Point3::new(1.0, 2.0, 0.5));
        assert_eq!(GroundImage::free_surface(1.0).coefficient(), -1.0);
    }

    #[test]
    fn rejects_bad_params() {
        let bad = KernelParams {
            core_radius: 0.0,
            ..KernelParams::default()
        };
        assert!(bad.validate().is_err());
        let below = KernelParams {
            ground: Some(GroundImage::ground(-1.0)),
            ..KernelParams::default()
        };
        assert!(below.validate().is_err());
        KernelParams::default().validate().unwrap();
    }
}
