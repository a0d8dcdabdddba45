use std::f64::consts::PI;

use crate::error::{MeshError, Result};
use crate::math::Point3;

use super::PositionTag;

/// Structured point grid describing one surface of a part.
///
/// Rows run along the first parametric direction (chordwise for lifting
/// surfaces, axial for bodies) and columns along the second (spanwise or
/// hoop). A cell `(i, j)` spans rows `i..=i+1` and columns `j..=j+1`.
#[derive(Debug, Clone)]
pub struct SurfaceGrid {
    points: Vec<Point3>,
    rows: usize,
    columns: usize,
    pub position: PositionTag,
    /// Flip the cell node order so that the normal points outward.
    pub reversed: bool,
    /// The last row is a trailing edge that sheds a wake.
    pub trailing: bool,
}

impl SurfaceGrid {
    /// Creates a grid from row-major points.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Degenerate`] if there are fewer than two rows or
    /// columns, or if the point count does not match `rows * columns`.
    pub fn new(
        points: Vec<Point3>,
        rows: usize,
        columns: usize,
        position: PositionTag,
    ) -> Result<Self> {
        if rows < 2 || columns < 2 {
            return Err(MeshError::Degenerate(format!(
                "surface grid needs at least 2x2 points, got {rows}x{columns}"
            ))
            .into());
        }
        if points.len() != rows * columns {
            return Err(MeshError::Degenerate(format!(
                "surface grid expects {} points, got {}",
                rows * columns,
                points.len()
            ))
            .into());
        }
        Ok(Self {
            points,
            rows,
            columns,
            position,
            reversed: false,
            trailing: false,
        })
    }

    /// A flat rectangular thin surface in the `z = 0` plane, leading edge on
    /// `x = 0`, spanning `y` in `[-span/2, span/2]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn flat_plate(chord: f64, span: f64, chord_panels: usize, span_panels: usize) -> Self {
        let rows = chord_panels.max(1) + 1;
        let columns = span_panels.max(1) + 1;
        let mut points = Vec::with_capacity(rows * columns);
        for i in 0..rows {
            let x = chord * i as f64 / (rows - 1) as f64;
            for j in 0..columns {
                let y = -0.5 * span + span * j as f64 / (columns - 1) as f64;
                points.push(Point3::new(x, y, 0.0));
            }
        }
        Self {
            points,
            rows,
            columns,
            position: PositionTag::Mid,
            reversed: false,
            trailing: true,
        }
    }

    #[must_use]
    pub fn with_reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    #[must_use]
    pub fn with_trailing_edge(mut self, trailing: bool) -> Self {
        self.trailing = trailing;
        self
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[must_use]
    pub fn point(&self, row: usize, column: usize) -> Point3 {
        self.points[row * self.columns + column]
    }

    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut [Point3] {
        &mut self.points
    }

    /// Point on the ring lattice of a thin surface: a quarter of the local
    /// row spacing downstream of `(row, column)`, or the point itself on the
    /// last row.
    #[must_use]
    pub fn quarter_point(&self, row: usize, column: usize) -> Point3 {
        let p = self.point(row, column);
        if row + 1 < self.rows {
            p + (self.point(row + 1, column) - p) * 0.25
        } else {
            p
        }
    }
}

/// Parametric description of a straight-tapered wing.
///
/// The root leading edge sits at `origin`; the span runs symmetrically along
/// `y`. Chordwise stations use cosine spacing when requested.
#[derive(Debug, Clone, Copy)]
pub struct WingShape {
    pub origin: Point3,
    pub root_chord: f64,
    pub tip_chord: f64,
    pub span: f64,
    /// Leading-edge sweep, degrees.
    pub sweep: f64,
    /// Dihedral, degrees.
    pub dihedral: f64,
    /// Thickness-to-chord ratio of the symmetric NACA 4-digit section.
    pub thickness: f64,
    pub chord_panels: usize,
    pub span_panels: usize,
    pub cosine_spacing: bool,
}

impl Default for WingShape {
    fn default() -> Self {
        Self {
            origin: Point3::origin(),
            root_chord: 1.0,
            tip_chord: 1.0,
            span: 8.0,
            sweep: 0.0,
            dihedral: 0.0,
            thickness: 0.12,
            chord_panels: 8,
            span_panels: 16,
            cosine_spacing: true,
        }
    }
}

impl WingShape {
    /// Single mean-surface grid for thin analyses.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Degenerate`] if the panel counts or dimensions
    /// cannot form a grid.
    pub fn thin_surface(&self) -> Result<SurfaceGrid> {
        self.check()?;
        let points = self.sample(|_| 0.0);
        Ok(SurfaceGrid::new(points, self.rows(), self.columns(), PositionTag::Mid)?
            .with_trailing_edge(true))
    }

    /// Top, bottom and both tip closures of a thick wing.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Degenerate`] if the panel counts or dimensions
    /// cannot form a grid.
    pub fn thick_surfaces(&self) -> Result<Vec<SurfaceGrid>> {
        self.check()?;
        let t = self.thickness;
        let top = SurfaceGrid::new(
            self.sample(|x| naca_half_thickness(t, x)),
            self.rows(),
            self.columns(),
            PositionTag::Top,
        )?
        .with_trailing_edge(true);
        let bottom = SurfaceGrid::new(
            self.sample(|x| -naca_half_thickness(t, x)),
            self.rows(),
            self.columns(),
            PositionTag::Bottom,
        )?
        .with_reversed(true)
        .with_trailing_edge(true);

        let last = self.columns() - 1;
        let left = tip_patch(&bottom, &top, 0, false)?;
        let right = tip_patch(&bottom, &top, last, true)?;
        Ok(vec![top, bottom, left, right])
    }

    fn rows(&self) -> usize {
        self.chord_panels + 1
    }

    fn columns(&self) -> usize {
        self.span_panels + 1
    }

    fn check(&self) -> Result<()> {
        if self.chord_panels == 0 || self.span_panels == 0 {
            return Err(MeshError::Degenerate("wing needs at least one panel per direction".into()).into());
        }
        if self.span <= 0.0 || self.root_chord <= 0.0 || self.tip_chord < 0.0 {
            return Err(MeshError::Degenerate("wing dimensions must be positive".into()).into());
        }
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn sample(&self, offset: impl Fn(f64) -> f64) -> Vec<Point3> {
        let rows = self.rows();
        let columns = self.columns();
        let (tan_sweep, tan_dihedral) = (self.sweep.to_radians().tan(), self.dihedral.to_radians().tan());
        let half = 0.5 * self.span;
        let mut points = Vec::with_capacity(rows * columns);
        for i in 0..rows {
            let s = i as f64 / (rows - 1) as f64;
            let x = if self.cosine_spacing {
                0.5 * (1.0 - (PI * s).cos())
            } else {
                s
            };
            for j in 0..columns {
                let y = -half + self.span * j as f64 / (columns - 1) as f64;
                let eta = y.abs() / half;
                let chord = self.root_chord + (self.tip_chord - self.root_chord) * eta;
                let x_le = y.abs() * tan_sweep;
                let z = y.abs() * tan_dihedral;
                points.push(Point3::new(
                    self.origin.x + x_le + x * chord,
                    self.origin.y + y,
                    self.origin.z + z + offset(x) * chord,
                ));
            }
        }
        points
    }
}

/// Half thickness of a symmetric NACA 4-digit section with a closed
/// trailing edge, as a fraction of chord.
#[must_use]
pub fn naca_half_thickness(thickness: f64, x: f64) -> f64 {
    let x = x.clamp(0.0, 1.0);
    5.0 * thickness
        * (0.2969 * x.sqrt() - 0.1260 * x - 0.3516 * x * x + 0.2843 * x.powi(3)
            - 0.1036 * x.powi(4))
}

fn tip_patch(
    bottom: &SurfaceGrid,
    top: &SurfaceGrid,
    column: usize,
    reversed: bool,
) -> Result<SurfaceGrid> {
    let rows = top.rows();
    let mut points = Vec::with_capacity(rows * 2);
    for i in 0..rows {
        points.push(bottom.point(i, column));
        points.push(top.point(i, column));
    }
    Ok(SurfaceGrid::new(points, rows, 2, PositionTag::Side)?.with_reversed(reversed))
}

/// Axisymmetric body sampled along `x` (rows) and around the hoop (columns).
#[derive(Debug, Clone, Copy)]
pub struct BodyOfRevolution {
    pub nose: Point3,
    pub length: f64,
    pub max_radius: f64,
    pub axial_panels: usize,
    pub hoop_panels: usize,
}

impl BodyOfRevolution {
    /// Builds the outward-facing fuselage grid. Nose and tail collapse to a
    /// single point, producing triangular end panels.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Degenerate`] for fewer than 2 axial or 3 hoop
    /// panels, or a non-positive size.
    #[allow(clippy::cast_precision_loss)]
    pub fn build(&self) -> Result<SurfaceGrid> {
        if self.axial_panels < 2 || self.hoop_panels < 3 {
            return Err(MeshError::Degenerate("body needs 2 axial and 3 hoop panels".into()).into());
        }
        if self.length <= 0.0 || self.max_radius <= 0.0 {
            return Err(MeshError::Degenerate("body dimensions must be positive".into()).into());
        }
        let rows = self.axial_panels + 1;
        let columns = self.hoop_panels + 1;
        let mut points = Vec::with_capacity(rows * columns);
        for i in 0..rows {
            let s = 0.5 * (1.0 - (PI * i as f64 / (rows - 1) as f64).cos());
            let radius = self.max_radius * (1.0 - (2.0 * s - 1.0).powi(2)).max(0.0).sqrt();
            for j in 0..columns {
                let theta = 2.0 * PI * (j % self.hoop_panels) as f64 / self.hoop_panels as f64;
                points.push(Point3::new(
                    self.nose.x + s * self.length,
                    self.nose.y + radius * theta.cos(),
                    self.nose.z + radius * theta.sin(),
                ));
            }
        }
        Ok(SurfaceGrid::new(points, rows, columns, PositionTag::Fuselage)?.with_reversed(true))
    }
}
