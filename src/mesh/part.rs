use slotmap::SlotMap;

use crate::error::{MeshError, Result};
use crate::math::{rotate_about_axis, Point3, Vector3, TOLERANCE};

use super::{PositionTag, SurfaceGrid};

slotmap::new_key_type! {
    /// Key identifying a part in a [`PartStore`].
    pub struct PartId;
}

/// Closed set of part kinds the solver distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Wing,
    Fuselage,
    Sail,
}

/// Whether a part is modelled as a doublet sheet or as a closed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Thin,
    Thick,
}

/// Hinged control surface: every grid row aft of `hinge_row` rotates about
/// the hinge line. Positive deflection moves the trailing edge down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSurface {
    pub hinge_row: usize,
}

/// A paneled part as produced by the geometry collaborator.
#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub kind: PartKind,
    pub surface_kind: SurfaceKind,
    pub surfaces: Vec<SurfaceGrid>,
    pub control: Option<ControlSurface>,
}

impl Part {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: PartKind,
        surface_kind: SurfaceKind,
        surfaces: Vec<SurfaceGrid>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            surface_kind,
            surfaces,
            control: None,
        }
    }

    #[must_use]
    pub fn with_control(mut self, control: ControlSurface) -> Self {
        self.control = Some(control);
        self
    }

    /// Returns a rotated copy of the part. With a control surface only the
    /// rows aft of the hinge move; without one the whole part rotates about a
    /// spanwise axis through its first grid point.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Degenerate`] if the hinge row lies outside a grid.
    pub fn deflected(&self, angle_deg: f64) -> Result<Self> {
        let mut copy = self.clone();
        if angle_deg.abs() < TOLERANCE || self.surfaces.is_empty() {
            return Ok(copy);
        }
        let angle = angle_deg.to_radians();
        let (origin, axis, first_row) = match self.control {
            Some(control) => {
                let (origin, axis) = self.hinge_line(control.hinge_row)?;
                (origin, axis, control.hinge_row + 1)
            }
            None => (self.surfaces[0].point(0, 0), Vector3::y(), 0),
        };
        for grid in &mut copy.surfaces {
            let columns = grid.columns();
            let start = first_row * columns;
            for p in grid.points_mut().iter_mut().skip(start) {
                *p = rotate_about_axis(p, &origin, &axis, angle);
            }
        }
        Ok(copy)
    }

    /// Hinge line through the mean of the lifting grids' hinge rows, directed
    /// from the first to the last column.
    fn hinge_line(&self, row: usize) -> Result<(Point3, Vector3)> {
        let mut left = Vector3::zeros();
        let mut right = Vector3::zeros();
        let mut count = 0usize;
        for grid in &self.surfaces {
            if !matches!(grid.position, PositionTag::Top | PositionTag::Bottom | PositionTag::Mid) {
                continue;
            }
            if row + 1 >= grid.rows() {
                return Err(MeshError::Degenerate(format!(
                    "hinge row {row} outside grid of {} rows",
                    grid.rows()
                ))
                .into());
            }
            left += grid.point(row, 0).coords;
            right += grid.point(row, grid.columns() - 1).coords;
            count += 1;
        }
        if count == 0 {
            return Err(MeshError::Degenerate("control surface on a part without lifting grids".into()).into());
        }
        #[allow(clippy::cast_precision_loss)]
        let count = count as f64;
        let origin = Point3::from(left / count);
        Ok((origin, right / count - left / count))
    }
}

/// Arena of parts. Part order is insertion order and defines the order of
/// control gains in a polar.
#[derive(Debug, Default, Clone)]
pub struct PartStore {
    parts: SlotMap<PartId, Part>,
    order: Vec<PartId>,
}

impl PartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, part: Part) -> PartId {
        let id = self.parts.insert(part);
        self.order.push(id);
        id
    }

    /// # Errors
    ///
    /// Returns [`MeshError::PartNotFound`] if the key is unknown.
    pub fn part(&self, id: PartId) -> Result<&Part> {
        self.parts
            .get(id)
            .ok_or_else(|| MeshError::PartNotFound(format!("{id:?}")).into())
    }

    /// # Errors
    ///
    /// Returns [`MeshError::PartNotFound`] if the key is unknown.
    pub fn part_mut(&mut self, id: PartId) -> Result<&mut Part> {
        self.parts
            .get_mut(id)
            .ok_or_else(|| MeshError::PartNotFound(format!("{id:?}")).into())
    }

    pub fn remove(&mut self, id: PartId) -> Option<Part> {
        self.order.retain(|&k| k != id);
        self.parts.remove(id)
    }

    /// Parts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (PartId, &Part)> {
        self.order.iter().filter_map(|&id| self.parts.get(id).map(|p| (id, p)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
