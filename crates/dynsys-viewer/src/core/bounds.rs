//! Trajectory points, the component mapping and axis-aligned bounds.

use crate::error::{PointDefect, Result, ViewerError};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Render axis. `Y` is the vertical (camera up) axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit(self) -> DVec3 {
        match self {
            Axis::X => DVec3::X,
            Axis::Y => DVec3::Y,
            Axis::Z => DVec3::Z,
        }
    }
}

/// One sample of the trajectory in render-axis order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint(pub DVec3);

impl TrajectoryPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(DVec3::new(x, y, z))
    }

    pub fn get(&self, axis: Axis) -> f64 {
        self.0[axis.index()]
    }
}

impl From<[f64; 3]> for TrajectoryPoint {
    fn from(v: [f64; 3]) -> Self {
        Self(DVec3::from_array(v))
    }
}

/// Which raw state component feeds each render axis.
///
/// Chosen once per session. A slot that points past the end of a row reads
/// as `0.0`, so planar systems plot on the `z = 0` plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentMapping(pub [usize; 3]);

impl Default for ComponentMapping {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ComponentMapping {
    pub const IDENTITY: ComponentMapping = ComponentMapping([0, 1, 2]);
    /// Minimum row width accepted by [`ComponentMapping::map_rows`].
    pub const REQUIRED_COMPONENTS: usize = 2;

    pub fn new(slots: [usize; 3]) -> Result<Self> {
        let [a, b, c] = slots;
        if a == b || b == c || a == c {
            return Err(ViewerError::InvalidMapping { mapping: slots });
        }
        Ok(Self(slots))
    }

    /// Map one raw row. `index` is only used for error reporting.
    pub fn map_row(&self, index: usize, row: &[f64]) -> Result<TrajectoryPoint> {
        if row.len() < Self::REQUIRED_COMPONENTS {
            return Err(ViewerError::InvalidPoint {
                index,
                defect: PointDefect::MissingComponents {
                    found: row.len(),
                    required: Self::REQUIRED_COMPONENTS,
                },
            });
        }
        if let Some((component, &value)) = row.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ViewerError::InvalidPoint {
                index,
                defect: PointDefect::NonFinite { component, value },
            });
        }
        let pick = |slot: usize| row.get(slot).copied().unwrap_or(0.0);
        Ok(TrajectoryPoint::new(
            pick(self.0[0]),
            pick(self.0[1]),
            pick(self.0[2]),
        ))
    }

    /// Map every row, failing on the first invalid one.
    pub fn map_rows<R: AsRef<[f64]>>(&self, rows: &[R]) -> Result<Vec<TrajectoryPoint>> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| self.map_row(i, row.as_ref()))
            .collect()
    }
}

/// Validate already-mapped points.
pub fn validate_points(points: &[TrajectoryPoint]) -> Result<()> {
    if points.is_empty() {
        return Err(ViewerError::EmptyTrajectory);
    }
    for (index, p) in points.iter().enumerate() {
        if let Some(component) = (0..3).find(|&c| !p.0[c].is_finite()) {
            return Err(ViewerError::InvalidPoint {
                index,
                defect: PointDefect::NonFinite {
                    component,
                    value: p.0[component],
                },
            });
        }
    }
    Ok(())
}

/// Axis-aligned bounds of a trajectory in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl BoundingBox {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Bounds of a non-empty point set.
    pub fn from_points(points: &[TrajectoryPoint]) -> Result<Self> {
        let (first, rest) = points.split_first().ok_or(ViewerError::EmptyTrajectory)?;
        let mut min = first.0;
        let mut max = first.0;
        for p in rest {
            min = min.min(p.0);
            max = max.max(p.0);
        }
        Ok(Self { min, max })
    }

    pub fn center(&self) -> DVec3 {
        self.min * 0.5 + self.max * 0.5
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn range(&self, axis: Axis) -> (f64, f64) {
        (self.min[axis.index()], self.max[axis.index()])
    }

    pub fn is_degenerate(&self, axis: Axis) -> bool {
        let (lo, hi) = self.range(axis);
        lo == hi
    }

    /// `(min_x, max_x, min_y, max_y, min_z, max_z)`
    pub fn as_tuple(&self) -> (f64, f64, f64, f64, f64, f64) {
        (
            self.min.x, self.max.x, self.min.y, self.max.y, self.min.z, self.max.z,
        )
    }
}
