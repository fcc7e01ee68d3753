pub mod input;

use crate::error::{GuidanceError, Result};
use nalgebra::{Isometry3, Point3, Unit, Vector3};
use std::fmt;

/// Row and column labels of a physical template hole.
///
/// The labels are opaque to the engine; they are only carried through for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HoleLabel {
    pub row: String,
    pub column: String,
}

impl HoleLabel {
    pub fn new(row: impl Into<String>, column: impl Into<String>) -> Self {
        HoleLabel {
            row: row.into(),
            column: column.into(),
        }
    }

    /// Label reported when no trajectory is available.
    pub fn none() -> Self {
        HoleLabel::new("--", "--")
    }

    pub fn is_none(&self) -> bool {
        self.row == "--" && self.column == "--"
    }
}

impl fmt::Display for HoleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// A candidate needle path through one template hole, in world coordinates (mm).
///
/// `direction` is stored as given and is not normalized; the nearest-path
/// search projects onto it as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    origin: Point3<f64>,
    direction: Vector3<f64>,
    hole: HoleLabel,
    max_depth: f64,
}

impl Trajectory {
    /// Creates a trajectory, rejecting zero-length or non-finite geometry.
    pub fn new(
        origin: Point3<f64>,
        direction: Vector3<f64>,
        hole: HoleLabel,
        max_depth: f64,
    ) -> Result<Self> {
        let finite = origin.iter().all(|c| c.is_finite())
            && direction.iter().all(|c| c.is_finite())
            && max_depth.is_finite();
        if !finite || direction.norm_squared() == 0.0 {
            return Err(GuidanceError::DegenerateTrajectory { hole });
        }
        Ok(Trajectory {
            origin,
            direction,
            hole,
            max_depth,
        })
    }

    pub fn origin(&self) -> &Point3<f64> {
        &self.origin
    }

    pub fn direction(&self) -> &Vector3<f64> {
        &self.direction
    }

    pub fn hole(&self) -> &HoleLabel {
        &self.hole
    }

    pub fn max_depth(&self) -> f64 {
        self.max_depth
    }

    pub fn unit_direction(&self) -> Unit<Vector3<f64>> {
        // direction is non-zero by construction
        Unit::new_normalize(self.direction)
    }

    /// Point reached after inserting `depth` mm along the trajectory.
    pub fn point_at_depth(&self, depth: f64) -> Point3<f64> {
        self.origin + self.unit_direction().into_inner() * depth
    }

    /// Deepest reachable point of the trajectory.
    pub fn end(&self) -> Point3<f64> {
        self.point_at_depth(self.max_depth)
    }
}

/// Read-only source of candidate trajectories for the guidance engine.
pub trait TemplateGeometryProvider {
    fn trajectories(&self) -> &[Trajectory];

    /// Template-to-world registration, if one has been established.
    fn registration(&self) -> Option<&Isometry3<f64>>;
}

/// The trajectory array of one registered template.
///
/// Replaced wholesale on re-registration; `generation` identifies which
/// registration a computation was built against.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateGeometry {
    trajectories: Vec<Trajectory>,
    registration: Option<Isometry3<f64>>,
    generation: u64,
}

impl TemplateGeometry {
    pub fn new(
        trajectories: Vec<Trajectory>,
        registration: Option<Isometry3<f64>>,
        generation: u64,
    ) -> Self {
        TemplateGeometry {
            trajectories,
            registration,
            generation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn get(&self, index: usize) -> Option<&Trajectory> {
        self.trajectories.get(index)
    }
}

impl TemplateGeometryProvider for TemplateGeometry {
    fn trajectories(&self) -> &[Trajectory] {
        &self.trajectories
    }

    fn registration(&self) -> Option<&Isometry3<f64>> {
        self.registration.as_ref()
    }
}
