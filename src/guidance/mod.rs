pub mod comparison;
pub mod computation;

use crate::template::{HoleLabel, Trajectory};
use nalgebra::Point3;

pub use computation::GuidanceComputation;

/// Outcome of the nearest-trajectory search for one point.
///
/// `needle_start`/`needle_end` are only set when the depth is in range; the
/// end is the deepest point of the chosen trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestPath {
    pub trajectory_index: Option<usize>,
    pub needle_start: Option<Point3<f64>>,
    pub needle_end: Option<Point3<f64>>,
    pub hole: HoleLabel,
    pub depth: f64,
    pub in_range: bool,
}

impl NearestPath {
    fn none() -> Self {
        NearestPath {
            trajectory_index: None,
            needle_start: None,
            needle_end: None,
            hole: HoleLabel::none(),
            depth: 0.0,
            in_range: false,
        }
    }
}

/// `0 < depth < max_depth`, both bounds exclusive.
pub fn depth_in_range(depth: f64, max_depth: f64) -> bool {
    0.0 < depth && depth < max_depth
}

/// Finds the trajectory closest to `position`.
///
/// The projection uses each direction vector as stored (not normalized), so
/// with non-unit directions `depth` and the squared distance are scaled by
/// the direction's length. The first strict minimum wins. An empty slice
/// yields the `(--, --)` sentinel.
pub fn compute_nearest_path(trajectories: &[Trajectory], position: &Point3<f64>) -> NearestPath {
    let mut min_mag2 = f64::INFINITY;
    let mut min_depth = 0.0;
    let mut min_index = None;

    for (i, trajectory) in trajectories.iter().enumerate() {
        let v = trajectory.direction();
        let op = position - trajectory.origin();
        let aproj = op.dot(v);
        let perp = op - v * aproj;
        let mag2 = perp.dot(&perp);
        // the first trajectory is always taken, even with an infinite distance
        if min_index.is_none() || mag2 < min_mag2 {
            min_mag2 = mag2;
            min_index = Some(i);
            min_depth = aproj;
        }
    }

    let Some(index) = min_index else {
        return NearestPath::none();
    };

    let trajectory = &trajectories[index];
    let in_range = depth_in_range(min_depth, trajectory.max_depth());
    let (needle_start, needle_end) = if in_range {
        (Some(*trajectory.origin()), Some(trajectory.end()))
    } else {
        (None, None)
    };

    NearestPath {
        trajectory_index: Some(index),
        needle_start,
        needle_end,
        hole: trajectory.hole().clone(),
        depth: min_depth,
        in_range,
    }
}

/// Cached guidance for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct GuidanceResult {
    pub trajectory_index: usize,
    pub hole: HoleLabel,
    /// Insertion depth in mm along the chosen trajectory.
    pub depth: f64,
    pub in_range: bool,
    pub needle_start: Option<Point3<f64>>,
    pub needle_end: Option<Point3<f64>>,
    /// Target projected onto the trajectory at `depth`; set only in range.
    pub needle_tip: Option<Point3<f64>>,
}

impl GuidanceResult {
    /// Depth in centimeters, rounded to one decimal.
    ///
    /// Rounds the exact binary value with ties to even, so 2.5 mm reads 0.2.
    pub fn depth_cm(&self) -> f64 {
        let cm = self.depth / 10.0;
        format!("{:.1}", cm).parse().unwrap_or(cm)
    }

    /// Display form of the depth; parenthesized when out of range.
    pub fn depth_text(&self) -> String {
        if self.in_range {
            format!("{:.1}", self.depth_cm())
        } else {
            format!("({:.1})", self.depth_cm())
        }
    }

    pub(crate) fn from_nearest_path(path: NearestPath, trajectories: &[Trajectory]) -> Option<Self> {
        let trajectory_index = path.trajectory_index?;
        let needle_tip = match path.needle_start {
            Some(_) if path.in_range => {
                Some(trajectories[trajectory_index].point_at_depth(path.depth))
            }
            _ => None,
        };
        Some(GuidanceResult {
            trajectory_index,
            hole: path.hole,
            depth: path.depth,
            in_range: path.in_range,
            needle_start: path.needle_start,
            needle_end: path.needle_end,
            needle_tip,
        })
    }
}
