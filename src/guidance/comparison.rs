use super::GuidanceComputation;
use crate::error::Result;
use crate::targets::TargetList;
use crate::template::HoleLabel;

/// Annotation shown for a target whose current depth cannot be reached.
pub const OUT_OF_RANGE_ANNOTATION: &str = "Current depth: out of range";

/// Default allowed difference between planned and current depth, in cm.
pub const DEFAULT_DEPTH_TOLERANCE_CM: f64 = 0.5;

/// Coloring of a hole or depth cell in the target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    Match,
    Mismatch,
}

/// Row-by-row comparison of a target between the planning list and the
/// current list.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetComparison {
    pub index: usize,
    pub planning_hole: HoleLabel,
    pub current_hole: HoleLabel,
    pub planning_depth_cm: f64,
    pub current_depth_cm: f64,
    pub current_in_range: bool,
    pub hole_status: CellStatus,
    pub depth_status: CellStatus,
}

impl TargetComparison {
    pub fn out_of_range_annotation(&self) -> Option<&'static str> {
        if self.current_in_range {
            None
        } else {
            Some(OUT_OF_RANGE_ANNOTATION)
        }
    }
}

/// `|a - b| <= max(1e-9 * max(|a|, |b|), tolerance)`
pub fn depths_match(current_cm: f64, planning_cm: f64, tolerance_cm: f64) -> bool {
    approx::relative_eq!(
        current_cm,
        planning_cm,
        epsilon = tolerance_cm,
        max_relative = 1e-9
    )
}

/// Compares target `index` of `current_targets` against the same row of the
/// planning list.
pub fn compare_with_planning(
    current: &mut GuidanceComputation,
    current_targets: &TargetList,
    planning: &mut GuidanceComputation,
    planning_targets: &TargetList,
    index: usize,
    tolerance_cm: f64,
) -> Result<TargetComparison> {
    let current_result = current.result(current_targets, index)?.clone();
    let planning_result = planning.result(planning_targets, index)?.clone();

    let hole_status = if current_result.hole == planning_result.hole {
        CellStatus::Match
    } else {
        CellStatus::Mismatch
    };

    let current_depth_cm = current_result.depth_cm();
    let planning_depth_cm = planning_result.depth_cm();
    let depth_status = if current_result.in_range
        && depths_match(current_depth_cm, planning_depth_cm, tolerance_cm)
    {
        CellStatus::Match
    } else {
        CellStatus::Mismatch
    };

    Ok(TargetComparison {
        index,
        planning_hole: planning_result.hole,
        current_hole: current_result.hole,
        planning_depth_cm,
        current_depth_cm,
        current_in_range: current_result.in_range,
        hole_status,
        depth_status,
    })
}
