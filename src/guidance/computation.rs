use super::{compute_nearest_path, GuidanceResult};
use crate::error::{GuidanceError, Result};
use crate::targets::{TargetChange, TargetList};
use crate::template::{HoleLabel, TemplateGeometry, TemplateGeometryProvider};

use nalgebra::Point3;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-target-list guidance cache bound to one registered template.
///
/// Results are computed lazily on first access and dropped when the target
/// they belong to changes. The template is held by `Arc`, so a computation can
/// never read trajectories from a newer registration; re-registration
/// replaces the computation instead.
#[derive(Debug, Clone)]
pub struct GuidanceComputation {
    template: Arc<TemplateGeometry>,
    cache: BTreeMap<usize, GuidanceResult>,
}

impl GuidanceComputation {
    pub fn new(template: Arc<TemplateGeometry>) -> Result<Self> {
        if template.is_empty() {
            return Err(GuidanceError::NoTemplate);
        }
        Ok(GuidanceComputation {
            template,
            cache: BTreeMap::new(),
        })
    }

    pub fn template(&self) -> &Arc<TemplateGeometry> {
        &self.template
    }

    pub fn template_generation(&self) -> u64 {
        self.template.generation()
    }

    pub fn reset(&mut self) {
        self.cache.clear();
    }

    pub fn invalidate(&mut self, index: usize) {
        self.cache.remove(&index);
    }

    /// Cached result without computing.
    pub fn cached(&self, index: usize) -> Option<&GuidanceResult> {
        self.cache.get(&index)
    }

    /// Drops every cached result and recomputes the whole list.
    pub fn calculate(&mut self, targets: &TargetList) -> Result<()> {
        self.reset();
        for index in 0..targets.len() {
            self.calculate_target(targets, index)?;
        }
        Ok(())
    }

    /// Brings the cache up to date after a target list mutation.
    ///
    /// A move only touches the moved target; additions and removals shift
    /// indices, so the whole list is recomputed.
    pub fn apply_change(&mut self, targets: &TargetList, change: TargetChange) -> Result<()> {
        match change {
            TargetChange::Moved(index) => {
                self.invalidate(index);
                self.calculate_target(targets, index)?;
                Ok(())
            }
            TargetChange::Added(_) | TargetChange::Removed(_) => self.calculate(targets),
        }
    }

    fn calculate_target(&mut self, targets: &TargetList, index: usize) -> Result<&GuidanceResult> {
        let position = targets.position(index)?;
        let result = self.compute_for_position(&position)?;
        log::debug!(
            "start:{:?}, end:{:?}, hole:{}, depth:{}, inRange:{}",
            result.needle_start,
            result.needle_end,
            result.hole,
            result.depth,
            result.in_range
        );
        self.cache.insert(index, result);
        self.cache
            .get(&index)
            .ok_or(GuidanceError::TargetIndexOutOfBounds {
                index,
                len: targets.len(),
            })
    }

    /// Guidance for an arbitrary point, bypassing the cache.
    pub fn compute_for_position(&self, position: &Point3<f64>) -> Result<GuidanceResult> {
        if !position.iter().all(|c| c.is_finite()) {
            return Err(GuidanceError::NonFiniteTarget);
        }
        let trajectories = self.template.trajectories();
        GuidanceResult::from_nearest_path(compute_nearest_path(trajectories, position), trajectories)
            .ok_or(GuidanceError::NoTemplate)
    }

    /// Cached result for `index`, computing it if absent.
    pub fn result(&mut self, targets: &TargetList, index: usize) -> Result<&GuidanceResult> {
        if targets.len() <= index {
            return Err(GuidanceError::TargetIndexOutOfBounds {
                index,
                len: targets.len(),
            });
        }
        if self.cache.contains_key(&index) {
            return self
                .cache
                .get(&index)
                .ok_or(GuidanceError::TargetIndexOutOfBounds {
                    index,
                    len: targets.len(),
                });
        }
        self.calculate_target(targets, index)
    }

    /// Position the target would snap to on its nearest trajectory.
    pub fn needle_end_pos(&mut self, targets: &TargetList, index: usize) -> Result<Point3<f64>> {
        let result = self.result(targets, index)?;
        result.needle_tip.ok_or(GuidanceError::OutOfRange {
            index,
            depth: result.depth,
        })
    }

    pub fn hole(&mut self, targets: &TargetList, index: usize) -> Result<HoleLabel> {
        Ok(self.result(targets, index)?.hole.clone())
    }

    /// Depth in cm rounded to one decimal.
    pub fn depth_cm(&mut self, targets: &TargetList, index: usize) -> Result<f64> {
        Ok(self.result(targets, index)?.depth_cm())
    }

    /// Depth in cm as shown in the target table, e.g. `"3.2"` or `"(3.2)"`.
    pub fn depth_text(&mut self, targets: &TargetList, index: usize) -> Result<String> {
        Ok(self.result(targets, index)?.depth_text())
    }

    pub fn depth_in_range(&mut self, targets: &TargetList, index: usize) -> Result<bool> {
        Ok(self.result(targets, index)?.in_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ablation::NeedleType;
    use crate::utils::test_utils::{grid_template, single_trajectory, target_list};
    use approx::assert_relative_eq;
    use nalgebra::Isometry3;

    fn single_template() -> Arc<TemplateGeometry> {
        Arc::new(TemplateGeometry::new(
            vec![single_trajectory()],
            Some(Isometry3::identity()),
            1,
        ))
    }

    #[test]
    fn test_empty_template_is_no_template() {
        let empty = Arc::new(TemplateGeometry::new(Vec::new(), None, 1));
        assert_eq!(
            GuidanceComputation::new(empty).unwrap_err(),
            GuidanceError::NoTemplate
        );
    }

    #[test]
    fn test_lazy_accessors() {
        let targets = target_list(&[(0.0, 0.0, 50.0), (0.0, 0.0, 150.0)]);
        let mut guidance = GuidanceComputation::new(single_template()).unwrap();
        assert!(guidance.cached(0).is_none());

        assert_eq!(guidance.hole(&targets, 0).unwrap().to_string(), "(1, 1)");
        assert!(guidance.cached(0).is_some());
        assert!(guidance.cached(1).is_none());

        assert_eq!(guidance.depth_text(&targets, 0).unwrap(), "5.0");
        assert_relative_eq!(guidance.depth_cm(&targets, 0).unwrap(), 5.0);
        assert!(guidance.depth_in_range(&targets, 0).unwrap());

        assert_eq!(guidance.depth_text(&targets, 1).unwrap(), "(15.0)");
        assert!(!guidance.depth_in_range(&targets, 1).unwrap());
    }

    #[test]
    fn test_needle_end_pos() {
        let targets = target_list(&[(0.5, -0.5, 42.0), (0.0, 0.0, 150.0)]);
        let mut guidance = GuidanceComputation::new(single_template()).unwrap();
        let snapped = guidance.needle_end_pos(&targets, 0).unwrap();
        assert_relative_eq!(snapped.x, 0.0);
        assert_relative_eq!(snapped.y, 0.0);
        assert_relative_eq!(snapped.z, 42.0);

        assert_eq!(
            guidance.needle_end_pos(&targets, 1),
            Err(GuidanceError::OutOfRange {
                index: 1,
                depth: 150.0
            })
        );
        // callers can fall back to the unsnapped position
        let fallback = guidance
            .needle_end_pos(&targets, 1)
            .unwrap_or(targets.position(1).unwrap());
        assert_eq!(fallback, Point3::new(0.0, 0.0, 150.0));
    }

    #[test]
    fn test_index_out_of_bounds() {
        let targets = target_list(&[(0.0, 0.0, 50.0)]);
        let mut guidance = GuidanceComputation::new(single_template()).unwrap();
        assert_eq!(
            guidance.hole(&targets, 3),
            Err(GuidanceError::TargetIndexOutOfBounds { index: 3, len: 1 })
        );
    }

    #[test]
    fn test_move_only_invalidates_moved_target() {
        let mut targets = target_list(&[(0.0, 0.0, 20.0), (10.0, 5.0, 30.0), (20.0, 20.0, 40.0)]);
        let mut guidance =
            GuidanceComputation::new(Arc::new(grid_template(5, 5, 5.0, 150.0))).unwrap();
        guidance.calculate(&targets).unwrap();
        let before_0 = guidance.cached(0).cloned().unwrap();
        let before_2 = guidance.cached(2).cloned().unwrap();

        let change = targets.set_position(1, Point3::new(15.0, 15.0, 60.0)).unwrap();
        guidance.invalidate(1);
        assert!(guidance.cached(1).is_none());
        guidance.apply_change(&targets, change).unwrap();

        assert_eq!(guidance.cached(0), Some(&before_0));
        assert_eq!(guidance.cached(2), Some(&before_2));
        assert_eq!(guidance.cached(1).unwrap().hole, HoleLabel::new("D", "4"));
        assert_relative_eq!(guidance.cached(1).unwrap().depth, 60.0);
    }

    #[test]
    fn test_removal_recomputes_shifted_indices() {
        let mut targets = target_list(&[(0.0, 0.0, 20.0), (10.0, 5.0, 30.0)]);
        let mut guidance =
            GuidanceComputation::new(Arc::new(grid_template(5, 5, 5.0, 150.0))).unwrap();
        guidance.calculate(&targets).unwrap();
        assert_eq!(guidance.cached(1).unwrap().hole, HoleLabel::new("B", "3"));

        let change = targets.remove(0).unwrap();
        guidance.apply_change(&targets, change).unwrap();
        assert_eq!(guidance.cached(0).unwrap().hole, HoleLabel::new("B", "3"));
        assert!(guidance.cached(1).is_none());

        let change = targets
            .add("T3", Point3::new(0.0, 0.0, 10.0), NeedleType::Rod)
            .unwrap();
        guidance.apply_change(&targets, change).unwrap();
        assert_eq!(guidance.cached(1).unwrap().hole, HoleLabel::new("A", "1"));
    }

    #[test]
    fn test_compute_for_position_rejects_non_finite() {
        let guidance = GuidanceComputation::new(single_template()).unwrap();
        assert_eq!(
            guidance.compute_for_position(&Point3::new(f64::NAN, 0.0, 0.0)),
            Err(GuidanceError::NonFiniteTarget)
        );
    }

    #[test]
    fn test_far_finite_target_is_not_reported_as_missing_template() {
        let guidance = GuidanceComputation::new(single_template()).unwrap();
        let result = guidance
            .compute_for_position(&Point3::new(1e200, 0.0, 10.0))
            .unwrap();
        assert_eq!(result.trajectory_index, 0);
        assert_eq!(result.hole, HoleLabel::new("1", "1"));
    }

    #[test]
    fn test_repeated_calculation_is_bit_identical() {
        let targets = target_list(&[(1.3, 2.7, 33.3), (7.1, 9.9, 120.0)]);
        let mut guidance =
            GuidanceComputation::new(Arc::new(grid_template(4, 4, 5.0, 100.0))).unwrap();
        guidance.calculate(&targets).unwrap();
        let first: Vec<_> = (0..2).map(|i| guidance.cached(i).cloned().unwrap()).collect();
        guidance.calculate(&targets).unwrap();
        for (i, r) in first.iter().enumerate() {
            let again = guidance.cached(i).unwrap();
            assert_eq!(r.depth.to_bits(), again.depth.to_bits());
            assert_eq!(r, again);
        }
    }
}
