use super::primitives::{Bounds, Cone, Ellipsoid, Tube};
use super::{AblationZoneSpec, NeedleType, NEEDLE_RADIUS};
use crate::config::AblationConfig;
use crate::guidance::GuidanceResult;
use crate::targets::Target;
use crate::template::HoleLabel;

use nalgebra::{Isometry3, Point3, Unit, UnitQuaternion};

/// Needle drawn for one target: the tip cone plus the shaft leading to it.
#[derive(Debug, Clone, PartialEq)]
pub struct NeedleVisual {
    pub hole: HoleLabel,
    pub cone: Cone,
    /// Absent when the insertion is not deeper than the cone itself.
    pub tube: Option<Tube>,
}

impl NeedleVisual {
    pub fn bounds(&self) -> Bounds {
        match &self.tube {
            Some(tube) => self.cone.bounds().merge(&tube.bounds()),
            None => self.cone.bounds(),
        }
    }
}

/// Aggregate renderable geometry: all needle paths and all iceballs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AblationZoneGeometry {
    pub needle_paths: Vec<NeedleVisual>,
    pub iceballs: Vec<Ellipsoid>,
}

impl AblationZoneGeometry {
    pub fn is_empty(&self) -> bool {
        self.needle_paths.is_empty() && self.iceballs.is_empty()
    }

    /// Whether `point` lies inside any iceball.
    pub fn covers(&self, point: &Point3<f64>) -> bool {
        self.iceballs.iter().any(|e| e.contains(point))
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.needle_paths
            .iter()
            .map(NeedleVisual::bounds)
            .chain(self.iceballs.iter().map(Ellipsoid::bounds))
            .reduce(|a, b| a.merge(&b))
    }
}

/// Derives needle and iceball geometry from computed guidance.
#[derive(Debug, Clone)]
pub struct AblationZoneBuilder {
    config: AblationConfig,
}

impl AblationZoneBuilder {
    pub fn new(config: AblationConfig) -> Self {
        AblationZoneBuilder { config }
    }

    /// Builds the geometry for all active targets with one needle type.
    ///
    /// Returns `None` when the template is not registered; nothing is drawn
    /// in that case. Out-of-range targets are skipped.
    pub fn build(
        &self,
        active_targets: &[(&Target, &GuidanceResult)],
        needle_type: NeedleType,
        registration: Option<&Isometry3<f64>>,
    ) -> Option<AblationZoneGeometry> {
        self.build_with(active_targets, registration, |_| needle_type)
    }

    /// Like [`build`](Self::build), using each target's own needle type.
    pub fn build_with_target_types(
        &self,
        active_targets: &[(&Target, &GuidanceResult)],
        registration: Option<&Isometry3<f64>>,
    ) -> Option<AblationZoneGeometry> {
        self.build_with(active_targets, registration, |target| target.needle_type)
    }

    fn build_with<F>(
        &self,
        active_targets: &[(&Target, &GuidanceResult)],
        registration: Option<&Isometry3<f64>>,
        needle_type_of: F,
    ) -> Option<AblationZoneGeometry>
    where
        F: Fn(&Target) -> NeedleType,
    {
        let Some(registration) = registration else {
            log::info!("template not registered, no ablation zone to display");
            return None;
        };

        let mut geometry = AblationZoneGeometry::default();
        for (target, guidance) in active_targets {
            let needle_type = needle_type_of(target);
            if needle_type == NeedleType::Hidden {
                continue;
            }
            let spec = AblationZoneSpec::for_needle(needle_type, &self.config);
            if let Some((needle, iceball)) =
                self.target_geometry(guidance, &spec, &registration.rotation)
            {
                geometry.needle_paths.push(needle);
                geometry.iceballs.push(iceball);
            }
        }
        Some(geometry)
    }

    fn target_geometry(
        &self,
        guidance: &GuidanceResult,
        spec: &AblationZoneSpec,
        orientation: &UnitQuaternion<f64>,
    ) -> Option<(NeedleVisual, Ellipsoid)> {
        if !guidance.in_range {
            return None;
        }
        let (start, end) = (guidance.needle_start?, guidance.needle_end?);
        let direction = Unit::try_new(end - start, f64::EPSILON)?;
        let depth = guidance.depth;
        let along = |distance: f64| start + direction.into_inner() * distance;

        let cone = Cone {
            center: along(depth),
            direction,
            radius: NEEDLE_RADIUS,
            height: spec.cone_height,
            capped: true,
        };
        let tube = (depth > spec.cone_height).then(|| Tube {
            start,
            end: along(depth - spec.cone_height),
            radius: NEEDLE_RADIUS,
        });
        let iceball = Ellipsoid {
            center: along(depth + spec.tip_offset - spec.needle_radius_xyz.z),
            radii: spec.needle_radius_xyz,
            orientation: *orientation,
        };

        Some((
            NeedleVisual {
                hole: guidance.hole.clone(),
                cone,
                tube,
            },
            iceball,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guidance::GuidanceComputation;
    use crate::template::TemplateGeometryProvider;
    use crate::utils::test_utils::{grid_template, target_list};
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, Vector3};
    use std::sync::Arc;

    fn guidance_for(positions: &[(f64, f64, f64)]) -> (Vec<Target>, Vec<GuidanceResult>) {
        let targets = target_list(positions);
        let mut guidance = GuidanceComputation::new(Arc::new(grid_template(3, 3, 5.0, 100.0))).unwrap();
        guidance.calculate(&targets).unwrap();
        let results = (0..targets.len())
            .map(|i| guidance.cached(i).cloned().unwrap())
            .collect();
        (targets.iter().cloned().collect(), results)
    }

    #[test]
    fn test_single_seed_geometry() {
        let (targets, results) = guidance_for(&[(5.0, 0.0, 40.0)]);
        let active: Vec<_> = targets.iter().zip(results.iter()).collect();
        let builder = AblationZoneBuilder::new(AblationConfig::default());
        let geometry = builder
            .build(&active, NeedleType::Seed, Some(&Isometry3::identity()))
            .unwrap();

        assert_eq!(geometry.needle_paths.len(), 1);
        assert_eq!(geometry.iceballs.len(), 1);

        let needle = &geometry.needle_paths[0];
        assert_eq!(needle.hole, HoleLabel::new("A", "2"));
        assert_eq!(needle.cone.center, Point3::new(5.0, 0.0, 40.0));
        assert_relative_eq!(needle.cone.radius, 1.5);
        assert!(needle.cone.capped);
        let tube = needle.tube.unwrap();
        assert_eq!(tube.start, Point3::new(5.0, 0.0, 0.0));
        assert_eq!(tube.end, Point3::new(5.0, 0.0, 35.0));

        let iceball = &geometry.iceballs[0];
        // 40 + 5 - 12.5
        assert_eq!(iceball.center, Point3::new(5.0, 0.0, 32.5));
        assert_eq!(iceball.radii, Vector3::new(10.0, 10.0, 12.5));
        assert!(geometry.covers(&Point3::new(5.0, 0.0, 40.0)));
        assert!(!geometry.covers(&Point3::new(5.0, 0.0, 50.0)));
    }

    #[test]
    fn test_out_of_range_and_hidden_targets_are_skipped() {
        let (mut targets, results) =
            guidance_for(&[(0.0, 0.0, 30.0), (0.0, 0.0, 130.0), (10.0, 10.0, 50.0)]);
        targets[2].needle_type = NeedleType::Hidden;
        targets[0].needle_type = NeedleType::Rod;
        let active: Vec<_> = targets.iter().zip(results.iter()).collect();
        let builder = AblationZoneBuilder::new(AblationConfig::default());

        let geometry = builder
            .build_with_target_types(&active, Some(&Isometry3::identity()))
            .unwrap();
        assert_eq!(geometry.needle_paths.len(), 1);
        assert_eq!(geometry.iceballs[0].radii, Vector3::new(12.5, 12.5, 17.5));

        let all_seed = builder
            .build(&active, NeedleType::Seed, Some(&Isometry3::identity()))
            .unwrap();
        assert_eq!(all_seed.needle_paths.len(), 2);

        let hidden = builder
            .build(&active, NeedleType::Hidden, Some(&Isometry3::identity()))
            .unwrap();
        assert!(hidden.is_empty());
        assert!(hidden.bounds().is_none());
    }

    #[test]
    fn test_unregistered_template_builds_nothing() {
        let (targets, results) = guidance_for(&[(0.0, 0.0, 30.0)]);
        let active: Vec<_> = targets.iter().zip(results.iter()).collect();
        let builder = AblationZoneBuilder::new(AblationConfig::default());
        assert!(builder.build(&active, NeedleType::Seed, None).is_none());
    }

    #[test]
    fn test_shallow_insertion_has_no_tube() {
        let (targets, results) = guidance_for(&[(0.0, 0.0, 3.0)]);
        let active: Vec<_> = targets.iter().zip(results.iter()).collect();
        let builder = AblationZoneBuilder::new(AblationConfig::default());
        let geometry = builder
            .build(&active, NeedleType::Seed, Some(&Isometry3::identity()))
            .unwrap();
        assert!(geometry.needle_paths[0].tube.is_none());
    }

    #[test]
    fn test_iceball_follows_registration_rotation() {
        let template = grid_template(1, 1, 5.0, 100.0);
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.3);
        let registration = Isometry3::from_parts(Translation3::new(1.0, 2.0, 3.0), rotation);
        let targets = target_list(&[(0.0, 0.0, 20.0)]);
        let mut guidance = GuidanceComputation::new(Arc::new(template.clone())).unwrap();
        let result = guidance.result(&targets, 0).unwrap().clone();
        let active = vec![(targets.get(0).unwrap(), &result)];

        let builder = AblationZoneBuilder::new(AblationConfig::default());
        let geometry = builder
            .build(&active, NeedleType::Seed, Some(&registration))
            .unwrap();
        assert_eq!(geometry.iceballs[0].orientation, rotation);
        assert!(template.registration().is_some());

        let bounds = geometry.bounds().unwrap();
        assert!(bounds.contains(&Point3::new(0.0, 0.0, 20.0)));
        assert!(bounds.contains(&Point3::new(0.0, 0.0, 0.0)));
    }
}
