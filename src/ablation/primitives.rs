use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Bounds {
    pub fn around(center: &Point3<f64>, half_extent: &Vector3<f64>) -> Self {
        Bounds {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    pub fn merge(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn contains(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|i| self.min[i] <= point[i] && point[i] <= self.max[i])
    }
}

/// Half extents of a disk of `radius` whose normal is `axis`.
fn disk_half_extent(axis: &Unit<Vector3<f64>>, radius: f64) -> Vector3<f64> {
    axis.map(|a| radius * (1.0 - a * a).max(0.0).sqrt())
}

/// Capped cone; `direction` points from the base to the apex and `center`
/// is midway between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cone {
    pub center: Point3<f64>,
    pub direction: Unit<Vector3<f64>>,
    pub radius: f64,
    pub height: f64,
    pub capped: bool,
}

impl Cone {
    pub fn apex(&self) -> Point3<f64> {
        self.center + self.direction.into_inner() * (self.height / 2.0)
    }

    pub fn base_center(&self) -> Point3<f64> {
        self.center - self.direction.into_inner() * (self.height / 2.0)
    }

    pub fn bounds(&self) -> Bounds {
        let base = Bounds::around(
            &self.base_center(),
            &disk_half_extent(&self.direction, self.radius),
        );
        base.merge(&Bounds::around(&self.apex(), &Vector3::zeros()))
    }
}

/// Cylindrical tube between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tube {
    pub start: Point3<f64>,
    pub end: Point3<f64>,
    pub radius: f64,
}

impl Tube {
    pub fn length(&self) -> f64 {
        nalgebra::distance(&self.start, &self.end)
    }

    pub fn bounds(&self) -> Bounds {
        let axis = Unit::new_normalize(self.end - self.start);
        let extent = disk_half_extent(&axis, self.radius);
        Bounds::around(&self.start, &extent).merge(&Bounds::around(&self.end, &extent))
    }
}

/// Ellipsoid with semi-axes `radii` along its local x, y and z, rotated by
/// `orientation` and placed at `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub center: Point3<f64>,
    pub radii: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Ellipsoid {
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        if self.radii.iter().any(|r| *r <= 0.0) {
            return false;
        }
        let local = self
            .orientation
            .inverse_transform_vector(&(point - self.center));
        local.component_div(&self.radii).norm_squared() <= 1.0
    }

    pub fn bounds(&self) -> Bounds {
        let rotation = self.orientation.to_rotation_matrix();
        let m = rotation.matrix();
        let half_extent = Vector3::from_fn(|i, _| {
            (0..3)
                .map(|j| (m[(i, j)] * self.radii[j]).powi(2))
                .sum::<f64>()
                .sqrt()
        });
        Bounds::around(&self.center, &half_extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_cone_apex_and_base() {
        let cone = Cone {
            center: Point3::new(0.0, 0.0, 10.0),
            direction: Vector3::z_axis(),
            radius: 1.5,
            height: 5.0,
            capped: true,
        };
        assert_eq!(cone.apex(), Point3::new(0.0, 0.0, 12.5));
        assert_eq!(cone.base_center(), Point3::new(0.0, 0.0, 7.5));
        let b = cone.bounds();
        assert_relative_eq!(b.min.x, -1.5);
        assert_relative_eq!(b.max.y, 1.5);
        assert_relative_eq!(b.min.z, 7.5);
        assert_relative_eq!(b.max.z, 12.5);
    }

    #[test]
    fn test_tube_bounds() {
        let tube = Tube {
            start: Point3::new(0.0, 0.0, 0.0),
            end: Point3::new(10.0, 0.0, 0.0),
            radius: 2.0,
        };
        assert_relative_eq!(tube.length(), 10.0);
        let b = tube.bounds();
        assert_relative_eq!(b.min.x, 0.0);
        assert_relative_eq!(b.max.x, 10.0);
        assert_relative_eq!(b.min.y, -2.0);
        assert_relative_eq!(b.max.z, 2.0);
    }

    #[test]
    fn test_rotated_ellipsoid() {
        let ellipsoid = Ellipsoid {
            center: Point3::new(1.0, 2.0, 3.0),
            radii: Vector3::new(10.0, 10.0, 20.0),
            // local z now points along world x
            orientation: UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2),
        };
        assert!(ellipsoid.contains(&Point3::new(19.0, 2.0, 3.0)));
        assert!(!ellipsoid.contains(&Point3::new(1.0, 2.0, 19.0)));

        let b = ellipsoid.bounds();
        assert_relative_eq!(b.max.x, 21.0, epsilon = 1e-9);
        assert_relative_eq!(b.max.z, 13.0, epsilon = 1e-9);
        assert!(b.contains(&Point3::new(-18.0, 2.0, 3.0)));
    }

    #[test]
    fn test_zero_radius_ellipsoid_is_empty() {
        let ellipsoid = Ellipsoid {
            center: Point3::origin(),
            radii: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        };
        assert!(!ellipsoid.contains(&Point3::origin()));
    }
}
