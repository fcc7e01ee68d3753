use crate::ablation::NeedleType;
use crate::targets::TargetList;
use crate::template::{HoleLabel, TemplateGeometry, Trajectory};
use nalgebra::{Isometry3, Point3, Vector3};

/// The single +z trajectory at the origin with 100 mm max depth.
pub fn single_trajectory() -> Trajectory {
    Trajectory::new(
        Point3::origin(),
        Vector3::z(),
        HoleLabel::new("1", "1"),
        100.0,
    )
    .unwrap()
}

/// Generates a rows x cols grid of parallel +z trajectories in the z = 0 plane.
///
/// Hole (row r, column c) sits at (c * spacing, r * spacing, 0); rows are
/// labelled A, B, C, ... and columns 1, 2, 3, ...
pub fn grid_template(rows: usize, cols: usize, spacing: f64, max_depth: f64) -> TemplateGeometry {
    let mut trajectories = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            let row_label = ((b'A' + r as u8) as char).to_string();
            trajectories.push(
                Trajectory::new(
                    Point3::new(c as f64 * spacing, r as f64 * spacing, 0.0),
                    Vector3::z(),
                    HoleLabel::new(row_label, (c + 1).to_string()),
                    max_depth,
                )
                .unwrap(),
            );
        }
    }
    TemplateGeometry::new(trajectories, Some(Isometry3::identity()), 1)
}

/// Creates a target list from (x, y, z) tuples labelled T1, T2, ...
pub fn target_list(positions: &[(f64, f64, f64)]) -> TargetList {
    let mut list = TargetList::new("targets");
    for (i, p) in positions.iter().enumerate() {
        list.add(
            format!("T{}", i + 1),
            Point3::new(p.0, p.1, p.2),
            NeedleType::Seed,
        )
        .unwrap();
    }
    list
}
