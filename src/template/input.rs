use super::{HoleLabel, TemplateGeometry, Trajectory};
use crate::error::Result;

use anyhow::Context;
use csv::ReaderBuilder;
use nalgebra::{Isometry3, Point3, Vector3};
use serde::Deserialize;

use std::io::Read;

/// One hole of the needle template, in template (zFrame) coordinates.
///
/// Rows of the hole table have the following order
///
/// ```text
/// row, column, x, y, z, nx, ny, nz, max_depth
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TemplateHole {
    pub row: String,
    pub column: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub nx: f64,
    pub ny: f64,
    pub nz: f64,
    pub max_depth: f64,
}

impl TemplateHole {
    pub fn origin(&self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }

    pub fn direction(&self) -> Vector3<f64> {
        Vector3::new(self.nx, self.ny, self.nz)
    }

    /// Maps the hole into world space: the origin as a point, the direction
    /// rotated only.
    pub fn to_trajectory(&self, registration: &Isometry3<f64>) -> Result<Trajectory> {
        Trajectory::new(
            registration.transform_point(&self.origin()),
            registration.transform_vector(&self.direction()),
            HoleLabel::new(self.row.clone(), self.column.clone()),
            self.max_depth,
        )
    }
}

/// Reads the template hole table. The first line is a header.
pub fn read_template_holes<R: Read>(reader: R) -> anyhow::Result<Vec<TemplateHole>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut holes = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let hole: TemplateHole =
            result.with_context(|| format!("invalid template hole record {}", line + 1))?;
        holes.push(hole);
    }
    Ok(holes)
}

/// Builds the world-space trajectory array of a registered template.
pub fn register_template(
    holes: &[TemplateHole],
    registration: Isometry3<f64>,
    generation: u64,
) -> Result<TemplateGeometry> {
    let trajectories = holes
        .iter()
        .map(|hole| hole.to_trajectory(&registration))
        .collect::<Result<Vec<_>>>()?;
    log::info!(
        "registered template generation {} with {} trajectories",
        generation,
        trajectories.len()
    );
    Ok(TemplateGeometry::new(
        trajectories,
        Some(registration),
        generation,
    ))
}
