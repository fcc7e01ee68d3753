use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::ablation::NeedleType;
use crate::config::AblationConfig;
use crate::error::GuidanceError;
use crate::guidance::{compute_nearest_path, GuidanceResult};
use crate::session::{GuidanceSession, TargetListId};
use crate::template::{HoleLabel, Trajectory};

use nalgebra::{Isometry3, Point3, Vector3};

impl From<GuidanceError> for PyErr {
    fn from(err: GuidanceError) -> PyErr {
        match err {
            GuidanceError::TargetIndexOutOfBounds { .. } => PyIndexError::new_err(err.to_string()),
            GuidanceError::NoTemplate | GuidanceError::OutOfRange { .. } => {
                PyRuntimeError::new_err(err.to_string())
            }
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

fn parse_needle_type(name: &str) -> PyResult<NeedleType> {
    match name.to_ascii_lowercase().as_str() {
        "hidden" => Ok(NeedleType::Hidden),
        "seed" | "iceseed" => Ok(NeedleType::Seed),
        "rod" | "icerod" => Ok(NeedleType::Rod),
        other => Err(PyValueError::new_err(format!("unknown needle type '{}'", other))),
    }
}

#[pyclass]
#[derive(Debug, Clone)]
pub struct PyTrajectory {
    #[pyo3(get, set)]
    pub origin: (f64, f64, f64),
    #[pyo3(get, set)]
    pub direction: (f64, f64, f64),
    #[pyo3(get, set)]
    pub row: String,
    #[pyo3(get, set)]
    pub column: String,
    #[pyo3(get, set)]
    pub max_depth: f64,
}

#[pymethods]
impl PyTrajectory {
    #[new]
    fn new(
        origin: (f64, f64, f64),
        direction: (f64, f64, f64),
        row: String,
        column: String,
        max_depth: f64,
    ) -> Self {
        PyTrajectory {
            origin,
            direction,
            row,
            column,
            max_depth,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Trajectory(hole=({}, {}), origin=({:.2}, {:.2}, {:.2}), max_depth={:.1})",
            self.row, self.column, self.origin.0, self.origin.1, self.origin.2, self.max_depth
        )
    }
}

impl TryFrom<&PyTrajectory> for Trajectory {
    type Error = GuidanceError;

    fn try_from(t: &PyTrajectory) -> Result<Self, Self::Error> {
        Trajectory::new(
            Point3::new(t.origin.0, t.origin.1, t.origin.2),
            Vector3::new(t.direction.0, t.direction.1, t.direction.2),
            HoleLabel::new(t.row.clone(), t.column.clone()),
            t.max_depth,
        )
    }
}

fn to_trajectories(trajectories: &[PyTrajectory]) -> PyResult<Vec<Trajectory>> {
    trajectories
        .iter()
        .map(|t| Trajectory::try_from(t).map_err(PyErr::from))
        .collect()
}

fn point_tuple(p: &Point3<f64>) -> (f64, f64, f64) {
    (p.x, p.y, p.z)
}

#[pyclass]
#[derive(Debug, Clone)]
pub struct PyGuidanceResult {
    #[pyo3(get)]
    pub trajectory_index: usize,
    #[pyo3(get)]
    pub hole: (String, String),
    #[pyo3(get)]
    pub depth: f64,
    #[pyo3(get)]
    pub in_range: bool,
    #[pyo3(get)]
    pub needle_start: Option<(f64, f64, f64)>,
    #[pyo3(get)]
    pub needle_end: Option<(f64, f64, f64)>,
    #[pyo3(get)]
    pub depth_text: String,
}

#[pymethods]
impl PyGuidanceResult {
    fn __repr__(&self) -> String {
        format!(
            "GuidanceResult(hole=({}, {}), depth={}, in_range={})",
            self.hole.0, self.hole.1, self.depth_text, self.in_range
        )
    }
}

impl From<&GuidanceResult> for PyGuidanceResult {
    fn from(r: &GuidanceResult) -> Self {
        PyGuidanceResult {
            trajectory_index: r.trajectory_index,
            hole: (r.hole.row.clone(), r.hole.column.clone()),
            depth: r.depth,
            in_range: r.in_range,
            needle_start: r.needle_start.as_ref().map(point_tuple),
            needle_end: r.needle_end.as_ref().map(point_tuple),
            depth_text: r.depth_text(),
        }
    }
}

/// Nearest trajectory for a single point, without any session state.
#[pyfunction(name = "compute_nearest_path")]
fn nearest_path(
    trajectories: Vec<PyTrajectory>,
    position: (f64, f64, f64),
) -> PyResult<PyGuidanceResult> {
    let trajectories = to_trajectories(&trajectories)?;
    let path = compute_nearest_path(
        &trajectories,
        &Point3::new(position.0, position.1, position.2),
    );
    GuidanceResult::from_nearest_path(path, &trajectories)
        .map(|r| PyGuidanceResult::from(&r))
        .ok_or_else(|| GuidanceError::NoTemplate.into())
}

#[pyfunction]
fn needle_radius_xyz(needle_type: &str) -> PyResult<(f64, f64, f64)> {
    let r = AblationConfig::default().needle_radius_xyz(parse_needle_type(needle_type)?);
    Ok((r.x, r.y, r.z))
}

/// Guidance session holding a single target list.
#[pyclass(unsendable)]
pub struct PyGuidanceSession {
    session: GuidanceSession,
    targets: TargetListId,
}

#[pymethods]
impl PyGuidanceSession {
    #[new]
    #[pyo3(signature = (config_path = None))]
    fn new(config_path: Option<&str>) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => AblationConfig::from_path(path)
                .map_err(|e| PyValueError::new_err(format!("{:#}", e)))?,
            None => AblationConfig::default(),
        };
        let mut session = GuidanceSession::new(config);
        let targets = session.add_target_list("targets");
        Ok(PyGuidanceSession { session, targets })
    }

    /// Installs world-space trajectories; returns the template generation.
    #[pyo3(signature = (trajectories, registered = true))]
    fn register_template(&mut self, trajectories: Vec<PyTrajectory>, registered: bool) -> PyResult<u64> {
        let trajectories = to_trajectories(&trajectories)?;
        let registration = registered.then(Isometry3::identity);
        Ok(self.session.register_trajectories(trajectories, registration))
    }

    fn add_target(&mut self, label: &str, position: (f64, f64, f64)) -> PyResult<usize> {
        Ok(self.session.add_target(
            self.targets,
            label,
            Point3::new(position.0, position.1, position.2),
        )?)
    }

    #[pyo3(signature = (index, position, snap = false))]
    fn move_target(
        &mut self,
        index: usize,
        position: (f64, f64, f64),
        snap: bool,
    ) -> PyResult<(f64, f64, f64)> {
        let position = Point3::new(position.0, position.1, position.2);
        if snap {
            let snapped = self.session.move_target_snapped(self.targets, index, position)?;
            Ok(point_tuple(&snapped))
        } else {
            self.session.move_target(self.targets, index, position)?;
            Ok(point_tuple(&position))
        }
    }

    fn remove_target(&mut self, index: usize) -> PyResult<()> {
        Ok(self.session.remove_target(self.targets, index)?)
    }

    fn set_needle_type(&mut self, index: usize, needle_type: &str) -> PyResult<()> {
        let needle_type = parse_needle_type(needle_type)?;
        Ok(self.session.set_needle_type(self.targets, index, needle_type)?)
    }

    fn guidance(&mut self, index: usize) -> PyResult<PyGuidanceResult> {
        Ok(PyGuidanceResult::from(&self.session.guidance(self.targets, index)?))
    }

    fn hole(&mut self, index: usize) -> PyResult<String> {
        Ok(self.session.hole(self.targets, index)?.to_string())
    }

    fn depth_text(&mut self, index: usize) -> PyResult<String> {
        Ok(self.session.depth_text(self.targets, index)?)
    }

    fn depth_in_range(&mut self, index: usize) -> PyResult<bool> {
        Ok(self.session.depth_in_range(self.targets, index)?)
    }

    fn needle_end_pos(&mut self, index: usize) -> PyResult<(f64, f64, f64)> {
        Ok(point_tuple(&self.session.needle_end_pos(self.targets, index)?))
    }
}

/// Module importable from Python:
///
/// ```python
/// import prostate_guidance as pg
/// s = pg.PyGuidanceSession()
/// s.register_template([pg.PyTrajectory((0, 0, 0), (0, 0, 1), "A", "1", 100.0)])
/// s.add_target("T1", (0.0, 0.0, 42.0))
/// s.hole(0), s.depth_text(0)
/// ```
#[pymodule]
fn prostate_guidance(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(nearest_path, m)?)?;
    m.add_function(wrap_pyfunction!(needle_radius_xyz, m)?)?;

    m.add_class::<PyTrajectory>()?;
    m.add_class::<PyGuidanceResult>()?;
    m.add_class::<PyGuidanceSession>()?;
    Ok(())
}
