//! Needle guidance geometry for template-based prostate cryoablation.
//!
//! A registered needle template yields a set of straight trajectories. For
//! every planned target the crate finds the closest trajectory, the insertion
//! depth along it and whether that depth is reachable, and derives the needle
//! and iceball geometry shown to the operator.

pub mod ablation;
pub mod config;
pub mod error;
pub mod guidance;
pub mod session;
pub mod targets;
pub mod template;

mod utils;

#[cfg(feature = "python")]
mod python_bind;

pub use ablation::{AblationZoneBuilder, AblationZoneGeometry, NeedleType};
pub use config::AblationConfig;
pub use error::{GuidanceError, Result};
pub use guidance::{compute_nearest_path, GuidanceComputation, GuidanceResult, NearestPath};
pub use session::{GuidanceSession, SessionEvent, TargetListId};
pub use targets::{Target, TargetList};
pub use template::{HoleLabel, TemplateGeometry, TemplateGeometryProvider, Trajectory};
