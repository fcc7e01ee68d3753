pub mod builder;
pub mod primitives;

use crate::config::AblationConfig;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub use builder::{AblationZoneBuilder, AblationZoneGeometry, NeedleVisual};

/// Radius of the needle tube and tip cone, mm.
pub const NEEDLE_RADIUS: f64 = 1.5;
/// Height of the needle tip cone, mm.
pub const CONE_HEIGHT: f64 = 5.0;
/// Distance the iceball extends past the needle tip, mm.
pub const TIP_OFFSET: f64 = 5.0;

/// Cryo-needle kind; selects the iceball size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeedleType {
    Hidden,
    #[default]
    Seed,
    Rod,
}

impl NeedleType {
    /// Reference iceball radii (half the nominal diameters), mm.
    pub fn radius_xyz(self) -> Vector3<f64> {
        match self {
            NeedleType::Hidden => Vector3::zeros(),
            NeedleType::Seed => Vector3::new(10.0, 10.0, 12.5),
            NeedleType::Rod => Vector3::new(12.5, 12.5, 17.5),
        }
    }
}

/// Shape parameters for one target's ablation zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AblationZoneSpec {
    pub needle_radius_xyz: Vector3<f64>,
    pub cone_height: f64,
    pub tip_offset: f64,
}

impl AblationZoneSpec {
    pub fn for_needle(needle_type: NeedleType, config: &AblationConfig) -> Self {
        AblationZoneSpec {
            needle_radius_xyz: config.needle_radius_xyz(needle_type),
            cone_height: CONE_HEIGHT,
            tip_offset: TIP_OFFSET,
        }
    }
}
