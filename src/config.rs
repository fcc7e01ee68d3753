use crate::ablation::NeedleType;
use crate::guidance::comparison::DEFAULT_DEPTH_TOLERANCE_CM;

use anyhow::Context;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Nominal iceball diameters per needle type, mm (x, y, z).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedleDiameters {
    pub ice_seed: [f64; 3],
    pub ice_rod: [f64; 3],
}

impl Default for NeedleDiameters {
    fn default() -> Self {
        NeedleDiameters {
            ice_seed: [20.0, 20.0, 25.0],
            ice_rod: [25.0, 25.0, 35.0],
        }
    }
}

/// Settings for guidance display and the ablation zone.
///
/// ```toml
/// needle_type = "seed"
/// planning_depth_tolerance_cm = 0.5
///
/// [needle_diameter]
/// ice_seed = [20.0, 20.0, 25.0]
/// ice_rod = [25.0, 25.0, 35.0]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AblationConfig {
    /// Needle type given to newly placed targets.
    pub needle_type: NeedleType,
    pub planning_depth_tolerance_cm: f64,
    pub needle_diameter: NeedleDiameters,
}

impl Default for AblationConfig {
    fn default() -> Self {
        AblationConfig {
            needle_type: NeedleType::Seed,
            planning_depth_tolerance_cm: DEFAULT_DEPTH_TOLERANCE_CM,
            needle_diameter: NeedleDiameters::default(),
        }
    }
}

impl AblationConfig {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: AblationConfig =
            toml::from_str(content).context("failed to parse ablation config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {:?}", path.as_ref()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid config {:?}", path.as_ref()))
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        toml::to_string(self).context("failed to serialize ablation config")
    }

    fn validate(&self) -> anyhow::Result<()> {
        let diameters = self
            .needle_diameter
            .ice_seed
            .iter()
            .chain(self.needle_diameter.ice_rod.iter());
        for d in diameters {
            if !d.is_finite() || *d < 0.0 {
                return Err(anyhow::anyhow!("needle diameters must be finite and non-negative, got {}", d));
            }
        }
        if !self.planning_depth_tolerance_cm.is_finite() || self.planning_depth_tolerance_cm < 0.0 {
            return Err(anyhow::anyhow!(
                "planning_depth_tolerance_cm must be finite and non-negative, got {}",
                self.planning_depth_tolerance_cm
            ));
        }
        Ok(())
    }

    /// Iceball radii for `needle_type`: half the configured diameters.
    pub fn needle_radius_xyz(&self, needle_type: NeedleType) -> Vector3<f64> {
        let diameters = match needle_type {
            NeedleType::Hidden => return Vector3::zeros(),
            NeedleType::Seed => self.needle_diameter.ice_seed,
            NeedleType::Rod => self.needle_diameter.ice_rod,
        };
        Vector3::from(diameters) / 2.0
    }
}
