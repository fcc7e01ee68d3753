use crate::ablation::NeedleType;
use crate::error::{GuidanceError, Result};
use nalgebra::Point3;

#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub label: String,
    pub position: Point3<f64>,
    pub needle_type: NeedleType,
    /// Whether the target takes part in the ablation-zone display.
    pub visible: bool,
}

/// What happened to a target list; consumed by the guidance cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetChange {
    Added(usize),
    Moved(usize),
    Removed(usize),
}

/// An ordered list of targets, referenced by index from the guidance cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetList {
    pub name: String,
    targets: Vec<Target>,
}

/// Distance between two targets of one list.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDistance {
    pub from: String,
    pub to: String,
    pub distance_cm: f64,
}

fn check_finite(position: &Point3<f64>) -> Result<()> {
    if position.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        log::warn!("rejected non-finite target position {:?}", position);
        Err(GuidanceError::NonFiniteTarget)
    }
}

impl TargetList {
    pub fn new(name: impl Into<String>) -> Self {
        TargetList {
            name: name.into(),
            targets: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    pub fn get(&self, index: usize) -> Result<&Target> {
        self.targets
            .get(index)
            .ok_or(GuidanceError::TargetIndexOutOfBounds {
                index,
                len: self.targets.len(),
            })
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut Target> {
        let len = self.targets.len();
        self.targets
            .get_mut(index)
            .ok_or(GuidanceError::TargetIndexOutOfBounds { index, len })
    }

    pub fn position(&self, index: usize) -> Result<Point3<f64>> {
        Ok(self.get(index)?.position)
    }

    pub fn add(
        &mut self,
        label: impl Into<String>,
        position: Point3<f64>,
        needle_type: NeedleType,
    ) -> Result<TargetChange> {
        check_finite(&position)?;
        self.targets.push(Target {
            label: label.into(),
            position,
            needle_type,
            visible: true,
        });
        Ok(TargetChange::Added(self.targets.len() - 1))
    }

    pub fn set_position(&mut self, index: usize, position: Point3<f64>) -> Result<TargetChange> {
        check_finite(&position)?;
        self.get_mut(index)?.position = position;
        Ok(TargetChange::Moved(index))
    }

    pub fn remove(&mut self, index: usize) -> Result<TargetChange> {
        self.get(index)?;
        self.targets.remove(index);
        Ok(TargetChange::Removed(index))
    }

    pub fn set_needle_type(&mut self, index: usize, needle_type: NeedleType) -> Result<()> {
        self.get_mut(index)?.needle_type = needle_type;
        Ok(())
    }

    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.get_mut(index)?.visible = visible;
        Ok(())
    }

    /// Distances between every pair of targets, in list order.
    pub fn pairwise_distances(&self) -> Vec<TargetDistance> {
        let mut distances = Vec::new();
        for (i, a) in self.targets.iter().enumerate() {
            for b in &self.targets[i + 1..] {
                distances.push(TargetDistance {
                    from: a.label.clone(),
                    to: b.label.clone(),
                    distance_cm: nalgebra::distance(&a.position, &b.position) / 10.0,
                });
            }
        }
        distances
    }

    /// Distance in mm from `point` (e.g. the cursor) to each target.
    pub fn distances_to(&self, point: &Point3<f64>) -> Vec<f64> {
        self.targets
            .iter()
            .map(|t| nalgebra::distance(&t.position, point))
            .collect()
    }
}

impl std::fmt::Display for TargetDistance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}: {:?}cm", self.from, self.to, self.distance_cm)
    }
}
