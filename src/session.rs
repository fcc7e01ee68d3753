use crate::ablation::{AblationZoneBuilder, AblationZoneGeometry, NeedleType};
use crate::config::AblationConfig;
use crate::error::{GuidanceError, Result};
use crate::guidance::comparison::{compare_with_planning, TargetComparison};
use crate::guidance::{GuidanceComputation, GuidanceResult};
use crate::targets::{TargetChange, TargetList};
use crate::template::input::{register_template, TemplateHole};
use crate::template::{HoleLabel, TemplateGeometry, TemplateGeometryProvider, Trajectory};

use nalgebra::{Isometry3, Point3};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetListId(u32);

impl fmt::Display for TargetListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u32);

/// Notifications delivered to session observers, after the state they
/// describe is fully updated.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TemplateRegistered { generation: u64 },
    GuidanceRecomputed { list: TargetListId },
    TargetSnapped {
        list: TargetListId,
        index: usize,
        position: Point3<f64>,
    },
}

type Observer = Box<dyn FnMut(&SessionEvent)>;

/// Owns the registered template, the target lists and one guidance
/// computation per list. All mutations go through the session so that
/// caches are brought up to date before observers run.
pub struct GuidanceSession {
    config: AblationConfig,
    template: Option<Arc<TemplateGeometry>>,
    generation: u64,
    target_lists: BTreeMap<TargetListId, TargetList>,
    computations: BTreeMap<TargetListId, GuidanceComputation>,
    observers: Vec<(ObserverId, Observer)>,
    next_list_id: u32,
    next_observer_id: u32,
}

impl GuidanceSession {
    pub fn new(config: AblationConfig) -> Self {
        GuidanceSession {
            config,
            template: None,
            generation: 0,
            target_lists: BTreeMap::new(),
            computations: BTreeMap::new(),
            observers: Vec::new(),
            next_list_id: 0,
            next_observer_id: 0,
        }
    }

    pub fn config(&self) -> &AblationConfig {
        &self.config
    }

    pub fn subscribe<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&SessionEvent) + 'static,
    {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    fn emit(&mut self, event: SessionEvent) {
        for (_, observer) in self.observers.iter_mut() {
            observer(&event);
        }
    }

    // --- template ---

    pub fn template(&self) -> Option<&Arc<TemplateGeometry>> {
        self.template.as_ref()
    }

    pub fn is_registered(&self) -> bool {
        self.template.is_some()
    }

    /// Installs a new trajectory array, discarding every cached guidance.
    pub fn register_trajectories(
        &mut self,
        trajectories: Vec<Trajectory>,
        registration: Option<Isometry3<f64>>,
    ) -> u64 {
        self.generation += 1;
        let template = TemplateGeometry::new(trajectories, registration, self.generation);
        self.install_template(template)
    }

    /// Registers template-space holes with a template-to-world transform.
    pub fn register_template_holes(
        &mut self,
        holes: &[TemplateHole],
        registration: Isometry3<f64>,
    ) -> Result<u64> {
        let template = register_template(holes, registration, self.generation + 1)?;
        self.generation += 1;
        Ok(self.install_template(template))
    }

    fn install_template(&mut self, template: TemplateGeometry) -> u64 {
        let generation = template.generation();
        self.template = Some(Arc::new(template));
        self.computations.clear();
        self.emit(SessionEvent::TemplateRegistered { generation });
        generation
    }

    // --- target lists ---

    pub fn add_target_list(&mut self, name: impl Into<String>) -> TargetListId {
        let id = TargetListId(self.next_list_id);
        self.next_list_id += 1;
        self.target_lists.insert(id, TargetList::new(name));
        id
    }

    pub fn remove_target_list(&mut self, list: TargetListId) -> Result<TargetList> {
        self.computations.remove(&list);
        self.target_lists
            .remove(&list)
            .ok_or(GuidanceError::UnknownTargetList(list))
    }

    pub fn target_list(&self, list: TargetListId) -> Result<&TargetList> {
        self.target_lists
            .get(&list)
            .ok_or(GuidanceError::UnknownTargetList(list))
    }

    fn target_list_mut(&mut self, list: TargetListId) -> Result<&mut TargetList> {
        self.target_lists
            .get_mut(&list)
            .ok_or(GuidanceError::UnknownTargetList(list))
    }

    /// Adds a target with the configured default needle type; returns its index.
    pub fn add_target(
        &mut self,
        list: TargetListId,
        label: impl Into<String>,
        position: Point3<f64>,
    ) -> Result<usize> {
        let needle_type = self.config.needle_type;
        let change = self.target_list_mut(list)?.add(label, position, needle_type)?;
        self.targets_changed(list, change)?;
        Ok(self.target_list(list)?.len() - 1)
    }

    pub fn move_target(
        &mut self,
        list: TargetListId,
        index: usize,
        position: Point3<f64>,
    ) -> Result<()> {
        let change = self.target_list_mut(list)?.set_position(index, position)?;
        self.targets_changed(list, change)
    }

    pub fn remove_target(&mut self, list: TargetListId, index: usize) -> Result<()> {
        let change = self.target_list_mut(list)?.remove(index)?;
        self.targets_changed(list, change)
    }

    pub fn set_needle_type(
        &mut self,
        list: TargetListId,
        index: usize,
        needle_type: NeedleType,
    ) -> Result<()> {
        self.target_list_mut(list)?.set_needle_type(index, needle_type)
    }

    pub fn set_target_visible(&mut self, list: TargetListId, index: usize, visible: bool) -> Result<()> {
        self.target_list_mut(list)?.set_visible(index, visible)
    }

    /// Moves a target, then snaps it onto its nearest trajectory when the
    /// new position is in range. Returns where the target ended up.
    pub fn move_target_snapped(
        &mut self,
        list: TargetListId,
        index: usize,
        position: Point3<f64>,
    ) -> Result<Point3<f64>> {
        self.move_target(list, index, position)?;
        let snapped = self
            .computation_and_targets(list)
            .and_then(|(computation, targets)| computation.needle_end_pos(targets, index));
        match snapped {
            Ok(snap) => {
                self.move_target(list, index, snap)?;
                self.emit(SessionEvent::TargetSnapped {
                    list,
                    index,
                    position: snap,
                });
                Ok(snap)
            }
            Err(GuidanceError::OutOfRange { .. } | GuidanceError::NoTemplate) => Ok(position),
            Err(e) => Err(e),
        }
    }

    /// Brings an existing computation up to date, then notifies observers.
    fn targets_changed(&mut self, list: TargetListId, change: TargetChange) -> Result<()> {
        if let Some(computation) = self.computations.get_mut(&list) {
            let targets = self
                .target_lists
                .get(&list)
                .ok_or(GuidanceError::UnknownTargetList(list))?;
            computation.apply_change(targets, change)?;
        }
        self.emit(SessionEvent::GuidanceRecomputed { list });
        Ok(())
    }

    // --- guidance ---

    fn computation_and_targets(
        &mut self,
        list: TargetListId,
    ) -> Result<(&mut GuidanceComputation, &TargetList)> {
        let targets = self
            .target_lists
            .get(&list)
            .ok_or(GuidanceError::UnknownTargetList(list))?;
        let template = self.template.as_ref().ok_or(GuidanceError::NoTemplate)?;
        let computation = match self.computations.entry(list) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                entry.insert(GuidanceComputation::new(Arc::clone(template))?)
            }
        };
        debug_assert_eq!(
            computation.template_generation(),
            template.generation(),
            "guidance cache outlived its template"
        );
        Ok((computation, targets))
    }

    pub fn guidance(&mut self, list: TargetListId, index: usize) -> Result<GuidanceResult> {
        let (computation, targets) = self.computation_and_targets(list)?;
        computation.result(targets, index).cloned()
    }

    pub fn hole(&mut self, list: TargetListId, index: usize) -> Result<HoleLabel> {
        let (computation, targets) = self.computation_and_targets(list)?;
        computation.hole(targets, index)
    }

    pub fn depth_cm(&mut self, list: TargetListId, index: usize) -> Result<f64> {
        let (computation, targets) = self.computation_and_targets(list)?;
        computation.depth_cm(targets, index)
    }

    pub fn depth_text(&mut self, list: TargetListId, index: usize) -> Result<String> {
        let (computation, targets) = self.computation_and_targets(list)?;
        computation.depth_text(targets, index)
    }

    pub fn depth_in_range(&mut self, list: TargetListId, index: usize) -> Result<bool> {
        let (computation, targets) = self.computation_and_targets(list)?;
        computation.depth_in_range(targets, index)
    }

    pub fn needle_end_pos(&mut self, list: TargetListId, index: usize) -> Result<Point3<f64>> {
        let (computation, targets) = self.computation_and_targets(list)?;
        computation.needle_end_pos(targets, index)
    }

    /// Compares row `index` of `current` against the same row of `planning`.
    pub fn compare_with_planning(
        &mut self,
        current: TargetListId,
        planning: TargetListId,
        index: usize,
    ) -> Result<TargetComparison> {
        let tolerance = self.config.planning_depth_tolerance_cm;
        // make sure both computations exist before borrowing them together
        self.computation_and_targets(current)?;
        self.computation_and_targets(planning)?;

        let current_targets = self
            .target_lists
            .get(&current)
            .ok_or(GuidanceError::UnknownTargetList(current))?;
        let planning_targets = self
            .target_lists
            .get(&planning)
            .ok_or(GuidanceError::UnknownTargetList(planning))?;

        if current == planning {
            let computation = self
                .computations
                .get_mut(&current)
                .ok_or(GuidanceError::UnknownTargetList(current))?;
            let mut same = computation.clone();
            return compare_with_planning(
                computation,
                current_targets,
                &mut same,
                planning_targets,
                index,
                tolerance,
            );
        }

        let mut current_computation = self
            .computations
            .remove(&current)
            .ok_or(GuidanceError::UnknownTargetList(current))?;
        let result = match self.computations.get_mut(&planning) {
            Some(planning_computation) => compare_with_planning(
                &mut current_computation,
                current_targets,
                planning_computation,
                planning_targets,
                index,
                tolerance,
            ),
            None => Err(GuidanceError::UnknownTargetList(planning)),
        };
        self.computations.insert(current, current_computation);
        result
    }

    /// Needle and iceball geometry for the visible targets of `list`.
    ///
    /// `None` when no template is registered or the template carries no
    /// registration transform.
    pub fn ablation_zone(&mut self, list: TargetListId) -> Result<Option<AblationZoneGeometry>> {
        let Some(template) = self.template.clone() else {
            log::info!("no template registered, nothing to display");
            return Ok(None);
        };
        let builder = AblationZoneBuilder::new(self.config.clone());
        let (computation, targets) = self.computation_and_targets(list)?;

        let mut results = Vec::new();
        for (index, target) in targets.iter().enumerate() {
            if target.visible {
                results.push((target, computation.result(targets, index)?.clone()));
            }
        }
        let active: Vec<_> = results.iter().map(|(t, r)| (*t, r)).collect();
        Ok(builder.build_with_target_types(&active, template.registration()))
    }
}
