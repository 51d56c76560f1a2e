//! Equipment-reuse dependency graph.
//!
//! A drop-off that needs equipment currently sitting at another site cannot
//! be visited before the pickup that frees it. The graph maps each dependent
//! task id to the task ids that must be visited first.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::types::Stop;
use super::config::DuplicateEquipmentPolicy;
use super::error::SequencerError;

/// Precedence constraints for one run, keyed by task id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    requirements: HashMap<String, Vec<String>>,
    required: HashSet<String>,
}

impl DependencyGraph {
    /// Build the graph from the run's stops.
    ///
    /// Drop-offs depend on every pickup that frees one of their equipment ids.
    /// Explicit `depends_on` entries are merged in for any stop type.
    pub fn build(stops: &[Stop], policy: DuplicateEquipmentPolicy) -> Result<Self, SequencerError> {
        let freed_by = equipment_sources(stops, policy)?;

        let mut requirements: HashMap<String, Vec<String>> = HashMap::new();
        for stop in stops {
            let mut deps: Vec<String> = Vec::new();

            if stop.is_drop_off() {
                for equipment_id in &stop.equipment_ids {
                    if let Some(&pickup_task) = freed_by.get(equipment_id.as_str()) {
                        if !deps.iter().any(|d| d == pickup_task) {
                            deps.push(pickup_task.to_string());
                        }
                    }
                }
            }

            for extra in &stop.depends_on {
                if !deps.contains(extra) {
                    deps.push(extra.clone());
                }
            }

            if !deps.is_empty() {
                debug!("Task {} requires {:?}", stop.task_id, deps);
                requirements.insert(stop.task_id.clone(), deps);
            }
        }

        let required = requirements.values().flatten().cloned().collect();

        Ok(Self {
            requirements,
            required,
        })
    }

    /// Task ids that must be visited before `task_id`
    pub fn requirements(&self, task_id: &str) -> &[String] {
        self.requirements
            .get(task_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True when `dependent` must come after `required`
    pub fn requires(&self, dependent: &str, required: &str) -> bool {
        self.requirements(dependent).iter().any(|r| r == required)
    }

    /// True when some other stop waits on `task_id`
    pub fn is_required(&self, task_id: &str) -> bool {
        self.required.contains(task_id)
    }

    pub fn is_satisfied(&self, task_id: &str, scheduled: &HashSet<&str>) -> bool {
        self.requirements(task_id)
            .iter()
            .all(|r| scheduled.contains(r.as_str()))
    }

    /// Requirements of `task_id` not yet in `scheduled`
    pub fn missing(&self, task_id: &str, scheduled: &HashSet<&str>) -> Vec<String> {
        self.requirements(task_id)
            .iter()
            .filter(|r| !scheduled.contains(r.as_str()))
            .cloned()
            .collect()
    }

    /// Number of tasks with at least one requirement
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

/// Map each equipment id to the pickup task that frees it
fn equipment_sources(
    stops: &[Stop],
    policy: DuplicateEquipmentPolicy,
) -> Result<HashMap<&str, &str>, SequencerError> {
    let mut freed_by: HashMap<&str, &str> = HashMap::new();

    for stop in stops.iter().filter(|s| s.is_pick_up()) {
        for equipment_id in &stop.equipment_ids {
            match freed_by.insert(equipment_id.as_str(), stop.task_id.as_str()) {
                Some(previous) if previous != stop.task_id => match policy {
                    DuplicateEquipmentPolicy::Reject => {
                        return Err(SequencerError::AmbiguousEquipment {
                            equipment_id: equipment_id.clone(),
                            task_ids: vec![previous.to_string(), stop.task_id.clone()],
                        });
                    }
                    DuplicateEquipmentPolicy::LastWins => {
                        warn!(
                            "Equipment {} is freed by both {} and {}, using {}",
                            equipment_id, previous, stop.task_id, stop.task_id
                        );
                    }
                },
                _ => {}
            }
        }
    }

    Ok(freed_by)
}
