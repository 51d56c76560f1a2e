//! Sequencer tuning configuration

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::defaults;

/// What to do when two pickups free the same equipment id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateEquipmentPolicy {
    /// Fail the run with an ambiguity error
    #[default]
    Reject,
    /// Keep the pickup seen last in input order
    LastWins,
}

impl DuplicateEquipmentPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" => Some(DuplicateEquipmentPolicy::Reject),
            "last_wins" | "last-wins" | "lastwins" => Some(DuplicateEquipmentPolicy::LastWins),
            _ => None,
        }
    }
}

/// Scoring and cost weights for the route sequencer
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerConfig {
    /// Setup time per handled unit
    pub setup_minutes_per_unit: u32,
    /// Weight of one minute of lateness in scores and route cost
    pub lateness_penalty: f64,
    /// Score bonus per minute of drive from the home base
    pub far_early_bonus: f64,
    /// Flat score bonus for high-priority stops
    pub high_priority_bonus: f64,
    /// Events starting before this time are high priority
    pub high_priority_cutoff: NaiveTime,
    pub duplicate_equipment: DuplicateEquipmentPolicy,
    /// Safety cap on local-search passes
    pub max_improvement_passes: usize,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            setup_minutes_per_unit: defaults::SETUP_MINUTES_PER_UNIT,
            lateness_penalty: defaults::LATENESS_PENALTY,
            far_early_bonus: defaults::FAR_EARLY_BONUS,
            high_priority_bonus: defaults::HIGH_PRIORITY_BONUS,
            high_priority_cutoff: defaults::high_priority_cutoff(),
            duplicate_equipment: DuplicateEquipmentPolicy::default(),
            max_improvement_passes: defaults::MAX_IMPROVEMENT_PASSES,
        }
    }
}

impl SequencerConfig {
    /// Defaults, but duplicate equipment ids resolve to the last pickup seen
    pub fn last_wins() -> Self {
        Self {
            duplicate_equipment: DuplicateEquipmentPolicy::LastWins,
            ..Default::default()
        }
    }

    /// Defaults with custom setup time per unit
    pub fn with_setup_minutes(setup_minutes_per_unit: u32) -> Self {
        Self {
            setup_minutes_per_unit,
            ..Default::default()
        }
    }
}
