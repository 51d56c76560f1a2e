//! Setup time and lateness model

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use tracing::debug;

use crate::types::Stop;
use super::config::SequencerConfig;
use super::dependency::DependencyGraph;

/// Parse "HH:MM" (1- or 2-digit hours, optional ":SS") into minutes since midnight.
///
/// Malformed strings read as 00:00.
pub fn parse_event_minutes(value: &str) -> u32 {
    match try_parse_event_minutes(value) {
        Some(minutes) => minutes,
        None => {
            debug!("Malformed event start time '{}', treating as 00:00", value);
            0
        }
    }
}

fn try_parse_event_minutes(value: &str) -> Option<u32> {
    let mut parts = value.trim().split(':');
    let hours = parts.next()?;
    let minutes = parts.next()?;

    if let Some(seconds) = parts.next() {
        if seconds.len() != 2 || seconds.parse::<u32>().ok()? >= 60 {
            return None;
        }
    }
    if parts.next().is_some() {
        return None;
    }

    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return None;
    }
    if !hours.chars().chain(minutes.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }

    Some(hours * 60 + minutes)
}

/// Event start of a drop-off, if it has one
pub fn event_start_minutes(stop: &Stop) -> Option<u32> {
    if !stop.is_drop_off() {
        return None;
    }
    stop.event_start_time.as_deref().map(parse_event_minutes)
}

/// Setup time for a stop: units × per-unit minutes
pub fn setup_minutes(stop: &Stop, config: &SequencerConfig) -> u32 {
    stop.unit_count.saturating_mul(config.setup_minutes_per_unit)
}

/// Minutes by which setup would finish after the stop's event start.
///
/// Always 0 for pickups and for drop-offs without an event start.
pub fn calculate_lateness(arrival: NaiveDateTime, stop: &Stop, setup_minutes: u32) -> u32 {
    let Some(event_minutes) = event_start_minutes(stop) else {
        return 0;
    };

    let arrival_minutes = wall_clock_minutes(arrival.time());
    arrival_minutes
        .saturating_add(setup_minutes)
        .saturating_sub(event_minutes)
}

/// Pickups, early events and stops other orders wait on go first
pub fn is_high_priority(stop: &Stop, graph: &DependencyGraph, config: &SequencerConfig) -> bool {
    if stop.is_pick_up() || stop.feeds_downstream || graph.is_required(&stop.task_id) {
        return true;
    }

    match event_start_minutes(stop) {
        Some(event_minutes) => event_minutes < wall_clock_minutes(config.high_priority_cutoff),
        None => false,
    }
}

fn wall_clock_minutes(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}
