//! Shared builders for sequencer tests

use chrono::{NaiveDate, NaiveDateTime};

use crate::services::routing::DistanceTimeMatrices;
use crate::types::{Stop, StopType};

pub fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 15)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

pub fn drop_off(task_id: &str, event: Option<&str>, equipment: &[&str]) -> Stop {
    Stop {
        id: format!("id-{}", task_id),
        task_id: task_id.to_string(),
        order_id: format!("order-{}", task_id),
        address: format!("{} address", task_id),
        stop_type: StopType::DropOff,
        event_start_time: event.map(str::to_string),
        equipment_ids: equipment.iter().map(|e| e.to_string()).collect(),
        unit_count: 1,
        depends_on: vec![],
        feeds_downstream: false,
    }
}

pub fn pick_up(task_id: &str, equipment: &[&str]) -> Stop {
    Stop {
        stop_type: StopType::PickUp,
        ..drop_off(task_id, None, equipment)
    }
}

/// Every pair of distinct locations is `dist_m` meters / `dur_s` seconds apart
pub fn uniform_matrix(size: usize, dist_m: u64, dur_s: u64) -> DistanceTimeMatrices {
    let mut distances = vec![vec![0u64; size]; size];
    let mut durations = vec![vec![0u64; size]; size];
    for i in 0..size {
        for j in 0..size {
            if i != j {
                distances[i][j] = dist_m;
                durations[i][j] = dur_s;
            }
        }
    }
    DistanceTimeMatrices {
        distances,
        durations,
        size,
    }
}

/// Matrix from drive minutes; distance is 1 km per minute
pub fn matrix_from_minutes(minutes: &[&[u64]]) -> DistanceTimeMatrices {
    let size = minutes.len();
    DistanceTimeMatrices {
        distances: minutes.iter().map(|row| row.iter().map(|m| m * 1_000).collect()).collect(),
        durations: minutes.iter().map(|row| row.iter().map(|m| m * 60).collect()).collect(),
        size,
    }
}
