//! Day plan loading from JSON or CSV files
//!
//! CSV files hold one stop per row (semicolon separated, header required).
//! The date and window of a CSV plan come from the caller.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{info, warn};

use crate::defaults::{default_afternoon_departure, default_morning_departure};
use crate::types::{DayPlan, ServiceWindow, Stop, StopType};

// =============================================================================
// CSV ROW
// =============================================================================

#[derive(Debug, serde::Deserialize)]
struct CsvStopRow {
    #[serde(alias = "stop_id", default)]
    id: Option<String>,
    #[serde(alias = "taskId", alias = "task")]
    task_id: String,
    #[serde(alias = "orderId", alias = "order", default)]
    order_id: Option<String>,
    #[serde(alias = "location")]
    address: String,
    #[serde(alias = "stop_type", alias = "kind")]
    r#type: String,
    #[serde(alias = "eventStartTime", alias = "event_start", alias = "event", default)]
    event_start_time: Option<String>,
    #[serde(alias = "equipmentIds", alias = "equipment", default)]
    equipment_ids: Option<String>,
    #[serde(alias = "unitCount", alias = "units", default)]
    unit_count: Option<u32>,
    #[serde(alias = "dependsOn", default)]
    depends_on: Option<String>,
    #[serde(alias = "feedsDownstream", default)]
    feeds_downstream: Option<String>,
}

impl CsvStopRow {
    fn into_stop(self, line: usize) -> Result<Stop> {
        let stop_type = StopType::parse(&self.r#type)
            .with_context(|| format!("line {}: unknown stop type '{}'", line, self.r#type))?;

        Ok(Stop {
            id: self.id.unwrap_or_default(),
            task_id: self.task_id.trim().to_string(),
            order_id: self.order_id.unwrap_or_default(),
            address: self.address.trim().to_string(),
            stop_type,
            event_start_time: self.event_start_time.filter(|t| !t.trim().is_empty()),
            equipment_ids: split_list(self.equipment_ids.as_deref()),
            unit_count: self.unit_count.unwrap_or(1),
            depends_on: split_list(self.depends_on.as_deref()),
            feeds_downstream: parse_flag(self.feeds_downstream.as_deref()),
        })
    }
}

/// Split "E1,E2" or "E1|E2" into trimmed, non-empty items
fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split([',', '|'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "y")
    )
}

// =============================================================================
// LOADING
// =============================================================================

/// Parse semicolon separated stop rows
pub fn parse_stops_csv(content: &str) -> Result<Vec<Stop>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let mut stops = Vec::new();
    for (i, result) in reader.deserialize().enumerate() {
        // header is line 1
        let line = i + 2;
        let row: CsvStopRow = result.with_context(|| format!("line {}: invalid row", line))?;
        stops.push(row.into_stop(line)?);
    }
    Ok(stops)
}

/// Load a day plan. JSON files carry their own date and window;
/// CSV files get `date` and `window` from the caller.
pub fn load_plan(path: &Path, date: NaiveDate, window: ServiceWindow) -> Result<DayPlan> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan file {}", path.display()))?;

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let plan = if is_csv {
        DayPlan {
            date,
            window,
            departure: None,
            home_base: None,
            stops: parse_stops_csv(&content)?,
        }
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse plan file {}", path.display()))?
    };

    info!(
        "Loaded plan for {} ({}) with {} stops from {}",
        plan.date,
        plan.window.as_str(),
        plan.stops.len(),
        path.display()
    );
    Ok(plan)
}

// =============================================================================
// DEPARTURE
// =============================================================================

/// Default home base departure per service window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDepartures {
    pub morning: NaiveTime,
    pub afternoon: NaiveTime,
}

impl Default for WindowDepartures {
    fn default() -> Self {
        Self {
            morning: default_morning_departure(),
            afternoon: default_afternoon_departure(),
        }
    }
}

impl WindowDepartures {
    pub fn for_window(&self, window: ServiceWindow) -> NaiveTime {
        match window {
            ServiceWindow::Morning => self.morning,
            ServiceWindow::Afternoon => self.afternoon,
        }
    }
}

/// Parse "HH:MM" or "HH:MM:SS"
pub fn parse_clock_time(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .with_context(|| format!("Invalid time '{}', expected HH:MM", value))
}

/// Departure for a plan: explicit override, then the plan's own departure,
/// then the window default
pub fn resolve_departure(
    plan: &DayPlan,
    override_time: Option<&str>,
    defaults: &WindowDepartures,
) -> Result<NaiveDateTime> {
    let time = match override_time.or(plan.departure.as_deref()) {
        Some(value) => parse_clock_time(value)?,
        None => defaults.for_window(plan.window),
    };

    if plan.window == ServiceWindow::Morning && time >= defaults.afternoon {
        warn!(
            "Morning plan departs at {}, after the afternoon window opens",
            time.format("%H:%M")
        );
    }

    Ok(plan.date.and_time(time))
}
