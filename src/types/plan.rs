//! Day plan types (one crew, one window)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Stop;

/// Half-day window the crew works in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceWindow {
    #[default]
    Morning,
    Afternoon,
}

impl ServiceWindow {
    pub const fn as_str(self) -> &'static str {
        match self {
            ServiceWindow::Morning => "morning",
            ServiceWindow::Afternoon => "afternoon",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "morning" | "am" => Some(ServiceWindow::Morning),
            "afternoon" | "pm" => Some(ServiceWindow::Afternoon),
            _ => None,
        }
    }
}

/// Stops to sequence for one window of one day
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub date: NaiveDate,
    #[serde(default)]
    pub window: ServiceWindow,
    /// Departure from the home base ("HH:MM"). Falls back to the window default.
    #[serde(default)]
    pub departure: Option<String>,
    /// Overrides the configured home base address
    #[serde(default)]
    pub home_base: Option<String>,
    pub stops: Vec<Stop>,
}
