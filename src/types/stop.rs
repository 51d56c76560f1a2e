//! Stop types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Kind of work done at a stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopType {
    /// Equipment is delivered and set up for an event
    DropOff,
    /// Equipment is collected and becomes free for reuse
    PickUp,
}

impl StopType {
    pub const fn as_str(self) -> &'static str {
        match self {
            StopType::DropOff => "drop_off",
            StopType::PickUp => "pick_up",
        }
    }

    /// Lenient parser used by plan imports ("dropoff", "drop-off", "delivery", ...)
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();

        match normalized.as_str() {
            "dropoff" | "delivery" | "drop" => Some(StopType::DropOff),
            "pickup" | "collection" | "pick" => Some(StopType::PickUp),
            _ => None,
        }
    }
}

/// A location the crew must visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    /// Backing record id. May be empty until the caller creates the record.
    #[serde(default)]
    pub id: String,
    /// Logical task reference, used as the dependency key
    pub task_id: String,
    /// Business order that owns this stop
    #[serde(default)]
    pub order_id: String,
    /// Opaque location string passed to the travel matrix provider
    pub address: String,
    #[serde(rename = "type")]
    pub stop_type: StopType,
    /// Required event start ("HH:MM"). Only meaningful for drop-offs.
    #[serde(default)]
    pub event_start_time: Option<String>,
    /// Equipment carried by this stop
    #[serde(default)]
    pub equipment_ids: Vec<String>,
    /// Number of discrete units handled here
    #[serde(default = "default_unit_count")]
    pub unit_count: u32,
    /// Extra task ids that must be visited before this stop
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Caller flag: other orders are waiting on this stop
    #[serde(default)]
    pub feeds_downstream: bool,
}

fn default_unit_count() -> u32 {
    1
}

impl Stop {
    pub fn is_drop_off(&self) -> bool {
        self.stop_type == StopType::DropOff
    }

    pub fn is_pick_up(&self) -> bool {
        self.stop_type == StopType::PickUp
    }
}

/// A stop placed on the route together with its computed timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedStop {
    #[serde(flatten)]
    pub stop: Stop,
    /// 1-based position in the route
    pub sort_order: u32,
    /// Meters from the previous location. None when no matrix was fetched.
    pub distance_from_previous: Option<u64>,
    /// Seconds from the previous location. None when no matrix was fetched.
    pub duration_from_previous: Option<u64>,
    /// Estimated arrival. None when no matrix was fetched.
    pub arrival_time: Option<NaiveDateTime>,
    pub setup_minutes: u32,
    /// Minutes past the event start at which setup would finish
    pub estimated_lateness: u32,
}

impl AnnotatedStop {
    pub fn is_late(&self) -> bool {
        self.estimated_lateness > 0
    }
}

/// Why a stop was left off the route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnscheduledReason {
    /// Some required tasks were never placed (missing from the run or cyclic)
    DependencyNotSatisfied { missing: Vec<String> },
    /// Every remaining leg to this stop is reported unreachable
    Unreachable,
}

/// A stop the sequencer could not legally place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnscheduledStop {
    pub stop: Stop,
    pub reason: UnscheduledReason,
}

/// Warning about route issues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteWarning {
    /// Task id of the related stop (if applicable)
    pub task_id: Option<String>,
    /// Warning type code
    pub warning_type: String,
    /// Human-readable message
    pub message: String,
}

/// Totals for a sequenced route
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    /// Meters driven to reach every scheduled stop
    pub total_distance_meters: u64,
    /// Seconds driven to reach every scheduled stop
    pub total_drive_seconds: u64,
    pub total_setup_minutes: u32,
    pub total_lateness_minutes: u32,
    /// Stops whose setup would finish after their event start
    pub late_stop_count: usize,
    /// Drive time in minutes plus weighted lateness
    pub total_cost: f64,
    /// Leg from the last stop back to the home base
    pub return_to_base_distance_meters: Option<u64>,
    pub return_to_base_duration_seconds: Option<u64>,
    /// Expected time back at the home base
    pub estimated_return: Option<NaiveDateTime>,
    /// Improving swaps applied by the local search
    pub swaps_applied: usize,
}

/// Result of one sequencing run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencedRoute {
    pub scheduled: Vec<AnnotatedStop>,
    pub unscheduled: Vec<UnscheduledStop>,
    pub summary: RouteSummary,
    pub warnings: Vec<RouteWarning>,
}

impl SequencedRoute {
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when every input stop made it onto the route
    pub fn is_complete(&self) -> bool {
        self.unscheduled.is_empty()
    }

    /// Number of stops at risk of missing their event start
    pub fn at_risk_count(&self) -> usize {
        self.scheduled.iter().filter(|s| s.is_late()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_type_parse_variants() {
        assert_eq!(StopType::parse("DropOff"), Some(StopType::DropOff));
        assert_eq!(StopType::parse("drop-off"), Some(StopType::DropOff));
        assert_eq!(StopType::parse(" delivery "), Some(StopType::DropOff));
        assert_eq!(StopType::parse("PICK_UP"), Some(StopType::PickUp));
        assert_eq!(StopType::parse("collection"), Some(StopType::PickUp));
        assert_eq!(StopType::parse("teleport"), None);
    }

    #[test]
    fn test_stop_deserializes_with_defaults() {
        let json = r#"{
            "taskId": "t1",
            "address": "1 Main St",
            "type": "drop_off",
            "eventStartTime": "9:30",
            "equipmentIds": ["E1"]
        }"#;

        let stop: Stop = serde_json::from_str(json).unwrap();
        assert_eq!(stop.id, "");
        assert_eq!(stop.task_id, "t1");
        assert_eq!(stop.stop_type, StopType::DropOff);
        assert_eq!(stop.event_start_time.as_deref(), Some("9:30"));
        assert_eq!(stop.unit_count, 1);
        assert!(stop.depends_on.is_empty());
        assert!(!stop.feeds_downstream);
    }

    #[test]
    fn test_annotated_stop_serializes_flat() {
        let stop = Stop {
            id: "s1".to_string(),
            task_id: "t1".to_string(),
            order_id: "o1".to_string(),
            address: "1 Main St".to_string(),
            stop_type: StopType::PickUp,
            event_start_time: None,
            equipment_ids: vec![],
            unit_count: 2,
            depends_on: vec![],
            feeds_downstream: false,
        };
        let annotated = AnnotatedStop {
            stop,
            sort_order: 1,
            distance_from_previous: Some(1200),
            duration_from_previous: Some(300),
            arrival_time: None,
            setup_minutes: 40,
            estimated_lateness: 0,
        };

        let value = serde_json::to_value(&annotated).unwrap();
        assert_eq!(value["taskId"], "t1");
        assert_eq!(value["type"], "pick_up");
        assert_eq!(value["sortOrder"], 1);
        assert_eq!(value["setupMinutes"], 40);
    }

    #[test]
    fn test_unscheduled_reason_tagged() {
        let reason = UnscheduledReason::DependencyNotSatisfied {
            missing: vec!["t9".to_string()],
        };
        let value = serde_json::to_value(&reason).unwrap();
        assert_eq!(value["kind"], "dependency_not_satisfied");
        assert_eq!(value["missing"][0], "t9");
    }

    #[test]
    fn test_empty_route_is_complete() {
        let route = SequencedRoute::empty();
        assert!(route.is_complete());
        assert_eq!(route.at_risk_count(), 0);
    }
}
