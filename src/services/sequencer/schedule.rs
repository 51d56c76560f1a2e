//! Sequential schedule evaluation for a stop order.
//!
//! Walks an ordered list of stops from the home base and computes arrival,
//! setup and lateness for each one, plus the total route cost used by the
//! local search. Does NOT change the order.

use chrono::{Duration, NaiveDateTime};

use crate::services::routing::DistanceTimeMatrices;
use crate::types::Stop;
use super::config::SequencerConfig;
use super::dependency::DependencyGraph;
use super::timing::{calculate_lateness, setup_minutes};

/// Matrix index of the home base
pub const HOME_BASE: usize = 0;

/// Matrix index of the stop at `stop_index` in the input list
pub fn matrix_index(stop_index: usize) -> usize {
    stop_index + 1
}

/// Everything a single run evaluates routes against
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    pub stops: &'a [Stop],
    pub matrices: &'a DistanceTimeMatrices,
    pub graph: &'a DependencyGraph,
    pub departure: NaiveDateTime,
    pub config: &'a SequencerConfig,
}

/// Computed timing for one visited stop
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledVisit {
    /// Index into the input stop list
    pub stop_index: usize,
    pub distance_from_previous: u64,
    pub duration_from_previous: u64,
    pub arrival: NaiveDateTime,
    pub setup_minutes: u32,
    pub lateness: u32,
}

impl ScheduledVisit {
    pub fn departure(&self) -> NaiveDateTime {
        self.arrival + Duration::minutes(self.setup_minutes as i64)
    }
}

/// Result of walking a route
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEvaluation {
    pub visits: Vec<ScheduledVisit>,
    pub total_distance_meters: u64,
    pub total_drive_seconds: u64,
    pub total_setup_minutes: u32,
    pub total_lateness_minutes: u32,
    /// False when some leg is unreachable
    pub reachable: bool,
}

impl RouteEvaluation {
    /// Drive minutes plus weighted lateness; infinite when a leg is unreachable
    pub fn cost(&self, config: &SequencerConfig) -> f64 {
        if !self.reachable {
            return f64::INFINITY;
        }
        self.total_drive_seconds as f64 / 60.0
            + self.total_lateness_minutes as f64 * config.lateness_penalty
    }
}

/// Time and place the crew is at after finishing a stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub matrix_index: usize,
    pub time: NaiveDateTime,
}

impl Cursor {
    pub fn at_home_base(departure: NaiveDateTime) -> Self {
        Self {
            matrix_index: HOME_BASE,
            time: departure,
        }
    }
}

/// Drive from `cursor` to `stop_index` and compute the visit there
pub fn visit(ctx: &RouteContext<'_>, cursor: Cursor, stop_index: usize) -> ScheduledVisit {
    let stop = &ctx.stops[stop_index];
    let to = matrix_index(stop_index);

    let distance = ctx.matrices.distance(cursor.matrix_index, to);
    let duration = ctx.matrices.duration(cursor.matrix_index, to);
    let arrival = if ctx.matrices.is_reachable(cursor.matrix_index, to) {
        cursor.time + Duration::seconds(duration as i64)
    } else {
        cursor.time
    };

    let setup = setup_minutes(stop, ctx.config);
    let lateness = calculate_lateness(arrival, stop, setup);

    ScheduledVisit {
        stop_index,
        distance_from_previous: distance,
        duration_from_previous: duration,
        arrival,
        setup_minutes: setup,
        lateness,
    }
}

/// Walk `order` (indices into `ctx.stops`) from the fixed departure
pub fn evaluate_route(ctx: &RouteContext<'_>, order: &[usize]) -> RouteEvaluation {
    let mut visits = Vec::with_capacity(order.len());
    let mut cursor = Cursor::at_home_base(ctx.departure);
    let mut total_distance_meters: u64 = 0;
    let mut total_drive_seconds: u64 = 0;
    let mut total_setup_minutes: u32 = 0;
    let mut total_lateness_minutes: u32 = 0;
    let mut reachable = true;

    for &stop_index in order {
        let to = matrix_index(stop_index);
        if !ctx.matrices.is_reachable(cursor.matrix_index, to) {
            reachable = false;
        }

        let scheduled = visit(ctx, cursor, stop_index);

        total_distance_meters = total_distance_meters.saturating_add(scheduled.distance_from_previous);
        total_drive_seconds = total_drive_seconds.saturating_add(scheduled.duration_from_previous);
        total_setup_minutes = total_setup_minutes.saturating_add(scheduled.setup_minutes);
        total_lateness_minutes = total_lateness_minutes.saturating_add(scheduled.lateness);

        cursor = Cursor {
            matrix_index: to,
            time: scheduled.departure(),
        };
        visits.push(scheduled);
    }

    RouteEvaluation {
        visits,
        total_distance_meters,
        total_drive_seconds,
        total_setup_minutes,
        total_lateness_minutes,
        reachable,
    }
}

/// Total cost of `order`: drive minutes + lateness × penalty
pub fn route_cost(ctx: &RouteContext<'_>, order: &[usize]) -> f64 {
    evaluate_route(ctx, order).cost(ctx.config)
}

// ===========================================================================
// Tests
// ===========================================================================
