//! Drop-off / pickup route sequencer
//!
//! Fetches one travel matrix per run, builds the equipment dependency graph,
//! constructs a greedy route and improves it with adjacent swaps.

mod config;
mod construct;
mod dependency;
mod error;
mod improve;
mod schedule;
mod timing;
#[cfg(test)]
pub(crate) mod test_support;

pub use config::{DuplicateEquipmentPolicy, SequencerConfig};
pub use construct::{candidate_score, construct_route, Construction};
pub use dependency::DependencyGraph;
pub use error::SequencerError;
pub use improve::{improve_route, Improvement};
pub use schedule::{evaluate_route, route_cost, RouteContext, RouteEvaluation, ScheduledVisit};
pub use timing::{calculate_lateness, is_high_priority, parse_event_minutes, setup_minutes};

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::defaults::MAX_SETUP_MINUTES;
use crate::services::routing::{DistanceTimeMatrices, TravelMatrixProvider, MAX_LEG_SECONDS};
use crate::types::{
    AnnotatedStop, RouteSummary, RouteWarning, SequencedRoute, Stop, UnscheduledReason, UnscheduledStop,
};
use schedule::HOME_BASE;

/// Entry point: sequences the stops of one crew window
pub struct RouteSequencer {
    provider: Arc<dyn TravelMatrixProvider>,
    home_base: String,
    config: SequencerConfig,
}

impl RouteSequencer {
    pub fn new(provider: Arc<dyn TravelMatrixProvider>, home_base: impl Into<String>, config: SequencerConfig) -> Self {
        Self {
            provider,
            home_base: home_base.into(),
            config,
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn home_base(&self) -> &str {
        &self.home_base
    }

    /// Order `stops` for a crew leaving the home base at `departure`.
    ///
    /// Makes exactly one provider call when there are two or more stops and
    /// none otherwise. Stops that cannot be legally placed come back in
    /// `unscheduled`.
    pub async fn optimize(&self, stops: &[Stop], departure: NaiveDateTime) -> Result<SequencedRoute, SequencerError> {
        let span = info_span!("optimize", run_id = %Uuid::new_v4(), stops = stops.len());
        self.optimize_inner(stops, departure).instrument(span).await
    }

    async fn optimize_inner(&self, stops: &[Stop], departure: NaiveDateTime) -> Result<SequencedRoute, SequencerError> {
        validate_stops(stops, &self.config)?;

        if stops.is_empty() {
            debug!("No stops to sequence, returning empty route");
            return Ok(SequencedRoute::empty());
        }

        let graph = DependencyGraph::build(stops, self.config.duplicate_equipment)?;

        if let [stop] = stops {
            return Ok(self.single_stop_route(stop, &graph));
        }

        let mut locations = Vec::with_capacity(stops.len() + 1);
        locations.push(self.home_base.clone());
        locations.extend(stops.iter().map(|s| s.address.clone()));

        info!(
            "Sequencing {} stops ({} with requirements) using {}",
            stops.len(),
            graph.len(),
            self.provider.name()
        );

        let matrices = self
            .provider
            .get_matrices(&locations)
            .await
            .map_err(SequencerError::Provider)?;

        if !matrices.is_square(locations.len()) {
            return Err(SequencerError::MatrixShape {
                expected: locations.len(),
                actual: matrices.size,
            });
        }
        matrices
            .check_leg_durations(MAX_LEG_SECONDS)
            .map_err(SequencerError::Provider)?;

        let ctx = RouteContext {
            stops,
            matrices: &matrices,
            graph: &graph,
            departure,
            config: &self.config,
        };

        let construction = construct_route(&ctx);
        let improvement = improve_route(&ctx, construction.order);

        info!(
            "Route sequenced: {} scheduled, {} unscheduled, cost {:.1} -> {:.1} ({} swaps)",
            improvement.order.len(),
            construction.unscheduled.len(),
            improvement.initial_cost,
            improvement.final_cost,
            improvement.swaps
        );

        Ok(annotate(&ctx, &improvement, construction.unscheduled))
    }

    /// One stop needs no matrix: it is first unless it waits on a task not in the plan
    fn single_stop_route(&self, stop: &Stop, graph: &DependencyGraph) -> SequencedRoute {
        let missing = graph.missing(&stop.task_id, &HashSet::new());
        if !missing.is_empty() {
            let message = format!(
                "Stop {} could not be scheduled: waiting on {}",
                stop.task_id,
                missing.join(", ")
            );
            warn!("{}", message);
            return SequencedRoute {
                scheduled: vec![],
                unscheduled: vec![UnscheduledStop {
                    stop: stop.clone(),
                    reason: UnscheduledReason::DependencyNotSatisfied { missing },
                }],
                summary: RouteSummary::default(),
                warnings: vec![RouteWarning {
                    task_id: Some(stop.task_id.clone()),
                    warning_type: "UNSCHEDULED".to_string(),
                    message,
                }],
            };
        }

        let setup = setup_minutes(stop, &self.config);
        SequencedRoute {
            scheduled: vec![AnnotatedStop {
                stop: stop.clone(),
                sort_order: 1,
                distance_from_previous: None,
                duration_from_previous: None,
                arrival_time: None,
                setup_minutes: setup,
                estimated_lateness: 0,
            }],
            unscheduled: vec![],
            summary: RouteSummary {
                total_setup_minutes: setup,
                ..Default::default()
            },
            warnings: vec![],
        }
    }
}

/// Reject inputs the sequencer cannot key or time reliably
fn validate_stops(stops: &[Stop], config: &SequencerConfig) -> Result<(), SequencerError> {
    let mut task_ids = HashSet::with_capacity(stops.len());
    let mut ids = HashSet::with_capacity(stops.len());

    for stop in stops {
        if stop.task_id.is_empty() {
            return Err(SequencerError::MissingTaskId {
                address: stop.address.clone(),
            });
        }
        if !task_ids.insert(stop.task_id.as_str()) {
            return Err(SequencerError::DuplicateTaskId(stop.task_id.clone()));
        }
        if !stop.id.is_empty() && !ids.insert(stop.id.as_str()) {
            return Err(SequencerError::DuplicateStopId(stop.id.clone()));
        }
        if stop.unit_count == 0 || setup_minutes(stop, config) > MAX_SETUP_MINUTES {
            return Err(SequencerError::InvalidUnitCount {
                task_id: stop.task_id.clone(),
                unit_count: stop.unit_count,
            });
        }
    }

    Ok(())
}

/// Turn the final order into annotated stops, summary and warnings
fn annotate(
    ctx: &RouteContext<'_>,
    improvement: &Improvement,
    unscheduled: Vec<(usize, UnscheduledReason)>,
) -> SequencedRoute {
    let evaluation = evaluate_route(ctx, &improvement.order);
    let mut warnings = Vec::new();

    let scheduled: Vec<AnnotatedStop> = evaluation
        .visits
        .iter()
        .enumerate()
        .map(|(position, visit)| {
            let stop = &ctx.stops[visit.stop_index];
            if visit.lateness > 0 {
                warnings.push(RouteWarning {
                    task_id: Some(stop.task_id.clone()),
                    warning_type: "LATE_ARRIVAL".to_string(),
                    message: format!(
                        "Setup at {} finishes {} min after the {} event start",
                        stop.address,
                        visit.lateness,
                        stop.event_start_time.as_deref().unwrap_or("?")
                    ),
                });
            }
            AnnotatedStop {
                stop: stop.clone(),
                sort_order: position as u32 + 1,
                distance_from_previous: Some(visit.distance_from_previous),
                duration_from_previous: Some(visit.duration_from_previous),
                arrival_time: Some(visit.arrival),
                setup_minutes: visit.setup_minutes,
                estimated_lateness: visit.lateness,
            }
        })
        .collect();

    let unscheduled: Vec<UnscheduledStop> = unscheduled
        .into_iter()
        .map(|(index, reason)| {
            let stop = ctx.stops[index].clone();
            let message = match &reason {
                UnscheduledReason::DependencyNotSatisfied { missing } => format!(
                    "Stop {} could not be scheduled: waiting on {}",
                    stop.task_id,
                    missing.join(", ")
                ),
                UnscheduledReason::Unreachable => {
                    format!("Stop {} could not be scheduled: no route to {}", stop.task_id, stop.address)
                }
            };
            warn!("{}", message);
            warnings.push(RouteWarning {
                task_id: Some(stop.task_id.clone()),
                warning_type: "UNSCHEDULED".to_string(),
                message,
            });
            UnscheduledStop { stop, reason }
        })
        .collect();

    let (return_distance, return_duration, estimated_return) =
        return_leg(ctx.matrices, &evaluation.visits);

    let summary = RouteSummary {
        total_distance_meters: evaluation.total_distance_meters,
        total_drive_seconds: evaluation.total_drive_seconds,
        total_setup_minutes: evaluation.total_setup_minutes,
        total_lateness_minutes: evaluation.total_lateness_minutes,
        late_stop_count: scheduled.iter().filter(|s| s.is_late()).count(),
        total_cost: evaluation.cost(ctx.config),
        return_to_base_distance_meters: return_distance,
        return_to_base_duration_seconds: return_duration,
        estimated_return,
        swaps_applied: improvement.swaps,
    };

    SequencedRoute {
        scheduled,
        unscheduled,
        summary,
        warnings,
    }
}

/// Leg from the last visit back home, if there is one and it is reachable
fn return_leg(
    matrices: &DistanceTimeMatrices,
    visits: &[ScheduledVisit],
) -> (Option<u64>, Option<u64>, Option<NaiveDateTime>) {
    let Some(last) = visits.last() else {
        return (None, None, None);
    };

    let from = schedule::matrix_index(last.stop_index);
    if !matrices.is_reachable(from, HOME_BASE) {
        return (None, None, None);
    }

    let duration = matrices.duration(from, HOME_BASE);
    (
        Some(matrices.distance(from, HOME_BASE)),
        Some(duration),
        Some(last.departure() + Duration::seconds(duration as i64)),
    )
}
