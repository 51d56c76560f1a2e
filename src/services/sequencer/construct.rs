//! Greedy best-first route construction.
//!
//! Starting at the home base, repeatedly append the eligible stop with the
//! lowest score. A stop is eligible once all of its requirements are on the
//! route and the leg to it is reachable.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::types::UnscheduledReason;
use super::schedule::{matrix_index, visit, Cursor, RouteContext, ScheduledVisit, HOME_BASE};
use super::timing::is_high_priority;

/// Greedy route plus whatever could not be placed
#[derive(Debug, Clone, PartialEq)]
pub struct Construction {
    /// Indices into the input stop list, in visiting order
    pub order: Vec<usize>,
    pub unscheduled: Vec<(usize, UnscheduledReason)>,
}

/// Score of visiting a candidate next; lower is better.
///
/// `drive + lateness × penalty − base_distance × far_bonus − priority_bonus`
pub fn candidate_score(ctx: &RouteContext<'_>, candidate: &ScheduledVisit) -> f64 {
    let config = ctx.config;
    let stop = &ctx.stops[candidate.stop_index];
    let to = matrix_index(candidate.stop_index);

    let drive_minutes = candidate.duration_from_previous as f64 / 60.0;
    let base_minutes = if ctx.matrices.is_reachable(HOME_BASE, to) {
        ctx.matrices.duration(HOME_BASE, to) as f64 / 60.0
    } else {
        0.0
    };

    let mut score = drive_minutes + candidate.lateness as f64 * config.lateness_penalty
        - base_minutes * config.far_early_bonus;

    if is_high_priority(stop, ctx.graph, config) {
        score -= config.high_priority_bonus;
    }

    score
}

/// Build the initial route. Ties go to the stop listed first.
pub fn construct_route(ctx: &RouteContext<'_>) -> Construction {
    let n = ctx.stops.len();
    let mut order: Vec<usize> = Vec::with_capacity(n);
    let mut placed = vec![false; n];
    let mut scheduled: HashSet<&str> = HashSet::with_capacity(n);
    let mut cursor = Cursor::at_home_base(ctx.departure);

    while order.len() < n {
        let mut best: Option<(f64, ScheduledVisit)> = None;

        for (i, stop) in ctx.stops.iter().enumerate() {
            if placed[i] || !ctx.graph.is_satisfied(&stop.task_id, &scheduled) {
                continue;
            }
            if !ctx.matrices.is_reachable(cursor.matrix_index, matrix_index(i)) {
                continue;
            }

            let candidate = visit(ctx, cursor, i);
            let score = candidate_score(ctx, &candidate);

            if best.as_ref().map_or(true, |(best_score, _)| score < *best_score) {
                best = Some((score, candidate));
            }
        }

        let Some((score, chosen)) = best else {
            warn!(
                "No eligible stop after {} of {} placed, ending route early",
                order.len(),
                n
            );
            break;
        };

        let stop = &ctx.stops[chosen.stop_index];
        debug!(
            "#{} task {} score={:.1} arrival={} lateness={}",
            order.len() + 1,
            stop.task_id,
            score,
            chosen.arrival.format("%H:%M"),
            chosen.lateness
        );

        placed[chosen.stop_index] = true;
        scheduled.insert(stop.task_id.as_str());
        cursor = Cursor {
            matrix_index: matrix_index(chosen.stop_index),
            time: chosen.departure(),
        };
        order.push(chosen.stop_index);
    }

    let unscheduled = (0..n)
        .filter(|&i| !placed[i])
        .map(|i| {
            let missing = ctx.graph.missing(&ctx.stops[i].task_id, &scheduled);
            let reason = if missing.is_empty() {
                UnscheduledReason::Unreachable
            } else {
                UnscheduledReason::DependencyNotSatisfied { missing }
            };
            (i, reason)
        })
        .collect();

    Construction { order, unscheduled }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::routing::{DistanceTimeMatrices, UNREACHABLE};
    use crate::services::sequencer::config::{DuplicateEquipmentPolicy, SequencerConfig};
    use crate::services::sequencer::dependency::DependencyGraph;
    use crate::services::sequencer::test_support::{at, drop_off, matrix_from_minutes, pick_up, uniform_matrix};
    use crate::types::Stop;

    fn construct(stops: &[Stop], matrices: &DistanceTimeMatrices, departure: chrono::NaiveDateTime) -> Construction {
        let graph = DependencyGraph::build(stops, DuplicateEquipmentPolicy::Reject).unwrap();
        let config = SequencerConfig::default();
        let ctx = RouteContext { stops, matrices, graph: &graph, departure, config: &config };
        construct_route(&ctx)
    }

    #[test]
    fn test_empty_input() {
        let result = construct(&[], &uniform_matrix(1, 0, 0), at(6, 30));
        assert!(result.order.is_empty());
        assert!(result.unscheduled.is_empty());
    }

    #[test]
    fn test_pickup_before_dependent_drop_off() {
        // Drop-off is 5 min from base, pickup 30 min: drive time alone would
        // pick the drop-off first.
        let stops = vec![
            drop_off("drop", Some("10:00"), &["E1"]),
            pick_up("pick", &["E1"]),
        ];
        let matrices = matrix_from_minutes(&[
            &[0, 5, 30],
            &[5, 0, 30],
            &[30, 30, 0],
        ]);

        let result = construct(&stops, &matrices, at(6, 30));
        assert_eq!(result.order, vec![1, 0]);
        assert!(result.unscheduled.is_empty());
    }

    #[test]
    fn test_early_event_goes_first() {
        let mut stops = vec![
            drop_off("late", Some("14:00"), &[]),
            drop_off("mid", Some("10:00"), &[]),
            drop_off("early", Some("08:00"), &[]),
        ];
        for stop in &mut stops {
            stop.unit_count = 3;
        }
        // "early" is slightly farther away than the others
        let matrices = matrix_from_minutes(&[
            &[0, 10, 10, 12],
            &[10, 0, 10, 10],
            &[10, 10, 0, 10],
            &[12, 10, 10, 0],
        ]);

        let result = construct(&stops, &matrices, at(6, 30));
        assert_eq!(result.order[0], 2);
        assert_eq!(result.order.len(), 3);
    }

    #[test]
    fn test_score_weights_lateness() {
        let stops = vec![drop_off("tight", Some("07:00"), &[])];
        let graph = DependencyGraph::default();
        let config = SequencerConfig::default();
        let matrices = uniform_matrix(2, 1_000, 600);
        let ctx = RouteContext { stops: &stops, matrices: &matrices, graph: &graph, departure: at(6, 45), config: &config };

        // arrive 06:55, setup until 07:15 → 15 late; early event → priority bonus
        let candidate = visit(&ctx, Cursor::at_home_base(ctx.departure), 0);
        assert_eq!(candidate.lateness, 15);
        assert!((candidate_score(&ctx, &candidate) - (10.0 + 1_500.0 - 1.0 - 50.0)).abs() < 1e-9);
    }

    #[test]
    fn test_ties_broken_by_input_order() {
        let stops = vec![
            drop_off("first", None, &[]),
            drop_off("second", None, &[]),
        ];
        let result = construct(&stops, &uniform_matrix(3, 1_000, 600), at(6, 30));
        assert_eq!(result.order, vec![0, 1]);
    }

    #[test]
    fn test_missing_dependency_left_unscheduled() {
        let mut blocked = drop_off("blocked", None, &[]);
        blocked.depends_on = vec!["ghost".to_string()];
        let stops = vec![drop_off("free", None, &[]), blocked];

        let result = construct(&stops, &uniform_matrix(3, 1_000, 600), at(6, 30));

        assert_eq!(result.order, vec![0]);
        assert_eq!(
            result.unscheduled,
            vec![(1, UnscheduledReason::DependencyNotSatisfied { missing: vec!["ghost".to_string()] })]
        );
    }

    #[test]
    fn test_cycle_left_unscheduled() {
        let mut a = drop_off("a", None, &[]);
        a.depends_on = vec!["b".to_string()];
        let mut b = drop_off("b", None, &[]);
        b.depends_on = vec!["a".to_string()];
        let stops = vec![a, b, drop_off("c", None, &[])];

        let result = construct(&stops, &uniform_matrix(4, 1_000, 600), at(6, 30));

        assert_eq!(result.order, vec![2]);
        assert_eq!(result.unscheduled.len(), 2);
    }

    #[test]
    fn test_unreachable_stop_left_unscheduled() {
        let stops = vec![drop_off("a", None, &[]), drop_off("island", None, &[])];
        let mut matrices = uniform_matrix(3, 1_000, 600);
        for from in 0..3 {
            matrices.durations[from][2] = UNREACHABLE;
            matrices.distances[from][2] = UNREACHABLE;
        }
        matrices.durations[2][2] = 0;
        matrices.distances[2][2] = 0;

        let result = construct(&stops, &matrices, at(6, 30));

        assert_eq!(result.order, vec![0]);
        assert_eq!(result.unscheduled, vec![(1, UnscheduledReason::Unreachable)]);
    }

    #[test]
    fn test_far_stops_get_bonus() {
        // Same drive from the current position, but "far" is farther from base.
        let stops = vec![drop_off("close", None, &[]), drop_off("far", None, &[])];
        let graph = DependencyGraph::default();
        let config = SequencerConfig::default();
        let matrices = matrix_from_minutes(&[
            &[0, 10, 100],
            &[10, 0, 20],
            &[100, 20, 0],
        ]);
        let ctx = RouteContext { stops: &stops, matrices: &matrices, graph: &graph, departure: at(6, 30), config: &config };
        let cursor = Cursor { matrix_index: 1, time: at(7, 0) };

        let far = visit(&ctx, cursor, 1);
        // 20 min drive − 100 × 0.1
        assert!((candidate_score(&ctx, &far) - 10.0).abs() < 1e-9);
    }
}
