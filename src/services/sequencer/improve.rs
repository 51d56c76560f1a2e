//! Adjacent-swap local search.
//!
//! Each pass tries swapping every neighbouring pair and keeps a swap only if
//! the whole route gets strictly cheaper. Stops when a full pass changes
//! nothing. This finds a local optimum for the swap neighbourhood only.

use tracing::{debug, warn};

use super::schedule::{route_cost, RouteContext};

/// Cost differences below this are treated as equal
const COST_EPSILON: f64 = 1e-9;

/// Outcome of the local search
#[derive(Debug, Clone, PartialEq)]
pub struct Improvement {
    pub order: Vec<usize>,
    pub initial_cost: f64,
    pub final_cost: f64,
    pub swaps: usize,
    pub passes: usize,
}

/// True when `second` may be moved in front of `first`
fn can_swap(ctx: &RouteContext<'_>, first: usize, second: usize) -> bool {
    !ctx.graph.requires(&ctx.stops[second].task_id, &ctx.stops[first].task_id)
}

/// Improve `order` by adjacent swaps until no swap helps
pub fn improve_route(ctx: &RouteContext<'_>, mut order: Vec<usize>) -> Improvement {
    let initial_cost = route_cost(ctx, &order);
    let mut current_cost = initial_cost;
    let mut swaps = 0;
    let mut passes = 0;

    if order.len() >= 2 {
        loop {
            if passes >= ctx.config.max_improvement_passes {
                warn!("Local search stopped after {} passes without converging", passes);
                break;
            }
            passes += 1;

            let mut improved = false;
            for i in 0..order.len() - 1 {
                if !can_swap(ctx, order[i], order[i + 1]) {
                    continue;
                }

                order.swap(i, i + 1);
                let cost = route_cost(ctx, &order);
                if cost < current_cost - COST_EPSILON {
                    debug!(
                        "Swap at {} improved cost {:.1} -> {:.1}",
                        i, current_cost, cost
                    );
                    current_cost = cost;
                    swaps += 1;
                    improved = true;
                } else {
                    order.swap(i, i + 1);
                }
            }

            if !improved {
                break;
            }
        }
    }

    Improvement {
        order,
        initial_cost,
        final_cost: current_cost,
        swaps,
        passes,
    }
}
