//! Reload-depot operators.
//!
//! For vehicle types that may reload, these moves insert a reload depot
//! between two visits (resetting the carried load and starting a new trip)
//! or drop an existing reload visit. Relocating a reload emerges from a
//! removal followed by an insertion in later passes.

use crate::evaluation::CostEvaluator;
use crate::local_search::route::{splice_cost, SearchRoute};
use crate::models::ProblemData;
use crate::Cost;

/// First improving reload insertion or removal on this route, as the new
/// interior visit sequence and its exact delta.
pub(crate) fn improve_reloads(
    data: &ProblemData,
    ev: &CostEvaluator,
    route: &SearchRoute,
) -> Option<(Cost, Vec<usize>)> {
    let vt = data.vehicle_type(route.vehicle_type());
    if vt.max_reloads() == 0 && route.num_reloads() == 0 {
        return None;
    }
    let current = route.current_cost(data, ev);
    let n = route.len();

    // Drop existing reloads that no longer pay for themselves.
    for pos in 1..n - 1 {
        if route.nodes()[pos] < data.num_depots() {
            let new = splice_cost(data, ev, (route, pos - 1), &[], (route, pos + 1));
            if new < current {
                let mut visits = route.visits().to_vec();
                visits.remove(pos - 1);
                return Some((new - current, visits));
            }
        }
    }

    // Insert a reload between two consecutive visits.
    if route.num_reloads() < vt.max_reloads() {
        for &depot in vt.reload_depots() {
            for pos in 1..n - 1 {
                let new = splice_cost(data, ev, (route, pos), &[depot], (route, pos + 1));
                if new < current {
                    let mut visits = route.visits().to_vec();
                    visits.insert(pos, depot);
                    return Some((new - current, visits));
                }
            }
        }
    }
    None
}
