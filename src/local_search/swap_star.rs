//! Swap* and Relocate*: best-position moves between a pair of routes.
//!
//! Swap* exchanges one client from each route, reinserting each at its best
//! position in the other route rather than in the vacated slot. Candidate
//! positions are preselected by distance delta (three best per client and
//! route, plus the vacated slot) and the winning pair is re-evaluated
//! exactly against the segment caches before it is accepted.
//!
//! # Reference
//!
//! Vidal, T. (2022). "Hybrid genetic search for the CVRP: Open-source
//! implementation and SWAP* neighborhood", *Computers & Operations
//! Research* 140, 105643.

use crate::evaluation::CostEvaluator;
use crate::local_search::route::{splice_cost, SearchRoute};
use crate::models::ProblemData;
use crate::Cost;

/// An accepted route-pair move: the new interior visit sequences and the
/// exact penalised-cost delta.
pub(crate) struct PairMove {
    pub delta: Cost,
    pub visits_u: Vec<usize>,
    pub visits_v: Vec<usize>,
}

/// The three cheapest insertion slots of a client into a route, by distance
/// delta. Slots are node positions: inserting after `pos` places the client
/// between `nodes[pos]` and `nodes[pos + 1]`.
fn three_best_slots(
    data: &ProblemData,
    route: &SearchRoute,
    client: usize,
) -> [(Cost, usize); 3] {
    let vt = data.vehicle_type(route.vehicle_type());
    let dist = data.distance_matrix(vt.profile());
    let mut best = [(Cost::MAX, usize::MAX); 3];
    for pos in 0..route.len() - 1 {
        let (a, b) = (route.nodes()[pos], route.nodes()[pos + 1]);
        let delta = dist.get(a, client) + dist.get(client, b) - dist.get(a, b);
        if delta < best[2].0 {
            best[2] = (delta, pos);
            if best[2].0 < best[1].0 {
                best.swap(1, 2);
            }
            if best[1].0 < best[0].0 {
                best.swap(0, 1);
            }
        }
    }
    best
}

/// Distance saved by removing the client at node position `pos`.
fn removal_gain(data: &ProblemData, route: &SearchRoute, pos: usize) -> Cost {
    let vt = data.vehicle_type(route.vehicle_type());
    let dist = data.distance_matrix(vt.profile());
    let nodes = route.nodes();
    let (prev, cur, next) = (nodes[pos - 1], nodes[pos], nodes[pos + 1]);
    dist.get(prev, next) - dist.get(prev, cur) - dist.get(cur, next)
}

/// Client node positions of a route.
fn client_positions(data: &ProblemData, route: &SearchRoute) -> Vec<usize> {
    (1..route.len() - 1)
        .filter(|&pos| route.nodes()[pos] >= data.num_depots())
        .collect()
}

/// Exact cost of the cached route with the client at `remove_pos` taken out
/// and `client` inserted after node position `slot`, as one splice. The
/// nodes between the two edit points ride along in the mid piece.
fn replace_cost(
    data: &ProblemData,
    ev: &CostEvaluator,
    route: &SearchRoute,
    remove_pos: usize,
    client: usize,
    slot: usize,
) -> Cost {
    let nodes = route.nodes();
    if slot + 1 == remove_pos || slot == remove_pos {
        // In place of the removed client.
        splice_cost(data, ev, (route, remove_pos - 1), &[client], (route, remove_pos + 1))
    } else if slot < remove_pos {
        let mut mid = vec![client];
        mid.extend_from_slice(&nodes[slot + 1..remove_pos]);
        splice_cost(data, ev, (route, slot), &mid, (route, remove_pos + 1))
    } else {
        let mut mid = nodes[remove_pos + 1..slot + 1].to_vec();
        mid.push(client);
        splice_cost(data, ev, (route, remove_pos - 1), &mid, (route, slot + 1))
    }
}

/// The interior visit sequence matching [`replace_cost`].
fn replaced_visits(
    route: &SearchRoute,
    remove_pos: usize,
    client: usize,
    slot: usize,
) -> Vec<usize> {
    let mut visits = route.visits().to_vec();
    visits.remove(remove_pos - 1);
    let idx = if slot < remove_pos { slot } else { slot - 1 };
    visits.insert(idx.min(visits.len()), client);
    visits
}

/// The vacated slot plus the usable preselected slots.
fn candidate_slots(slots: &[(Cost, usize)], remove_pos: usize) -> Vec<usize> {
    let mut out = vec![remove_pos];
    for &(cost, slot) in slots {
        if cost < Cost::MAX && !out.contains(&slot) {
            out.push(slot);
        }
    }
    out
}

/// Best Swap* move between two routes, if any improving one exists.
pub(crate) fn swap_star(
    data: &ProblemData,
    ev: &CostEvaluator,
    r1: &SearchRoute,
    r2: &SearchRoute,
) -> Option<PairMove> {
    let old = r1.current_cost(data, ev) + r2.current_cost(data, ev);

    let positions1 = client_positions(data, r1);
    let positions2 = client_positions(data, r2);
    if positions1.is_empty() || positions2.is_empty() {
        return None;
    }

    // Preselect the most promising pair by distance deltas alone.
    let mut best_pair = None;
    let mut best_estimate = 0;
    for &pu in &positions1 {
        let u = r1.nodes()[pu];
        if !allowed(data, u, r2.vehicle_type()) {
            continue;
        }
        let slots_u = three_best_slots(data, r2, u);
        for &pv in &positions2 {
            let v = r2.nodes()[pv];
            if !allowed(data, v, r1.vehicle_type()) {
                continue;
            }
            let slots_v = three_best_slots(data, r1, v);
            let estimate = removal_gain(data, r1, pu)
                + removal_gain(data, r2, pv)
                + slot_estimate(&slots_u, pv)
                + slot_estimate(&slots_v, pu);
            if estimate < best_estimate {
                best_estimate = estimate;
                best_pair = Some((pu, pv, slots_u, slots_v));
            }
        }
    }

    let (pu, pv, slots_u, slots_v) = best_pair?;
    let u = r1.nodes()[pu];
    let v = r2.nodes()[pv];

    let best_replace = |route: &SearchRoute, remove_pos, client, slots: &[(Cost, usize)]| {
        candidate_slots(slots, remove_pos)
            .into_iter()
            .map(|slot| (replace_cost(data, ev, route, remove_pos, client, slot), slot))
            .min()
            .expect("the vacated slot is always a candidate")
    };
    let (cost1, slot1) = best_replace(r1, pu, v, &slots_v);
    let (cost2, slot2) = best_replace(r2, pv, u, &slots_u);

    let delta = cost1 + cost2 - old;
    (delta < 0).then(|| PairMove {
        delta,
        visits_u: replaced_visits(r1, pu, v, slot1),
        visits_v: replaced_visits(r2, pv, u, slot2),
    })
}

/// Best Relocate* move: the cheapest relocation of any client of `r1` into
/// one of its three best slots of `r2`, if improving.
pub(crate) fn relocate_star(
    data: &ProblemData,
    ev: &CostEvaluator,
    r1: &SearchRoute,
    r2: &SearchRoute,
) -> Option<PairMove> {
    let old = r1.current_cost(data, ev) + r2.current_cost(data, ev);
    let mut best: Option<(Cost, usize, usize)> = None;

    for pu in client_positions(data, r1) {
        let u = r1.nodes()[pu];
        if !allowed(data, u, r2.vehicle_type()) {
            continue;
        }
        let cost1 = splice_cost(data, ev, (r1, pu - 1), &[], (r1, pu + 1));
        for &(slot_cost, slot) in &three_best_slots(data, r2, u) {
            if slot_cost == Cost::MAX {
                continue;
            }
            let cost2 = splice_cost(data, ev, (r2, slot), &[u], (r2, slot + 1));
            let delta = cost1 + cost2 - old;
            if delta < 0 && best.map_or(true, |(b, _, _)| delta < b) {
                best = Some((delta, pu, slot));
            }
        }
    }

    best.map(|(delta, pu, slot)| {
        let mut visits_u = r1.visits().to_vec();
        visits_u.remove(pu - 1);
        let mut visits_v = r2.visits().to_vec();
        visits_v.insert(slot, r1.nodes()[pu]);
        PairMove {
            delta,
            visits_u,
            visits_v,
        }
    })
}

fn allowed(data: &ProblemData, client: usize, vehicle_type: usize) -> bool {
    !data.has_vehicle_restrictions() || data.location(client).allows_vehicle_type(vehicle_type)
}

/// Cheapest preselected slot that does not touch the removed node position.
fn slot_estimate(slots: &[(Cost, usize)], removed_pos: usize) -> Cost {
    slots
        .iter()
        .filter(|&&(cost, pos)| cost < Cost::MAX && pos != removed_pos && pos + 1 != removed_pos)
        .map(|&(cost, _)| cost)
        .next()
        .unwrap_or(slots[0].0.min(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Matrix;
    use crate::local_search::route::sequence_cost;
    use crate::models::{Location, ProblemData, VehicleType};

    fn setup() -> (ProblemData, CostEvaluator) {
        let locations = vec![
            Location::depot(0, 0),
            Location::client(1, 0).with_delivery(vec![2]),
            Location::client(2, 0).with_delivery(vec![2]),
            Location::client(10, 0).with_delivery(vec![2]),
            Location::client(11, 0).with_delivery(vec![2]),
        ];
        let m = Matrix::from_fn(5, |i, j| {
            (locations_x(i) - locations_x(j)).abs()
        });
        let data = ProblemData::new(
            locations,
            1,
            vec![VehicleType::new(2, vec![20])],
            vec![m.clone()],
            vec![m],
            vec![],
        )
        .expect("valid instance");
        (data, CostEvaluator::new(vec![10], 10, 10, 10))
    }

    fn locations_x(i: usize) -> i64 {
        [0, 1, 2, 10, 11][i]
    }

    #[test]
    fn test_three_best_slots_ordering() {
        let (data, _) = setup();
        let mut route = SearchRoute::new(&data, 0);
        route.set_visits(&data, vec![1, 3]);
        let slots = three_best_slots(&data, &route, 2);
        // Inserting 2 after client 1 (pos 1) is free on the line.
        assert_eq!(slots[0].1, 1);
        assert_eq!(slots[0].0, 0);
        assert!(slots[0].0 <= slots[1].0 && slots[1].0 <= slots[2].0);
    }

    #[test]
    fn test_replace_cost_matches_rebuild() {
        let (data, ev) = setup();
        let mut route = SearchRoute::new(&data, 0);
        route.set_visits(&data, vec![1, 3, 2]);
        // Remove client 3 (pos 2) and try every slot for client 4.
        for slot in 0..route.len() - 1 {
            let got = replace_cost(&data, &ev, &route, 2, 4, slot);
            let visits = replaced_visits(&route, 2, 4, slot);
            assert_eq!(got, sequence_cost(&data, &ev, 0, &visits), "slot {slot}");
        }
    }

    #[test]
    fn test_swap_star_untangles_routes() {
        let (data, ev) = setup();
        // Route 0 holds one far client, route 1 the mirror arrangement.
        let mut r1 = SearchRoute::new(&data, 0);
        r1.set_visits(&data, vec![1, 11]);
        let mut r2 = SearchRoute::new(&data, 0);
        r2.set_visits(&data, vec![10, 2]);
        let mv = swap_star(&data, &ev, &r1, &r2).expect("improving move");
        assert!(mv.delta < 0);
        let total_new = sequence_cost(&data, &ev, 0, &mv.visits_u)
            + sequence_cost(&data, &ev, 0, &mv.visits_v);
        let total_old = r1.current_cost(&data, &ev) + r2.current_cost(&data, &ev);
        assert_eq!(mv.delta, total_new - total_old);
    }

    #[test]
    fn test_swap_star_no_move_on_separated_routes() {
        let (data, ev) = setup();
        let mut r1 = SearchRoute::new(&data, 0);
        r1.set_visits(&data, vec![1, 2]);
        let mut r2 = SearchRoute::new(&data, 0);
        r2.set_visits(&data, vec![10, 11]);
        assert!(swap_star(&data, &ev, &r1, &r2).is_none());
    }

    #[test]
    fn test_relocate_star_moves_misplaced_client() {
        let (data, ev) = setup();
        let mut r1 = SearchRoute::new(&data, 0);
        r1.set_visits(&data, vec![1, 10, 2]);
        let mut r2 = SearchRoute::new(&data, 0);
        r2.set_visits(&data, vec![11]);
        let mv = relocate_star(&data, &ev, &r1, &r2).expect("improving move");
        assert!(mv.delta < 0);
        assert_eq!(mv.visits_u, vec![1, 2]);
        assert!(mv.visits_v.contains(&10));
        let total_new = sequence_cost(&data, &ev, 0, &mv.visits_u)
            + sequence_cost(&data, &ev, 0, &mv.visits_v);
        let total_old = r1.current_cost(&data, &ev) + r2.current_cost(&data, &ev);
        assert_eq!(mv.delta, total_new - total_old);
    }

    #[test]
    fn test_relocate_star_empty_target() {
        let (data, ev) = setup();
        let mut r1 = SearchRoute::new(&data, 0);
        r1.set_visits(&data, vec![1, 2, 10, 11]);
        let r2 = SearchRoute::new(&data, 0);
        // Relocating into an empty route is possible when it pays off; on
        // this line instance it does not (no penalties are active).
        assert!(relocate_star(&data, &ev, &r1, &r2).is_none());
    }
}
