//! Crossover operators.
//!
//! - [`selective_route_exchange`] — SREX: the offspring keeps most of the
//!   first parent's routes, adopts a block of the second parent's routes,
//!   and greedily reinserts whatever required clients fell through.
//! - [`order_crossover`] — OX over the giant-tour flattening, for
//!   single-vehicle-type instances whose parents use equally many routes.
//!
//! # Reference
//!
//! Nagata, Y., Bräysy, O. (2009). "Edge assembly-based memetic algorithm
//! for the capacitated vehicle routing problem", *Networks* 54(4), 205-215.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::evaluation::CostEvaluator;
use crate::local_search::route::{splice_cost, SearchRoute};
use crate::models::{ProblemData, Route, Solution};
use crate::Cost;

/// Selective route exchange of two parent solutions.
pub fn selective_route_exchange<R: Rng>(
    data: &ProblemData,
    ev: &CostEvaluator,
    parents: (&Solution, &Solution),
    rng: &mut R,
) -> Solution {
    let (p1, p2) = parents;
    if p1.num_routes() == 0 {
        return p2.clone();
    }
    if p2.num_routes() == 0 {
        return p1.clone();
    }

    let max_k = (p1.num_routes().min(p2.num_routes()) / 2).max(1);
    let k = rng.random_range(1..=max_k);
    let start1 = rng.random_range(0..p1.num_routes());
    let start2 = rng.random_range(0..p2.num_routes());

    // Clients and groups covered by the adopted block of p2's routes.
    let mut adopted = vec![false; data.num_locations()];
    let mut group_taken = vec![false; data.groups().len()];
    for i in 0..k {
        let route = &p2.routes()[(start2 + i) % p2.num_routes()];
        for client in route.clients() {
            adopted[client] = true;
            if let Some(g) = data.location(client).group() {
                group_taken[g] = true;
            }
        }
    }

    let mut removed1 = vec![false; p1.num_routes()];
    for i in 0..k {
        removed1[(start1 + i) % p1.num_routes()] = true;
    }

    let mut routes: Vec<(Vec<usize>, usize)> = Vec::new();
    for (idx, route) in p1.routes().iter().enumerate() {
        if removed1[idx] {
            continue;
        }
        let visits: Vec<usize> = route
            .visits()
            .iter()
            .copied()
            .filter(|&v| {
                v < data.num_depots()
                    || (!adopted[v]
                        && data.location(v).group().map_or(true, |g| !group_taken[g]))
            })
            .collect();
        routes.push((visits, route.vehicle_type()));
    }
    for i in 0..k {
        let route = &p2.routes()[(start2 + i) % p2.num_routes()];
        routes.push((route.visits().to_vec(), route.vehicle_type()));
    }

    repair_vehicle_usage(data, &mut routes);
    reinsert_missing(data, ev, &mut routes, rng);

    let built = routes
        .into_iter()
        .map(|(visits, vt)| Route::new(data, visits, vt))
        .collect();
    Solution::new(data, built)
}

/// Order crossover over the giant-tour flattening. The offspring reuses the
/// first parent's route sizes and vehicle types.
pub fn order_crossover<R: Rng>(
    data: &ProblemData,
    parents: (&Solution, &Solution),
    rng: &mut R,
) -> Solution {
    let (p1, p2) = parents;
    let tour1 = giant_tour(p1);
    if tour1.is_empty() {
        return p1.clone();
    }
    let tour2 = giant_tour(p2);

    let a = rng.random_range(0..tour1.len());
    let b = rng.random_range(0..tour1.len());
    let (lo, hi) = (a.min(b), a.max(b));

    let mut in_window = vec![false; data.num_locations()];
    for &c in &tour1[lo..=hi] {
        in_window[c] = true;
    }
    let mut in_tour1 = vec![false; data.num_locations()];
    for &c in &tour1 {
        in_tour1[c] = true;
    }

    // The remainder keeps p2's relative order; clients p2 does not serve
    // keep their p1 order at the end.
    let mut rest: Vec<usize> = tour2
        .iter()
        .copied()
        .filter(|&c| in_tour1[c] && !in_window[c])
        .collect();
    let mut in_rest = vec![false; data.num_locations()];
    for &c in &rest {
        in_rest[c] = true;
    }
    rest.extend(
        tour1
            .iter()
            .copied()
            .filter(|&c| !in_window[c] && !in_rest[c]),
    );

    let mut child = Vec::with_capacity(tour1.len());
    child.extend_from_slice(&rest[..lo]);
    child.extend_from_slice(&tour1[lo..=hi]);
    child.extend_from_slice(&rest[lo..]);

    let mut routes = Vec::with_capacity(p1.num_routes());
    let mut cursor = 0;
    for route in p1.routes() {
        let len = route.num_clients();
        routes.push(Route::new(
            data,
            child[cursor..cursor + len].to_vec(),
            route.vehicle_type(),
        ));
        cursor += len;
    }
    Solution::new(data, routes)
}

fn giant_tour(solution: &Solution) -> Vec<usize> {
    solution
        .routes()
        .iter()
        .flat_map(|r| r.clients())
        .collect()
}

/// Reassigns or drops routes so that no vehicle type is used more often
/// than its availability permits.
fn repair_vehicle_usage(data: &ProblemData, routes: &mut Vec<(Vec<usize>, usize)>) {
    let mut used = vec![0usize; data.num_vehicle_types()];
    let mut keep = Vec::with_capacity(routes.len());
    for (visits, vt) in routes.drain(..) {
        if used[vt] < data.vehicle_type(vt).num_available() {
            used[vt] += 1;
            keep.push((visits, vt));
            continue;
        }
        let fallback = (0..data.num_vehicle_types()).find(|&t| {
            used[t] < data.vehicle_type(t).num_available()
                && visits
                    .iter()
                    .filter(|&&v| v >= data.num_depots())
                    .all(|&v| data.location(v).allows_vehicle_type(t))
        });
        match fallback {
            Some(t) => {
                used[t] += 1;
                // Reload depots of the old type may be foreign to the new
                // one; keep clients only.
                let visits = visits
                    .into_iter()
                    .filter(|&v| v >= data.num_depots())
                    .collect();
                keep.push((visits, t));
            }
            None => {} // Clients fall through to reinsertion.
        }
    }
    *routes = keep;
}

/// Greedily inserts every required client that no route serves, at its
/// cheapest penalised position. Infeasible insertions are allowed. Each
/// route is mirrored into a cached search route once, so every slot is a
/// constant-time splice.
fn reinsert_missing<R: Rng>(
    data: &ProblemData,
    ev: &CostEvaluator,
    routes: &mut Vec<(Vec<usize>, usize)>,
    rng: &mut R,
) {
    let mut assigned = vec![false; data.num_locations()];
    for (visits, _) in routes.iter() {
        for &v in visits {
            if v >= data.num_depots() {
                assigned[v] = true;
            }
        }
    }
    let mut missing: Vec<usize> = data
        .clients()
        .filter(|&c| data.location(c).is_required() && !assigned[c])
        .collect();
    missing.shuffle(rng);
    if missing.is_empty() {
        return;
    }
    if routes.is_empty() {
        routes.push((Vec::new(), 0));
    }

    let mut mirrors: Vec<SearchRoute> = routes
        .iter()
        .map(|(visits, vt)| {
            let mut mirror = SearchRoute::new(data, *vt);
            mirror.set_visits(data, visits.clone());
            mirror
        })
        .collect();

    for client in missing {
        let mut best: Option<(Cost, usize, usize)> = None;
        for (r, mirror) in mirrors.iter().enumerate() {
            if !data.location(client).allows_vehicle_type(mirror.vehicle_type()) {
                continue;
            }
            let current = mirror.current_cost(data, ev);
            for slot in 0..mirror.len() - 1 {
                let delta =
                    splice_cost(data, ev, (mirror, slot), &[client], (mirror, slot + 1)) - current;
                if best.map_or(true, |(b, _, _)| delta < b) {
                    best = Some((delta, r, slot));
                }
            }
        }
        if let Some((_, r, slot)) = best {
            routes[r].0.insert(slot, client);
            mirrors[r].set_visits(data, routes[r].0.clone());
        }
    }
}
