//! Granular neighbourhood descent.
//!
//! The engine loads a [`Solution`] into mutable routes with cumulative
//! segment caches, then repeatedly sweeps all clients in random order. For
//! each client `u` and each `v` in its granular neighbour list it probes,
//! in a fixed order, the node exchange operators, the 2-opt family, and,
//! per route pair once the node sweep settles, Swap*, Relocate*, and the
//! reload moves. Depending on the [`SearchMode`], either the first strictly
//! improving move around the client is applied, or the whole sweep runs and
//! the best one is; the descent stops at a fixed point either way.
//!
//! Optional clients are inserted or removed whenever the prize balance pays
//! for it; required clients are never removed.

mod exchange;
mod neighbours;
mod reload;
pub(crate) mod route;
mod swap_star;
mod two_opt;

pub use neighbours::{compute_neighbours, NeighbourhoodParams};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::evaluation::CostEvaluator;
use crate::local_search::exchange::{NodeOp, NODE_OPS};
use crate::local_search::reload::improve_reloads;
use crate::local_search::route::{splice_cost, SearchRoute};
use crate::local_search::swap_star::{relocate_star, swap_star, PairMove};
use crate::local_search::two_opt::{
    apply_two_opt_within, evaluate_two_opt_tails, evaluate_two_opt_within, tails_visits,
};
use crate::models::{ProblemData, Route, Solution};
use crate::Cost;

/// How the sweep around a client picks among improving moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    /// Apply the first strictly improving move found.
    #[default]
    FirstImprovement,
    /// Evaluate every candidate move around the client, apply the best.
    BestImprovement,
}

/// A candidate move around some client, recorded during a best-improvement
/// sweep and applied afterwards.
enum CandidateMove {
    Node(NodeOp, (usize, usize)),
    TwoOptWithin(usize, usize),
    TwoOptTails(usize, usize),
}

/// Descent engine over a bounded neighbourhood.
///
/// One instance is reused across all education calls of a solver run; it
/// owns the neighbour lists and the per-vehicle route buffers.
pub struct LocalSearch {
    neighbours: Vec<Vec<usize>>,
    mode: SearchMode,
    routes: Vec<SearchRoute>,
    /// Client location -> (route index, node position), `None` if unassigned.
    positions: Vec<Option<(usize, usize)>>,
    order: Vec<usize>,
    last_modified: Vec<u64>,
    last_tested: Vec<u64>,
    counter: u64,
}

impl LocalSearch {
    /// Creates an engine over the given neighbour lists, in
    /// first-improvement mode.
    pub fn new(data: &ProblemData, neighbours: Vec<Vec<usize>>) -> Self {
        Self {
            neighbours,
            mode: SearchMode::default(),
            routes: Vec::new(),
            positions: vec![None; data.num_locations()],
            order: data.clients().collect(),
            last_modified: Vec::new(),
            last_tested: vec![0; data.num_locations()],
            counter: 1,
        }
    }

    /// Selects how the sweep picks among improving moves.
    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Runs the descent on `solution` under the given evaluator and returns
    /// the locally optimal result.
    pub fn search<R: Rng>(
        &mut self,
        data: &ProblemData,
        solution: &Solution,
        ev: &CostEvaluator,
        rng: &mut R,
    ) -> Solution {
        self.load(data, solution);
        loop {
            let mut improved = false;
            self.order.shuffle(rng);
            let order = self.order.clone();
            for &u in &order {
                while self.improve_client(data, ev, u) {
                    improved = true;
                }
            }
            if self.improve_route_pairs(data, ev) {
                improved = true;
            }
            if !improved {
                break;
            }
        }
        self.export(data)
    }

    fn load(&mut self, data: &ProblemData, solution: &Solution) {
        self.routes.clear();
        let mut slots: Vec<Vec<usize>> = vec![Vec::new(); data.num_vehicle_types()];
        for (t, vt) in data.vehicle_types().iter().enumerate() {
            for _ in 0..vt.num_available() {
                slots[t].push(self.routes.len());
                self.routes.push(SearchRoute::new(data, t));
            }
        }

        let mut next_slot = vec![0; data.num_vehicle_types()];
        for route in solution.routes() {
            let t = route.vehicle_type();
            let slot = slots[t][next_slot[t]];
            next_slot[t] += 1;
            self.routes[slot].set_visits(data, route.visits().to_vec());
        }

        self.positions = vec![None; data.num_locations()];
        for idx in 0..self.routes.len() {
            self.sync_positions(data, idx);
        }
        self.counter = 1;
        self.last_modified = vec![1; self.routes.len()];
        self.last_tested = vec![0; data.num_locations()];
    }

    fn sync_positions(&mut self, data: &ProblemData, route_idx: usize) {
        let nodes: Vec<usize> = self.routes[route_idx].nodes().to_vec();
        for (pos, &node) in nodes.iter().enumerate().skip(1).take(nodes.len() - 2) {
            if node >= data.num_depots() {
                self.positions[node] = Some((route_idx, pos));
            }
        }
    }

    fn after_move(&mut self, data: &ProblemData, touched: &[usize]) {
        self.counter += 1;
        for &r in touched {
            self.last_modified[r] = self.counter;
            self.sync_positions(data, r);
        }
    }

    /// Probes all moves around client `u`; applies the first or the best
    /// improvement, per the configured [`SearchMode`].
    fn improve_client(&mut self, data: &ProblemData, ev: &CostEvaluator, u: usize) -> bool {
        let Some((ru, pu)) = self.positions[u] else {
            return self.try_insert(data, ev, u);
        };

        if !data.location(u).is_required() && self.try_remove(data, ev, u, ru, pu) {
            return true;
        }

        let mode = self.mode;
        let mut best: Option<(Cost, CandidateMove)> = None;
        let found = move |best: &mut Option<(Cost, CandidateMove)>, delta, mv| {
            if best.as_ref().map_or(true, |&(b, _)| delta < b) {
                *best = Some((delta, mv));
            }
            // First-improvement stops the sweep at the first hit.
            mode == SearchMode::FirstImprovement
        };

        let neighbours = self.neighbours[u].clone();
        'sweep: for v in neighbours {
            let Some((rv, pv)) = self.positions[v] else {
                continue;
            };
            if self.last_tested[u] > self.last_modified[ru].max(self.last_modified[rv]) {
                continue;
            }

            for op in NODE_OPS {
                if let Some(delta) = op.evaluate(data, ev, &self.routes, (ru, pu), (rv, pv)) {
                    if delta < 0 && found(&mut best, delta, CandidateMove::Node(op, (rv, pv))) {
                        break 'sweep;
                    }
                }
            }

            if ru == rv {
                let (i, j) = (pu.min(pv), pu.max(pv));
                if let Some(delta) = evaluate_two_opt_within(data, ev, &self.routes[ru], i, j) {
                    if delta < 0 && found(&mut best, delta, CandidateMove::TwoOptWithin(i, j)) {
                        break 'sweep;
                    }
                }
            } else if let Some(delta) =
                evaluate_two_opt_tails(data, ev, &self.routes[ru], pu, &self.routes[rv], pv)
            {
                if delta < 0 && found(&mut best, delta, CandidateMove::TwoOptTails(rv, pv)) {
                    break 'sweep;
                }
            }
        }

        if let Some((_, mv)) = best {
            self.apply_candidate(data, (ru, pu), mv);
            return true;
        }

        if self.try_relocate_to_empty(data, ev, u, ru, pu) {
            return true;
        }

        self.last_tested[u] = self.counter;
        false
    }

    fn apply_candidate(&mut self, data: &ProblemData, u: (usize, usize), mv: CandidateMove) {
        let (ru, pu) = u;
        match mv {
            CandidateMove::Node(op, v) => {
                op.apply(data, &mut self.routes, (ru, pu), v);
                self.after_move(data, &[ru, v.0]);
            }
            CandidateMove::TwoOptWithin(i, j) => {
                apply_two_opt_within(data, &mut self.routes[ru], i, j);
                self.after_move(data, &[ru]);
            }
            CandidateMove::TwoOptTails(rv, pv) => {
                let (v1, v2) = tails_visits(&self.routes[ru], pu, &self.routes[rv], pv);
                self.routes[ru].set_visits(data, v1);
                self.routes[rv].set_visits(data, v2);
                self.after_move(data, &[ru, rv]);
            }
        }
    }

    /// Tries to insert the unassigned client `u` next to one of its
    /// neighbours or into an empty route. Required clients are inserted at
    /// the best candidate position regardless of cost.
    fn try_insert(&mut self, data: &ProblemData, ev: &CostEvaluator, u: usize) -> bool {
        let loc = data.location(u);
        if let Some(g) = loc.group() {
            let taken = data.groups()[g]
                .clients()
                .iter()
                .any(|&c| self.positions[c].is_some());
            if taken {
                return false;
            }
        }

        let mut best: Option<(Cost, usize, usize)> = None;
        let mut consider = |delta: Cost, route: usize, insert_at: usize| {
            if best.map_or(true, |(b, _, _)| delta < b) {
                best = Some((delta, route, insert_at));
            }
        };

        for &v in &self.neighbours[u] {
            let Some((rv, pv)) = self.positions[v] else {
                continue;
            };
            let r = &self.routes[rv];
            if !loc.allows_vehicle_type(r.vehicle_type()) {
                continue;
            }
            let new = splice_cost(data, ev, (r, pv), &[u], (r, pv + 1));
            consider(new - r.current_cost(data, ev) - loc.prize(), rv, pv);
        }
        for idx in self.empty_route_candidates(data, u) {
            let r = &self.routes[idx];
            let new = splice_cost(data, ev, (r, 0), &[u], (r, 1));
            consider(new - r.current_cost(data, ev) - loc.prize(), idx, 0);
        }

        match best {
            Some((delta, route, insert_at)) if delta < 0 || loc.is_required() => {
                let mut visits = self.routes[route].visits().to_vec();
                visits.insert(insert_at, u);
                self.routes[route].set_visits(data, visits);
                self.after_move(data, &[route]);
                true
            }
            _ => false,
        }
    }

    /// Tries to drop the optional client `u` when the saved travel exceeds
    /// its prize.
    fn try_remove(
        &mut self,
        data: &ProblemData,
        ev: &CostEvaluator,
        u: usize,
        ru: usize,
        pu: usize,
    ) -> bool {
        let r = &self.routes[ru];
        let new = splice_cost(data, ev, (r, pu - 1), &[], (r, pu + 1));
        let delta = new - r.current_cost(data, ev) + data.location(u).prize();
        if delta < 0 {
            let mut visits = r.visits().to_vec();
            visits.remove(pu - 1);
            self.routes[ru].set_visits(data, visits);
            self.positions[u] = None;
            self.after_move(data, &[ru]);
            return true;
        }
        false
    }

    /// Tries to relocate `u` into the first empty route of each vehicle
    /// type, opening a new vehicle when that pays off.
    fn try_relocate_to_empty(
        &mut self,
        data: &ProblemData,
        ev: &CostEvaluator,
        u: usize,
        ru: usize,
        pu: usize,
    ) -> bool {
        for idx in self.empty_route_candidates(data, u) {
            if idx == ru {
                continue;
            }
            let (r1, r2) = (&self.routes[ru], &self.routes[idx]);
            let new1 = splice_cost(data, ev, (r1, pu - 1), &[], (r1, pu + 1));
            let new2 = splice_cost(data, ev, (r2, 0), &[u], (r2, 1));
            let delta =
                new1 + new2 - r1.current_cost(data, ev) - r2.current_cost(data, ev);
            if delta < 0 {
                let mut v1 = self.routes[ru].visits().to_vec();
                v1.remove(pu - 1);
                self.routes[ru].set_visits(data, v1);
                self.routes[idx].set_visits(data, vec![u]);
                self.after_move(data, &[ru, idx]);
                return true;
            }
        }
        false
    }

    /// The first empty route of each vehicle type that may serve `u`.
    fn empty_route_candidates(&self, data: &ProblemData, u: usize) -> Vec<usize> {
        let loc = data.location(u);
        let mut seen = vec![false; data.num_vehicle_types()];
        let mut out = Vec::new();
        for (idx, r) in self.routes.iter().enumerate() {
            let t = r.vehicle_type();
            if r.num_clients() == 0 && !seen[t] && loc.allows_vehicle_type(t) {
                seen[t] = true;
                out.push(idx);
            }
        }
        out
    }

    /// Swap*, Relocate*, and reload moves over overlapping route pairs.
    fn improve_route_pairs(&mut self, data: &ProblemData, ev: &CostEvaluator) -> bool {
        let mut improved = false;
        let active: Vec<usize> = (0..self.routes.len())
            .filter(|&r| self.routes[r].num_clients() > 0)
            .collect();

        for (i, &a) in active.iter().enumerate() {
            for &b in &active[i + 1..] {
                if !self.pair_overlaps(a, b) {
                    continue;
                }
                if let Some(mv) = relocate_star(data, ev, &self.routes[a], &self.routes[b]) {
                    self.apply_pair_move(data, a, b, mv);
                    improved = true;
                    continue;
                }
                if let Some(mv) = relocate_star(data, ev, &self.routes[b], &self.routes[a]) {
                    self.apply_pair_move(data, b, a, mv);
                    improved = true;
                    continue;
                }
                if let Some(mv) = swap_star(data, ev, &self.routes[a], &self.routes[b]) {
                    self.apply_pair_move(data, a, b, mv);
                    improved = true;
                }
            }
        }

        for idx in 0..self.routes.len() {
            while let Some((_, visits)) = improve_reloads(data, ev, &self.routes[idx]) {
                self.routes[idx].set_visits(data, visits);
                self.after_move(data, &[idx]);
                improved = true;
            }
        }
        improved
    }

    fn apply_pair_move(&mut self, data: &ProblemData, a: usize, b: usize, mv: PairMove) {
        self.routes[a].set_visits(data, mv.visits_u);
        self.routes[b].set_visits(data, mv.visits_v);
        // Clients may have left either route entirely; recompute from scratch.
        for c in data.clients() {
            if let Some((r, _)) = self.positions[c] {
                if r == a || r == b {
                    self.positions[c] = None;
                }
            }
        }
        self.after_move(data, &[a, b]);
    }

    /// Whether some client of route `a` lists a client of route `b` among
    /// its neighbours (or vice versa).
    fn pair_overlaps(&self, a: usize, b: usize) -> bool {
        let on_route = |r: usize, c: usize| matches!(self.positions[c], Some((rr, _)) if rr == r);
        self.routes[a]
            .visits()
            .iter()
            .any(|&u| {
                u < self.neighbours.len()
                    && self.neighbours[u].iter().any(|&v| on_route(b, v))
            })
            || self.routes[b]
                .visits()
                .iter()
                .any(|&u| {
                    u < self.neighbours.len()
                        && self.neighbours[u].iter().any(|&v| on_route(a, v))
                })
    }

    fn export(&self, data: &ProblemData) -> Solution {
        let routes = self
            .routes
            .iter()
            .filter(|r| r.num_clients() > 0)
            .map(|r| Route::new(data, r.visits().to_vec(), r.vehicle_type()))
            .collect();
        Solution::new(data, routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Matrix;
    use crate::models::{Location, VehicleType};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn line_data(num_vehicles: usize, capacity: i64) -> ProblemData {
        let locations = vec![
            Location::depot(0, 0),
            Location::client(1, 0).with_delivery(vec![4]),
            Location::client(2, 0).with_delivery(vec![3]),
            Location::client(3, 0).with_delivery(vec![5]),
            Location::client(4, 0).with_delivery(vec![2]),
        ];
        let m = Matrix::from_fn(5, |i, j| (i as i64 - j as i64).abs());
        ProblemData::new(
            locations,
            1,
            vec![VehicleType::new(num_vehicles, vec![capacity])],
            vec![m.clone()],
            vec![m],
            vec![],
        )
        .expect("valid instance")
    }

    fn engine(data: &ProblemData) -> LocalSearch {
        LocalSearch::new(data, compute_neighbours(data, &NeighbourhoodParams::default()))
    }

    #[test]
    fn test_descent_reaches_line_optimum() {
        let data = line_data(1, 20);
        let ev = CostEvaluator::new(vec![20], 6, 6, 6);
        let mut ls = engine(&data);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let start = Solution::new(
            &data,
            vec![Route::new(&data, vec![3, 1, 4, 2], 0)],
        );
        let result = ls.search(&data, &start, &ev, &mut rng);
        // On a line the optimum visits clients in coordinate order.
        assert_eq!(result.distance(), 8);
        assert!(result.is_feasible());
    }

    #[test]
    fn test_best_improvement_reaches_line_optimum() {
        let data = line_data(1, 20);
        let ev = CostEvaluator::new(vec![20], 6, 6, 6);
        let mut ls = engine(&data).with_mode(SearchMode::BestImprovement);
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let start = Solution::new(
            &data,
            vec![Route::new(&data, vec![3, 1, 4, 2], 0)],
        );
        let result = ls.search(&data, &start, &ev, &mut rng);
        assert_eq!(result.distance(), 8);
        assert!(result.is_feasible());
    }

    #[test]
    fn test_descent_is_idempotent() {
        let data = line_data(2, 10);
        let ev = CostEvaluator::new(vec![20], 6, 6, 6);
        let mut ls = engine(&data);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let start = Solution::random(&data, &mut rng);
        let once = ls.search(&data, &start, &ev, &mut rng);
        let twice = ls.search(&data, &once, &ev, &mut rng);
        assert_eq!(ev.penalised_cost(&once), ev.penalised_cost(&twice));
        assert_eq!(once.broken_pairs_distance(&twice), 0.0);
    }

    #[test]
    fn test_capacity_split_over_vehicles() {
        let data = line_data(2, 8);
        let ev = CostEvaluator::new(vec![100], 6, 6, 6);
        let mut ls = engine(&data);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        // All demand (14) on one vehicle overloads it; the descent must
        // split the clients over both vehicles.
        let start = Solution::new(
            &data,
            vec![Route::new(&data, vec![1, 2, 3, 4], 0)],
        );
        let result = ls.search(&data, &start, &ev, &mut rng);
        assert!(result.excess_load().iter().all(|&e| e == 0));
        assert_eq!(result.num_routes(), 2);
    }

    #[test]
    fn test_unprofitable_optional_client_dropped() {
        let locations = vec![
            Location::depot(0, 0),
            Location::client(1, 0).with_prize(100).with_required(false),
            Location::client(50, 0).with_prize(3).with_required(false),
        ];
        let m = Matrix::from_fn(3, |i, j| {
            let xs = [0i64, 1, 50];
            (xs[i] - xs[j]).abs()
        });
        let data = ProblemData::new(
            locations,
            1,
            vec![VehicleType::new(1, vec![10])],
            vec![m.clone()],
            vec![m],
            vec![],
        )
        .expect("valid instance");
        let ev = CostEvaluator::new(vec![20], 6, 6, 6);
        let mut ls = LocalSearch::new(
            &data,
            compute_neighbours(&data, &NeighbourhoodParams::default()),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let start = Solution::new(&data, vec![Route::new(&data, vec![1, 2], 0)]);
        let result = ls.search(&data, &start, &ev, &mut rng);
        // Client 2's round trip costs ~100 against a prize of 3.
        assert_eq!(result.unassigned(), &[2]);
        // Client 1 stays: prize 100 against a round trip of 2.
        assert_eq!(result.neighbours(1), Some((0, 0)));
    }

    #[test]
    fn test_profitable_optional_client_inserted() {
        let locations = vec![
            Location::depot(0, 0),
            Location::client(1, 0).with_prize(100).with_required(false),
            Location::client(2, 0).with_prize(100).with_required(false),
        ];
        let m = Matrix::from_fn(3, |i, j| (i as i64 - j as i64).abs());
        let data = ProblemData::new(
            locations,
            1,
            vec![VehicleType::new(1, vec![10])],
            vec![m.clone()],
            vec![m],
            vec![],
        )
        .expect("valid instance");
        let ev = CostEvaluator::new(vec![20], 6, 6, 6);
        let mut ls = LocalSearch::new(
            &data,
            compute_neighbours(&data, &NeighbourhoodParams::default()),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let start = Solution::new(&data, vec![Route::new(&data, vec![1], 0)]);
        let result = ls.search(&data, &start, &ev, &mut rng);
        assert!(result.unassigned().is_empty());
    }

    #[test]
    fn test_reload_inserted_under_pressure() {
        let locations = vec![
            Location::depot(0, 0),
            Location::client(1, 0).with_delivery(vec![6]),
            Location::client(2, 0).with_delivery(vec![6]),
        ];
        let m = Matrix::from_fn(3, |i, j| (i as i64 - j as i64).abs());
        let data = ProblemData::new(
            locations,
            1,
            vec![VehicleType::new(1, vec![8]).with_reloads(vec![0], 1)],
            vec![m.clone()],
            vec![m],
            vec![],
        )
        .expect("valid instance");
        let ev = CostEvaluator::new(vec![100], 6, 6, 6);
        let mut ls = LocalSearch::new(
            &data,
            compute_neighbours(&data, &NeighbourhoodParams::default()),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let start = Solution::new(&data, vec![Route::new(&data, vec![1, 2], 0)]);
        let result = ls.search(&data, &start, &ev, &mut rng);
        assert!(result.excess_load().iter().all(|&e| e == 0));
        assert_eq!(result.routes()[0].num_reloads(), 1);
    }
}
