//! Mutable route representation used during local search.
//!
//! A [`SearchRoute`] keeps its visit sequence together with cumulative
//! prefix/suffix segment summaries, refreshed in O(route length) after an
//! applied move. Candidate moves are evaluated against these caches by
//! [`splice_cost`] from a bounded number of segment merges, without touching
//! the route itself.

use crate::evaluation::CostEvaluator;
use crate::models::{ProblemData, VehicleType};
use crate::segment::{DurationSegment, LoadSegment};
use crate::{Cost, Distance, Load};

/// Duration segment of a route endpoint: the depot's window intersected
/// with the vehicle shift window, no service.
fn endpoint_segment(data: &ProblemData, depot: usize, vt: &VehicleType) -> DurationSegment {
    let loc = data.location(depot);
    DurationSegment::visit(
        0,
        loc.tw_early().max(vt.tw_early()),
        loc.tw_late().min(vt.tw_late()),
        0,
    )
}

/// Duration segment of an interior visit (client or reload depot).
pub(crate) fn visit_segment(data: &ProblemData, loc: usize) -> DurationSegment {
    let location = data.location(loc);
    DurationSegment::visit(
        location.service_duration(),
        location.tw_early(),
        location.tw_late(),
        location.release_time(),
    )
}

/// A route under modification: interior visits bracketed by the start and
/// end depots, plus the segment caches that make move deltas cheap.
#[derive(Debug, Clone)]
pub(crate) struct SearchRoute {
    vehicle_type: usize,
    /// `nodes[0]` is the start depot, `nodes[len - 1]` the end depot.
    nodes: Vec<usize>,
    cum_dist: Vec<Distance>,
    ds_before: Vec<DurationSegment>,
    ds_after: Vec<DurationSegment>,
    /// Trip-local load state: depot positions hold the identity segment,
    /// with the closed trip's excess already folded into `excess_before`
    /// (resp. the trip opening after them into `excess_after`).
    ls_before: Vec<Vec<LoadSegment>>,
    ls_after: Vec<Vec<LoadSegment>>,
    excess_before: Vec<Vec<Load>>,
    excess_after: Vec<Vec<Load>>,
    excess_total: Vec<Load>,
    clients_upto: Vec<usize>,
    reloads_upto: Vec<usize>,
}

impl SearchRoute {
    pub(crate) fn new(data: &ProblemData, vehicle_type: usize) -> Self {
        let vt = data.vehicle_type(vehicle_type);
        let mut route = Self {
            vehicle_type,
            nodes: vec![vt.start_depot(), vt.end_depot()],
            cum_dist: Vec::new(),
            ds_before: Vec::new(),
            ds_after: Vec::new(),
            ls_before: Vec::new(),
            ls_after: Vec::new(),
            excess_before: Vec::new(),
            excess_after: Vec::new(),
            excess_total: Vec::new(),
            clients_upto: Vec::new(),
            reloads_upto: Vec::new(),
        };
        route.update(data);
        route
    }

    /// Replaces the interior visits and refreshes the caches.
    pub(crate) fn set_visits(&mut self, data: &ProblemData, visits: Vec<usize>) {
        let vt = data.vehicle_type(self.vehicle_type);
        self.nodes.clear();
        self.nodes.push(vt.start_depot());
        self.nodes.extend(visits);
        self.nodes.push(vt.end_depot());
        self.update(data);
    }

    /// The interior visits, without the depot endpoints.
    pub(crate) fn visits(&self) -> &[usize] {
        &self.nodes[1..self.nodes.len() - 1]
    }

    pub(crate) fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn vehicle_type(&self) -> usize {
        self.vehicle_type
    }

    pub(crate) fn num_clients(&self) -> usize {
        self.clients_upto[self.nodes.len()]
    }

    pub(crate) fn num_reloads(&self) -> usize {
        self.reloads_upto[self.nodes.len()]
    }

    /// Rebuilds every cache in one forward and one backward pass.
    pub(crate) fn update(&mut self, data: &ProblemData) {
        let vt = data.vehicle_type(self.vehicle_type);
        let dist = data.distance_matrix(vt.profile());
        let dur = data.duration_matrix(vt.profile());
        let dims = data.num_load_dims();
        let n = self.nodes.len();
        let num_depots = data.num_depots();

        self.cum_dist = vec![0; n];
        self.ds_before = vec![DurationSegment::empty(); n];
        self.ds_after = vec![DurationSegment::empty(); n];
        self.clients_upto = vec![0; n + 1];
        self.reloads_upto = vec![0; n + 1];

        self.ds_before[0] = endpoint_segment(data, self.nodes[0], vt);
        for pos in 1..n {
            let (prev, cur) = (self.nodes[pos - 1], self.nodes[pos]);
            self.cum_dist[pos] = self.cum_dist[pos - 1].saturating_add(dist.get(prev, cur));
            let seg = if pos == n - 1 {
                endpoint_segment(data, cur, vt)
            } else {
                visit_segment(data, cur)
            };
            self.ds_before[pos] =
                DurationSegment::merge(dur.get(prev, cur), &self.ds_before[pos - 1], &seg);

            self.clients_upto[pos] = self.clients_upto[pos - 1] + usize::from(prev >= num_depots);
            self.reloads_upto[pos] =
                self.reloads_upto[pos - 1] + usize::from(pos >= 2 && prev < num_depots);
        }
        self.clients_upto[n] = self.clients_upto[n - 1] + usize::from(self.nodes[n - 1] >= num_depots);
        self.reloads_upto[n] = self.reloads_upto[n - 1];

        self.ds_after[n - 1] = endpoint_segment(data, self.nodes[n - 1], vt);
        for pos in (0..n - 1).rev() {
            let (cur, next) = (self.nodes[pos], self.nodes[pos + 1]);
            let seg = if pos == 0 {
                endpoint_segment(data, cur, vt)
            } else {
                visit_segment(data, cur)
            };
            self.ds_after[pos] =
                DurationSegment::merge(dur.get(cur, next), &seg, &self.ds_after[pos + 1]);
        }

        self.ls_before = vec![vec![LoadSegment::empty(); n]; dims];
        self.ls_after = vec![vec![LoadSegment::empty(); n]; dims];
        self.excess_before = vec![vec![0; n]; dims];
        self.excess_after = vec![vec![0; n]; dims];
        self.excess_total = vec![0; dims];

        for d in 0..dims {
            let capacity = vt.capacity_dim(d);
            for pos in 1..n {
                let cur = self.nodes[pos];
                if cur < num_depots {
                    // A depot visit closes the open trip.
                    self.ls_before[d][pos] = LoadSegment::empty();
                    self.excess_before[d][pos] = self.excess_before[d][pos - 1]
                        + self.ls_before[d][pos - 1].excess(capacity);
                } else {
                    let loc = data.location(cur);
                    self.ls_before[d][pos] = LoadSegment::merge(
                        &self.ls_before[d][pos - 1],
                        &LoadSegment::client(loc.delivery_dim(d), loc.pickup_dim(d)),
                    );
                    self.excess_before[d][pos] = self.excess_before[d][pos - 1];
                }
            }
            self.excess_total[d] = self.excess_before[d][n - 1];

            for pos in (0..n - 1).rev() {
                let cur = self.nodes[pos];
                if cur < num_depots {
                    self.ls_after[d][pos] = LoadSegment::empty();
                    self.excess_after[d][pos] =
                        self.excess_after[d][pos + 1] + self.ls_after[d][pos + 1].excess(capacity);
                } else {
                    let loc = data.location(cur);
                    self.ls_after[d][pos] = LoadSegment::merge(
                        &LoadSegment::client(loc.delivery_dim(d), loc.pickup_dim(d)),
                        &self.ls_after[d][pos + 1],
                    );
                    self.excess_after[d][pos] = self.excess_after[d][pos + 1];
                }
            }
        }
    }

    /// Penalised cost of the route as it currently stands, from the caches.
    pub(crate) fn current_cost(&self, data: &ProblemData, ev: &CostEvaluator) -> Cost {
        let n = self.nodes.len();
        route_cost(
            data,
            ev,
            self.vehicle_type,
            self.cum_dist[n - 1],
            &self.ds_before[n - 1],
            &self.excess_total,
            self.num_clients(),
        )
    }
}

/// Penalised cost of a candidate route from its raw ingredients: travel and
/// duration costs, fixed cost if any client is served, and all penalties.
pub(crate) fn route_cost(
    data: &ProblemData,
    ev: &CostEvaluator,
    vehicle_type: usize,
    distance: Distance,
    ds: &DurationSegment,
    excess_load: &[Load],
    num_clients: usize,
) -> Cost {
    if num_clients == 0 {
        return 0;
    }
    let vt = data.vehicle_type(vehicle_type);
    let duration = ds.duration();
    vt.fixed_cost()
        .saturating_add(vt.unit_distance_cost().saturating_mul(distance))
        .saturating_add(vt.unit_duration_cost().saturating_mul(duration))
        .saturating_add(ev.load_penalty(excess_load))
        .saturating_add(ev.tw_penalty(ds.time_warp()))
        .saturating_add(ev.dist_penalty((distance - vt.max_distance()).max(0)))
        .saturating_add(ev.dur_penalty((duration - vt.max_duration()).max(0)))
}

/// Penalised cost of the route obtained by keeping `pre`'s nodes up to and
/// including position `i`, then the `mid` visits, then `suf`'s nodes from
/// position `j` on. The resulting route belongs to `pre`'s vehicle.
///
/// When `pre` and `suf` are different routes the caller must have checked
/// [`tails_compatible`]; the suffix caches embed that route's profile and
/// end depot.
pub(crate) fn splice_cost(
    data: &ProblemData,
    ev: &CostEvaluator,
    pre: (&SearchRoute, usize),
    mid: &[usize],
    suf: (&SearchRoute, usize),
) -> Cost {
    let (ra, i) = pre;
    let (rb, j) = suf;
    let vt = data.vehicle_type(ra.vehicle_type);
    let dist = data.distance_matrix(vt.profile());
    let dur = data.duration_matrix(vt.profile());
    let dims = data.num_load_dims();
    let num_depots = data.num_depots();
    let nb = rb.nodes.len();

    let mut distance = ra.cum_dist[i];
    let mut ds = ra.ds_before[i];
    let mut prev = ra.nodes[i];
    let mut mid_clients = 0;
    for &m in mid {
        distance = distance.saturating_add(dist.get(prev, m));
        ds = DurationSegment::merge(dur.get(prev, m), &ds, &visit_segment(data, m));
        mid_clients += usize::from(m >= num_depots);
        prev = m;
    }
    distance = distance
        .saturating_add(dist.get(prev, rb.nodes[j]))
        .saturating_add(rb.cum_dist[nb - 1] - rb.cum_dist[j]);
    ds = DurationSegment::merge(dur.get(prev, rb.nodes[j]), &ds, &rb.ds_after[j]);

    let mut excess_load = vec![0; dims];
    for (d, excess) in excess_load.iter_mut().enumerate() {
        let capacity = vt.capacity_dim(d);
        let mut total = ra.excess_before[d][i];
        let mut open = ra.ls_before[d][i];
        for &m in mid {
            if m < num_depots {
                total += open.excess(capacity);
                open = LoadSegment::empty();
            } else {
                let loc = data.location(m);
                open = LoadSegment::merge(
                    &open,
                    &LoadSegment::client(loc.delivery_dim(d), loc.pickup_dim(d)),
                );
            }
        }
        total += LoadSegment::merge(&open, &rb.ls_after[d][j]).excess(capacity);
        total += rb.excess_after[d][j];
        *excess = total;
    }

    let num_clients =
        ra.clients_upto[i + 1] + mid_clients + (rb.clients_upto[nb] - rb.clients_upto[j]);
    route_cost(data, ev, ra.vehicle_type, distance, &ds, &excess_load, num_clients)
}

/// Number of reload visits in the route formed as in [`splice_cost`].
pub(crate) fn splice_reloads(
    pre: (&SearchRoute, usize),
    mid_reloads: usize,
    suf: (&SearchRoute, usize),
) -> usize {
    let (ra, i) = pre;
    let (rb, j) = suf;
    let nb = rb.nodes.len();
    ra.reloads_upto[i + 1] + mid_reloads + (rb.reloads_upto[nb] - rb.reloads_upto[j])
}

/// Penalised cost of an arbitrary interior visit sequence under the given
/// vehicle type, computed from scratch. Test oracle for the cache-based
/// [`splice_cost`] evaluations.
#[cfg(test)]
pub(crate) fn sequence_cost(
    data: &ProblemData,
    ev: &CostEvaluator,
    vehicle_type: usize,
    visits: &[usize],
) -> Cost {
    let vt = data.vehicle_type(vehicle_type);
    let dist = data.distance_matrix(vt.profile());
    let dur = data.duration_matrix(vt.profile());
    let dims = data.num_load_dims();
    let num_depots = data.num_depots();

    let mut distance: Distance = 0;
    let mut ds = endpoint_segment(data, vt.start_depot(), vt);
    let mut prev = vt.start_depot();
    let mut num_clients = 0;
    let mut excess_load = vec![0; dims];
    let mut open = vec![LoadSegment::empty(); dims];

    for &m in visits {
        distance = distance.saturating_add(dist.get(prev, m));
        ds = DurationSegment::merge(dur.get(prev, m), &ds, &visit_segment(data, m));
        if m < num_depots {
            for d in 0..dims {
                excess_load[d] += open[d].excess(vt.capacity_dim(d));
                open[d] = LoadSegment::empty();
            }
        } else {
            num_clients += 1;
            let loc = data.location(m);
            for (d, seg) in open.iter_mut().enumerate() {
                *seg = LoadSegment::merge(
                    seg,
                    &LoadSegment::client(loc.delivery_dim(d), loc.pickup_dim(d)),
                );
            }
        }
        prev = m;
    }
    for d in 0..dims {
        excess_load[d] += open[d].excess(vt.capacity_dim(d));
    }
    distance = distance.saturating_add(dist.get(prev, vt.end_depot()));
    ds = DurationSegment::merge(
        dur.get(prev, vt.end_depot()),
        &ds,
        &endpoint_segment(data, vt.end_depot(), vt),
    );

    route_cost(data, ev, vehicle_type, distance, &ds, &excess_load, num_clients)
}

/// Whether a tail of `b` may be grafted onto `a` using `b`'s cached suffix
/// summaries: same profile, end depot, shift window, and reload depots.
pub(crate) fn tails_compatible(data: &ProblemData, a: usize, b: usize) -> bool {
    if a == b {
        return true;
    }
    let (va, vb) = (data.vehicle_type(a), data.vehicle_type(b));
    va.profile() == vb.profile()
        && va.end_depot() == vb.end_depot()
        && va.tw_early() == vb.tw_early()
        && va.tw_late() == vb.tw_late()
        && va.reload_depots() == vb.reload_depots()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Matrix;
    use crate::models::{Location, VehicleType};

    fn line_data(vt: VehicleType) -> ProblemData {
        let locations = vec![
            Location::depot(0, 0),
            Location::client(1, 0).with_delivery(vec![4]),
            Location::client(2, 0).with_delivery(vec![3]),
            Location::client(3, 0).with_delivery(vec![5]),
        ];
        let m = Matrix::from_fn(4, |i, j| (i as i64 - j as i64).abs());
        ProblemData::new(locations, 1, vec![vt], vec![m.clone()], vec![m], vec![])
            .expect("valid instance")
    }

    fn plain_ev() -> CostEvaluator {
        CostEvaluator::new(vec![10], 10, 10, 10)
    }

    #[test]
    fn test_current_cost_matches_sequence_cost() {
        let data = line_data(VehicleType::new(1, vec![10]));
        let ev = plain_ev();
        let mut route = SearchRoute::new(&data, 0);
        route.set_visits(&data, vec![1, 3, 2]);
        assert_eq!(
            route.current_cost(&data, &ev),
            sequence_cost(&data, &ev, 0, &[1, 3, 2])
        );
    }

    #[test]
    fn test_empty_route_costs_nothing() {
        let data = line_data(VehicleType::new(1, vec![10]).with_fixed_cost(100));
        let route = SearchRoute::new(&data, 0);
        assert_eq!(route.current_cost(&data, &plain_ev()), 0);
    }

    #[test]
    fn test_splice_insertion_matches_sequence() {
        let data = line_data(VehicleType::new(1, vec![10]));
        let ev = plain_ev();
        let mut route = SearchRoute::new(&data, 0);
        route.set_visits(&data, vec![1, 3]);
        // Insert client 2 after position 1 (client 1).
        let spliced = splice_cost(&data, &ev, (&route, 1), &[2], (&route, 2));
        assert_eq!(spliced, sequence_cost(&data, &ev, 0, &[1, 2, 3]));
    }

    #[test]
    fn test_splice_removal_matches_sequence() {
        let data = line_data(VehicleType::new(1, vec![5]));
        let ev = plain_ev();
        let mut route = SearchRoute::new(&data, 0);
        route.set_visits(&data, vec![1, 2, 3]);
        // Remove client 2 (position 2).
        let spliced = splice_cost(&data, &ev, (&route, 1), &[], (&route, 3));
        assert_eq!(spliced, sequence_cost(&data, &ev, 0, &[1, 3]));
    }

    #[test]
    fn test_splice_cross_route_tails() {
        let data = line_data(VehicleType::new(2, vec![10]));
        let ev = plain_ev();
        let mut r1 = SearchRoute::new(&data, 0);
        r1.set_visits(&data, vec![1, 2]);
        let mut r2 = SearchRoute::new(&data, 0);
        r2.set_visits(&data, vec![3]);
        // r1 keeps client 1, then takes r2's tail from its client 3 onward.
        let spliced = splice_cost(&data, &ev, (&r1, 1), &[], (&r2, 1));
        assert_eq!(spliced, sequence_cost(&data, &ev, 0, &[1, 3]));
    }

    #[test]
    fn test_splice_with_reload_in_suffix() {
        let data = line_data(VehicleType::new(1, vec![8]).with_reloads(vec![0], 2));
        let ev = plain_ev();
        let mut route = SearchRoute::new(&data, 0);
        route.set_visits(&data, vec![1, 0, 2, 3]);
        assert_eq!(route.num_reloads(), 1);
        assert_eq!(
            route.current_cost(&data, &ev),
            sequence_cost(&data, &ev, 0, &[1, 0, 2, 3])
        );
        // Insert nothing, remove client 1: depot-led route remains consistent.
        let spliced = splice_cost(&data, &ev, (&route, 0), &[], (&route, 2));
        assert_eq!(spliced, sequence_cost(&data, &ev, 0, &[0, 2, 3]));
        assert_eq!(splice_reloads((&route, 0), 0, (&route, 2)), 1);
    }

    #[test]
    fn test_splice_reload_in_mid() {
        let data = line_data(VehicleType::new(1, vec![8]).with_reloads(vec![0], 2));
        let ev = plain_ev();
        let mut route = SearchRoute::new(&data, 0);
        route.set_visits(&data, vec![1, 2, 3]);
        // Insert a reload between clients 2 and 3.
        let spliced = splice_cost(&data, &ev, (&route, 2), &[0], (&route, 3));
        assert_eq!(spliced, sequence_cost(&data, &ev, 0, &[1, 2, 0, 3]));
        assert_eq!(splice_reloads((&route, 2), 1, (&route, 3)), 1);
    }

    #[test]
    fn test_time_warp_in_costs() {
        let locations = vec![
            Location::depot(0, 0),
            Location::client(5, 0).with_time_window(0, 3),
        ];
        let m = Matrix::from_fn(2, |i, j| if i == j { 0 } else { 5 });
        let data = ProblemData::new(
            locations,
            1,
            vec![VehicleType::new(1, vec![10])],
            vec![m.clone()],
            vec![m],
            vec![],
        )
        .expect("valid instance");
        let ev = CostEvaluator::new(vec![0], 7, 0, 0);
        let mut route = SearchRoute::new(&data, 0);
        route.set_visits(&data, vec![1]);
        // Distance 10 plus time-warp 2 at penalty 7.
        assert_eq!(route.current_cost(&data, &ev), 10 + 14);
    }

    #[test]
    fn test_tails_compatible() {
        let locations = vec![
            Location::depot(0, 0),
            Location::client(1, 0).with_delivery(vec![1]),
        ];
        let m = Matrix::from_fn(2, |i, j| (i as i64 - j as i64).abs());
        let data = ProblemData::new(
            locations,
            1,
            vec![
                VehicleType::new(1, vec![10]),
                VehicleType::new(1, vec![20]),
                VehicleType::new(1, vec![10]).with_shift_window(0, 100),
            ],
            vec![m.clone()],
            vec![m],
            vec![],
        )
        .expect("valid instance");
        assert!(tails_compatible(&data, 0, 1)); // capacities may differ
        assert!(!tails_compatible(&data, 0, 2)); // shift windows may not
        assert!(tails_compatible(&data, 2, 2));
    }
}
