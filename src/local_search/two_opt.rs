//! 2-opt moves: intra-route segment reversal and inter-route tail exchange.
//!
//! The within-route variant reverses the visits between two positions; the
//! across-route variant (2-opt*) exchanges everything after `u` with
//! everything after `v`. Tail exchanges reuse the other route's suffix
//! caches and are therefore restricted to compatible vehicle types.

use crate::evaluation::CostEvaluator;
use crate::local_search::route::{splice_cost, splice_reloads, tails_compatible, SearchRoute};
use crate::models::ProblemData;
use crate::Cost;

/// Delta of reversing the node range `i..=j` within a route, or `None` if
/// the range is invalid or crosses a trip boundary.
pub(crate) fn evaluate_two_opt_within(
    data: &ProblemData,
    ev: &CostEvaluator,
    route: &SearchRoute,
    i: usize,
    j: usize,
) -> Option<Cost> {
    let n = route.len();
    if i == 0 || j <= i || j > n - 2 {
        return None;
    }
    let segment = &route.nodes()[i..=j];
    if segment.iter().any(|&s| s < data.num_depots()) {
        return None;
    }
    let mid: Vec<usize> = segment.iter().rev().copied().collect();
    let new = splice_cost(data, ev, (route, i - 1), &mid, (route, j + 1));
    Some(new - route.current_cost(data, ev))
}

/// Applies a within-route reversal of the node range `i..=j`.
pub(crate) fn apply_two_opt_within(
    data: &ProblemData,
    route: &mut SearchRoute,
    i: usize,
    j: usize,
) {
    let mut visits = route.visits().to_vec();
    visits[i - 1..=j - 1].reverse();
    route.set_visits(data, visits);
}

/// Delta of exchanging the tails after positions `pu` and `pv` of two
/// different routes, or `None` if the routes' vehicle types cannot exchange
/// tails or a reload bound would be violated.
pub(crate) fn evaluate_two_opt_tails(
    data: &ProblemData,
    ev: &CostEvaluator,
    r1: &SearchRoute,
    pu: usize,
    r2: &SearchRoute,
    pv: usize,
) -> Option<Cost> {
    if !tails_compatible(data, r1.vehicle_type(), r2.vehicle_type()) {
        return None;
    }
    let (vt1, vt2) = (
        data.vehicle_type(r1.vehicle_type()),
        data.vehicle_type(r2.vehicle_type()),
    );
    if splice_reloads((r1, pu), 0, (r2, pv + 1)) > vt1.max_reloads()
        || splice_reloads((r2, pv), 0, (r1, pu + 1)) > vt2.max_reloads()
    {
        return None;
    }
    if data.has_vehicle_restrictions() {
        let tail_ok = |tail: &[usize], vt: usize| {
            tail.iter()
                .filter(|&&c| c >= data.num_depots())
                .all(|&c| data.location(c).allows_vehicle_type(vt))
        };
        if !tail_ok(&r2.nodes()[pv + 1..], r1.vehicle_type())
            || !tail_ok(&r1.nodes()[pu + 1..], r2.vehicle_type())
        {
            return None;
        }
    }

    let new1 = splice_cost(data, ev, (r1, pu), &[], (r2, pv + 1));
    let new2 = splice_cost(data, ev, (r2, pv), &[], (r1, pu + 1));
    Some(new1 + new2 - r1.current_cost(data, ev) - r2.current_cost(data, ev))
}

/// The interior visit sequences resulting from a tail exchange.
pub(crate) fn tails_visits(
    r1: &SearchRoute,
    pu: usize,
    r2: &SearchRoute,
    pv: usize,
) -> (Vec<usize>, Vec<usize>) {
    let mut v1 = r1.visits()[..pu].to_vec();
    v1.extend_from_slice(&r2.visits()[pv..]);
    let mut v2 = r2.visits()[..pv].to_vec();
    v2.extend_from_slice(&r1.visits()[pu..]);
    (v1, v2)
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
            Location::client(3, 0).with_delivery(vec![2]),
            Location::client(4, 0).with_delivery(vec![2]),
        ];
        let m = Matrix::from_fn(5, |i, j| (i as i64 - j as i64).abs());
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

    #[test]
    fn test_within_reversal_fixes_detour() {
        let (data, ev) = setup();
        let mut route = SearchRoute::new(&data, 0);
        route.set_visits(&data, vec![3, 2, 1, 4]);
        // Reverse nodes 1..=3 (clients 3, 2, 1) to get 1, 2, 3, 4.
        let delta = evaluate_two_opt_within(&data, &ev, &route, 1, 3).expect("applicable");
        let expect = sequence_cost(&data, &ev, 0, &[1, 2, 3, 4]) - route.current_cost(&data, &ev);
        assert_eq!(delta, expect);
        assert!(delta < 0);
        apply_two_opt_within(&data, &mut route, 1, 3);
        assert_eq!(route.visits(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_within_invalid_ranges() {
        let (data, ev) = setup();
        let mut route = SearchRoute::new(&data, 0);
        route.set_visits(&data, vec![1, 2, 3]);
        assert!(evaluate_two_opt_within(&data, &ev, &route, 0, 2).is_none());
        assert!(evaluate_two_opt_within(&data, &ev, &route, 2, 2).is_none());
        assert!(evaluate_two_opt_within(&data, &ev, &route, 2, 4).is_none());
    }

    #[test]
    fn test_tails_exchange() {
        let (data, ev) = setup();
        let mut r1 = SearchRoute::new(&data, 0);
        r1.set_visits(&data, vec![1, 4]);
        let mut r2 = SearchRoute::new(&data, 0);
        r2.set_visits(&data, vec![3, 2]);
        // Exchange tails after client 1 (pos 1) and client 3 (pos 1):
        // routes become [1, 2] and [3, 4].
        let delta = evaluate_two_opt_tails(&data, &ev, &r1, 1, &r2, 1).expect("applicable");
        let expect = sequence_cost(&data, &ev, 0, &[1, 2]) + sequence_cost(&data, &ev, 0, &[3, 4])
            - r1.current_cost(&data, &ev)
            - r2.current_cost(&data, &ev);
        assert_eq!(delta, expect);
        assert!(delta < 0);
        let (v1, v2) = tails_visits(&r1, 1, &r2, 1);
        assert_eq!(v1, vec![1, 2]);
        assert_eq!(v2, vec![3, 4]);
    }

    #[test]
    fn test_tails_incompatible_vehicle_types() {
        let locations = vec![
            Location::depot(0, 0),
            Location::client(1, 0),
            Location::client(2, 0),
        ];
        let m = Matrix::from_fn(3, |i, j| (i as i64 - j as i64).abs());
        let data = ProblemData::new(
            locations,
            1,
            vec![
                VehicleType::new(1, vec![20]),
                VehicleType::new(1, vec![20]).with_shift_window(0, 50),
            ],
            vec![m.clone()],
            vec![m],
            vec![],
        )
        .expect("valid instance");
        let ev = CostEvaluator::new(vec![10], 10, 10, 10);
        let mut r1 = SearchRoute::new(&data, 0);
        r1.set_visits(&data, vec![1]);
        let mut r2 = SearchRoute::new(&data, 1);
        r2.set_visits(&data, vec![2]);
        assert!(evaluate_two_opt_tails(&data, &ev, &r1, 1, &r2, 1).is_none());
    }
}
