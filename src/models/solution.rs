//! Solution representation.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::{ProblemData, Route};
use crate::{Cost, Distance, Duration, Load};

/// A complete, immutable solution: a set of routes plus the clients left
/// unassigned.
///
/// Solutions are constructed once and never modified; the local search
/// mutates its own internal representation and exports a fresh `Solution`.
///
/// # Examples
///
/// ```
/// use hgs_routing::distance::Matrix;
/// use hgs_routing::models::{Location, ProblemData, Route, Solution, VehicleType};
///
/// let locations = vec![
///     Location::depot(0, 0),
///     Location::client(1, 0).with_delivery(vec![4]),
///     Location::client(2, 0).with_delivery(vec![3]),
/// ];
/// let m = Matrix::from_fn(3, |i, j| (i as i64 - j as i64).abs());
/// let data = ProblemData::new(
///     locations, 1, vec![VehicleType::new(1, vec![10])], vec![m.clone()], vec![m], vec![],
/// ).unwrap();
///
/// let sol = Solution::new(&data, vec![Route::new(&data, vec![1, 2], 0)]);
/// assert!(sol.is_feasible());
/// assert_eq!(sol.distance(), 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    routes: Vec<Route>,
    unassigned: Vec<usize>,
    num_depots: usize,
    num_clients: usize,
    distance: Distance,
    duration: Duration,
    time_warp: Duration,
    excess_distance: Distance,
    excess_duration: Duration,
    excess_load: Vec<Load>,
    fixed_cost: Cost,
    distance_cost: Cost,
    duration_cost: Cost,
    uncollected_prizes: Cost,
    is_complete: bool,
    neighbours: Vec<Option<(usize, usize)>>,
}

impl Solution {
    /// Builds a solution from the given routes. Empty routes are dropped.
    ///
    /// # Panics
    ///
    /// Panics if the routes visit a client more than once, use more vehicles
    /// of a type than are available, or select more than one client from a
    /// mutually exclusive group. These are internal invariant violations,
    /// not recoverable input errors.
    pub fn new(data: &ProblemData, routes: Vec<Route>) -> Self {
        let routes: Vec<Route> = routes.into_iter().filter(|r| !r.is_empty()).collect();

        let mut used = vec![0usize; data.num_vehicle_types()];
        for route in &routes {
            used[route.vehicle_type()] += 1;
        }
        for (t, &count) in used.iter().enumerate() {
            assert!(
                count <= data.vehicle_type(t).num_available(),
                "vehicle type {t} used {count} times"
            );
        }

        let mut assigned = vec![false; data.num_locations()];
        let mut group_used = vec![false; data.groups().len()];
        let mut neighbours = vec![None; data.num_locations()];

        for route in &routes {
            let vt = data.vehicle_type(route.vehicle_type());
            let mut prev = vt.start_depot();
            let clients: Vec<usize> = route.clients().collect();
            for (i, &client) in clients.iter().enumerate() {
                assert!(!assigned[client], "client {client} visited twice");
                assigned[client] = true;
                if let Some(g) = data.location(client).group() {
                    assert!(!group_used[g], "group {g} used twice");
                    group_used[g] = true;
                }
                let next = clients.get(i + 1).copied().unwrap_or(vt.end_depot());
                neighbours[client] = Some((prev, next));
                prev = client;
            }
        }

        let mut unassigned = Vec::new();
        let mut uncollected_prizes = 0;
        let mut is_complete = true;
        for client in data.clients() {
            if !assigned[client] {
                unassigned.push(client);
                uncollected_prizes += data.location(client).prize();
                if data.location(client).is_required() {
                    is_complete = false;
                }
            }
        }

        let dims = data.num_load_dims();
        let mut excess_load = vec![0; dims];
        let (mut distance, mut duration, mut time_warp) = (0, 0, 0);
        let (mut excess_distance, mut excess_duration) = (0, 0);
        let (mut fixed_cost, mut distance_cost, mut duration_cost) = (0, 0, 0);
        for route in &routes {
            let vt = data.vehicle_type(route.vehicle_type());
            distance += route.distance();
            duration += route.duration();
            time_warp += route.time_warp();
            excess_distance += route.excess_distance();
            excess_duration += route.excess_duration();
            for d in 0..dims {
                excess_load[d] += route.excess_load()[d];
            }
            fixed_cost += vt.fixed_cost();
            distance_cost += vt.unit_distance_cost() * route.distance();
            duration_cost += vt.unit_duration_cost() * route.duration();
        }

        Self {
            routes,
            unassigned,
            num_depots: data.num_depots(),
            num_clients: data.num_clients(),
            distance,
            duration,
            time_warp,
            excess_distance,
            excess_duration,
            excess_load,
            fixed_cost,
            distance_cost,
            duration_cost,
            uncollected_prizes,
            is_complete,
            neighbours,
        }
    }

    /// Builds a random solution: one member of each mutually exclusive group
    /// and every other client, dealt in random order round-robin over the
    /// available vehicles.
    pub fn random<R: Rng>(data: &ProblemData, rng: &mut R) -> Self {
        let mut selected: Vec<usize> = data
            .clients()
            .filter(|&c| data.location(c).group().is_none())
            .collect();
        for group in data.groups() {
            selected.push(*group.clients().choose(rng).expect("groups are non-empty"));
        }
        selected.shuffle(rng);

        let vehicles: Vec<usize> = data
            .vehicle_types()
            .iter()
            .enumerate()
            .flat_map(|(t, vt)| std::iter::repeat(t).take(vt.num_available()))
            .collect();
        let num_routes = vehicles.len();

        let mut visits: Vec<Vec<usize>> = vec![Vec::new(); num_routes];
        for (i, &client) in selected.iter().enumerate() {
            let loc = data.location(client);
            for offset in 0..num_routes {
                let r = (i + offset) % num_routes;
                if loc.allows_vehicle_type(vehicles[r]) {
                    visits[r].push(client);
                    break;
                }
            }
        }

        let routes = visits
            .into_iter()
            .zip(vehicles)
            .filter(|(v, _)| !v.is_empty())
            .map(|(v, t)| Route::new(data, v, t))
            .collect();
        Self::new(data, routes)
    }

    /// The routes of this solution.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Number of non-empty routes.
    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    /// Clients not visited by any route.
    pub fn unassigned(&self) -> &[usize] {
        &self.unassigned
    }

    /// Number of visited clients.
    pub fn num_clients_served(&self) -> usize {
        self.num_clients - self.unassigned.len()
    }

    /// The predecessor and successor locations of the given client, or
    /// `None` if it is unassigned.
    pub fn neighbours(&self, client: usize) -> Option<(usize, usize)> {
        self.neighbours[client]
    }

    /// Total travel distance over all routes.
    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// Total duration over all routes.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Total time-warp over all routes.
    pub fn time_warp(&self) -> Duration {
        self.time_warp
    }

    /// Total distance in excess of the per-route maxima.
    pub fn excess_distance(&self) -> Distance {
        self.excess_distance
    }

    /// Total duration in excess of the per-route maxima.
    pub fn excess_duration(&self) -> Duration {
        self.excess_duration
    }

    /// Total load in excess of capacity, per dimension.
    pub fn excess_load(&self) -> &[Load] {
        &self.excess_load
    }

    /// Total fixed cost of the used vehicles.
    pub fn fixed_cost(&self) -> Cost {
        self.fixed_cost
    }

    /// Total distance-proportional cost.
    pub fn distance_cost(&self) -> Cost {
        self.distance_cost
    }

    /// Total duration-proportional cost.
    pub fn duration_cost(&self) -> Cost {
        self.duration_cost
    }

    /// Total prize of the unvisited clients.
    pub fn uncollected_prizes(&self) -> Cost {
        self.uncollected_prizes
    }

    /// Returns `true` if every required client is assigned.
    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    /// Returns `true` if this solution violates no constraint.
    pub fn is_feasible(&self) -> bool {
        self.is_complete
            && self.time_warp == 0
            && self.excess_distance == 0
            && self.excess_duration == 0
            && self.excess_load.iter().all(|&e| e == 0)
    }

    /// Broken-pairs distance to another solution: the fraction of clients
    /// whose predecessor or successor differs, ignoring depot identity.
    pub fn broken_pairs_distance(&self, other: &Solution) -> f64 {
        debug_assert_eq!(self.neighbours.len(), other.neighbours.len());
        let normalise = |pair: Option<(usize, usize)>| {
            pair.map(|(pred, succ)| {
                (
                    if pred < self.num_depots { usize::MAX } else { pred },
                    if succ < self.num_depots { usize::MAX } else { succ },
                )
            })
        };
        let broken = (self.num_depots..self.neighbours.len())
            .filter(|&c| normalise(self.neighbours[c]) != normalise(other.neighbours[c]))
            .count();
        broken as f64 / self.num_clients.max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Matrix;
    use crate::models::{Location, VehicleType};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_data() -> ProblemData {
        let locations = vec![
            Location::depot(0, 0),
            Location::client(1, 0).with_delivery(vec![4]),
            Location::client(2, 0).with_delivery(vec![3]),
            Location::client(3, 0).with_delivery(vec![5]),
        ];
        let m = Matrix::from_fn(4, |i, j| (i as i64 - j as i64).abs());
        ProblemData::new(
            locations,
            1,
            vec![VehicleType::new(2, vec![10])],
            vec![m.clone()],
            vec![m],
            vec![],
        )
        .expect("valid instance")
    }

    #[test]
    fn test_aggregates() {
        let data = small_data();
        let sol = Solution::new(
            &data,
            vec![
                Route::new(&data, vec![1, 2], 0),
                Route::new(&data, vec![3], 0),
            ],
        );
        assert_eq!(sol.num_routes(), 2);
        assert_eq!(sol.distance(), 4 + 6);
        assert_eq!(sol.excess_load(), &[0]);
        assert!(sol.is_complete());
        assert!(sol.is_feasible());
        assert_eq!(sol.num_clients_served(), 3);
    }

    #[test]
    fn test_neighbours() {
        let data = small_data();
        let sol = Solution::new(&data, vec![Route::new(&data, vec![1, 2], 0)]);
        assert_eq!(sol.neighbours(1), Some((0, 2)));
        assert_eq!(sol.neighbours(2), Some((1, 0)));
        assert_eq!(sol.neighbours(3), None);
    }

    #[test]
    fn test_missing_required_client() {
        let data = small_data();
        let sol = Solution::new(&data, vec![Route::new(&data, vec![1], 0)]);
        assert!(!sol.is_complete());
        assert!(!sol.is_feasible());
        assert_eq!(sol.unassigned(), &[2, 3]);
    }

    #[test]
    #[should_panic(expected = "visited twice")]
    fn test_duplicate_client_panics() {
        let data = small_data();
        Solution::new(
            &data,
            vec![
                Route::new(&data, vec![1, 2], 0),
                Route::new(&data, vec![1], 0),
            ],
        );
    }

    #[test]
    #[should_panic(expected = "vehicle type")]
    fn test_vehicle_overuse_panics() {
        let data = small_data();
        Solution::new(
            &data,
            vec![
                Route::new(&data, vec![1], 0),
                Route::new(&data, vec![2], 0),
                Route::new(&data, vec![3], 0),
            ],
        );
    }

    #[test]
    fn test_random_serves_all_clients() {
        let data = small_data();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let sol = Solution::random(&data, &mut rng);
        assert!(sol.unassigned().is_empty());
        assert!(sol.is_complete());
    }

    #[test]
    fn test_random_is_deterministic() {
        let data = small_data();
        let a = Solution::random(&data, &mut ChaCha8Rng::seed_from_u64(3));
        let b = Solution::random(&data, &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(a.broken_pairs_distance(&b), 0.0);
    }

    #[test]
    fn test_broken_pairs_symmetric() {
        let data = small_data();
        let a = Solution::new(&data, vec![Route::new(&data, vec![1, 2, 3], 0)]);
        let b = Solution::new(
            &data,
            vec![
                Route::new(&data, vec![2, 1], 0),
                Route::new(&data, vec![3], 0),
            ],
        );
        assert_eq!(a.broken_pairs_distance(&b), b.broken_pairs_distance(&a));
        assert_eq!(a.broken_pairs_distance(&a), 0.0);
        assert!(a.broken_pairs_distance(&b) > 0.0);
    }

    #[test]
    fn test_uncollected_prizes() {
        let locations = vec![
            Location::depot(0, 0),
            Location::client(1, 0).with_prize(10).with_required(false),
            Location::client(2, 0).with_prize(25).with_required(false),
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
        let sol = Solution::new(&data, vec![Route::new(&data, vec![1], 0)]);
        assert_eq!(sol.uncollected_prizes(), 25);
        assert!(sol.is_complete());
    }
}
