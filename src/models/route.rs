//! Finished routes.

use serde::{Deserialize, Serialize};

use crate::models::ProblemData;
use crate::segment::{DurationSegment, LoadSegment};
use crate::{Cost, Distance, Duration, Load};

/// A single vehicle's route: an ordered sequence of visits between the
/// vehicle type's start and end depots.
///
/// Visits are client locations, optionally interleaved with reload depots
/// that partition the route into trips; the carried load resets at each
/// reload. All statistics are computed once, at construction, from the
/// segment algebra.
///
/// # Examples
///
/// ```
/// use hgs_routing::distance::Matrix;
/// use hgs_routing::models::{Location, ProblemData, Route, VehicleType};
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
/// let route = Route::new(&data, vec![1, 2], 0);
/// assert_eq!(route.distance(), 4); // 0 -> 1 -> 2 -> 0
/// assert_eq!(route.excess_load(), &[0]);
/// assert!(route.is_feasible());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    vehicle_type: usize,
    visits: Vec<usize>,
    num_depots: usize,
    distance: Distance,
    duration: Duration,
    time_warp: Duration,
    start_time: Duration,
    excess_distance: Distance,
    excess_duration: Duration,
    excess_load: Vec<Load>,
    delivery: Vec<Load>,
    pickup: Vec<Load>,
    trip_loads: Vec<Vec<Load>>,
    trip_bounds: Vec<(usize, usize)>,
    prizes: Cost,
    num_reloads: usize,
}

impl Route {
    /// Builds a route from the given visit sequence and vehicle type,
    /// computing all statistics.
    ///
    /// `visits` holds client locations and, for reloading routes, reload
    /// depot locations; the start and end depots are implied by the vehicle
    /// type and must not be listed.
    pub fn new(data: &ProblemData, visits: Vec<usize>, vehicle_type: usize) -> Self {
        let vt = data.vehicle_type(vehicle_type);
        let dist = data.distance_matrix(vt.profile());
        let dur = data.duration_matrix(vt.profile());
        let dims = data.num_load_dims();

        let depot_segment = |depot: usize| {
            let loc = data.location(depot);
            DurationSegment::visit(
                0,
                loc.tw_early().max(vt.tw_early()),
                loc.tw_late().min(vt.tw_late()),
                0,
            )
        };

        let mut ds = depot_segment(vt.start_depot());
        let mut prev = vt.start_depot();
        let mut distance: Distance = 0;
        let mut prizes: Cost = 0;
        let mut num_reloads = 0;

        let mut delivery = vec![0; dims];
        let mut pickup = vec![0; dims];
        let mut excess_load = vec![0; dims];
        let mut open = vec![LoadSegment::empty(); dims];
        let mut trip_loads: Vec<Vec<Load>> = Vec::new();
        let mut trip_bounds: Vec<(usize, usize)> = Vec::new();
        let mut trip_start = 0;

        let mut close_trip = |open: &mut Vec<LoadSegment>,
                              excess_load: &mut Vec<Load>,
                              trip_loads: &mut Vec<Vec<Load>>,
                              end: usize,
                              trip_start: &mut usize| {
            let mut loads = Vec::with_capacity(dims);
            for (d, seg) in open.iter_mut().enumerate() {
                excess_load[d] += seg.excess(vt.capacity_dim(d));
                loads.push(seg.max_load());
                *seg = LoadSegment::empty();
            }
            trip_loads.push(loads);
            trip_bounds.push((*trip_start, end));
            *trip_start = end + 1;
        };

        for (pos, &loc) in visits.iter().enumerate() {
            distance = distance.saturating_add(dist.get(prev, loc));
            let location = data.location(loc);
            ds = DurationSegment::merge(
                dur.get(prev, loc),
                &ds,
                &DurationSegment::visit(
                    location.service_duration(),
                    location.tw_early(),
                    location.tw_late(),
                    location.release_time(),
                ),
            );

            if location.is_depot() {
                close_trip(
                    &mut open,
                    &mut excess_load,
                    &mut trip_loads,
                    pos,
                    &mut trip_start,
                );
                num_reloads += 1;
            } else {
                prizes += location.prize();
                for d in 0..dims {
                    let client = LoadSegment::client(
                        location.delivery_dim(d),
                        location.pickup_dim(d),
                    );
                    delivery[d] += client.delivery();
                    pickup[d] += client.pickup();
                    open[d] = LoadSegment::merge(&open[d], &client);
                }
            }
            prev = loc;
        }
        close_trip(
            &mut open,
            &mut excess_load,
            &mut trip_loads,
            visits.len(),
            &mut trip_start,
        );

        distance = distance.saturating_add(dist.get(prev, vt.end_depot()));
        ds = DurationSegment::merge(
            dur.get(prev, vt.end_depot()),
            &ds,
            &depot_segment(vt.end_depot()),
        );

        Self {
            vehicle_type,
            num_depots: data.num_depots(),
            distance,
            duration: ds.duration(),
            time_warp: ds.time_warp(),
            start_time: ds.start_time(),
            excess_distance: (distance - vt.max_distance()).max(0),
            excess_duration: (ds.duration() - vt.max_duration()).max(0),
            excess_load,
            delivery,
            pickup,
            trip_loads,
            trip_bounds,
            prizes,
            num_reloads,
            visits,
        }
    }

    /// The visit sequence, including any reload depots.
    pub fn visits(&self) -> &[usize] {
        &self.visits
    }

    /// The visited clients, in order, without reload depots.
    pub fn clients(&self) -> impl Iterator<Item = usize> + '_ {
        let num_depots = self.num_depots;
        self.visits.iter().copied().filter(move |&v| v >= num_depots)
    }

    /// Number of visited clients.
    pub fn num_clients(&self) -> usize {
        self.clients().count()
    }

    /// Returns `true` if this route visits no clients.
    pub fn is_empty(&self) -> bool {
        self.clients().next().is_none()
    }

    /// Vehicle type serving this route.
    pub fn vehicle_type(&self) -> usize {
        self.vehicle_type
    }

    /// The trips of this route: maximal visit subsequences between depot
    /// visits.
    pub fn trips(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.trip_bounds
            .iter()
            .map(move |&(start, end)| &self.visits[start..end])
    }

    /// Number of reload visits.
    pub fn num_reloads(&self) -> usize {
        self.num_reloads
    }

    /// Total travel distance.
    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// Total duration: travel, service, and unavoidable waiting.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Total time-warp.
    pub fn time_warp(&self) -> Duration {
        self.time_warp
    }

    /// Earliest departure time from the start depot.
    pub fn start_time(&self) -> Duration {
        self.start_time
    }

    /// Distance in excess of the vehicle type's maximum.
    pub fn excess_distance(&self) -> Distance {
        self.excess_distance
    }

    /// Duration in excess of the vehicle type's maximum.
    pub fn excess_duration(&self) -> Duration {
        self.excess_duration
    }

    /// Load in excess of capacity, per dimension, summed over trips.
    pub fn excess_load(&self) -> &[Load] {
        &self.excess_load
    }

    /// Total delivered quantity per dimension.
    pub fn delivery(&self) -> &[Load] {
        &self.delivery
    }

    /// Total picked-up quantity per dimension.
    pub fn pickup(&self) -> &[Load] {
        &self.pickup
    }

    /// Maximum load carried per trip, per dimension.
    pub fn trip_loads(&self) -> &[Vec<Load>] {
        &self.trip_loads
    }

    /// Total prize of the visited clients.
    pub fn prizes(&self) -> Cost {
        self.prizes
    }

    /// Returns `true` if this route violates no constraint.
    pub fn is_feasible(&self) -> bool {
        self.time_warp == 0
            && self.excess_distance == 0
            && self.excess_duration == 0
            && self.excess_load.iter().all(|&e| e == 0)
    }
}
