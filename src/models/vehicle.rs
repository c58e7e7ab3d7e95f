//! Vehicle types.

use serde::{Deserialize, Serialize};

use crate::{Cost, Distance, Duration, Load, MAX_VALUE};

/// A group of identical vehicles.
///
/// # Examples
///
/// ```
/// use hgs_routing::models::VehicleType;
///
/// let vt = VehicleType::new(3, vec![100])
///     .with_depots(0, 0)
///     .with_max_duration(480)
///     .with_fixed_cost(50);
/// assert_eq!(vt.num_available(), 3);
/// assert_eq!(vt.capacity(), &[100]);
/// assert_eq!(vt.fixed_cost(), 50);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleType {
    num_available: usize,
    capacity: Vec<Load>,
    start_depot: usize,
    end_depot: usize,
    tw_early: Duration,
    tw_late: Duration,
    max_duration: Duration,
    max_distance: Distance,
    fixed_cost: Cost,
    unit_distance_cost: Cost,
    unit_duration_cost: Cost,
    profile: usize,
    reload_depots: Vec<usize>,
    max_reloads: usize,
}

impl VehicleType {
    /// Creates a vehicle type with the given fleet size and capacities.
    ///
    /// Defaults: depot 0 for both route ends, unbounded shift window and
    /// route limits, no fixed cost, unit distance cost 1, no duration cost,
    /// profile 0, no reloading.
    pub fn new(num_available: usize, capacity: Vec<Load>) -> Self {
        Self {
            num_available,
            capacity,
            start_depot: 0,
            end_depot: 0,
            tw_early: 0,
            tw_late: MAX_VALUE,
            max_duration: MAX_VALUE,
            max_distance: MAX_VALUE,
            fixed_cost: 0,
            unit_distance_cost: 1,
            unit_duration_cost: 0,
            profile: 0,
            reload_depots: Vec::new(),
            max_reloads: 0,
        }
    }

    /// Sets the start and end depots.
    pub fn with_depots(mut self, start: usize, end: usize) -> Self {
        self.start_depot = start;
        self.end_depot = end;
        self
    }

    /// Sets the shift window `[early, late]`.
    pub fn with_shift_window(mut self, early: Duration, late: Duration) -> Self {
        self.tw_early = early;
        self.tw_late = late;
        self
    }

    /// Sets the maximum route duration.
    pub fn with_max_duration(mut self, max: Duration) -> Self {
        self.max_duration = max;
        self
    }

    /// Sets the maximum route distance.
    pub fn with_max_distance(mut self, max: Distance) -> Self {
        self.max_distance = max;
        self
    }

    /// Sets the fixed cost for using a vehicle of this type.
    pub fn with_fixed_cost(mut self, cost: Cost) -> Self {
        self.fixed_cost = cost;
        self
    }

    /// Sets the cost per unit distance.
    pub fn with_unit_distance_cost(mut self, cost: Cost) -> Self {
        self.unit_distance_cost = cost;
        self
    }

    /// Sets the cost per unit duration.
    pub fn with_unit_duration_cost(mut self, cost: Cost) -> Self {
        self.unit_duration_cost = cost;
        self
    }

    /// Sets the routing profile this type travels under.
    pub fn with_profile(mut self, profile: usize) -> Self {
        self.profile = profile;
        self
    }

    /// Enables reloading at the given depots, at most `max_reloads` times
    /// per route.
    pub fn with_reloads(mut self, depots: Vec<usize>, max_reloads: usize) -> Self {
        self.reload_depots = depots;
        self.max_reloads = max_reloads;
        self
    }

    /// Number of identical vehicles of this type.
    pub fn num_available(&self) -> usize {
        self.num_available
    }

    /// Capacities, one per dimension.
    pub fn capacity(&self) -> &[Load] {
        &self.capacity
    }

    /// Capacity in the given dimension (zero if unset).
    pub fn capacity_dim(&self, dim: usize) -> Load {
        self.capacity.get(dim).copied().unwrap_or(0)
    }

    /// Depot where routes of this type start.
    pub fn start_depot(&self) -> usize {
        self.start_depot
    }

    /// Depot where routes of this type end.
    pub fn end_depot(&self) -> usize {
        self.end_depot
    }

    /// Opening of the shift window.
    pub fn tw_early(&self) -> Duration {
        self.tw_early
    }

    /// Closing of the shift window.
    pub fn tw_late(&self) -> Duration {
        self.tw_late
    }

    /// Maximum route duration.
    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    /// Maximum route distance.
    pub fn max_distance(&self) -> Distance {
        self.max_distance
    }

    /// Fixed cost for using a vehicle of this type.
    pub fn fixed_cost(&self) -> Cost {
        self.fixed_cost
    }

    /// Cost per unit distance.
    pub fn unit_distance_cost(&self) -> Cost {
        self.unit_distance_cost
    }

    /// Cost per unit duration.
    pub fn unit_duration_cost(&self) -> Cost {
        self.unit_duration_cost
    }

    /// Routing profile index.
    pub fn profile(&self) -> usize {
        self.profile
    }

    /// Depots where vehicles of this type may reload.
    pub fn reload_depots(&self) -> &[usize] {
        &self.reload_depots
    }

    /// Maximum number of reloads per route.
    pub fn max_reloads(&self) -> usize {
        self.max_reloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_type_defaults() {
        let vt = VehicleType::new(2, vec![100]);
        assert_eq!(vt.num_available(), 2);
        assert_eq!(vt.capacity_dim(0), 100);
        assert_eq!(vt.start_depot(), 0);
        assert_eq!(vt.end_depot(), 0);
        assert_eq!(vt.max_duration(), MAX_VALUE);
        assert_eq!(vt.unit_distance_cost(), 1);
        assert_eq!(vt.unit_duration_cost(), 0);
        assert_eq!(vt.max_reloads(), 0);
    }

    #[test]
    fn test_vehicle_type_builder() {
        let vt = VehicleType::new(1, vec![50, 10])
            .with_depots(1, 0)
            .with_shift_window(60, 540)
            .with_max_duration(480)
            .with_max_distance(10_000)
            .with_fixed_cost(100)
            .with_unit_distance_cost(2)
            .with_unit_duration_cost(3)
            .with_profile(1)
            .with_reloads(vec![0, 1], 2);
        assert_eq!(vt.start_depot(), 1);
        assert_eq!(vt.end_depot(), 0);
        assert_eq!(vt.tw_early(), 60);
        assert_eq!(vt.capacity_dim(1), 10);
        assert_eq!(vt.capacity_dim(5), 0);
        assert_eq!(vt.profile(), 1);
        assert_eq!(vt.reload_depots(), &[0, 1]);
        assert_eq!(vt.max_reloads(), 2);
    }
}
