//! Depot and client locations.

use serde::{Deserialize, Serialize};

use crate::{Cost, Duration, Load, MAX_VALUE};

/// A depot or client in a routing problem.
///
/// Depots and clients share coordinates, a service duration, a time window,
/// and a release time. Clients additionally carry delivery and pickup
/// quantities (one per capacity dimension), a prize, a required flag, an
/// optional mutually-exclusive group, and an optional restriction to a set
/// of vehicle types.
///
/// # Examples
///
/// ```
/// use hgs_routing::models::Location;
///
/// let depot = Location::depot(0, 0);
/// assert!(depot.is_depot());
///
/// let client = Location::client(3, 4)
///     .with_delivery(vec![10])
///     .with_time_window(50, 200)
///     .with_prize(25)
///     .with_required(false);
/// assert_eq!(client.delivery(), &[10]);
/// assert!(!client.is_required());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    x: i64,
    y: i64,
    is_depot: bool,
    delivery: Vec<Load>,
    pickup: Vec<Load>,
    service_duration: Duration,
    tw_early: Duration,
    tw_late: Duration,
    release_time: Duration,
    prize: Cost,
    required: bool,
    group: Option<usize>,
    vehicle_types: Option<Vec<usize>>,
}

impl Location {
    /// Creates a depot at the given coordinates.
    pub fn depot(x: i64, y: i64) -> Self {
        Self {
            x,
            y,
            is_depot: true,
            delivery: Vec::new(),
            pickup: Vec::new(),
            service_duration: 0,
            tw_early: 0,
            tw_late: MAX_VALUE,
            release_time: 0,
            prize: 0,
            required: false,
            group: None,
            vehicle_types: None,
        }
    }

    /// Creates a required client at the given coordinates, with no demands
    /// and an unbounded time window.
    pub fn client(x: i64, y: i64) -> Self {
        Self {
            required: true,
            is_depot: false,
            ..Self::depot(x, y)
        }
    }

    /// Sets the delivery quantities, one per capacity dimension.
    pub fn with_delivery(mut self, delivery: Vec<Load>) -> Self {
        self.delivery = delivery;
        self
    }

    /// Sets the pickup quantities, one per capacity dimension.
    pub fn with_pickup(mut self, pickup: Vec<Load>) -> Self {
        self.pickup = pickup;
        self
    }

    /// Sets the service duration.
    pub fn with_service_duration(mut self, duration: Duration) -> Self {
        self.service_duration = duration;
        self
    }

    /// Sets the time window `[early, late]`.
    pub fn with_time_window(mut self, early: Duration, late: Duration) -> Self {
        self.tw_early = early;
        self.tw_late = late;
        self
    }

    /// Sets the release time.
    pub fn with_release_time(mut self, release: Duration) -> Self {
        self.release_time = release;
        self
    }

    /// Sets the prize collected by visiting this client.
    pub fn with_prize(mut self, prize: Cost) -> Self {
        self.prize = prize;
        self
    }

    /// Marks this client as required or optional.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Assigns this client to a mutually exclusive group.
    pub fn with_group(mut self, group: usize) -> Self {
        self.group = Some(group);
        self
    }

    /// Restricts this client to the given vehicle types.
    pub fn with_vehicle_types(mut self, vehicle_types: Vec<usize>) -> Self {
        self.vehicle_types = Some(vehicle_types);
        self
    }

    /// X-coordinate.
    pub fn x(&self) -> i64 {
        self.x
    }

    /// Y-coordinate.
    pub fn y(&self) -> i64 {
        self.y
    }

    /// Returns `true` if this location is a depot.
    pub fn is_depot(&self) -> bool {
        self.is_depot
    }

    /// Delivery quantities per capacity dimension.
    pub fn delivery(&self) -> &[Load] {
        &self.delivery
    }

    /// Pickup quantities per capacity dimension.
    pub fn pickup(&self) -> &[Load] {
        &self.pickup
    }

    /// Delivery quantity in the given dimension (zero if unset).
    pub fn delivery_dim(&self, dim: usize) -> Load {
        self.delivery.get(dim).copied().unwrap_or(0)
    }

    /// Pickup quantity in the given dimension (zero if unset).
    pub fn pickup_dim(&self, dim: usize) -> Load {
        self.pickup.get(dim).copied().unwrap_or(0)
    }

    /// Service duration at this location.
    pub fn service_duration(&self) -> Duration {
        self.service_duration
    }

    /// Opening of the time window.
    pub fn tw_early(&self) -> Duration {
        self.tw_early
    }

    /// Closing of the time window.
    pub fn tw_late(&self) -> Duration {
        self.tw_late
    }

    /// Earliest time this location's goods are available at the depot.
    pub fn release_time(&self) -> Duration {
        self.release_time
    }

    /// Prize for visiting this client.
    pub fn prize(&self) -> Cost {
        self.prize
    }

    /// Whether this client must be part of every solution.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Mutually exclusive group membership, if any.
    pub fn group(&self) -> Option<usize> {
        self.group
    }

    /// Permitted vehicle types; `None` means all types are permitted.
    pub fn vehicle_types(&self) -> Option<&[usize]> {
        self.vehicle_types.as_deref()
    }

    /// Returns `true` if this location may be served by the given vehicle
    /// type.
    pub fn allows_vehicle_type(&self, vehicle_type: usize) -> bool {
        match &self.vehicle_types {
            Some(types) => types.contains(&vehicle_type),
            None => true,
        }
    }
}
