//! Problem instance data and construction-time validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::distance::Matrix;
use crate::models::{Location, VehicleType};
use crate::MAX_VALUE;

/// Instance validation failure, surfaced when constructing a
/// [`ProblemData`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("instance has no depots")]
    NoDepots,
    #[error("location {0} is on the wrong side of the depot/client boundary")]
    MisplacedLocation(usize),
    #[error("instance has no vehicles")]
    NoVehicles,
    #[error("expected one distance and one duration matrix per profile")]
    MatrixCountMismatch,
    #[error("matrix for profile {profile} is {actual}x{actual}, expected {expected}x{expected}")]
    MatrixSize {
        profile: usize,
        expected: usize,
        actual: usize,
    },
    #[error("matrix for profile {0} has an entry outside [0, MAX_VALUE]")]
    InvalidMatrixEntry(usize),
    #[error("location {0} has tw_early > tw_late")]
    InvalidTimeWindow(usize),
    #[error("vehicle type {0} has tw_early > tw_late")]
    InvalidShiftWindow(usize),
    #[error("vehicle type {0} references an unknown depot")]
    InvalidDepot(usize),
    #[error("vehicle type {0} references an unknown profile")]
    InvalidProfile(usize),
    #[error("vehicle type {0} has a negative cost or limit")]
    InvalidVehicleValue(usize),
    #[error("location {0} has more load dimensions than any vehicle type")]
    DimensionMismatch(usize),
    #[error("location {0} has a negative demand, prize, or duration")]
    InvalidLocationValue(usize),
    #[error("group {0} membership is inconsistent with its clients")]
    InconsistentGroup(usize),
    #[error("location {0} restricts itself to an unknown vehicle type")]
    InvalidVehicleTypeReference(usize),
    #[error("required client {0} cannot be reached by any permitted vehicle type")]
    UnreachableClient(usize),
}

/// A set of mutually exclusive clients: at most one member may be part of
/// any solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientGroup {
    clients: Vec<usize>,
}

impl ClientGroup {
    /// Creates a group over the given client locations.
    pub fn new(clients: Vec<usize>) -> Self {
        Self { clients }
    }

    /// Member client locations.
    pub fn clients(&self) -> &[usize] {
        &self.clients
    }
}

/// A validated, immutable routing problem instance.
///
/// Locations are indexed contiguously with all depots first, then all
/// clients. Each routing profile owns one distance and one duration matrix
/// over all locations.
///
/// # Examples
///
/// ```
/// use hgs_routing::distance::Matrix;
/// use hgs_routing::models::{Location, ProblemData, VehicleType};
///
/// let locations = vec![
///     Location::depot(0, 0),
///     Location::client(1, 0).with_delivery(vec![5]),
///     Location::client(2, 0).with_delivery(vec![5]),
/// ];
/// let m = Matrix::from_fn(3, |i, j| (i as i64 - j as i64).abs());
/// let data = ProblemData::new(
///     locations,
///     1,
///     vec![VehicleType::new(2, vec![10])],
///     vec![m.clone()],
///     vec![m],
///     vec![],
/// )
/// .unwrap();
/// assert_eq!(data.num_clients(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ProblemData {
    locations: Vec<Location>,
    num_depots: usize,
    vehicle_types: Vec<VehicleType>,
    distances: Vec<Matrix>,
    durations: Vec<Matrix>,
    groups: Vec<ClientGroup>,
    num_vehicles: usize,
    num_load_dims: usize,
    has_vehicle_restrictions: bool,
}

impl ProblemData {
    /// Builds and validates a problem instance.
    ///
    /// The first `num_depots` locations must be depots, the rest clients.
    /// `distances[p]` and `durations[p]` are the matrices of profile `p`.
    pub fn new(
        locations: Vec<Location>,
        num_depots: usize,
        vehicle_types: Vec<VehicleType>,
        distances: Vec<Matrix>,
        durations: Vec<Matrix>,
        groups: Vec<ClientGroup>,
    ) -> Result<Self, DataError> {
        if num_depots == 0 || num_depots > locations.len() {
            return Err(DataError::NoDepots);
        }

        for (idx, loc) in locations.iter().enumerate() {
            if loc.is_depot() != (idx < num_depots) {
                return Err(DataError::MisplacedLocation(idx));
            }
            if loc.tw_early() > loc.tw_late() {
                return Err(DataError::InvalidTimeWindow(idx));
            }
            let negative_demand = loc
                .delivery()
                .iter()
                .chain(loc.pickup())
                .any(|&q| q < 0);
            if negative_demand || loc.prize() < 0 || loc.service_duration() < 0 {
                return Err(DataError::InvalidLocationValue(idx));
            }
        }

        let num_vehicles = vehicle_types.iter().map(|vt| vt.num_available()).sum();
        if vehicle_types.is_empty() || num_vehicles == 0 {
            return Err(DataError::NoVehicles);
        }

        if distances.len() != durations.len() || distances.is_empty() {
            return Err(DataError::MatrixCountMismatch);
        }
        for (profile, matrix) in distances.iter().chain(durations.iter()).enumerate() {
            let profile = profile % distances.len();
            if matrix.size() != locations.len() {
                return Err(DataError::MatrixSize {
                    profile,
                    expected: locations.len(),
                    actual: matrix.size(),
                });
            }
            if matrix.values().iter().any(|&v| !(0..=MAX_VALUE).contains(&v)) {
                return Err(DataError::InvalidMatrixEntry(profile));
            }
        }

        let num_load_dims = vehicle_types
            .iter()
            .map(|vt| vt.capacity().len())
            .max()
            .unwrap_or(0);

        for (idx, vt) in vehicle_types.iter().enumerate() {
            if vt.start_depot() >= num_depots
                || vt.end_depot() >= num_depots
                || vt.reload_depots().iter().any(|&d| d >= num_depots)
            {
                return Err(DataError::InvalidDepot(idx));
            }
            if vt.profile() >= distances.len() {
                return Err(DataError::InvalidProfile(idx));
            }
            if vt.tw_early() > vt.tw_late() {
                return Err(DataError::InvalidShiftWindow(idx));
            }
            let negative = vt.capacity().iter().any(|&c| c < 0)
                || vt.fixed_cost() < 0
                || vt.unit_distance_cost() < 0
                || vt.unit_duration_cost() < 0
                || vt.max_duration() < 0
                || vt.max_distance() < 0;
            if negative {
                return Err(DataError::InvalidVehicleValue(idx));
            }
        }

        for (idx, loc) in locations.iter().enumerate().skip(num_depots) {
            if loc.delivery().len() > num_load_dims || loc.pickup().len() > num_load_dims {
                return Err(DataError::DimensionMismatch(idx));
            }
            if let Some(types) = loc.vehicle_types() {
                if types.iter().any(|&t| t >= vehicle_types.len()) {
                    return Err(DataError::InvalidVehicleTypeReference(idx));
                }
            }
        }

        for (g, group) in groups.iter().enumerate() {
            let consistent = group.clients().iter().all(|&c| {
                (num_depots..locations.len()).contains(&c) && locations[c].group() == Some(g)
            });
            if !consistent || group.clients().is_empty() {
                return Err(DataError::InconsistentGroup(g));
            }
        }

        let has_vehicle_restrictions = locations
            .iter()
            .any(|loc| loc.vehicle_types().is_some());

        let data = Self {
            locations,
            num_depots,
            vehicle_types,
            distances,
            durations,
            groups,
            num_vehicles,
            num_load_dims,
            has_vehicle_restrictions,
        };

        for client in data.clients() {
            if data.location(client).is_required() && !data.is_reachable(client) {
                return Err(DataError::UnreachableClient(client));
            }
        }

        Ok(data)
    }

    fn is_reachable(&self, client: usize) -> bool {
        self.vehicle_types.iter().enumerate().any(|(t, vt)| {
            let dist = &self.distances[vt.profile()];
            self.locations[client].allows_vehicle_type(t)
                && dist.get(vt.start_depot(), client) < MAX_VALUE
                && dist.get(client, vt.end_depot()) < MAX_VALUE
        })
    }

    /// Total number of locations (depots and clients).
    pub fn num_locations(&self) -> usize {
        self.locations.len()
    }

    /// Number of depots.
    pub fn num_depots(&self) -> usize {
        self.num_depots
    }

    /// Number of clients.
    pub fn num_clients(&self) -> usize {
        self.locations.len() - self.num_depots
    }

    /// Location indices of all clients.
    pub fn clients(&self) -> std::ops::Range<usize> {
        self.num_depots..self.locations.len()
    }

    /// The location at the given index.
    pub fn location(&self, idx: usize) -> &Location {
        &self.locations[idx]
    }

    /// All vehicle types.
    pub fn vehicle_types(&self) -> &[VehicleType] {
        &self.vehicle_types
    }

    /// The vehicle type at the given index.
    pub fn vehicle_type(&self, idx: usize) -> &VehicleType {
        &self.vehicle_types[idx]
    }

    /// Number of vehicle types.
    pub fn num_vehicle_types(&self) -> usize {
        self.vehicle_types.len()
    }

    /// Total number of vehicles over all types.
    pub fn num_vehicles(&self) -> usize {
        self.num_vehicles
    }

    /// Number of routing profiles.
    pub fn num_profiles(&self) -> usize {
        self.distances.len()
    }

    /// Distance matrix of the given profile.
    pub fn distance_matrix(&self, profile: usize) -> &Matrix {
        &self.distances[profile]
    }

    /// Duration matrix of the given profile.
    pub fn duration_matrix(&self, profile: usize) -> &Matrix {
        &self.durations[profile]
    }

    /// All client groups.
    pub fn groups(&self) -> &[ClientGroup] {
        &self.groups
    }

    /// Number of load dimensions (largest capacity vector length).
    pub fn num_load_dims(&self) -> usize {
        self.num_load_dims
    }

    /// Whether any client restricts its permitted vehicle types.
    pub fn has_vehicle_restrictions(&self) -> bool {
        self.has_vehicle_restrictions
    }

    /// Whether any vehicle type may reload.
    pub fn has_reloads(&self) -> bool {
        self.vehicle_types.iter().any(|vt| vt.max_reloads() > 0)
    }
}
