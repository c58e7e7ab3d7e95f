//! Domain model types.
//!
//! - [`Location`] — a depot or client with service data and time windows
//! - [`VehicleType`] — a group of identical vehicles and their constraints
//! - [`ClientGroup`] — mutually exclusive clients
//! - [`ProblemData`] — the validated, immutable problem instance
//! - [`Route`] — a finished route with trip partition and statistics
//! - [`Solution`] — an immutable collection of routes

mod location;
mod problem;
mod route;
mod solution;
mod vehicle;

pub use location::Location;
pub use problem::{ClientGroup, DataError, ProblemData};
pub use route::Route;
pub use solution::Solution;
pub use vehicle::VehicleType;
