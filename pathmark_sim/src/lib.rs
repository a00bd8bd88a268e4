//! Simulated vehicle backend for the path marker task.
//!
//! `SimBus` implements the transport and heading-resolver traits over a
//! shared in-process log; `SimVehicle` closes the loop with a first-order
//! plant so a task can run end-to-end without a vehicle.

pub mod bus;
pub mod error;
pub mod util;
pub mod vehicle;

pub use bus::{Publication, SimBus, SimResolver};
pub use error::SimError;
pub use vehicle::{SimVehicle, VehicleParams};
