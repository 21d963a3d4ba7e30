//! Application layer - Use cases and business workflows
//!
//! - `floor_heating`: the demand-aggregation tree over manifolds, pumps and the valve
//! - `thermostat`: per-room control loop and its session protocol
//! - `home`: rooms, house discovery and the supervisor running them

pub mod floor_heating;
pub mod home;
pub mod thermostat;

pub use floor_heating::{DependentRelay, HeatingLoops, SignalingRelay};
pub use home::{Controller, Discovery, Room};
pub use thermostat::{Thermostat, ThermostatDevices};
