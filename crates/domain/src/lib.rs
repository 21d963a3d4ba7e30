//! Domain layer - Pure floor-heating logic with no I/O
//!
//! This crate contains:
//! - The `Relay` capability and fan-out composition
//! - Climate value types (fixed-point temperature, humidity)
//! - Sensor capabilities consumed by thermostats
//! - The thermostat decision table
//! - The validated house topology

pub mod climate;
pub mod error;
pub mod relay;
pub mod sensor;
pub mod thermostat;
pub mod topology;

// Re-export commonly used types
pub use climate::{Humidity, Temperature};
pub use error::DomainError;
pub use relay::{CompoundRelay, Relay, RelayGroup};
pub use sensor::{HumiditySensor, SensorAddress, TemperatureSensor};
pub use thermostat::{ControlAction, Features, ThermostatMode};
pub use topology::{HomeTopology, Level, RoomLoops};
