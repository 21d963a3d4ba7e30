mod floor_heating;
pub mod protocol;

pub use floor_heating::{Thermostat, ThermostatDevices};
