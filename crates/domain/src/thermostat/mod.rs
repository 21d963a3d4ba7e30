mod control;
mod feature;
mod mode;

pub use control::{ControlAction, decide};
pub use feature::Features;
pub use mode::ThermostatMode;
