//! Climate readings pushed by the room sensors over UDP.

mod listener;
mod registry;

pub use listener::{SensorListener, SensorUpdate, parse_notification};
pub use registry::{SensorReading, SensorRegistry};
