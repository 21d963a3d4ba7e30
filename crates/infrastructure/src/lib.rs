//! Infrastructure layer - External integrations

pub mod config;
pub mod drivers;
pub mod network;
pub mod sensors;

pub use config::ControllerConfig;
pub use drivers::{DriverFactory, Drivers, Manifold, Valve};
pub use network::{Listener, Session, SessionHandler, SessionReader, SessionRegistry};
pub use sensors::{SensorListener, SensorRegistry};
