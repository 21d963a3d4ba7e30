pub mod frame;
mod manifold;
mod valve;

pub use manifold::{Manifold, ManifoldConnection, ManifoldRelay};
pub use valve::Valve;

use std::sync::Arc;

use domain::{HomeTopology, Relay};
use tracing::info;

/// Hardware the relay tree is built on
pub struct Drivers {
    pub valve: Arc<dyn Relay>,
    pub manifolds: Vec<Manifold>,
}

/// Factory for creating device drivers
pub struct DriverFactory;

impl DriverFactory {
    /// Create the valve and one manifold driver per level
    pub fn create_drivers(topology: &HomeTopology) -> Drivers {
        info!(endpoint = %topology.valve, "Creating valve driver");
        let valve = Arc::new(Valve::new(topology.valve)) as Arc<dyn Relay>;

        let manifolds = topology
            .levels
            .iter()
            .map(|level| {
                info!(
                    level = %level.kind,
                    endpoint = %level.manifold,
                    pump = level.pump,
                    rooms = level.rooms.len(),
                    "Creating manifold driver"
                );
                Manifold::from_level(level)
            })
            .collect();

        Drivers { valve, manifolds }
    }
}
