use std::collections::HashMap;
use std::sync::Arc;

use domain::{HomeTopology, Relay, RelayGroup};
use infrastructure::drivers::DriverFactory;
use tracing::info;

use super::dependent::DependentRelay;

/// Demand-aggregation tree of the whole house.
///
/// The valve node is the root, each manifold pump is a child of it, and every room relay is a
/// child of its manifold's pump. Switching a room leaf cascades up as far as the OR changes.
pub struct HeatingLoops {
    valve: Arc<DependentRelay>,
    pumps: Vec<Arc<DependentRelay>>,
    rooms: HashMap<String, Arc<dyn Relay>>,
}

impl HeatingLoops {
    pub async fn build(valve: Arc<dyn Relay>, groups: Vec<RelayGroup>) -> Self {
        let valve = DependentRelay::new("valve", valve);
        let mut pumps = Vec::with_capacity(groups.len());
        let mut rooms = HashMap::new();

        for (index, group) in groups.into_iter().enumerate() {
            let pump = valve.signaling(group.pump).await;
            let pump = DependentRelay::new(format!("pump {}", index), Arc::new(pump));

            for (name, relay) in group.rooms {
                let leaf = pump.signaling(relay).await;
                rooms.insert(name, Arc::new(leaf) as Arc<dyn Relay>);
            }
            pumps.push(pump);
        }

        info!(pumps = pumps.len(), rooms = rooms.len(), "Heating loops built");
        Self {
            valve,
            pumps,
            rooms,
        }
    }

    /// Creates the drivers for `topology` and builds the tree over them.
    pub async fn from_topology(topology: &HomeTopology) -> Self {
        let drivers = DriverFactory::create_drivers(topology);
        let groups = drivers
            .manifolds
            .iter()
            .map(|manifold| manifold.relay_group())
            .collect();
        Self::build(drivers.valve, groups).await
    }

    /// Leaf relay of a room: switches its loops and reports demand upwards.
    pub fn room(&self, name: &str) -> Option<Arc<dyn Relay>> {
        self.rooms.get(name).cloned()
    }

    pub fn valve(&self) -> &Arc<DependentRelay> {
        &self.valve
    }

    pub fn pumps(&self) -> &[Arc<DependentRelay>] {
        &self.pumps
    }
}
