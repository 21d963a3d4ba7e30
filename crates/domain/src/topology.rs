use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{DomainError, Result};
use crate::sensor::SensorAddress;

/// Validated house layout the relay tree and the rooms are built from
#[derive(Debug, Clone, PartialEq)]
pub struct HomeTopology {
    pub server_port: u16,
    pub tick: Duration,
    pub valve: SocketAddr,
    pub levels: Vec<Level>,
}

/// One heating level: a manifold board, its pump coil and the rooms it serves
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    pub kind: String,
    pub manifold: SocketAddr,
    pub pump: u16,
    pub rooms: Vec<RoomLoops>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomLoops {
    pub name: String,
    pub sensor: SensorAddress,
    pub loops: Vec<u16>,
}

impl HomeTopology {
    /// Checks the invariants the relay tree relies on.
    pub fn validate(&self) -> Result<()> {
        if self.tick.is_zero() {
            return Err(DomainError::InvalidConfiguration(
                "Control tick must be greater than zero".into(),
            ));
        }

        let mut names = HashSet::new();
        for level in &self.levels {
            for room in &level.rooms {
                if !names.insert(room.name.as_str()) {
                    return Err(DomainError::InvalidConfiguration(format!(
                        "Duplicate room name: {}",
                        room.name
                    )));
                }
                if room.loops.is_empty() {
                    return Err(DomainError::InvalidConfiguration(format!(
                        "Room {} has no heating loops",
                        room.name
                    )));
                }
                if room.loops.contains(&level.pump) {
                    return Err(DomainError::InvalidConfiguration(format!(
                        "Room {} uses pump relay {} of level {} as a loop",
                        room.name, level.pump, level.kind
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn rooms(&self) -> impl Iterator<Item = &RoomLoops> {
        self.levels.iter().flat_map(|level| level.rooms.iter())
    }
}
