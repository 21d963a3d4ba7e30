use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use futures::future::join_all;
use domain::{DomainError, HomeTopology};
use infrastructure::network::Listener;
use infrastructure::sensors::SensorRegistry;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::discovery::{Discovery, RoomSummary};
use super::room::Room;
use crate::floor_heating::HeatingLoops;
use crate::thermostat::{Thermostat, ThermostatDevices};

/// Supervisor of every room and the discovery endpoint
pub struct Controller {
    rooms: Vec<Room>,
    discovery: Arc<Discovery>,
    listener: Listener,
}

impl Controller {
    /// Binds one endpoint per room on an ephemeral port, then the discovery endpoint on the
    /// configured server port.
    pub async fn build(
        topology: &HomeTopology,
        loops: &HeatingLoops,
        sensors: &SensorRegistry,
        host: IpAddr,
    ) -> Result<Self, DomainError> {
        let mut rooms = Vec::new();
        for room in topology.rooms() {
            let heating_loop = loops.room(&room.name).ok_or_else(|| {
                DomainError::InvalidConfiguration(format!("Room {} has no heating loop", room.name))
            })?;
            let sensor = sensors.sensor(room.sensor);
            let thermostat = Thermostat::new(
                room.name.clone(),
                topology.tick,
                ThermostatDevices {
                    heating_loop,
                    temperature: sensor.clone(),
                    humidity: sensor,
                },
            );
            rooms.push(Room::bind(thermostat, SocketAddr::new(host, 0)).await?);
        }

        let summaries = rooms
            .iter()
            .map(|room| {
                let thermostat = room.thermostat();
                Ok(RoomSummary::new(
                    thermostat.name(),
                    thermostat.features(),
                    room.port()?,
                ))
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        for summary in &summaries {
            info!(room = %summary.name, port = summary.port, serial = %summary.serial, "Room endpoint bound");
        }

        let listener =
            Listener::bind("discovery", SocketAddr::new(host, topology.server_port)).await?;

        Ok(Self {
            rooms,
            discovery: Arc::new(Discovery::new(summaries)),
            listener,
        })
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn discovery_port(&self) -> Result<u16, DomainError> {
        self.listener.port()
    }

    /// Runs everything until cancelled. Any task stopping on its own is an error.
    ///
    /// Discovery only starts serving once every room's thermostat is ready.
    pub async fn run(self, token: CancellationToken) -> Result<()> {
        let mut tasks = JoinSet::new();

        let thermostats: Vec<_> = self.rooms.iter().map(|room| room.thermostat().clone()).collect();
        for room in self.rooms {
            tasks.spawn(room.run(token.clone()));
        }
        info!(rooms = thermostats.len(), "Waiting for rooms to become ready");

        let ready = tokio::select! {
            _ = token.cancelled() => false,
            _ = join_all(thermostats.iter().map(|thermostat| thermostat.wait_ready())) => true,
            Some(joined) = tasks.join_next() => {
                Self::settle(joined, &token)?;
                false
            }
        };

        if ready {
            let listener = self.listener;
            let discovery = self.discovery;
            let discovery_token = token.clone();
            tasks.spawn(async move {
                listener
                    .run(discovery, discovery_token)
                    .await
                    .context("Discovery server failed")
            });
            info!(tasks = tasks.len(), "Controller running");
        }

        while let Some(joined) = tasks.join_next().await {
            Self::settle(joined, &token)?;
        }

        info!("Controller stopped");
        Ok(())
    }

    /// Accepts a finished task only while shutting down.
    fn settle(joined: Result<Result<()>, JoinError>, token: &CancellationToken) -> Result<()> {
        let outcome = joined.context("Controller task panicked")?;
        if token.is_cancelled() {
            if let Err(e) = outcome {
                warn!(error = %e, "Controller task failed during shutdown");
            }
            return Ok(());
        }
        Err(match outcome {
            Ok(()) => anyhow!("Controller task ended unexpectedly"),
            Err(e) => e,
        })
    }
}
