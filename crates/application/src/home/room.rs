use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use domain::DomainError;
use infrastructure::network::{Listener, SessionHandler};
use tokio_util::sync::CancellationToken;

use crate::thermostat::Thermostat;

/// A thermostat together with the endpoint its clients connect to
pub struct Room {
    thermostat: Arc<Thermostat>,
    listener: Listener,
}

impl Room {
    pub async fn bind(thermostat: Arc<Thermostat>, address: SocketAddr) -> Result<Self, DomainError> {
        let listener = Listener::bind(thermostat.name(), address).await?;
        Ok(Self {
            thermostat,
            listener,
        })
    }

    pub fn thermostat(&self) -> &Arc<Thermostat> {
        &self.thermostat
    }

    pub fn port(&self) -> Result<u16, DomainError> {
        self.listener.port()
    }

    /// Runs the control loop and the session listener until either stops.
    pub async fn run(self, token: CancellationToken) -> Result<()> {
        let name = self.thermostat.name().to_string();
        let handler: Arc<dyn SessionHandler> = self.thermostat.clone();

        tokio::select! {
            controlled = self.thermostat.clone().run(token.clone()) => {
                controlled.with_context(|| format!("Room {} thermostat failed", name))
            }
            served = self.listener.run(handler, token.clone()) => {
                served.with_context(|| format!("Room {} server failed", name))
            }
        }
    }
}
