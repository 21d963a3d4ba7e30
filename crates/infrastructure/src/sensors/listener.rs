use std::net::SocketAddr;
use std::sync::Arc;

use domain::{DomainError, Humidity, SensorAddress, Temperature};
use serde::Deserialize;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::registry::SensorRegistry;

const FULL_STATUS: &str = "NotifyFullStatus";
const DATAGRAM_LEN: usize = 8 * 1024;

#[derive(Debug, Deserialize)]
struct Notification {
    method: String,
    #[serde(default)]
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct FullStatus {
    sys: System,
    #[serde(rename = "temperature:0")]
    temperature: TemperatureComponent,
    #[serde(rename = "humidity:0")]
    humidity: HumidityComponent,
}

#[derive(Debug, Deserialize)]
struct System {
    mac: String,
}

#[derive(Debug, Deserialize)]
struct TemperatureComponent {
    #[serde(rename = "tC")]
    celsius: f64,
}

#[derive(Debug, Deserialize)]
struct HumidityComponent {
    rh: f64,
}

/// One decoded full-status notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorUpdate {
    pub address: SensorAddress,
    pub temperature: Temperature,
    pub humidity: Humidity,
}

/// Decodes a sensor datagram. Notifications other than full status yield `Ok(None)`.
pub fn parse_notification(datagram: &[u8]) -> Result<Option<SensorUpdate>, DomainError> {
    let notification: Notification = serde_json::from_slice(datagram)
        .map_err(|e| DomainError::Decode(format!("Invalid sensor notification: {}", e)))?;
    if notification.method != FULL_STATUS {
        return Ok(None);
    }

    let status: FullStatus = serde_json::from_value(notification.params)
        .map_err(|e| DomainError::Decode(format!("Invalid sensor status: {}", e)))?;
    let address = status
        .sys
        .mac
        .parse::<SensorAddress>()
        .map_err(|e| DomainError::Decode(e.to_string()))?;
    if !status.temperature.celsius.is_finite() {
        return Err(DomainError::Decode(format!(
            "Sensor {} reported an invalid temperature",
            address
        )));
    }

    Ok(Some(SensorUpdate {
        address,
        temperature: Temperature::from_celsius(status.temperature.celsius),
        humidity: Humidity::from_reading(status.humidity.rh),
    }))
}

/// UDP endpoint the room sensors push their status to
pub struct SensorListener {
    socket: UdpSocket,
    registry: Arc<SensorRegistry>,
}

impl SensorListener {
    pub async fn bind(address: SocketAddr, registry: Arc<SensorRegistry>) -> Result<Self, DomainError> {
        let socket = UdpSocket::bind(address).await.map_err(|e| {
            DomainError::Transport(format!("Sensor listener failed to bind {}: {}", address, e))
        })?;
        Ok(Self { socket, registry })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DomainError> {
        self.socket
            .local_addr()
            .map_err(|e| DomainError::Transport(e.to_string()))
    }

    /// Receives until cancelled. Bad datagrams are logged and skipped.
    pub async fn run(self, token: CancellationToken) -> Result<(), DomainError> {
        info!(address = %self.local_addr()?, "Sensor listener started");
        let mut buffer = vec![0u8; DATAGRAM_LEN];

        loop {
            let received = tokio::select! {
                _ = token.cancelled() => {
                    info!("Sensor listener stopped");
                    return Ok(());
                }
                received = self.socket.recv_from(&mut buffer) => received,
            };

            let (len, peer) = match received {
                Ok(datagram) => datagram,
                Err(e) => {
                    error!(error = %e, "Sensor communication error");
                    continue;
                }
            };

            match parse_notification(&buffer[..len]) {
                Ok(Some(update)) => {
                    self.registry
                        .sensor(update.address)
                        .update(update.temperature, update.humidity)
                        .await;
                    debug!(
                        sensor = %update.address,
                        temperature = %update.temperature,
                        humidity = %update.humidity,
                        "Sensor notification"
                    );
                }
                Ok(None) => {}
                Err(e) => error!(%peer, error = %e, "Sensor communication error"),
            }
        }
    }
}
