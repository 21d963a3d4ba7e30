use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use domain::topology::Level;
use domain::{CompoundRelay, DomainError, Relay, RelayGroup};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::frame::coil_command;

const RESPONSE_BUFFER_LEN: usize = 16;

/// Persistent TCP link to one manifold board.
///
/// The mutex doubles as the send lock: one request is in flight per board, shared by the pump
/// and every room relay. The stream is taken out of the slot for the duration of an exchange
/// and only put back when the exchange succeeded, so any error (or a cancelled call) leaves the
/// slot empty and the next call reconnects.
pub struct ManifoldConnection {
    endpoint: SocketAddr,
    stream: Mutex<Option<TcpStream>>,
}

impl ManifoldConnection {
    pub fn new(endpoint: SocketAddr) -> Self {
        Self {
            endpoint,
            stream: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    /// Sends `request` and returns whatever the board answered (at most 16 bytes).
    pub async fn transact(&self, request: &[u8]) -> Result<Vec<u8>, DomainError> {
        let mut slot = self.stream.lock().await;

        let mut stream = match slot.take() {
            Some(stream) => stream,
            None => {
                debug!(endpoint = %self.endpoint, "Connecting to manifold");
                TcpStream::connect(self.endpoint).await.map_err(|e| {
                    error!(endpoint = %self.endpoint, error = %e, "Manifold communication error");
                    DomainError::device(format!("Manifold {} connect failed: {}", self.endpoint, e))
                })?
            }
        };

        match Self::exchange(&mut stream, request).await {
            Ok(response) => {
                *slot = Some(stream);
                Ok(response)
            }
            Err(e) => {
                error!(endpoint = %self.endpoint, error = %e, "Manifold communication error");
                Err(DomainError::device(format!(
                    "Manifold {} communication failed: {}",
                    self.endpoint, e
                )))
            }
        }
    }

    async fn exchange(stream: &mut TcpStream, request: &[u8]) -> std::io::Result<Vec<u8>> {
        stream.write_all(request).await?;

        let mut buffer = [0u8; RESPONSE_BUFFER_LEN];
        let received = stream.read(&mut buffer).await?;
        if received == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        Ok(buffer[..received].to_vec())
    }
}

/// A single coil on a manifold board
pub struct ManifoldRelay {
    connection: Arc<ManifoldConnection>,
    index: u16,
}

impl ManifoldRelay {
    pub fn new(connection: Arc<ManifoldConnection>, index: u16) -> Self {
        Self { connection, index }
    }

    async fn send(&self, on: bool) -> Result<bool, DomainError> {
        let request = coil_command(self.index, on);
        let response = self.connection.transact(&request).await?;
        Ok(response == request)
    }
}

#[async_trait]
impl Relay for ManifoldRelay {
    async fn enable(&self) -> Result<(), DomainError> {
        let endpoint = self.connection.endpoint();
        debug!(%endpoint, index = self.index, "Enabling manifold relay");

        // TODO: decide whether a mismatched enable echo should fail like disable does.
        if self.send(true).await? {
            debug!(%endpoint, index = self.index, "Enabled manifold relay");
        } else {
            error!(%endpoint, index = self.index, "Manifold relay enabling failed");
        }
        Ok(())
    }

    async fn disable(&self) -> Result<(), DomainError> {
        let endpoint = self.connection.endpoint();
        debug!(%endpoint, index = self.index, "Disabling manifold relay");

        if !self.send(false).await? {
            error!(%endpoint, index = self.index, "Manifold relay disabling failed");
            return Err(DomainError::device(format!(
                "Manifold {} relay {} disabling failed",
                endpoint, self.index
            )));
        }

        debug!(%endpoint, index = self.index, "Disabled manifold relay");
        Ok(())
    }
}

/// One heating level's board: a pump coil plus a compound relay per room
pub struct Manifold {
    connection: Arc<ManifoldConnection>,
    pump: Arc<ManifoldRelay>,
    rooms: Vec<(String, Arc<CompoundRelay>)>,
}

impl Manifold {
    pub fn new<I>(endpoint: SocketAddr, pump: u16, rooms: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<u16>)>,
    {
        let connection = Arc::new(ManifoldConnection::new(endpoint));
        let pump = Arc::new(ManifoldRelay::new(connection.clone(), pump));
        let rooms = rooms
            .into_iter()
            .map(|(name, loops)| {
                let relays = loops
                    .into_iter()
                    .map(|index| {
                        Arc::new(ManifoldRelay::new(connection.clone(), index)) as Arc<dyn Relay>
                    })
                    .collect();
                (name, Arc::new(CompoundRelay::new(relays)))
            })
            .collect();

        Self {
            connection,
            pump,
            rooms,
        }
    }

    pub fn from_level(level: &Level) -> Self {
        Self::new(
            level.manifold,
            level.pump,
            level
                .rooms
                .iter()
                .map(|room| (room.name.clone(), room.loops.clone())),
        )
    }

    pub fn endpoint(&self) -> SocketAddr {
        self.connection.endpoint()
    }

    pub fn pump(&self) -> Arc<dyn Relay> {
        self.pump.clone()
    }

    pub fn room(&self, name: &str) -> Option<Arc<dyn Relay>> {
        self.rooms
            .iter()
            .find(|(room, _)| room == name)
            .map(|(_, relay)| relay.clone() as Arc<dyn Relay>)
    }

    pub fn relay_group(&self) -> RelayGroup {
        RelayGroup {
            pump: self.pump(),
            rooms: self
                .rooms
                .iter()
                .map(|(name, relay)| (name.clone(), relay.clone() as Arc<dyn Relay>))
                .collect(),
        }
    }
}
