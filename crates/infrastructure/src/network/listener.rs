use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use domain::DomainError;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::registry::SessionRegistry;
use super::session::{Session, SessionReader};

/// Per-connection protocol of a server
#[async_trait]
pub trait SessionHandler: Send + Sync + 'static {
    /// Registry the server broadcasts through
    fn sessions(&self) -> &SessionRegistry;

    /// Runs the protocol for one session until the peer leaves, the token is cancelled,
    /// or the protocol decides it is done.
    async fn communicate(
        &self,
        session: &Arc<Session>,
        reader: &mut SessionReader,
        token: &CancellationToken,
    ) -> Result<(), DomainError>;
}

/// Attaches the session, runs the handler and detaches it again whatever the outcome.
pub async fn serve_session<H>(
    handler: &H,
    session: Arc<Session>,
    mut reader: SessionReader,
    token: CancellationToken,
) -> Result<(), DomainError>
where
    H: SessionHandler + ?Sized,
{
    handler.sessions().attach(session.clone()).await;
    let result = handler.communicate(&session, &mut reader, &token).await;
    handler.sessions().detach(session.id()).await;
    result
}

/// TCP accept loop feeding a [`SessionHandler`]
pub struct Listener {
    name: String,
    listener: TcpListener,
}

impl Listener {
    /// Binds immediately so the chosen port is known before `run` starts.
    pub async fn bind(name: impl Into<String>, address: SocketAddr) -> Result<Self, DomainError> {
        let name = name.into();
        let listener = TcpListener::bind(address).await.map_err(|e| {
            DomainError::Transport(format!("{} failed to bind {}: {}", name, address, e))
        })?;
        Ok(Self { name, listener })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DomainError> {
        self.listener
            .local_addr()
            .map_err(|e| DomainError::Transport(format!("{} has no local address: {}", self.name, e)))
    }

    pub fn port(&self) -> Result<u16, DomainError> {
        self.local_addr().map(|address| address.port())
    }

    /// Accepts until cancelled. Each connection is served on its own task.
    pub async fn run(
        self,
        handler: Arc<dyn SessionHandler>,
        token: CancellationToken,
    ) -> Result<(), DomainError> {
        let address = self.local_addr()?;
        info!(server = %self.name, %address, "Listening");

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!(server = %self.name, "Listener stopped");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(connection) => connection,
                        Err(e) => {
                            error!(server = %self.name, error = %e, "Accept failed");
                            continue;
                        }
                    };

                    let (session, reader) = match Session::from_tcp(stream) {
                        Ok(session) => session,
                        Err(e) => {
                            warn!(server = %self.name, %peer, error = %e, "Dropping connection");
                            continue;
                        }
                    };

                    let handler = handler.clone();
                    let token = token.child_token();
                    let name = self.name.clone();
                    tokio::spawn(async move {
                        debug!(server = %name, %peer, session = %session.id(), "Client connected");
                        match serve_session(handler.as_ref(), session, reader, token).await {
                            Ok(()) => debug!(server = %name, %peer, "Client disconnected"),
                            Err(e) if e.is_cancelled() => debug!(server = %name, %peer, "Session cancelled"),
                            Err(e) => warn!(server = %name, %peer, error = %e, "Session ended with error"),
                        }
                    });
                }
            }
        }
    }
}
