use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use domain::DomainError;
use futures::SinkExt;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

const MAX_LINE_LENGTH: usize = 64 * 1024;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Inbound half of a session: newline-delimited messages, one reader per session
pub type SessionReader = FramedRead<Box<dyn AsyncRead + Send + Unpin>, LinesCodec>;

type SessionWriter = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, LinesCodec>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One connected client.
///
/// Writes go through a lock because direct replies and broadcasts come from different tasks
/// and must never interleave partial lines.
pub struct Session {
    id: SessionId,
    peer: String,
    writer: Mutex<SessionWriter>,
}

impl Session {
    pub fn new<R, W>(reader: R, writer: W, peer: impl Into<String>) -> (Arc<Self>, SessionReader)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);

        let session = Arc::new(Self {
            id: SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)),
            peer: peer.into(),
            writer: Mutex::new(FramedWrite::new(writer, LinesCodec::new())),
        });
        let reader = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        (session, reader)
    }

    pub fn from_tcp(stream: TcpStream) -> std::io::Result<(Arc<Self>, SessionReader)> {
        let peer = stream.peer_addr()?;
        let (reader, writer) = stream.into_split();
        Ok(Self::new(reader, writer, peer.to_string()))
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Writes one line (the newline is appended) and flushes it.
    pub async fn send(&self, line: &str) -> Result<(), DomainError> {
        let mut writer = self.writer.lock().await;
        writer.send(line).await.map_err(|e| {
            DomainError::Transport(format!("Sending to {} failed: {}", self.peer, e))
        })
    }

    pub async fn send_json<T: Serialize + ?Sized>(&self, message: &T) -> Result<(), DomainError> {
        let line = serde_json::to_string(message)
            .map_err(|e| DomainError::Decode(format!("Encoding message failed: {}", e)))?;
        self.send(&line).await
    }
}
