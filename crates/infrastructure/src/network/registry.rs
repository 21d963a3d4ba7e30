use std::collections::HashMap;
use std::sync::Arc;

use domain::DomainError;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::session::{Session, SessionId};

/// Sessions currently attached to one server
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn attach(&self, session: Arc<Session>) {
        debug!(session = %session.id(), peer = session.peer(), "Session attached");
        self.sessions.lock().await.insert(session.id(), session);
    }

    pub async fn detach(&self, id: SessionId) {
        if self.sessions.lock().await.remove(&id).is_some() {
            debug!(session = %id, "Session detached");
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Sends `line` to every attached session at once.
    ///
    /// Works on a snapshot, so sessions attaching or detaching meanwhile are not blocked.
    /// Every session is attempted; failures are collected into one error.
    pub async fn broadcast(&self, line: &str) -> Result<(), DomainError> {
        let snapshot: Vec<Arc<Session>> = self.sessions.lock().await.values().cloned().collect();
        if snapshot.is_empty() {
            return Ok(());
        }

        let results = join_all(snapshot.iter().map(|session| session.send(line))).await;

        let failures: Vec<String> = snapshot
            .iter()
            .zip(results)
            .filter_map(|(session, result)| {
                result.err().map(|e| {
                    warn!(session = %session.id(), peer = session.peer(), error = %e, "Broadcast failed");
                    e.to_string()
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Transport(format!(
                "Broadcast failed for {} of {} sessions: {}",
                failures.len(),
                snapshot.len(),
                failures.join("; ")
            )))
        }
    }

    pub async fn broadcast_json<T: Serialize + ?Sized>(&self, message: &T) -> Result<(), DomainError> {
        let line = serde_json::to_string(message)
            .map_err(|e| DomainError::Decode(format!("Encoding message failed: {}", e)))?;
        self.broadcast(&line).await
    }
}
