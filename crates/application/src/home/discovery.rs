use std::sync::Arc;

use async_trait::async_trait;
use domain::{DomainError, Features};
use infrastructure::network::{Session, SessionHandler, SessionReader, SessionRegistry};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub name: String,
    pub serial: Uuid,
    pub features: Features,
    pub port: u16,
}

impl RoomSummary {
    pub fn new(name: impl Into<String>, features: Features, port: u16) -> Self {
        let name = name.into();
        Self {
            serial: room_serial(&name, features),
            name,
            features,
            port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseSummary {
    pub version: String,
    pub rooms: Vec<RoomSummary>,
}

/// Name-based serial: the same room name and feature set always give the same serial.
pub fn room_serial(name: &str, features: Features) -> Uuid {
    let mut seed = Vec::with_capacity(name.len() + 1);
    seed.extend_from_slice(name.as_bytes());
    seed.push(features.bits());
    Uuid::new_v5(&Uuid::NAMESPACE_OID, &seed)
}

/// One-shot endpoint: every client receives the house summary once, then the session ends.
pub struct Discovery {
    summary: HouseSummary,
    sessions: SessionRegistry,
}

impl Discovery {
    pub fn new(rooms: Vec<RoomSummary>) -> Self {
        Self {
            summary: HouseSummary {
                version: env!("CARGO_PKG_VERSION").to_string(),
                rooms,
            },
            sessions: SessionRegistry::new(),
        }
    }

    pub fn summary(&self) -> &HouseSummary {
        &self.summary
    }
}

#[async_trait]
impl SessionHandler for Discovery {
    fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    async fn communicate(
        &self,
        session: &Arc<Session>,
        _reader: &mut SessionReader,
        _token: &CancellationToken,
    ) -> Result<(), DomainError> {
        debug!(peer = session.peer(), rooms = self.summary.rooms.len(), "Sending house summary");
        session.send_json(&self.summary).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serial_is_stable() {
        let first = room_serial("living", Features::FLOOR_HEATING);
        let second = room_serial("living", Features::FLOOR_HEATING);
        assert_eq!(first, second);
        assert_eq!(first.get_version_num(), 5);
    }

    #[test]
    fn test_serial_depends_on_name_and_features() {
        let living = room_serial("living", Features::FLOOR_HEATING);
        assert_ne!(living, room_serial("kitchen", Features::FLOOR_HEATING));
        assert_ne!(living, room_serial("living", Features::HEAT));
    }

    #[test]
    fn test_summary_shape() {
        let discovery = Discovery::new(vec![RoomSummary::new(
            "living",
            Features::FLOOR_HEATING,
            40123,
        )]);
        let value = serde_json::to_value(discovery.summary()).unwrap();

        assert_eq!(value["version"], json!(env!("CARGO_PKG_VERSION")));
        assert_eq!(value["rooms"][0]["name"], json!("living"));
        assert_eq!(value["rooms"][0]["features"], json!(49));
        assert_eq!(value["rooms"][0]["port"], json!(40123));
        assert_eq!(
            value["rooms"][0]["serial"],
            json!(room_serial("living", Features::FLOOR_HEATING).to_string())
        );
    }
}
