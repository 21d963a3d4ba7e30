mod compound;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

pub use compound::CompoundRelay;

/// On/off actuator capability.
///
/// Implemented by physical relays (manifold coils, the main valve) and by the virtual relays of
/// the demand-aggregation tree. Both operations are idempotent from the caller's perspective.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Relay: Send + Sync {
    async fn enable(&self) -> Result<()>;

    async fn disable(&self) -> Result<()>;
}

/// Relays exposed by one multi-relay board: its circulation pump and one relay per room.
#[derive(Clone)]
pub struct RelayGroup {
    pub pump: Arc<dyn Relay>,
    pub rooms: Vec<(String, Arc<dyn Relay>)>,
}
