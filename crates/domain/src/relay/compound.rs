use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use super::Relay;
use crate::error::Result;

/// Fans every call out to all member relays concurrently.
///
/// Every member call runs to completion; the first failure (in member order) is returned.
/// Members that already switched are left as they are.
pub struct CompoundRelay {
    relays: Vec<Arc<dyn Relay>>,
}

impl CompoundRelay {
    pub fn new(relays: Vec<Arc<dyn Relay>>) -> Self {
        Self { relays }
    }
}

#[async_trait]
impl Relay for CompoundRelay {
    async fn enable(&self) -> Result<()> {
        join_all(self.relays.iter().map(|relay| relay.enable()))
            .await
            .into_iter()
            .collect()
    }

    async fn disable(&self) -> Result<()> {
        join_all(self.relays.iter().map(|relay| relay.disable()))
            .await
            .into_iter()
            .collect()
    }
}
