use std::net::SocketAddr;

use async_trait::async_trait;
use domain::{DomainError, Relay};
use serde::Deserialize;
use tracing::{debug, error};

const RELAY_PATH: &str = "/relay/0";

/// Main water valve behind a smart-plug style HTTP relay.
///
/// Every call is a fresh HTTP request; nothing is kept between calls.
pub struct Valve {
    endpoint: SocketAddr,
}

/// Relay state reported by the plug after a switch request
#[derive(Debug, Clone, Copy, Deserialize)]
struct ValveStatus {
    ison: bool,
    overpower: bool,
}

impl Valve {
    pub fn new(endpoint: SocketAddr) -> Self {
        Self { endpoint }
    }

    fn url(&self, turn: &str) -> String {
        format!("http://{}{}?turn={}", self.endpoint, RELAY_PATH, turn)
    }

    async fn send(&self, turn: &str) -> Result<ValveStatus, DomainError> {
        let url = self.url(turn);

        let request = async {
            let client = reqwest::Client::builder()
                .pool_max_idle_per_host(0)
                .build()?;
            client.get(&url).send().await?.error_for_status()?.json::<ValveStatus>().await
        };

        request.await.map_err(|e| {
            error!(endpoint = %self.endpoint, error = %e, "Valve communication error");
            DomainError::device(format!("Valve {} communication failed: {}", self.endpoint, e))
        })
    }
}

#[async_trait]
impl Relay for Valve {
    async fn enable(&self) -> Result<(), DomainError> {
        debug!(endpoint = %self.endpoint, "Opening valve");

        let status = self.send("on").await?;
        if status.overpower {
            error!(endpoint = %self.endpoint, "Valve relay overpower");
            return Err(DomainError::device(format!(
                "Valve {} relay overpower",
                self.endpoint
            )));
        }
        if !status.ison {
            error!(endpoint = %self.endpoint, "Valve opening failed");
            return Err(DomainError::device(format!(
                "Valve {} opening failed",
                self.endpoint
            )));
        }

        debug!(endpoint = %self.endpoint, "Opened valve");
        Ok(())
    }

    async fn disable(&self) -> Result<(), DomainError> {
        debug!(endpoint = %self.endpoint, "Closing valve");

        let status = self.send("off").await?;
        if status.ison {
            error!(endpoint = %self.endpoint, "Valve closing failed");
            return Err(DomainError::device(format!(
                "Valve {} closing failed",
                self.endpoint
            )));
        }

        debug!(endpoint = %self.endpoint, "Closed valve");
        Ok(())
    }
}
