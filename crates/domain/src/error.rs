use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Hardware call failed or the device did not confirm the command
    #[error("Device error: {0}")]
    Device(String),

    /// Connection-level failure (connect/send/receive)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Cooperative shutdown, never a failure
    #[error("Operation cancelled")]
    Cancelled,

    /// Malformed inbound message
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl DomainError {
    pub fn device(message: impl Into<String>) -> Self {
        Self::Device(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
