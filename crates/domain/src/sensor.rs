use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::climate::{Humidity, Temperature};
use crate::error::DomainError;

/// Last-known temperature of a room; `None` until the first reading arrives.
///
/// Implementations must not perform network I/O on read.
#[async_trait]
pub trait TemperatureSensor: Send + Sync {
    async fn temperature(&self) -> Option<Temperature>;
}

/// Last-known relative humidity of a room; `None` until the first reading arrives.
#[async_trait]
pub trait HumiditySensor: Send + Sync {
    async fn humidity(&self) -> Option<Humidity>;
}

/// Hardware (MAC) address of a climate sensor.
///
/// Accepts `AA:BB:CC:DD:EE:FF`, `AA-BB-CC-DD-EE-FF` and `AABBCCDDEEFF` in any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SensorAddress([u8; 6]);

impl SensorAddress {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for SensorAddress {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| *c != ':' && *c != '-').collect();
        if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidConfiguration(format!(
                "Invalid sensor address: {}",
                s
            )));
        }

        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).map_err(|e| {
                DomainError::InvalidConfiguration(format!("Invalid sensor address {}: {}", s, e))
            })?;
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for SensorAddress {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SensorAddress> for String {
    fn from(address: SensorAddress) -> Self {
        address.to_string()
    }
}

impl fmt::Display for SensorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}
