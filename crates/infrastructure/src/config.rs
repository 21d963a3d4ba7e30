use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use domain::{DomainError, HomeTopology, Level, RoomLoops, SensorAddress};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Discovery (TCP) and sensor (UDP) port
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ControlConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

fn default_tick_ms() -> u64 {
    5000
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EndpointConfig {
    pub address: String,
    pub port: u16,
}

impl EndpointConfig {
    fn socket_addr(&self, what: &str) -> Result<SocketAddr, DomainError> {
        let ip: IpAddr = self.address.parse().map_err(|e| {
            DomainError::InvalidConfiguration(format!(
                "Invalid {} address {}: {}",
                what, self.address, e
            ))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LevelConfig {
    pub kind: String,
    pub manifold: EndpointConfig,
    pub pump: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RoomConfig {
    pub name: String,
    pub level: String,
    pub sensor: String,
    pub loops: Vec<u16>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ControllerConfig {
    #[serde(default)]
    pub log: LogConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub control: ControlConfig,
    pub valve: EndpointConfig,
    #[serde(default)]
    pub levels: Vec<LevelConfig>,
    #[serde(default)]
    pub rooms: Vec<RoomConfig>,
}

impl ControllerConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Self::builder()?
            // Required so the controller never starts without a house layout
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(true))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // e.g. CLIMATE__SERVER__PORT=5001
            .add_source(
                Environment::with_prefix("CLIMATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("log.level", default_log_level())?
            .set_default("control.tick_ms", default_tick_ms() as i64)
    }

    /// Resolves room levels and addresses into a validated topology.
    pub fn into_topology(self) -> Result<HomeTopology, DomainError> {
        let mut levels = self
            .levels
            .iter()
            .map(|level| {
                Ok(Level {
                    kind: level.kind.clone(),
                    manifold: level
                        .manifold
                        .socket_addr(&format!("manifold of level {}", level.kind))?,
                    pump: level.pump,
                    rooms: Vec::new(),
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        for room in self.rooms {
            let sensor = room.sensor.parse::<SensorAddress>().map_err(|_| {
                DomainError::InvalidConfiguration(format!(
                    "Room {} has an invalid sensor address: {}",
                    room.name, room.sensor
                ))
            })?;
            let level = levels
                .iter_mut()
                .find(|level| level.kind == room.level)
                .ok_or_else(|| {
                    DomainError::InvalidConfiguration(format!(
                        "Room {} references unknown level {}",
                        room.name, room.level
                    ))
                })?;
            level.rooms.push(RoomLoops {
                name: room.name,
                sensor,
                loops: room.loops,
            });
        }

        let topology = HomeTopology {
            server_port: self.server.port,
            tick: Duration::from_millis(self.control.tick_ms),
            valve: self.valve.socket_addr("valve")?,
            levels,
        };
        topology.validate()?;
        Ok(topology)
    }
}
