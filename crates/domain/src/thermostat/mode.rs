use serde::{Deserialize, Serialize};

/// Run state of a floor-heating thermostat
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThermostatMode {
    #[default]
    Off,
    Heat,
}

impl ThermostatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Heat => "heat",
        }
    }
}
