use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// Capability bitmask advertised to discovery clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Features(u8);

impl Features {
    pub const HEAT: Self = Self(1);
    pub const TEMPERATURE_SENSOR: Self = Self(16);
    pub const HUMIDITY_SENSOR: Self = Self(32);

    /// Everything a floor-heating room offers
    pub const FLOOR_HEATING: Self =
        Self(Self::HEAT.0 | Self::TEMPERATURE_SENSOR.0 | Self::HUMIDITY_SENSOR.0);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Features {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}
