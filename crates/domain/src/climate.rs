use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Temperature in degrees Celsius with a fixed resolution of 0.1 °C.
///
/// Stored as tenths of a degree so comparisons in the control loop are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Temperature(i32);

impl Temperature {
    pub const fn from_tenths(tenths: i32) -> Self {
        Self(tenths)
    }

    /// Rounds to one decimal place, ties to even (18.25 → 18.2, 18.35 → 18.4).
    pub fn from_celsius(celsius: f64) -> Self {
        Self((celsius * 10.0).round_ties_even() as i32)
    }

    pub const fn tenths(self) -> i32 {
        self.0
    }

    pub fn celsius(self) -> f64 {
        f64::from(self.0) / 10.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.celsius())
    }
}

impl Serialize for Temperature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.celsius())
    }
}

impl<'de> Deserialize<'de> for Temperature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let celsius = f64::deserialize(deserializer)?;
        if !celsius.is_finite() {
            return Err(serde::de::Error::custom("temperature must be finite"));
        }
        Ok(Self::from_celsius(celsius))
    }
}

/// Relative humidity in whole percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Humidity(u8);

impl Humidity {
    pub const fn from_percent(percent: u8) -> Self {
        Self(percent)
    }

    /// Rounds ties to even and clamps to 0..=100.
    pub fn from_reading(percent: f64) -> Self {
        Self(percent.round_ties_even().clamp(0.0, 100.0) as u8)
    }

    pub const fn percent(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Humidity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
