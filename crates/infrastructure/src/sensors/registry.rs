use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use domain::{Humidity, HumiditySensor, SensorAddress, Temperature, TemperatureSensor};
use tokio::sync::RwLock;

#[derive(Debug, Default, Clone, Copy)]
struct Climate {
    temperature: Option<Temperature>,
    humidity: Option<Humidity>,
}

/// Last values reported by one physical sensor
#[derive(Debug, Default)]
pub struct SensorReading {
    climate: RwLock<Climate>,
}

impl SensorReading {
    pub async fn update(&self, temperature: Temperature, humidity: Humidity) {
        let mut climate = self.climate.write().await;
        climate.temperature = Some(temperature);
        climate.humidity = Some(humidity);
    }
}

#[async_trait]
impl TemperatureSensor for SensorReading {
    async fn temperature(&self) -> Option<Temperature> {
        self.climate.read().await.temperature
    }
}

#[async_trait]
impl HumiditySensor for SensorReading {
    async fn humidity(&self) -> Option<Humidity> {
        self.climate.read().await.humidity
    }
}

/// Readings keyed by sensor address, shared by the listener and the thermostats
#[derive(Debug, Default)]
pub struct SensorRegistry {
    readings: DashMap<SensorAddress, Arc<SensorReading>>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the reading for `address`, creating an empty one if nothing was received yet.
    pub fn sensor(&self, address: SensorAddress) -> Arc<SensorReading> {
        self.readings.entry(address).or_default().clone()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: SensorAddress = SensorAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]);

    #[tokio::test]
    async fn test_unread_sensor_reports_nothing() {
        let registry = SensorRegistry::new();
        let sensor = registry.sensor(ADDRESS);
        assert_eq!(sensor.temperature().await, None);
        assert_eq!(sensor.humidity().await, None);
    }

    #[tokio::test]
    async fn test_same_address_shares_reading() {
        let registry = SensorRegistry::new();
        let thermostat_side = registry.sensor(ADDRESS);
        registry
            .sensor(ADDRESS)
            .update(Temperature::from_tenths(213), Humidity::from_percent(48))
            .await;

        assert_eq!(thermostat_side.temperature().await, Some(Temperature::from_tenths(213)));
        assert_eq!(thermostat_side.humidity().await, Some(Humidity::from_percent(48)));
        assert_eq!(registry.len(), 1);
    }
}
