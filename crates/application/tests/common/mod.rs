#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use domain::{
    DomainError, Humidity, HumiditySensor, Relay, Temperature, TemperatureSensor,
};
use tokio::sync::{Mutex, watch};

/// Shared, ordered record of every relay call
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.lock().await)
    }

    pub async fn count(&self, call: &str) -> usize {
        self.calls.lock().await.iter().filter(|c| *c == call).count()
    }

    async fn push(&self, call: String) {
        self.calls.lock().await.push(call);
    }
}

/// Relay that records `"<name> on"` / `"<name> off"` and can be told to fail
pub struct RecordingRelay {
    name: String,
    log: CallLog,
    failing: AtomicBool,
}

impl RecordingRelay {
    pub fn new(name: &str, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            failing: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    async fn record(&self, state: &str) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::device(format!("{} unreachable", self.name)));
        }
        self.log.push(format!("{} {}", self.name, state)).await;
        Ok(())
    }
}

#[async_trait]
impl Relay for RecordingRelay {
    async fn enable(&self) -> Result<(), DomainError> {
        self.record("on").await
    }

    async fn disable(&self) -> Result<(), DomainError> {
        self.record("off").await
    }
}

/// Relay whose calls wait until the test opens the gate, then record like `RecordingRelay`
pub struct GatedRelay {
    gate: watch::Sender<bool>,
    inner: Arc<RecordingRelay>,
}

impl GatedRelay {
    pub fn new(name: &str, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            gate: watch::Sender::new(false),
            inner: RecordingRelay::new(name, log),
        })
    }

    pub fn open(&self) {
        self.gate.send_replace(true);
    }

    async fn pass(&self) {
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
    }
}

#[async_trait]
impl Relay for GatedRelay {
    async fn enable(&self) -> Result<(), DomainError> {
        self.pass().await;
        self.inner.enable().await
    }

    async fn disable(&self) -> Result<(), DomainError> {
        self.pass().await;
        self.inner.disable().await
    }
}

/// Sensor whose readings the test sets directly
#[derive(Default)]
pub struct FakeSensor {
    temperature: Mutex<Option<Temperature>>,
    humidity: Mutex<Option<Humidity>>,
}

impl FakeSensor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reading(celsius: f64, percent: u8) -> Arc<Self> {
        Arc::new(Self {
            temperature: Mutex::new(Some(Temperature::from_celsius(celsius))),
            humidity: Mutex::new(Some(Humidity::from_percent(percent))),
        })
    }

    pub async fn set_temperature(&self, celsius: f64) {
        *self.temperature.lock().await = Some(Temperature::from_celsius(celsius));
    }
}

#[async_trait]
impl TemperatureSensor for FakeSensor {
    async fn temperature(&self) -> Option<Temperature> {
        *self.temperature.lock().await
    }
}

#[async_trait]
impl HumiditySensor for FakeSensor {
    async fn humidity(&self) -> Option<Humidity> {
        *self.humidity.lock().await
    }
}
