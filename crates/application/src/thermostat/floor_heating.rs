use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use domain::{
    ControlAction, DomainError, Features, Humidity, HumiditySensor, Relay, Temperature,
    TemperatureSensor, ThermostatMode, thermostat::decide,
};
use futures::StreamExt;
use infrastructure::network::{Session, SessionHandler, SessionReader, SessionRegistry};
use tokio::sync::{Mutex, watch};
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_util::codec::LinesCodecError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::protocol::{
    self, Decoded, FALLBACK_HUMIDITY, FALLBACK_TEMPERATURE, GET_STATUS, NOTIFY_STATUS, Request,
    Response, SET_CONTROL, Status,
};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Climate {
    current_temperature: Option<Temperature>,
    target_temperature: Option<Temperature>,
    current_humidity: Option<Humidity>,
    current_state: ThermostatMode,
    target_state: ThermostatMode,
}

#[derive(Debug, Default)]
struct ThermostatState {
    climate: Climate,
    /// Set by any observable change, cleared when the loop broadcasts
    dirty: bool,
}

impl ThermostatState {
    fn modify(&mut self, change: impl FnOnce(&mut Climate)) {
        let before = self.climate;
        change(&mut self.climate);
        if self.climate != before {
            self.dirty = true;
        }
    }
}

/// Read-only devices a thermostat is bound to
pub struct ThermostatDevices {
    pub heating_loop: Arc<dyn Relay>,
    pub temperature: Arc<dyn TemperatureSensor>,
    pub humidity: Arc<dyn HumiditySensor>,
}

/// Bang-bang floor-heating thermostat of one room.
///
/// Owns the room's climate state, drives the room's leaf relay from the control loop, and
/// serves the room's status/control sessions.
pub struct Thermostat {
    name: String,
    tick: Duration,
    devices: ThermostatDevices,
    state: Mutex<ThermostatState>,
    sessions: SessionRegistry,
    /// Flips to `true` once startup has completed
    ready: watch::Sender<bool>,
}

impl Thermostat {
    pub fn new(name: impl Into<String>, tick: Duration, devices: ThermostatDevices) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            tick,
            devices,
            state: Mutex::new(ThermostatState::default()),
            sessions: SessionRegistry::new(),
            ready: watch::Sender::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> Features {
        Features::FLOOR_HEATING
    }

    /// Switches the loop off, takes a first reading and holds the current temperature.
    /// Marks the thermostat ready on success.
    pub async fn initialize(&self) -> Result<(), DomainError> {
        info!(room = %self.name, "Initializing thermostat");

        self.disable().await?;
        self.read_climate().await;

        {
            let mut state = self.state.lock().await;
            state.climate.target_temperature = state.climate.current_temperature;
        }
        self.ready.send_replace(true);
        info!(room = %self.name, "Thermostat ready");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Resolves once `initialize` has succeeded.
    pub async fn wait_ready(&self) {
        let mut ready = self.ready.subscribe();
        // the sender lives as long as `self`, so this cannot observe a closed channel
        let _ = ready.wait_for(|ready| *ready).await;
    }

    /// One control cycle: read sensors, decide, actuate.
    pub async fn step(&self) -> Result<(), DomainError> {
        self.read_climate().await;

        let action = {
            let state = self.state.lock().await;
            let climate = state.climate;
            decide(
                climate.current_temperature,
                climate.target_temperature,
                climate.current_state,
                climate.target_state,
            )
        };

        match action {
            ControlAction::None => Ok(()),
            ControlAction::Enable => self.enable().await,
            ControlAction::Disable => self.disable().await,
        }
    }

    /// Initializes, then runs the control loop until cancelled.
    pub async fn run(self: Arc<Self>, token: CancellationToken) -> Result<()> {
        tokio::select! {
            _ = token.cancelled() => return Ok(()),
            initialized = self.initialize() => initialized?,
        }

        info!(room = %self.name, tick_ms = self.tick.as_millis() as u64, "Starting thermostat control loop");
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!(room = %self.name, "Thermostat control loop cancelled");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = token.cancelled() => {
                            info!(room = %self.name, "Thermostat control loop cancelled mid-step");
                            return Ok(());
                        }
                        stepped = self.step() => {
                            if let Err(e) = stepped {
                                error!(room = %self.name, error = %e, "Thermostat control loop error");
                            }
                        }
                    }
                    if self.take_dirty().await {
                        self.spawn_broadcast(&token);
                    }
                }
            }
        }
    }

    fn spawn_broadcast(self: &Arc<Self>, token: &CancellationToken) {
        let thermostat = self.clone();
        let token = token.child_token();
        tokio::spawn(async move {
            debug!(room = %thermostat.name, "Broadcasting state change");
            tokio::select! {
                _ = token.cancelled() => {}
                sent = timeout(thermostat.tick, thermostat.broadcast_status()) => match sent {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(room = %thermostat.name, error = %e, "Status broadcast incomplete"),
                    Err(_) => warn!(room = %thermostat.name, "Status broadcast timed out"),
                },
            }
        });
    }

    pub async fn broadcast_status(&self) -> Result<(), DomainError> {
        let status = self.status(NOTIFY_STATUS).await;
        self.sessions.broadcast_json(&status).await
    }

    /// Returns and clears the change flag.
    pub async fn take_dirty(&self) -> bool {
        std::mem::take(&mut self.state.lock().await.dirty)
    }

    /// Status snapshot; unread values are replaced by fallbacks and reported as a failure.
    pub async fn status(&self, kind: &str) -> Response {
        let climate = self.state.lock().await.climate;
        let readings = (
            climate.current_temperature,
            climate.target_temperature,
            climate.current_humidity,
        );
        let (success, current_temperature, target_temperature, current_humidity) = match readings {
            (Some(current), Some(target), Some(humidity)) => (true, current, target, humidity),
            _ => (false, FALLBACK_TEMPERATURE, FALLBACK_TEMPERATURE, FALLBACK_HUMIDITY),
        };

        Response {
            kind: kind.to_string(),
            success,
            status: Some(Status {
                current_temperature,
                target_temperature,
                current_humidity,
                current_state: climate.current_state,
                target_state: climate.target_state,
            }),
        }
    }

    /// Applies whichever targets the request carries.
    pub async fn set_control(&self, request: &Request) -> Response {
        let mut state = self.state.lock().await;
        if let Some(temperature) = request.target_temperature {
            info!(room = %self.name, %temperature, "Setting target temperature");
            state.modify(|climate| climate.target_temperature = Some(temperature));
        }
        if let Some(mode) = request.target_state {
            info!(room = %self.name, state = mode.as_str(), "Setting target state");
            state.modify(|climate| climate.target_state = mode);
        }
        Response::success(SET_CONTROL)
    }

    pub async fn handle(&self, request: &Request) -> Response {
        match request.kind.as_str() {
            GET_STATUS => self.status(GET_STATUS).await,
            SET_CONTROL => self.set_control(request).await,
            other => Response::failure(other),
        }
    }

    /// Answers one inbound line; `None` when nothing can be answered.
    pub async fn handle_line(&self, line: &str) -> Option<Response> {
        if line.trim().is_empty() {
            return None;
        }

        match protocol::decode(line) {
            Ok(Decoded::Request(request)) => {
                debug!(room = %self.name, kind = %request.kind, "Received request");
                Some(self.handle(&request).await)
            }
            Ok(Decoded::Invalid { kind, error }) => {
                warn!(room = %self.name, %kind, error = %error, "Invalid request");
                Some(Response::failure(kind))
            }
            Err(e) => {
                warn!(room = %self.name, error = %e, "Undecodable request");
                None
            }
        }
    }

    async fn read_climate(&self) {
        let (temperature, humidity) = tokio::join!(
            self.devices.temperature.temperature(),
            self.devices.humidity.humidity()
        );

        self.state.lock().await.modify(|climate| {
            climate.current_temperature = temperature;
            climate.current_humidity = humidity;
        });
    }

    async fn enable(&self) -> Result<(), DomainError> {
        info!(room = %self.name, "Enabling floor heating");
        self.devices.heating_loop.enable().await?;
        self.state
            .lock()
            .await
            .modify(|climate| climate.current_state = ThermostatMode::Heat);
        Ok(())
    }

    async fn disable(&self) -> Result<(), DomainError> {
        info!(room = %self.name, "Disabling floor heating");
        self.devices.heating_loop.disable().await?;
        self.state
            .lock()
            .await
            .modify(|climate| climate.current_state = ThermostatMode::Off);
        Ok(())
    }
}

#[async_trait]
impl SessionHandler for Thermostat {
    fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    async fn communicate(
        &self,
        session: &Arc<Session>,
        reader: &mut SessionReader,
        token: &CancellationToken,
    ) -> Result<(), DomainError> {
        loop {
            let line = tokio::select! {
                _ = token.cancelled() => return Err(DomainError::Cancelled),
                line = reader.next() => line,
            };

            let line = match line {
                None => {
                    debug!(room = %self.name, peer = session.peer(), "Communication finished");
                    return Ok(());
                }
                Some(Ok(line)) => line,
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    warn!(room = %self.name, peer = session.peer(), "Request too long");
                    continue;
                }
                Some(Err(LinesCodecError::Io(e))) => {
                    return Err(DomainError::Transport(format!(
                        "Receiving from {} failed: {}",
                        session.peer(),
                        e
                    )));
                }
            };

            if let Some(response) = self.handle_line(&line).await {
                debug!(room = %self.name, kind = %response.kind, success = response.success, "Sending response");
                session.send_json(&response).await?;
            }
        }
    }
}
