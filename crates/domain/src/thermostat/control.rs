use super::ThermostatMode;
use crate::climate::Temperature;

/// What the control loop must do with the room's heating loop this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    None,
    Enable,
    Disable,
}

/// Bang-bang decision table, evaluated top to bottom:
///
/// | target | current | temperature      | action  |
/// |--------|---------|------------------|---------|
/// | Off    | Off     | any              | None    |
/// | Off    | Heat    | any              | Disable |
/// | Heat   | Off     | at/above target  | None    |
/// | Heat   | Heat    | at/above target  | Disable |
/// | Heat   | Heat    | below target     | None    |
/// | Heat   | Off     | below target     | Enable  |
///
/// An unread temperature counts as being at or above the target, so nothing heats blind.
pub fn decide(
    current_temperature: Option<Temperature>,
    target_temperature: Option<Temperature>,
    current: ThermostatMode,
    target: ThermostatMode,
) -> ControlAction {
    let satisfied = match (current_temperature, target_temperature) {
        (Some(temperature), Some(setpoint)) => temperature >= setpoint,
        _ => true,
    };

    match (current, target) {
        (ThermostatMode::Off, ThermostatMode::Off) => ControlAction::None,
        (_, ThermostatMode::Off) => ControlAction::Disable,
        (ThermostatMode::Off, _) if satisfied => ControlAction::None,
        _ if satisfied => ControlAction::Disable,
        (ThermostatMode::Heat, _) => ControlAction::None,
        _ => ControlAction::Enable,
    }
}
