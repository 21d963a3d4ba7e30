//! JSON-lines messages exchanged with a room's clients.

use domain::{DomainError, Humidity, Temperature, ThermostatMode};
use serde::{Deserialize, Serialize};

pub const GET_STATUS: &str = "get_status";
pub const SET_CONTROL: &str = "set_control";
pub const NOTIFY_STATUS: &str = "notify_status";

/// Reported in place of values that were never read
pub const FALLBACK_TEMPERATURE: Temperature = Temperature::from_tenths(180);
pub const FALLBACK_HUMIDITY: Humidity = Humidity::from_percent(50);

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub target_temperature: Option<Temperature>,
    #[serde(default)]
    pub target_state: Option<ThermostatMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "type")]
    pub kind: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl Response {
    pub fn success(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            success: true,
            status: None,
        }
    }

    pub fn failure(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            success: false,
            status: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub current_temperature: Temperature,
    pub target_temperature: Temperature,
    pub current_humidity: Humidity,
    pub current_state: ThermostatMode,
    pub target_state: ThermostatMode,
}

/// Outcome of decoding one inbound line
#[derive(Debug)]
pub enum Decoded {
    Request(Request),
    /// The line named a message type but its fields did not decode
    Invalid { kind: String, error: DomainError },
}

/// Decodes one line. Fails outright only when not even the message type can be recovered.
pub fn decode(line: &str) -> Result<Decoded, DomainError> {
    let value: serde_json::Value = serde_json::from_str(line)
        .map_err(|e| DomainError::Decode(format!("Invalid request: {}", e)))?;
    let kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| DomainError::Decode("Request has no type".into()))?;

    Ok(match serde_json::from_value::<Request>(value) {
        Ok(request) => Decoded::Request(request),
        Err(e) => Decoded::Invalid {
            kind,
            error: DomainError::Decode(e.to_string()),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_set_control_rounds_half_to_even() {
        let Decoded::Request(request) =
            decode(r#"{"type":"set_control","target_temperature":18.25}"#).unwrap()
        else {
            panic!("expected a request");
        };
        assert_eq!(request.kind, SET_CONTROL);
        assert_eq!(request.target_temperature, Some(Temperature::from_tenths(182)));
        assert_eq!(request.target_state, None);

        let Decoded::Request(request) =
            decode(r#"{"type":"set_control","target_temperature":18.35,"target_state":"heat"}"#)
                .unwrap()
        else {
            panic!("expected a request");
        };
        assert_eq!(request.target_temperature, Some(Temperature::from_tenths(184)));
        assert_eq!(request.target_state, Some(ThermostatMode::Heat));
    }

    #[test]
    fn test_decode_keeps_type_of_invalid_request() {
        match decode(r#"{"type":"set_control","target_state":"cool"}"#).unwrap() {
            Decoded::Invalid { kind, .. } => assert_eq!(kind, SET_CONTROL),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_untyped_lines() {
        assert!(decode("{").is_err());
        assert!(decode(r#"{"target_state":"heat"}"#).is_err());
        assert!(decode(r#"{"type":3}"#).is_err());
    }

    #[test]
    fn test_response_shape() {
        let response = Response {
            kind: GET_STATUS.into(),
            success: true,
            status: Some(Status {
                current_temperature: Temperature::from_tenths(205),
                target_temperature: Temperature::from_tenths(210),
                current_humidity: Humidity::from_percent(45),
                current_state: ThermostatMode::Heat,
                target_state: ThermostatMode::Heat,
            }),
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "type": "get_status",
                "success": true,
                "status": {
                    "current_temperature": 20.5,
                    "target_temperature": 21.0,
                    "current_humidity": 45,
                    "current_state": "heat",
                    "target_state": "heat"
                }
            })
        );

        assert_eq!(
            serde_json::to_value(Response::failure("reboot")).unwrap(),
            json!({"type": "reboot", "success": false})
        );
    }
}
