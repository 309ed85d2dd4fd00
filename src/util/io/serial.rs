// src/util/io/serial.rs
//! Wire protocol spoken by the irrigation controller firmware.
//!
//! Device → host: one JSON object per line.
//!   sensor packet  {"temp":30,"hum":70,"gas":5,"moist":60,"relay":"ON"}
//!   diagnostic     {"error":"DHT read failed"}
//!   informational  {"status":"ready"}
//! Host → device: one plain-text directive per line, e.g. `RELAY_ON`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{LinkError, Result};

const TEMP_KEY: &str = "temp";
const HUM_KEY: &str = "hum";
const GAS_KEY: &str = "gas";
const MOIST_KEY: &str = "moist";
const RELAY_KEY: &str = "relay";
const ERROR_KEY: &str = "error";
const STATUS_KEY: &str = "status";

const RELAY_ON: &str = "ON";

/// One reading from the tank sensors, in device-reported units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub temperature: f64,
    pub humidity: f64,
    pub methane_level: f64,
    pub moisture: f64,
}

/// A fully classified line from the device.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceMessage {
    /// Telemetry and relay state from the same packet; always delivered together.
    SensorPacket {
        telemetry: TelemetryRecord,
        relay_on: bool,
    },
    Diagnostic(String),
    Status(String),
}

/// Why a line produced no event.
#[derive(Debug)]
pub enum Rejection {
    Malformed(serde_json::Error),
    UnknownShape,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Malformed(e) => write!(f, "malformed JSON: {}", e),
            Rejection::UnknownShape => write!(f, "unrecognised message shape"),
        }
    }
}

impl DeviceMessage {
    /// Classify one trimmed line. Checks run in order; the first match wins.
    pub fn classify(line: &str) -> std::result::Result<Self, Rejection> {
        let value: Value = serde_json::from_str(line).map_err(Rejection::Malformed)?;
        let object = value.as_object().ok_or(Rejection::UnknownShape)?;

        if [TEMP_KEY, HUM_KEY, GAS_KEY, MOIST_KEY, RELAY_KEY]
            .iter()
            .all(|key| object.contains_key(*key))
        {
            // Non-numeric readings fall through to the error and status rules
            if let Some(packet) = Self::sensor_packet(object) {
                return Ok(packet);
            }
        }

        if let Some(error) = object.get(ERROR_KEY).filter(|v| is_truthy(v)) {
            return Ok(DeviceMessage::Diagnostic(text_of(error)));
        }

        if let Some(status) = object.get(STATUS_KEY).filter(|v| is_truthy(v)) {
            return Ok(DeviceMessage::Status(text_of(status)));
        }

        Err(Rejection::UnknownShape)
    }

    fn sensor_packet(object: &Map<String, Value>) -> Option<Self> {
        let number = |key: &str| object.get(key).and_then(Value::as_f64);

        let (Some(temperature), Some(humidity), Some(methane_level), Some(moisture)) = (
            number(TEMP_KEY),
            number(HUM_KEY),
            number(GAS_KEY),
            number(MOIST_KEY),
        ) else {
            return None;
        };

        let relay_on = object.get(RELAY_KEY).and_then(Value::as_str) == Some(RELAY_ON);

        Some(DeviceMessage::SensorPacket {
            telemetry: TelemetryRecord {
                temperature,
                humidity,
                methane_level,
                moisture,
            },
            relay_on,
        })
    }
}

/// JavaScript-style truthiness, which is what the firmware's host expected.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Relay directives understood by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    On,
    Off,
}

impl RelayCommand {
    pub fn for_state(on: bool) -> Self {
        if on { RelayCommand::On } else { RelayCommand::Off }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelayCommand::On => "RELAY_ON",
            RelayCommand::Off => "RELAY_OFF",
        }
    }
}

impl fmt::Display for RelayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render an outbound command as exactly one newline-terminated line.
pub fn to_wire(command: &str) -> Result<String> {
    let trimmed = command.trim_end_matches(['\r', '\n']);
    if trimmed.trim().is_empty() {
        return Err(LinkError::EmptyCommand);
    }
    Ok(format!("{}\n", trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_packet_carries_telemetry_and_relay() {
        let msg = DeviceMessage::classify(
            r#"{"temp":30,"hum":70,"gas":5,"moist":60,"relay":"ON","uptime":12}"#,
        )
        .unwrap();

        assert_eq!(
            msg,
            DeviceMessage::SensorPacket {
                telemetry: TelemetryRecord {
                    temperature: 30.0,
                    humidity: 70.0,
                    methane_level: 5.0,
                    moisture: 60.0,
                },
                relay_on: true,
            }
        );
    }

    #[test]
    fn test_relay_values_other_than_on_mean_off() {
        for relay in ["\"OFF\"", "\"on\"", "1", "null"] {
            let line = format!(r#"{{"temp":1,"hum":2,"gas":3,"moist":4,"relay":{}}}"#, relay);
            match DeviceMessage::classify(&line).unwrap() {
                DeviceMessage::SensorPacket { relay_on, .. } => assert!(!relay_on, "{}", relay),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_missing_field_is_not_a_sensor_packet() {
        let result = DeviceMessage::classify(r#"{"temp":30,"hum":70,"gas":5,"relay":"ON"}"#);
        assert!(matches!(result, Err(Rejection::UnknownShape)));
    }

    #[test]
    fn test_sensor_packet_wins_over_error_and_status() {
        let msg = DeviceMessage::classify(
            r#"{"temp":1,"hum":2,"gas":3,"moist":4,"relay":"OFF","error":"x","status":"y"}"#,
        )
        .unwrap();
        assert!(matches!(msg, DeviceMessage::SensorPacket { .. }));
    }

    #[test]
    fn test_packet_with_unreadable_values_falls_back_to_error_field() {
        let msg = DeviceMessage::classify(
            r#"{"temp":"nan","hum":70,"gas":5,"moist":60,"relay":"ON","error":"DHT read failed"}"#,
        )
        .unwrap();
        assert_eq!(msg, DeviceMessage::Diagnostic("DHT read failed".into()));

        let result = DeviceMessage::classify(r#"{"temp":null,"hum":70,"gas":5,"moist":60,"relay":"ON"}"#);
        assert!(matches!(result, Err(Rejection::UnknownShape)));
    }

    #[test]
    fn test_diagnostic_and_status_shapes() {
        assert_eq!(
            DeviceMessage::classify(r#"{"error":"DHT read failed","status":"ok"}"#).unwrap(),
            DeviceMessage::Diagnostic("DHT read failed".into())
        );
        assert_eq!(
            DeviceMessage::classify(r#"{"status":"ready"}"#).unwrap(),
            DeviceMessage::Status("ready".into())
        );
        // Empty error string is falsy, so the status field decides
        assert_eq!(
            DeviceMessage::classify(r#"{"error":"","status":"ready"}"#).unwrap(),
            DeviceMessage::Status("ready".into())
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            DeviceMessage::classify("{\"temp\":"),
            Err(Rejection::Malformed(_))
        ));
        assert!(matches!(DeviceMessage::classify("42"), Err(Rejection::UnknownShape)));
        assert!(matches!(DeviceMessage::classify("[1,2]"), Err(Rejection::UnknownShape)));
        assert!(matches!(
            DeviceMessage::classify(r#"{"humidity":50}"#),
            Err(Rejection::UnknownShape)
        ));
    }

    #[test]
    fn test_non_numeric_readings_are_rejected() {
        let result =
            DeviceMessage::classify(r#"{"temp":"hot","hum":70,"gas":5,"moist":60,"relay":"ON"}"#);
        assert!(matches!(result, Err(Rejection::UnknownShape)));
    }

    #[test]
    fn test_wire_format_adds_single_newline() {
        assert_eq!(to_wire("RELAY_ON").unwrap(), "RELAY_ON\n");
        assert_eq!(to_wire("RELAY_OFF\n").unwrap(), "RELAY_OFF\n");
        assert!(matches!(to_wire("  \n"), Err(LinkError::EmptyCommand)));
        assert_eq!(RelayCommand::for_state(true).to_string(), "RELAY_ON");
    }
}
