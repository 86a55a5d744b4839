//! JSON frames exchanged with the flight server.

use drone_core::models::{Command, Movement};
use serde::{Deserialize, Serialize};

/// First message sent by the server after the connection opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Greeting {
    pub connection_id: String,
    #[serde(default)]
    pub message: String,
}

/// Outbound command, tagged with the session's command counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandFrame {
    pub speed: u8,
    pub altitude: f64,
    pub movement: Movement,
    pub command_count: u64,
}

impl CommandFrame {
    pub fn new(command: &Command, command_count: u64) -> Self {
        Self {
            speed: command.speed,
            altitude: command.altitude,
            movement: command.movement,
            command_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Crashed,
    #[serde(other)]
    Unknown,
}

/// Reply to a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: ResponseStatus,
    #[serde(default)]
    pub telemetry: Option<String>,
    /// Kept loose so a malformed metrics block cannot hide a crash.
    #[serde(default)]
    pub metrics: Option<serde_json::Value>,
    #[serde(default)]
    pub final_telemetry: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_frame_wire_shape() {
        let frame = CommandFrame::new(&Command::initial(), 1);
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            value,
            json!({"speed": 5, "altitude": 150.0, "movement": "fwd", "command_count": 1})
        );
    }

    #[test]
    fn unknown_status_is_tolerated_by_serde() {
        let response: Response = serde_json::from_str(r#"{"status": "paused"}"#).unwrap();
        assert_eq!(response.status, ResponseStatus::Unknown);
        assert!(response.telemetry.is_none());
    }

    #[test]
    fn greeting_message_is_optional() {
        let greeting: Greeting = serde_json::from_str(r#"{"connection_id": "abc"}"#).unwrap();
        assert_eq!(greeting.connection_id, "abc");
        assert!(greeting.message.is_empty());
    }
}
