//! WebSocket message envelope and payload types.
//!
//! Every frame in either direction is a JSON envelope with an id, a
//! message type, a timestamp, and a payload. Clients send commands;
//! the server answers with responses, pushes lifecycle events, and
//! reports protocol errors without closing the channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WsMessageType {
    /// Client-to-server command.
    Command,
    /// Server reply to a command.
    Response,
    /// Server-pushed lifecycle event.
    Event,
    /// Protocol-level error reply.
    Error,
}

/// The wire envelope for all WebSocket traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Unique message id.
    pub id: Uuid,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub message_type: WsMessageType,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Type-dependent payload.
    pub payload: Value,
}

impl WsMessage {
    /// Builds an envelope of the given type around `payload`.
    #[must_use]
    pub fn new(message_type: WsMessageType, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            message_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Server-pushed event envelope.
    #[must_use]
    pub fn event(payload: Value) -> Self {
        Self::new(WsMessageType::Event, payload)
    }

    /// Command response envelope.
    #[must_use]
    pub fn response(payload: Value) -> Self {
        Self::new(WsMessageType::Response, payload)
    }

    /// Protocol error envelope.
    #[must_use]
    pub fn error(message: &str) -> Self {
        Self::new(
            WsMessageType::Error,
            serde_json::json!({ "message": message }),
        )
    }

    /// Serializes the envelope to its wire form.
    ///
    /// Falls back to a static error frame if serialization fails, which
    /// cannot happen for the payloads this crate constructs.
    #[must_use]
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","payload":{"message":"serialization failure"}}"#.to_string()
        })
    }
}

/// Client-to-server commands.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Periodic location check-in (volunteer availability).
    LocationUpdate {
        /// Longitude in degrees.
        longitude: f64,
        /// Latitude in degrees.
        latitude: f64,
    },
    /// Explicit registration handshake; answered with an ack carrying
    /// the identity the channel is registered under.
    Register,
    /// Liveness probe; answered with a pong response.
    Ping,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trip() {
        let msg = WsMessage::event(serde_json::json!({"event_type": "sos_created"}));
        let frame = msg.to_frame();
        let Ok(parsed) = serde_json::from_str::<WsMessage>(&frame) else {
            panic!("frame did not parse");
        };
        assert_eq!(parsed.message_type, WsMessageType::Event);
        assert_eq!(parsed.id, msg.id);
    }

    #[test]
    fn command_parses_location_update() {
        let raw = r#"{"command":"location_update","longitude":77.21,"latitude":28.61}"#;
        let Ok(cmd) = serde_json::from_str::<WsCommand>(raw) else {
            panic!("command did not parse");
        };
        let WsCommand::LocationUpdate {
            longitude,
            latitude,
        } = cmd
        else {
            panic!("wrong command variant");
        };
        assert!((longitude - 77.21).abs() < f64::EPSILON);
        assert!((latitude - 28.61).abs() < f64::EPSILON);
    }

    #[test]
    fn register_command_parses() {
        let Ok(cmd) = serde_json::from_str::<WsCommand>(r#"{"command":"register"}"#) else {
            panic!("command did not parse");
        };
        assert!(matches!(cmd, WsCommand::Register));
    }

    #[test]
    fn unknown_command_is_an_error() {
        let raw = r#"{"command":"self_destruct"}"#;
        assert!(serde_json::from_str::<WsCommand>(raw).is_err());
    }

    #[test]
    fn error_frames_carry_the_message() {
        let frame = WsMessage::error("bad frame").to_frame();
        assert!(frame.contains("bad frame"));
        assert!(frame.contains("\"error\""));
    }
}
