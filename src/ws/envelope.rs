//! Wire frame parsing.
//!
//! Event frames are WAMP-style 3-element JSON arrays:
//!
//! ```json
//! [8, "OnJsonApiEvent", { "uri": "/lol-gameflow/v1/session",
//!                         "eventType": "Update",
//!                         "data": { ... } }]
//! ```
//!
//! The opcode is checked before anything else; non-event opcodes (subscribe
//! acks, keepalives) are ignored. Structurally malformed frames are protocol
//! errors and terminate the stream.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::Value;
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Wire Constants
// ============================================================================

/// Opcode of the subscription request frame.
pub(crate) const SUBSCRIBE_OPCODE: u64 = 5;

/// Opcode of an event frame.
pub(crate) const EVENT_OPCODE: u64 = 8;

/// The single wire-level topic multiplexing all domain events.
pub(crate) const ALL_EVENTS_TOPIC: &str = "OnJsonApiEvent";

// ============================================================================
// PayloadKind
// ============================================================================

/// What happened to the resource an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Resource created.
    Create,
    /// Resource updated.
    Update,
    /// Resource deleted.
    Delete,
}

impl PayloadKind {
    /// Maps the wire `eventType` field.
    fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "Create" => Some(Self::Create),
            "Update" => Some(Self::Update),
            "Delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
        };
        f.write_str(name)
    }
}

// ============================================================================
// EventEnvelope
// ============================================================================

/// A parsed, typed representation of one inbound event frame.
///
/// Produced per frame and handed transiently to matching listeners; not
/// retained by the stream.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    /// Event topic. For structured payloads this is the resource URI (e.g.
    /// `/lol-gameflow/v1/session`); otherwise the wire-level topic.
    pub topic: String,
    /// What happened to the resource.
    pub kind: PayloadKind,
    /// Opaque event payload.
    pub data: Value,
}

// ============================================================================
// Frame Construction / Parsing
// ============================================================================

/// Builds the one-time subscription frame for the "all events" topic.
pub(crate) fn subscribe_frame() -> String {
    serde_json::json!([SUBSCRIBE_OPCODE, ALL_EVENTS_TOPIC]).to_string()
}

/// Parses one inbound text frame.
///
/// Returns `Ok(None)` for frames that are valid but not events: empty
/// keepalives and non-event opcodes.
///
/// # Errors
///
/// [`Error::Protocol`] if the frame is not a JSON array, has a non-numeric
/// opcode, or is an event frame without exactly `[opcode, topic, payload]`.
pub(crate) fn parse_frame(text: &str) -> Result<Option<EventEnvelope>> {
    let text = text.trim();
    if text.is_empty() {
        // The host sends an empty frame right after the subscription.
        return Ok(None);
    }

    let value: Value = serde_json::from_str(text)
        .map_err(|e| Error::protocol(format!("frame is not valid JSON: {e}")))?;

    let Some(frame) = value.as_array() else {
        return Err(Error::protocol("frame is not a JSON array"));
    };

    let opcode = frame
        .first()
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::protocol("frame opcode is missing or not numeric"))?;

    if opcode != EVENT_OPCODE {
        trace!(opcode, "ignoring non-event frame");
        return Ok(None);
    }

    if frame.len() != 3 {
        return Err(Error::protocol(format!(
            "event frame has {} elements, expected 3",
            frame.len()
        )));
    }

    let wire_topic = frame[1]
        .as_str()
        .ok_or_else(|| Error::protocol("event topic is not a string"))?;

    Ok(Some(envelope_from_payload(wire_topic, &frame[2])))
}

/// Builds an envelope from an event payload.
///
/// Structured payloads carry their own `uri`/`eventType`/`data`; anything
/// else is passed through whole under the wire topic. An unrecognized
/// `eventType` degrades to [`PayloadKind::Update`] instead of failing the
/// stream, so a host adding event kinds stays compatible.
fn envelope_from_payload(wire_topic: &str, payload: &Value) -> EventEnvelope {
    if let Some(object) = payload.as_object()
        && (object.contains_key("uri") || object.contains_key("eventType"))
    {
        let topic = object
            .get("uri")
            .and_then(Value::as_str)
            .unwrap_or(wire_topic)
            .to_string();

        let kind = object
            .get("eventType")
            .and_then(Value::as_str)
            .and_then(PayloadKind::from_event_type)
            .unwrap_or_else(|| {
                trace!(topic = %topic, "unrecognized eventType, assuming Update");
                PayloadKind::Update
            });

        let data = object.get("data").cloned().unwrap_or(Value::Null);

        return EventEnvelope { topic, kind, data };
    }

    EventEnvelope {
        topic: wire_topic.to_string(),
        kind: PayloadKind::Update,
        data: payload.clone(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_frame_format() {
        assert_eq!(subscribe_frame(), r#"[5,"OnJsonApiEvent"]"#);
    }

    #[test]
    fn test_parse_structured_event_frame() {
        let frame = r#"[8, "OnJsonApiEvent", {
            "uri": "/lol-gameflow/v1/session",
            "eventType": "Create",
            "data": { "phase": "Lobby" }
        }]"#;

        let envelope = parse_frame(frame)
            .expect("valid frame")
            .expect("event frame");

        assert_eq!(envelope.topic, "/lol-gameflow/v1/session");
        assert_eq!(envelope.kind, PayloadKind::Create);
        assert_eq!(envelope.data["phase"], "Lobby");
    }

    #[test]
    fn test_parse_bare_payload_uses_wire_topic() {
        let envelope = parse_frame(r#"[8, "a", 1]"#)
            .expect("valid frame")
            .expect("event frame");

        assert_eq!(envelope.topic, "a");
        assert_eq!(envelope.kind, PayloadKind::Update);
        assert_eq!(envelope.data, serde_json::json!(1));
    }

    #[test]
    fn test_parse_unknown_event_type_degrades_to_update() {
        let frame = r#"[8, "OnJsonApiEvent", {
            "uri": "/x",
            "eventType": "Replace",
            "data": null
        }]"#;

        let envelope = parse_frame(frame)
            .expect("valid frame")
            .expect("event frame");
        assert_eq!(envelope.kind, PayloadKind::Update);
    }

    #[test]
    fn test_parse_ignores_non_event_opcodes() {
        // Subscribe ack.
        assert!(parse_frame(r#"[3, "OnJsonApiEvent"]"#).unwrap().is_none());
        // Empty keepalive after subscription.
        assert!(parse_frame("").unwrap().is_none());
    }

    #[test]
    fn test_parse_rejects_non_array_frame() {
        let err = parse_frame(r#"{"not": "an array"}"#).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = parse_frame("[8,").unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_parse_rejects_short_event_frame() {
        let err = parse_frame(r#"[8, "topic"]"#).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_parse_rejects_non_string_topic() {
        let err = parse_frame(r#"[8, 42, {}]"#).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_parse_rejects_non_numeric_opcode() {
        let err = parse_frame(r#"["evt", "a", 1]"#).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }
}
