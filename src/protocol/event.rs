//! Event message types.
//!
//! Events are notifications the shim forwards from browser listeners to
//! the host. Some of them expect an [`EventReply`].
//!
//! | Method | Source listener | Reply |
//! |--------|-----------------|-------|
//! | `commands.onCommand` | global keyboard shortcut | none |
//! | `runtime.onMessage` | message from a content agent | message response, if any |
//! | `page.*` | content script DOM relay, see [`PageEvent`](super::PageEvent) | per event |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::RequestId;

use super::{Message, MessageSender};

// ============================================================================
// Event
// ============================================================================

/// An event notification from the shim.
///
/// # Format
///
/// ```json
/// {
///   "id": "event-uuid",
///   "type": "event",
///   "method": "module.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Unique identifier for EventReply correlation.
    pub id: RequestId,

    /// Event type marker (always "event").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event name in `module.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Returns `true` for DOM events relayed from a frame.
    #[inline]
    #[must_use]
    pub fn is_page_event(&self) -> bool {
        self.method.starts_with("page.")
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        match self.method.as_str() {
            "commands.onCommand" => match self.params.get("command").and_then(Value::as_str) {
                Some(command) => ParsedEvent::Command {
                    command: command.to_string(),
                },
                None => self.unknown(),
            },

            "runtime.onMessage" => {
                let message = self
                    .params
                    .get("message")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<Message>(v).ok());
                let sender = self
                    .params
                    .get("sender")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<MessageSender>(v).ok())
                    .unwrap_or_default();

                match message {
                    Some(message) => ParsedEvent::RuntimeMessage { message, sender },
                    None => self.unknown(),
                }
            }

            _ => self.unknown(),
        }
    }

    fn unknown(&self) -> ParsedEvent {
        ParsedEvent::Unknown {
            method: self.method.clone(),
            params: self.params.clone(),
        }
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Typed view of an [`Event`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// A global keyboard command fired.
    Command {
        /// Command id.
        command: String,
    },

    /// A content agent sent a runtime message.
    RuntimeMessage {
        /// The message.
        message: Message,
        /// Where it came from.
        sender: MessageSender,
    },

    /// Unrecognised method or malformed params.
    Unknown {
        /// Event method.
        method: String,
        /// Raw params.
        params: Value,
    },
}

// ============================================================================
// EventReply
// ============================================================================

/// A reply to an event that keeps its response channel open.
///
/// # Format
///
/// ```json
/// {
///   "id": "event-uuid",
///   "replyTo": "runtime.onMessage",
///   "result": { "dataUrl": "..." }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct EventReply {
    /// Matches the event's ID.
    pub id: RequestId,

    /// Event method being replied to.
    #[serde(rename = "replyTo")]
    pub reply_to: String,

    /// Response payload.
    pub result: Value,
}

impl EventReply {
    /// Creates a new event reply.
    #[inline]
    #[must_use]
    pub fn new(id: RequestId, reply_to: impl Into<String>, result: Value) -> Self {
        Self {
            id,
            reply_to: reply_to.into(),
            result,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn event(method: &str, params: Value) -> Event {
        serde_json::from_value(json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "event",
            "method": method,
            "params": params,
        }))
        .expect("parse")
    }

    #[test]
    fn test_parse_command() {
        let parsed = event("commands.onCommand", json!({ "command": "scan-qr" })).parse();
        assert_eq!(
            parsed,
            ParsedEvent::Command {
                command: "scan-qr".to_string()
            }
        );
    }

    #[test]
    fn test_parse_runtime_message() {
        let parsed = event(
            "runtime.onMessage",
            json!({
                "message": { "action": "captureVisibleTab" },
                "sender": { "tabId": 12, "frameId": 0 }
            }),
        )
        .parse();

        match parsed {
            ParsedEvent::RuntimeMessage { message, sender } => {
                assert_eq!(message, Message::CaptureVisibleTab);
                assert_eq!(sender.tab_id.map(|t| t.as_u32()), Some(12));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_foreign_message_is_unknown() {
        let parsed = event(
            "runtime.onMessage",
            json!({ "message": { "action": "somethingElse" } }),
        )
        .parse();
        assert!(matches!(parsed, ParsedEvent::Unknown { .. }));
    }

    #[test]
    fn test_event_reply_format() {
        let reply = EventReply::new(
            RequestId::ready(),
            "runtime.onMessage",
            json!({ "error": "denied" }),
        );
        let json = serde_json::to_value(&reply).expect("serialize");
        assert_eq!(json["replyTo"], "runtime.onMessage");
        assert_eq!(json["result"]["error"], "denied");
    }
}
