//! Bridge request and response message types.
//!
//! Defines the message format for command requests and responses between
//! the Rust host and the extension shim.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::HostCommand;

// ============================================================================
// Request
// ============================================================================

/// A command request from the host to the shim.
///
/// # Format
///
/// ```json
/// {
///   "id": "uuid",
///   "method": "module.methodName",
///   "params": { ... }
/// }
/// ```
///
/// A notification adds `"noReply": true`; the shim runs it without
/// answering.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Unique identifier for request/response correlation.
    pub id: RequestId,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: HostCommand,

    #[serde(rename = "noReply", skip_serializing_if = "std::ops::Not::not")]
    pub no_reply: bool,
}

impl Request {
    /// Creates a new request with auto-generated ID.
    #[inline]
    #[must_use]
    pub fn new(command: HostCommand) -> Self {
        Self {
            id: RequestId::generate(),
            command,
            no_reply: false,
        }
    }

    /// Creates a request the shim must not answer.
    #[inline]
    #[must_use]
    pub fn notification(command: HostCommand) -> Self {
        Self {
            no_reply: true,
            ..Self::new(command)
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from the shim.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": "uuid", "type": "success", "result": { ... } }
/// ```
///
/// Error (`message` carries the host's `lastError.message`):
/// ```json
/// { "id": "uuid", "type": "error", "error": "code", "message": "..." }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: RequestId,

    /// Response type.
    #[serde(rename = "type")]
    pub response_type: ResponseType,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error code (if error).
    #[serde(default)]
    pub error: Option<String>,

    /// Error message (if error).
    #[serde(default)]
    pub message: Option<String>,
}

impl Response {
    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response_type == ResponseType::Success
    }

    /// Returns the host's error message, falling back to the error code.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the response was an error.
    pub fn into_result(self) -> Result<Value> {
        match self.response_type {
            ResponseType::Success => Ok(self.result.unwrap_or(Value::Null)),
            ResponseType::Error => Err(Error::protocol(self.error_message())),
        }
    }

    /// Gets a string value from the result.
    ///
    /// Returns `None` if key not found or not a string.
    #[inline]
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.result
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_str())
    }

    /// Gets a u64 value from the result.
    ///
    /// Returns 0 if key not found or not a number.
    #[inline]
    #[must_use]
    pub fn get_u64(&self, key: &str) -> u64 {
        self.result
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_u64())
            .unwrap_or_default()
    }
}

// ============================================================================
// ResponseType
// ============================================================================

/// Response type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Successful response.
    Success,
    /// Error response.
    Error,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = Request::new(HostCommand::CaptureVisibleTab {
            format: "png".to_string(),
        });
        let json = serde_json::to_string(&request).expect("serialize");

        assert!(json.contains("tabs.captureVisibleTab"));
        assert!(json.contains(r#""format":"png""#));
        assert!(json.contains(&request.id.to_string()));
        assert!(!json.contains("noReply"));
    }

    #[test]
    fn test_notification_is_marked() {
        let request = Request::notification(HostCommand::QueryActiveTab);
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["noReply"], true);
        assert_eq!(json["method"], "tabs.queryActive");
    }

    #[test]
    fn test_success_response() {
        let json_str = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "success",
            "result": {"tabId": 4}
        }"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert!(response.is_success());
        assert_eq!(response.get_u64("tabId"), 4);
        assert_eq!(response.get_str("missing"), None);
    }

    #[test]
    fn test_error_response() {
        let json_str = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "error",
            "error": "lastError",
            "message": "Could not establish connection. Receiving end does not exist."
        }"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert!(!response.is_success());
        assert_eq!(
            response.error_message(),
            "Could not establish connection. Receiving end does not exist."
        );
        assert!(response.into_result().is_err());
    }

    #[test]
    fn test_error_message_falls_back_to_code() {
        let json_str = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "error",
            "error": "no such tab"
        }"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert_eq!(response.error_message(), "no such tab");
    }
}
