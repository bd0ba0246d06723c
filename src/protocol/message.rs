//! Messages exchanged between the background controller and content agents.
//!
//! # Format
//!
//! Every message is a JSON object tagged by `action`:
//!
//! | Action | Direction | Reply |
//! |--------|-----------|-------|
//! | `activateScanner` | Background → Agent | `{ "ok": true }` |
//! | `captureVisibleTab` | Agent → Background | `{ "dataUrl" }` or `{ "error" }` |
//! | `agentReady` | Agent → Background | none |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifiers::{FrameId, TabId};

// ============================================================================
// Message
// ============================================================================

/// A runtime message between extension processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Message {
    /// Start a selection gesture.
    #[serde(rename = "activateScanner")]
    ActivateScanner,

    /// Capture the visible viewport of the sender's tab.
    #[serde(rename = "captureVisibleTab")]
    CaptureVisibleTab,

    /// The agent's listener is registered.
    #[serde(rename = "agentReady")]
    AgentReady,
}

impl Message {
    /// Returns the wire action name.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::ActivateScanner => "activateScanner",
            Self::CaptureVisibleTab => "captureVisibleTab",
            Self::AgentReady => "agentReady",
        }
    }

    /// Returns `true` if the receiver answers after the handler returns.
    ///
    /// The listener must keep the response channel open for these, so the
    /// host runtime does not drop the request before the reply is sent.
    #[inline]
    #[must_use]
    pub fn responds_async(&self) -> bool {
        matches!(self, Self::CaptureVisibleTab)
    }
}

// ============================================================================
// MessageSender
// ============================================================================

/// Origin of a runtime message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageSender {
    /// Sending tab, absent for extension pages.
    #[serde(rename = "tabId", default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<TabId>,

    /// Sending frame.
    #[serde(rename = "frameId", default)]
    pub frame_id: FrameId,
}

impl MessageSender {
    /// Sender in the main frame of `tab_id`.
    #[inline]
    #[must_use]
    pub fn tab(tab_id: TabId) -> Self {
        Self {
            tab_id: Some(tab_id),
            frame_id: FrameId::main(),
        }
    }
}

// ============================================================================
// Replies
// ============================================================================

/// Reply to `activateScanner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateAck {
    pub ok: bool,
}

impl ActivateAck {
    #[inline]
    #[must_use]
    pub const fn ok() -> Self {
        Self { ok: true }
    }
}

/// Reply to `captureVisibleTab`.
///
/// # Format
///
/// ```json
/// { "dataUrl": "data:image/png;base64,..." }
/// { "error": "reason" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptureResponse {
    /// Encoded viewport image (success).
    #[serde(rename = "dataUrl", default, skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,

    /// Capture failure reason, verbatim from the host (failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaptureResponse {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(data_url: impl Into<String>) -> Self {
        Self {
            data_url: Some(data_url.into()),
            error: None,
        }
    }

    /// Creates a failure response.
    #[inline]
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            data_url: None,
            error: Some(reason.into()),
        }
    }

    /// Extracts the data URL.
    ///
    /// An error reason wins over an image if both are present.
    ///
    /// # Errors
    ///
    /// - [`Error::CaptureFailed`] if the response carries an error
    /// - [`Error::EmptyCapture`] if it carries neither image nor error
    pub fn into_result(self) -> Result<String> {
        match (self.data_url, self.error) {
            (_, Some(reason)) => Err(Error::capture_failed(reason)),
            (Some(data_url), None) => Ok(data_url),
            (None, None) => Err(Error::EmptyCapture),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
