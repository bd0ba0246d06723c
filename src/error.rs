//! Error types for the QR region scanner.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use qr_region_scanner::{Result, Error};
//!
//! fn example(data_url: &str) -> Result<()> {
//!     let viewport = imaging::decode_data_url(data_url)?;
//!     let crop = imaging::crop_scaled(&viewport, region, 2.0);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Activation | [`Error::NoActiveTab`], [`Error::DeliveryFailed`], [`Error::InjectionFailed`] |
//! | Capture | [`Error::CaptureFailed`], [`Error::NoCaptureResponse`], [`Error::EmptyCapture`] |
//! | Decoding | [`Error::ImageDecode`], [`Error::NoQrFound`] |
//! | Presentation | [`Error::InvalidLinkTarget`], [`Error::Clipboard`] |
//! | Transport | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::Protocol`], [`Error::RequestTimeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{RequestId, TabId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when scanner configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Activation Errors
    // ========================================================================
    /// No active tab in the current window.
    ///
    /// Dropped silently by the controller; not a failure.
    #[error("No active tab")]
    NoActiveTab,

    /// Message could not be delivered to the content agent.
    ///
    /// Usually means no listener is registered in the tab yet.
    #[error("Delivery to tab {tab_id} failed: {message}")]
    DeliveryFailed {
        /// Target tab.
        tab_id: TabId,
        /// Reason reported by the host.
        message: String,
    },

    /// Injecting the content agent failed.
    #[error("Injection into tab {tab_id} failed: {message}")]
    InjectionFailed {
        /// Target tab.
        tab_id: TabId,
        /// Reason reported by the host.
        message: String,
    },

    // ========================================================================
    // Capture Errors
    // ========================================================================
    /// Visible-tab capture failed.
    ///
    /// The reason is propagated verbatim from the host (permission and
    /// rate-limit failures included).
    #[error("{reason}")]
    CaptureFailed {
        /// Reason reported by the capture primitive.
        reason: String,
    },

    /// The background controller sent no response object.
    #[error("Error: no response from extension background worker.")]
    NoCaptureResponse,

    /// The capture response carried neither an image nor an error.
    #[error("No image captured.")]
    EmptyCapture,

    // ========================================================================
    // Decoding Errors
    // ========================================================================
    /// The captured payload could not be loaded as an image.
    #[error("Failed to load captured screenshot: {message}")]
    ImageDecode {
        /// Description of the decode failure.
        message: String,
    },

    /// No QR code could be decoded from the selected region.
    #[error("No QR code found in selection")]
    NoQrFound,

    // ========================================================================
    // Presentation Errors
    // ========================================================================
    /// Text is not a recognised URL.
    #[error("Not a recognized URL: {text}")]
    InvalidLinkTarget {
        /// The rejected text.
        text: String,
    },

    /// Clipboard write failed.
    #[error("Clipboard error: {message}")]
    Clipboard {
        /// Description of the clipboard failure.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when WebSocket connection cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection timeout waiting for the extension shim.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Protocol violation or unexpected response.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Bridge request timeout.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a delivery failed error.
    #[inline]
    pub fn delivery_failed(tab_id: TabId, message: impl Into<String>) -> Self {
        Self::DeliveryFailed {
            tab_id,
            message: message.into(),
        }
    }

    /// Creates an injection failed error.
    #[inline]
    pub fn injection_failed(tab_id: TabId, message: impl Into<String>) -> Self {
        Self::InjectionFailed {
            tab_id,
            message: message.into(),
        }
    }

    /// Creates a capture failed error.
    #[inline]
    pub fn capture_failed(reason: impl Into<String>) -> Self {
        Self::CaptureFailed {
            reason: reason.into(),
        }
    }

    /// Creates an image decode error.
    #[inline]
    pub fn image_decode(message: impl Into<String>) -> Self {
        Self::ImageDecode {
            message: message.into(),
        }
    }

    /// Creates an invalid link target error.
    #[inline]
    pub fn invalid_link_target(text: impl Into<String>) -> Self {
        Self::InvalidLinkTarget { text: text.into() }
    }

    /// Creates a clipboard error.
    #[inline]
    pub fn clipboard(message: impl Into<String>) -> Self {
        Self::Clipboard {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a delivery failure.
    ///
    /// Delivery failures trigger the single inject-and-retry sequence.
    #[inline]
    #[must_use]
    pub fn is_delivery_failure(&self) -> bool {
        matches!(self, Self::DeliveryFailed { .. })
    }

    /// Returns `true` if this error ends up as result text in the modal.
    #[inline]
    #[must_use]
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::CaptureFailed { .. }
                | Self::NoCaptureResponse
                | Self::EmptyCapture
                | Self::ImageDecode { .. }
                | Self::NoQrFound
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    fn tab() -> TabId {
        TabId::new(7).expect("valid tab id")
    }

    #[test]
    fn test_error_display() {
        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "Connection failed: failed to connect");
    }

    #[test]
    fn test_capture_failed_is_verbatim() {
        let err = Error::capture_failed("permission denied");
        assert_eq!(err.to_string(), "permission denied");
    }

    #[test]
    fn test_delivery_failed_display() {
        let err = Error::delivery_failed(tab(), "Receiving end does not exist.");
        assert_eq!(
            err.to_string(),
            "Delivery to tab 7 failed: Receiving end does not exist."
        );
        assert!(err.is_delivery_failure());
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::ConnectionTimeout { timeout_ms: 5000 };
        let other_err = Error::connection("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_is_user_visible() {
        assert!(Error::NoQrFound.is_user_visible());
        assert!(Error::capture_failed("quota").is_user_visible());
        assert!(!Error::injection_failed(tab(), "blocked").is_user_visible());
        assert!(!Error::NoActiveTab.is_user_visible());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
