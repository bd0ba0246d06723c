//! Commands: the global activation command and bridge commands sent to the
//! extension shim.
//!
//! Bridge commands follow `module.methodName` format, mirroring the host
//! API they are forwarded to.
//!
//! | Method | Host API |
//! |--------|----------|
//! | `tabs.queryActive` | `tabs.query({ active, currentWindow })` |
//! | `tabs.sendMessage` | `tabs.sendMessage(tabId, message)` |
//! | `scripting.executeScript` | `scripting.executeScript({ target, files })` |
//! | `tabs.captureVisibleTab` | `tabs.captureVisibleTab(null, { format })` |
//! | `page.*` | overlay and modal DOM in the target frame |
//! | `clipboard.writeText` | `navigator.clipboard.writeText` in the target frame |
//! | `windows.open` | `window.open(url, "_blank", features)` in the target frame |
//!
//! Overlay and modal commands are fire-and-forget; see
//! [`Request::notification`](super::Request::notification).

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Region};
use crate::identifiers::TabId;
use crate::platform::CursorStyle;

use super::{FrameTarget, Message};

// ============================================================================
// ActivationCommand
// ============================================================================

/// Global keyboard command understood by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationCommand {
    /// Start a region scan in the active tab.
    Scan,
}

impl ActivationCommand {
    /// Maps a host command id to a command, given the id bound to `Scan`.
    #[inline]
    #[must_use]
    pub fn parse(name: &str, scan_command: &str) -> Option<Self> {
        (name == scan_command).then_some(Self::Scan)
    }
}

// ============================================================================
// HostCommand
// ============================================================================

/// Commands the shim executes against the browser on our behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum HostCommand {
    /// Resolve the active tab in the current window.
    #[serde(rename = "tabs.queryActive")]
    QueryActiveTab,

    /// Deliver a runtime message to a tab's content agent.
    #[serde(rename = "tabs.sendMessage")]
    SendMessage {
        /// Target tab.
        #[serde(rename = "tabId")]
        tab_id: TabId,
        /// Message to deliver.
        message: Message,
    },

    /// Inject script files into a tab.
    #[serde(rename = "scripting.executeScript")]
    ExecuteScript {
        /// Target tab.
        #[serde(rename = "tabId")]
        tab_id: TabId,
        /// Extension-relative script paths.
        files: Vec<String>,
    },

    /// Capture the visible viewport of the focused tab.
    #[serde(rename = "tabs.captureVisibleTab")]
    CaptureVisibleTab {
        /// Image format (`png`).
        format: String,
    },

    /// Add the dimming layer, selection box and crosshair.
    #[serde(rename = "page.mountOverlay")]
    MountOverlay { target: FrameTarget },

    #[serde(rename = "page.unmountOverlay")]
    UnmountOverlay { target: FrameTarget },

    #[serde(rename = "page.moveCrosshair")]
    MoveCrosshair { target: FrameTarget, at: Point },

    #[serde(rename = "page.showSelection")]
    ShowSelection { target: FrameTarget, region: Region },

    #[serde(rename = "page.setCursor")]
    SetCursor {
        target: FrameTarget,
        cursor: CursorStyle,
    },

    /// Show the scanning indicator; the page removes it after `expiresAfterMs`.
    #[serde(rename = "page.showLoading")]
    ShowLoading {
        target: FrameTarget,
        #[serde(rename = "expiresAfterMs")]
        expires_after_ms: u64,
    },

    #[serde(rename = "page.dismissLoading")]
    DismissLoading { target: FrameTarget },

    #[serde(rename = "page.showResult")]
    ShowResult { target: FrameTarget, text: String },

    #[serde(rename = "page.showCopied")]
    ShowCopied { target: FrameTarget },

    #[serde(rename = "page.alert")]
    Alert { target: FrameTarget, message: String },

    #[serde(rename = "page.dismissResult")]
    DismissResult { target: FrameTarget },

    /// Write text to the clipboard from the frame's document.
    #[serde(rename = "clipboard.writeText")]
    WriteClipboard { target: FrameTarget, text: String },

    /// Open a URL in a new browsing context.
    #[serde(rename = "windows.open")]
    OpenWindow {
        target: FrameTarget,
        url: String,
        /// `window.open` feature string.
        features: String,
    },
}

impl HostCommand {
    /// Returns the method name.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::QueryActiveTab => "tabs.queryActive",
            Self::SendMessage { .. } => "tabs.sendMessage",
            Self::ExecuteScript { .. } => "scripting.executeScript",
            Self::CaptureVisibleTab { .. } => "tabs.captureVisibleTab",
            Self::MountOverlay { .. } => "page.mountOverlay",
            Self::UnmountOverlay { .. } => "page.unmountOverlay",
            Self::MoveCrosshair { .. } => "page.moveCrosshair",
            Self::ShowSelection { .. } => "page.showSelection",
            Self::SetCursor { .. } => "page.setCursor",
            Self::ShowLoading { .. } => "page.showLoading",
            Self::DismissLoading { .. } => "page.dismissLoading",
            Self::ShowResult { .. } => "page.showResult",
            Self::ShowCopied { .. } => "page.showCopied",
            Self::Alert { .. } => "page.alert",
            Self::DismissResult { .. } => "page.dismissResult",
            Self::WriteClipboard { .. } => "clipboard.writeText",
            Self::OpenWindow { .. } => "windows.open",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
