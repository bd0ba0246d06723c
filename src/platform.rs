//! Capability traits for the host platform.
//!
//! The controller and the agent never touch browser APIs directly. Each
//! privileged or visual operation goes through one of these traits, so the
//! protocol and pipeline run headless in tests and against the extension
//! shim in production.
//!
//! | Trait | Side | Host primitive |
//! |-------|------|----------------|
//! | [`TabsApi`] | Background | tab query, message delivery, script injection |
//! | [`CaptureApi`] | Background | visible-tab screenshot |
//! | [`BackgroundChannel`] | Agent | runtime messages to the background |
//! | [`PageSurface`] | Agent | overlay DOM, page cursor, device pixel ratio |
//! | [`ResultPresenter`] | Agent | loading indicator and result modal |
//! | [`Clipboard`] | Agent | clipboard write |
//! | [`LinkOpener`] | Agent | new browsing context |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::Result;
use crate::geometry::{Point, Region};
use crate::identifiers::TabId;
use crate::protocol::{CaptureResponse, Message};

// ============================================================================
// Background Side
// ============================================================================

/// Tab operations available to the background controller.
#[async_trait]
pub trait TabsApi: Send + Sync {
    /// Resolves the active tab in the current window.
    async fn active_tab(&self) -> Result<Option<TabId>>;

    /// Delivers a message to the content agent in `tab_id`.
    ///
    /// Fails with [`Error::DeliveryFailed`](crate::Error::DeliveryFailed)
    /// when no listener is registered.
    async fn send_message(&self, tab_id: TabId, message: Message) -> Result<Value>;

    /// Injects the agent's script files into `tab_id`.
    ///
    /// Fails with [`Error::InjectionFailed`](crate::Error::InjectionFailed).
    async fn inject_agent(&self, tab_id: TabId, files: &[String]) -> Result<()>;
}

/// Visible-tab screenshot primitive.
#[async_trait]
pub trait CaptureApi: Send + Sync {
    /// Captures the focused tab's viewport as a data URL in `format`.
    ///
    /// Fails with [`Error::CaptureFailed`](crate::Error::CaptureFailed)
    /// carrying the host's reason verbatim.
    async fn capture_visible_tab(&self, format: &str) -> Result<String>;
}

// ============================================================================
// Agent Side
// ============================================================================

/// Runtime messaging from a content agent to the background controller.
#[async_trait]
pub trait BackgroundChannel: Send + Sync {
    /// Sends `captureVisibleTab` and waits for the reply.
    ///
    /// `Ok(None)` means the background answered without a response object.
    async fn request_capture(&self) -> Result<Option<CaptureResponse>>;

    /// Sends `agentReady` once the agent's listener is registered.
    async fn announce_ready(&self) -> Result<()>;
}

/// Page cursor style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorStyle {
    #[default]
    Default,
    Crosshair,
}

/// The page the agent draws its selection overlay on.
pub trait PageSurface {
    /// Adds the dimming layer, the hidden selection box and the crosshair
    /// follower.
    fn mount_overlay(&mut self);

    /// Removes every overlay element added by [`Self::mount_overlay`].
    fn unmount_overlay(&mut self);

    /// Moves the crosshair follower.
    fn move_crosshair(&mut self, at: Point);

    /// Positions the selection box and makes it visible.
    fn show_selection(&mut self, region: Region);

    /// Sets the page's pointer cursor.
    fn set_cursor(&mut self, cursor: CursorStyle);

    /// Physical pixels per CSS pixel.
    fn device_pixel_ratio(&self) -> f64;
}

/// Loading indicator and result modal.
///
/// Implementations hold their own view state; every method takes `&self`
/// so the modal can be dismissed from a timer task.
pub trait ResultPresenter: Send + Sync {
    /// Shows the scanning indicator; it removes itself after `expires_after`.
    fn show_loading(&self, expires_after: Duration);

    /// Removes the scanning indicator if still shown.
    fn dismiss_loading(&self);

    /// Opens the result modal with read-only `text`.
    fn show_result(&self, text: &str);

    /// Shows the transient copy confirmation.
    fn show_copied(&self);

    /// Shows a blocking alert.
    fn alert(&self, message: &str);

    /// Closes the result modal.
    fn dismiss(&self);
}

/// Clipboard write primitive.
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<()>;
}

/// Browsing context isolation for opened links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenPolicy {
    /// Opened context gets no `window.opener`.
    pub no_opener: bool,
    /// No `Referer` is sent.
    pub no_referrer: bool,
}

impl OpenPolicy {
    /// New context with neither opener nor referrer.
    #[inline]
    #[must_use]
    pub const fn isolated() -> Self {
        Self {
            no_opener: true,
            no_referrer: true,
        }
    }

    /// Window feature string for `window.open`.
    #[must_use]
    pub fn features(&self) -> String {
        let mut features = Vec::with_capacity(2);
        if self.no_opener {
            features.push("noopener");
        }
        if self.no_referrer {
            features.push("noreferrer");
        }
        features.join(",")
    }
}

/// Opens a URL in a new browsing context.
pub trait LinkOpener: Send + Sync {
    fn open(&self, url: &Url, policy: OpenPolicy) -> Result<()>;
}

// ============================================================================
// Shared Handles
// ============================================================================

#[async_trait]
impl<T: TabsApi + ?Sized> TabsApi for Arc<T> {
    async fn active_tab(&self) -> Result<Option<TabId>> {
        (**self).active_tab().await
    }

    async fn send_message(&self, tab_id: TabId, message: Message) -> Result<Value> {
        (**self).send_message(tab_id, message).await
    }

    async fn inject_agent(&self, tab_id: TabId, files: &[String]) -> Result<()> {
        (**self).inject_agent(tab_id, files).await
    }
}

#[async_trait]
impl<T: CaptureApi + ?Sized> CaptureApi for Arc<T> {
    async fn capture_visible_tab(&self, format: &str) -> Result<String> {
        (**self).capture_visible_tab(format).await
    }
}

#[async_trait]
impl<T: BackgroundChannel + ?Sized> BackgroundChannel for Arc<T> {
    async fn request_capture(&self) -> Result<Option<CaptureResponse>> {
        (**self).request_capture().await
    }

    async fn announce_ready(&self) -> Result<()> {
        (**self).announce_ready().await
    }
}

impl<T: ResultPresenter + ?Sized> ResultPresenter for Arc<T> {
    fn show_loading(&self, expires_after: Duration) {
        (**self).show_loading(expires_after);
    }

    fn dismiss_loading(&self) {
        (**self).dismiss_loading();
    }

    fn show_result(&self, text: &str) {
        (**self).show_result(text);
    }

    fn show_copied(&self) {
        (**self).show_copied();
    }

    fn alert(&self, message: &str) {
        (**self).alert(message);
    }

    fn dismiss(&self) {
        (**self).dismiss();
    }
}

// ============================================================================
// Tests
// ============================================================================
