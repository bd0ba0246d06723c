//! The per-frame content agent.
//!
//! One [`ContentAgent`] owns all selection state for a frame. The page shim
//! forwards DOM events to it (see [`PageBridge`](crate::transport::PageBridge)); it drives the overlay through
//! [`PageSurface`] and runs one [`ScanPipeline`] per confirmed selection.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing::{debug, trace};

use crate::config::ScannerConfig;
use crate::error::Result;
use crate::geometry::Point;
use crate::identifiers::ScanId;
use crate::imaging::QrDecoder;
use crate::platform::{BackgroundChannel, CursorStyle, PageSurface, ResultPresenter};
use crate::protocol::{ActivateAck, Message};

use super::pipeline::{ScanOutcome, ScanPipeline};
use super::selection::{PointerButton, PointerUp, SelectionMachine};

// ============================================================================
// KeyPress
// ============================================================================

/// A `keydown` as seen by the page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyPress {
    /// DOM `KeyboardEvent.key`.
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
}

impl KeyPress {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    #[must_use]
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Ctrl+Shift+Q, any letter case.
    #[must_use]
    pub fn is_activation_shortcut(&self) -> bool {
        self.ctrl && self.shift && self.key.eq_ignore_ascii_case("q")
    }

    #[inline]
    #[must_use]
    pub fn is_escape(&self) -> bool {
        self.key == "Escape"
    }
}

// ============================================================================
// ContentAgent
// ============================================================================

/// Selection overlay and scan pipeline for one frame.
pub struct ContentAgent<S, B, P, D> {
    surface: S,
    channel: B,
    presenter: P,
    decoder: D,
    selection: SelectionMachine,
    loading_timeout: Duration,
}

impl<S, B, P, D> ContentAgent<S, B, P, D>
where
    S: PageSurface,
    B: BackgroundChannel,
    P: ResultPresenter,
    D: QrDecoder,
{
    #[must_use]
    pub fn new(surface: S, channel: B, presenter: P, decoder: D, config: &ScannerConfig) -> Self {
        Self {
            surface,
            channel,
            presenter,
            decoder,
            selection: SelectionMachine::new(config.selection.min_size),
            loading_timeout: config.scan.loading_timeout(),
        }
    }

    #[inline]
    #[must_use]
    pub fn selection(&self) -> &SelectionMachine {
        &self.selection
    }

    #[inline]
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[inline]
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[inline]
    #[must_use]
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Announces readiness to the background once listeners are attached.
    ///
    /// # Errors
    ///
    /// Returns the channel's error if the message cannot be sent.
    pub async fn start(&self) -> Result<()> {
        self.channel.announce_ready().await?;
        debug!("Content agent ready");
        Ok(())
    }

    /// Handles a runtime message addressed to the agent.
    ///
    /// Returns the reply for `activateScanner`; other actions are not ours.
    pub fn handle_message(&mut self, message: Message) -> Option<ActivateAck> {
        match message {
            Message::ActivateScanner => {
                self.activate();
                Some(ActivateAck::ok())
            }
            other => {
                trace!(action = other.action(), "Ignoring message");
                None
            }
        }
    }

    /// Shows the selection overlay. No-op unless idle.
    pub fn activate(&mut self) -> bool {
        if !self.selection.activate() {
            debug!(state = ?self.selection.state(), "Scanner already active");
            return false;
        }

        self.surface.mount_overlay();
        self.surface.set_cursor(CursorStyle::Crosshair);
        debug!("Selection overlay shown");
        true
    }

    /// Cancels a selection in progress and removes the overlay.
    pub fn cancel(&mut self) -> bool {
        if !self.selection.cancel() {
            return false;
        }
        self.teardown();
        debug!("Selection cancelled");
        true
    }

    /// Handles a page `keydown`. Returns `true` if the default action
    /// should be prevented.
    pub fn on_key_down(&mut self, key: &KeyPress) -> bool {
        if key.is_activation_shortcut() {
            self.activate();
            return true;
        }
        if key.is_escape() {
            return self.cancel();
        }
        false
    }

    /// Handles `contextmenu`. Right-click cancels a selection.
    pub fn on_context_menu(&mut self) -> bool {
        self.cancel()
    }

    pub fn on_pointer_move(&mut self, at: Point) {
        if !self.selection.is_selecting() {
            return;
        }
        self.surface.move_crosshair(at);
        if let Some(region) = self.selection.pointer_move(at) {
            self.surface.show_selection(region);
        }
    }

    pub fn on_pointer_down(&mut self, button: PointerButton, at: Point) {
        self.selection.pointer_down(button, at);
    }

    /// Ends the drag. A confirmed region is scanned before returning.
    ///
    /// The overlay is removed before the capture request so it never
    /// appears in the screenshot.
    pub async fn on_pointer_up(&mut self, button: PointerButton, at: Point) -> Option<ScanOutcome> {
        let region = match self.selection.pointer_up(button, at) {
            PointerUp::Ignored => return None,
            PointerUp::Cancelled => {
                self.teardown();
                debug!("Selection below minimum size, cancelled");
                return None;
            }
            PointerUp::Confirmed(region) => region,
        };

        self.teardown();

        let scan_id = ScanId::generate();
        let dpr = effective_pixel_ratio(self.surface.device_pixel_ratio());
        let outcome = ScanPipeline::new(
            &self.channel,
            &self.presenter,
            &self.decoder,
            self.loading_timeout,
        )
        .run(scan_id, region, dpr)
        .await;

        self.selection.finish_scan();
        Some(outcome)
    }

    fn teardown(&mut self) {
        self.surface.unmount_overlay();
        self.surface.set_cursor(CursorStyle::Default);
    }
}

/// Falls back to 1 for a missing or nonsensical ratio.
fn effective_pixel_ratio(dpr: f64) -> f64 {
    if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 }
}

// ============================================================================
// Tests
// ============================================================================
