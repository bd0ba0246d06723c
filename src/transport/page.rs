//! Content agents bound to the shim's content scripts.
//!
//! Each frame's content script only relays DOM events as `page.*` events
//! and renders what it is told. [`PageBridge`] keeps one [`ContentAgent`]
//! per frame on the Rust side and drives it from those events. Overlay and
//! modal updates go back as notifications, so the page sees them in the
//! order the agent made them.
//!
//! Agents reach the background controller in-process through
//! [`ControllerChannel`]; only the screenshot itself crosses the socket.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::agent::{ContentAgent, KeyPress, PointerButton, ResultActions, ScanOutcome};
use crate::background::BackgroundController;
use crate::config::ScannerConfig;
use crate::error::{Error, Result};
use crate::geometry::{Point, Region};
use crate::identifiers::RequestId;
use crate::imaging::RqrrDecoder;
use crate::platform::{
    BackgroundChannel, CaptureApi, Clipboard, CursorStyle, LinkOpener, OpenPolicy, PageSurface,
    ResultPresenter, TabsApi,
};
use crate::protocol::{
    CaptureResponse, Event, EventReply, FrameTarget, HostCommand, Message, MessageSender,
    ModalAction, PageEvent, PointerPhase, Request,
};

use super::connection::{Connection, EventStream};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for a clipboard write in the page.
const DEFAULT_CLIPBOARD_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Event Routing
// ============================================================================

/// Splits shim events into background events and page events.
///
/// Returns `(background, page)`. Must be called within a Tokio runtime.
#[must_use]
pub fn split_events(mut events: EventStream) -> (EventStream, EventStream) {
    let (background_tx, background_rx) = mpsc::unbounded_channel();
    let (page_tx, page_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let tx = if event.is_page_event() {
                &page_tx
            } else {
                &background_tx
            };
            if tx.send(event).is_err() {
                trace!("Event consumer gone, discarding event");
            }
        }
    });

    (background_rx, page_rx)
}

// ============================================================================
// ShimFrame
// ============================================================================

/// Modal, clipboard and window primitives of one frame.
#[derive(Clone)]
pub struct ShimFrame {
    connection: Connection,
    target: FrameTarget,
    clipboard_timeout: Duration,
}

impl ShimFrame {
    #[must_use]
    pub fn new(connection: Connection, target: FrameTarget) -> Self {
        Self {
            connection,
            target,
            clipboard_timeout: DEFAULT_CLIPBOARD_TIMEOUT,
        }
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> FrameTarget {
        self.target
    }

    fn notify(&self, command: HostCommand) {
        let method = command.method();
        if let Err(e) = self.connection.post(Request::notification(command)) {
            warn!(
                tab_id = %self.target.tab_id,
                frame_id = %self.target.frame_id,
                method,
                error = %e,
                "Page update dropped"
            );
        }
    }
}

impl ResultPresenter for ShimFrame {
    fn show_loading(&self, expires_after: Duration) {
        self.notify(HostCommand::ShowLoading {
            target: self.target,
            expires_after_ms: expires_after.as_millis() as u64,
        });
    }

    fn dismiss_loading(&self) {
        self.notify(HostCommand::DismissLoading {
            target: self.target,
        });
    }

    fn show_result(&self, text: &str) {
        self.notify(HostCommand::ShowResult {
            target: self.target,
            text: text.to_string(),
        });
    }

    fn show_copied(&self) {
        self.notify(HostCommand::ShowCopied {
            target: self.target,
        });
    }

    fn alert(&self, message: &str) {
        self.notify(HostCommand::Alert {
            target: self.target,
            message: message.to_string(),
        });
    }

    fn dismiss(&self) {
        self.notify(HostCommand::DismissResult {
            target: self.target,
        });
    }
}

#[async_trait]
impl Clipboard for ShimFrame {
    async fn write_text(&self, text: &str) -> Result<()> {
        let request = Request::new(HostCommand::WriteClipboard {
            target: self.target,
            text: text.to_string(),
        });
        let response = self
            .connection
            .send_with_timeout(request, self.clipboard_timeout)
            .await
            .map_err(|e| Error::clipboard(e.to_string()))?;

        if !response.is_success() {
            return Err(Error::clipboard(response.error_message()));
        }
        Ok(())
    }
}

impl LinkOpener for ShimFrame {
    fn open(&self, url: &Url, policy: OpenPolicy) -> Result<()> {
        self.connection.post(Request::notification(HostCommand::OpenWindow {
            target: self.target,
            url: url.to_string(),
            features: policy.features(),
        }))
    }
}

// ============================================================================
// ShimSurface
// ============================================================================

/// Selection overlay in one frame.
pub struct ShimSurface {
    frame: ShimFrame,
    device_pixel_ratio: f64,
}

impl ShimSurface {
    #[must_use]
    pub fn new(frame: ShimFrame, device_pixel_ratio: f64) -> Self {
        Self {
            frame,
            device_pixel_ratio,
        }
    }

    /// Records the ratio the page last reported.
    pub fn set_device_pixel_ratio(&mut self, device_pixel_ratio: f64) {
        self.device_pixel_ratio = device_pixel_ratio;
    }
}

impl PageSurface for ShimSurface {
    fn mount_overlay(&mut self) {
        self.frame.notify(HostCommand::MountOverlay {
            target: self.frame.target,
        });
    }

    fn unmount_overlay(&mut self) {
        self.frame.notify(HostCommand::UnmountOverlay {
            target: self.frame.target,
        });
    }

    fn move_crosshair(&mut self, at: Point) {
        self.frame.notify(HostCommand::MoveCrosshair {
            target: self.frame.target,
            at,
        });
    }

    fn show_selection(&mut self, region: Region) {
        self.frame.notify(HostCommand::ShowSelection {
            target: self.frame.target,
            region,
        });
    }

    fn set_cursor(&mut self, cursor: CursorStyle) {
        self.frame.notify(HostCommand::SetCursor {
            target: self.frame.target,
            cursor,
        });
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }
}

// ============================================================================
// ControllerChannel
// ============================================================================

/// Runtime messages from one frame, handled by an in-process controller.
pub struct ControllerChannel<T, C> {
    controller: Arc<BackgroundController<T, C>>,
    sender: MessageSender,
}

impl<T, C> ControllerChannel<T, C> {
    #[must_use]
    pub fn new(controller: Arc<BackgroundController<T, C>>, sender: MessageSender) -> Self {
        Self { controller, sender }
    }
}

#[async_trait]
impl<T, C> BackgroundChannel for ControllerChannel<T, C>
where
    T: TabsApi + 'static,
    C: CaptureApi + 'static,
{
    async fn request_capture(&self) -> Result<Option<CaptureResponse>> {
        let reply = self
            .controller
            .handle_message(Message::CaptureVisibleTab, self.sender)
            .await;

        match reply {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn announce_ready(&self) -> Result<()> {
        self.controller
            .handle_message(Message::AgentReady, self.sender)
            .await;
        Ok(())
    }
}

// ============================================================================
// PageBridge
// ============================================================================

type FrameAgent<T, C> = ContentAgent<ShimSurface, ControllerChannel<T, C>, Arc<ShimFrame>, RqrrDecoder>;
type FrameActions = ResultActions<ShimFrame, ShimFrame, ShimFrame>;

struct FrameJob {
    id: RequestId,
    method: String,
    event: PageEvent,
}

/// One content agent per frame, fed from `page.*` events.
///
/// Events for a frame are handled in arrival order on that frame's own
/// task. A scan in one frame never holds up another.
pub struct PageBridge<T, C> {
    connection: Connection,
    controller: Arc<BackgroundController<T, C>>,
    config: ScannerConfig,
    frames: FxHashMap<FrameTarget, mpsc::UnboundedSender<FrameJob>>,
}

impl<T, C> PageBridge<T, C>
where
    T: TabsApi + 'static,
    C: CaptureApi + 'static,
{
    #[must_use]
    pub fn new(
        connection: Connection,
        controller: Arc<BackgroundController<T, C>>,
        config: &ScannerConfig,
    ) -> Self {
        Self {
            connection,
            controller,
            config: config.clone(),
            frames: FxHashMap::default(),
        }
    }

    /// Returns the number of frames with a live agent.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Dispatches page events until the stream closes.
    pub async fn serve(mut self, mut events: EventStream) {
        info!("Serving page events");

        while let Some(event) = events.recv().await {
            self.dispatch(event);
        }

        info!(frames = self.frames.len(), "Page event stream closed");
    }

    fn dispatch(&mut self, event: Event) {
        let Some(page_event) = PageEvent::from_event(&event) else {
            debug!(method = %event.method, "Ignoring malformed page event");
            return;
        };
        let target = page_event.target();

        match page_event {
            PageEvent::Loaded {
                device_pixel_ratio, ..
            } => self.attach(target, device_pixel_ratio),

            PageEvent::Unloaded { .. } => {
                if self.frames.remove(&target).is_some() {
                    debug!(tab_id = %target.tab_id, frame_id = %target.frame_id, "Frame detached");
                }
            }

            page_event => {
                // Scripts that were already running may skip page.onLoad
                if !self.frames.contains_key(&target) {
                    self.attach(target, 1.0);
                }

                let job = FrameJob {
                    id: event.id,
                    method: event.method,
                    event: page_event,
                };
                let delivered = self
                    .frames
                    .get(&target)
                    .is_some_and(|queue| queue.send(job).is_ok());
                if !delivered {
                    warn!(tab_id = %target.tab_id, frame_id = %target.frame_id, "Frame worker stopped");
                    self.frames.remove(&target);
                }
            }
        }
    }

    /// Starts a fresh agent for `target`, replacing any previous one.
    fn attach(&mut self, target: FrameTarget, device_pixel_ratio: f64) {
        let frame = ShimFrame::new(self.connection.clone(), target);
        let presenter = Arc::new(frame.clone());

        let agent = ContentAgent::new(
            ShimSurface::new(frame.clone(), device_pixel_ratio),
            ControllerChannel::new(Arc::clone(&self.controller), target.sender()),
            Arc::clone(&presenter),
            RqrrDecoder::new(self.config.decoder.inversion),
            &self.config,
        );
        let actions = ResultActions::new(
            presenter,
            frame.clone(),
            frame,
            self.config.scan.copy_dismiss(),
        );

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        if self.frames.insert(target, queue_tx).is_some() {
            debug!(tab_id = %target.tab_id, frame_id = %target.frame_id, "Frame reloaded");
        }
        tokio::spawn(run_frame(agent, actions, self.connection.clone(), queue_rx));

        debug!(
            tab_id = %target.tab_id,
            frame_id = %target.frame_id,
            device_pixel_ratio,
            "Frame attached"
        );
    }
}

/// Announces the agent, then handles its frame's events in order.
async fn run_frame<T, C>(
    mut agent: FrameAgent<T, C>,
    actions: FrameActions,
    connection: Connection,
    mut queue: mpsc::UnboundedReceiver<FrameJob>,
) where
    T: TabsApi + 'static,
    C: CaptureApi + 'static,
{
    if let Err(e) = agent.start().await {
        warn!(error = %e, "Agent could not announce itself");
    }

    while let Some(job) = queue.recv().await {
        let Some(result) = handle_page_event(&mut agent, &actions, job.event).await else {
            continue;
        };
        if let Err(e) = connection.reply(EventReply::new(job.id, job.method, result)) {
            warn!(error = %e, "Could not reply to page event");
        }
    }

    trace!("Frame worker stopped");
}

/// Feeds one event to the agent. Returns the reply payload, if any.
async fn handle_page_event<T, C>(
    agent: &mut FrameAgent<T, C>,
    actions: &FrameActions,
    event: PageEvent,
) -> Option<Value>
where
    T: TabsApi + 'static,
    C: CaptureApi + 'static,
{
    match event {
        PageEvent::RuntimeMessage { message, .. } => {
            let ack = agent.handle_message(message)?;
            match serde_json::to_value(ack) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(error = %e, "Failed to serialize activation ack");
                    None
                }
            }
        }

        PageEvent::Pointer {
            phase,
            x,
            y,
            button,
            device_pixel_ratio,
            ..
        } => {
            agent.surface_mut().set_device_pixel_ratio(device_pixel_ratio);
            let at = Point::new(x, y);
            let button = PointerButton::from_index(button);

            match phase {
                PointerPhase::Move => agent.on_pointer_move(at),
                PointerPhase::Down => agent.on_pointer_down(button, at),
                PointerPhase::Up => {
                    if let Some(outcome) = agent.on_pointer_up(button, at).await {
                        debug!(
                            decoded = matches!(outcome, ScanOutcome::Decoded(_)),
                            "Scan finished"
                        );
                    }
                }
            }
            None
        }

        PageEvent::KeyDown {
            key, ctrl, shift, ..
        } => {
            let handled = agent.on_key_down(&KeyPress { key, ctrl, shift });
            Some(json!({ "handled": handled }))
        }

        PageEvent::ContextMenu { .. } => Some(json!({ "handled": agent.on_context_menu() })),

        PageEvent::ResultAction { action, text, .. } => {
            match action {
                ModalAction::Copy => {
                    if let Err(e) = actions.copy(&text).await {
                        debug!(error = %e, "Copy failed");
                    }
                }
                ModalAction::OpenLink => {
                    if let Err(e) = actions.open_link(&text) {
                        debug!(error = %e, "Result not opened");
                    }
                }
                ModalAction::Close => actions.close(),
            }
            None
        }

        PageEvent::Loaded { .. } | PageEvent::Unloaded { .. } => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
