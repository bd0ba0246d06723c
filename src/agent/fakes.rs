//! Recording fakes of the agent-side platform traits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;
use parking_lot::Mutex;
use url::Url;

use crate::error::{Error, Result};
use crate::geometry::{Point, Region};
use crate::imaging::QrDecoder;
use crate::platform::{
    BackgroundChannel, Clipboard, CursorStyle, LinkOpener, OpenPolicy, PageSurface,
    ResultPresenter,
};
use crate::protocol::CaptureResponse;

// ============================================================================
// FakeChannel
// ============================================================================

/// Scripted reply to `captureVisibleTab`.
#[derive(Debug, Clone)]
pub(crate) enum ChannelReply {
    Respond(Option<CaptureResponse>),
    Fail,
}

#[derive(Debug)]
pub(crate) struct FakeChannel {
    reply: Mutex<ChannelReply>,
    pub(crate) requests: AtomicUsize,
    pub(crate) announced: AtomicUsize,
}

impl FakeChannel {
    pub(crate) fn new(reply: ChannelReply) -> Self {
        Self {
            reply: Mutex::new(reply),
            requests: AtomicUsize::new(0),
            announced: AtomicUsize::new(0),
        }
    }

    pub(crate) fn responding(response: CaptureResponse) -> Self {
        Self::new(ChannelReply::Respond(Some(response)))
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackgroundChannel for FakeChannel {
    async fn request_capture(&self) -> Result<Option<CaptureResponse>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.reply.lock().clone() {
            ChannelReply::Respond(response) => Ok(response),
            ChannelReply::Fail => Err(Error::connection("receiving end does not exist")),
        }
    }

    async fn announce_ready(&self) -> Result<()> {
        self.announced.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// FakePresenter
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Shown {
    Loading(Duration),
    LoadingDismissed,
    Result(String),
    Copied,
    Alert(String),
    Dismissed,
}

#[derive(Debug, Default)]
pub(crate) struct FakePresenter {
    pub(crate) shown: Mutex<Vec<Shown>>,
}

impl FakePresenter {
    pub(crate) fn shown(&self) -> Vec<Shown> {
        self.shown.lock().clone()
    }

    pub(crate) fn last_result(&self) -> Option<String> {
        self.shown.lock().iter().rev().find_map(|s| match s {
            Shown::Result(text) => Some(text.clone()),
            _ => None,
        })
    }
}

impl ResultPresenter for FakePresenter {
    fn show_loading(&self, expires_after: Duration) {
        self.shown.lock().push(Shown::Loading(expires_after));
    }

    fn dismiss_loading(&self) {
        self.shown.lock().push(Shown::LoadingDismissed);
    }

    fn show_result(&self, text: &str) {
        self.shown.lock().push(Shown::Result(text.to_string()));
    }

    fn show_copied(&self) {
        self.shown.lock().push(Shown::Copied);
    }

    fn alert(&self, message: &str) {
        self.shown.lock().push(Shown::Alert(message.to_string()));
    }

    fn dismiss(&self) {
        self.shown.lock().push(Shown::Dismissed);
    }
}

// ============================================================================
// FakeSurface
// ============================================================================

#[derive(Debug)]
pub(crate) struct FakeSurface {
    pub(crate) mounted: bool,
    pub(crate) mounts: usize,
    pub(crate) cursor: CursorStyle,
    pub(crate) crosshair: Option<Point>,
    pub(crate) selection: Option<Region>,
    pub(crate) dpr: f64,
}

impl FakeSurface {
    pub(crate) fn with_dpr(dpr: f64) -> Self {
        Self {
            mounted: false,
            mounts: 0,
            cursor: CursorStyle::Default,
            crosshair: None,
            selection: None,
            dpr,
        }
    }
}

impl PageSurface for FakeSurface {
    fn mount_overlay(&mut self) {
        assert!(!self.mounted, "overlay mounted twice");
        self.mounted = true;
        self.mounts += 1;
    }

    fn unmount_overlay(&mut self) {
        self.mounted = false;
        self.crosshair = None;
        self.selection = None;
    }

    fn move_crosshair(&mut self, at: Point) {
        self.crosshair = Some(at);
    }

    fn show_selection(&mut self, region: Region) {
        self.selection = Some(region);
    }

    fn set_cursor(&mut self, cursor: CursorStyle) {
        self.cursor = cursor;
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.dpr
    }
}

// ============================================================================
// CountingDecoder
// ============================================================================

/// Wraps a decoder and counts decode attempts.
#[derive(Debug, Default)]
pub(crate) struct CountingDecoder<D> {
    inner: D,
    calls: AtomicUsize,
}

impl<D> CountingDecoder<D> {
    pub(crate) fn new(inner: D) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<D: QrDecoder> QrDecoder for CountingDecoder<D> {
    fn decode(&self, pixels: &RgbaImage) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.decode(pixels)
    }
}

// ============================================================================
// FakeClipboard / FakeOpener
// ============================================================================

#[derive(Debug, Default)]
pub(crate) struct FakeClipboard {
    pub(crate) fail: bool,
    pub(crate) written: Mutex<Vec<String>>,
}

#[async_trait]
impl Clipboard for FakeClipboard {
    async fn write_text(&self, text: &str) -> Result<()> {
        if self.fail {
            return Err(Error::clipboard("document is not focused"));
        }
        self.written.lock().push(text.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeOpener {
    pub(crate) opened: Mutex<Vec<(Url, OpenPolicy)>>,
}

impl LinkOpener for FakeOpener {
    fn open(&self, url: &Url, policy: OpenPolicy) -> Result<()> {
        self.opened.lock().push((url.clone(), policy));
        Ok(())
    }
}
