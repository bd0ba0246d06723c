//! Capture, crop and decode for one confirmed selection.
//!
//! ```text
//! show loading ──► request capture ──► decode data URL ──► crop (× dpr) ──► QR decode
//!                        │                   │                                 │
//!                        ▼                   ▼                                 ▼
//!                  failure text        failure text                     text | hints
//! ```
//!
//! Every path ends with exactly one `show_result`.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::geometry::Region;
use crate::identifiers::ScanId;
use crate::imaging::{QrDecoder, crop_scaled, decode_data_url};
use crate::platform::{BackgroundChannel, ResultPresenter};

// ============================================================================
// Messages
// ============================================================================

/// The capture request could not be sent or was not answered.
pub const REQUEST_FAILED_MESSAGE: &str = "Error requesting screen capture.";

/// The captured payload could not be decoded as an image.
pub const SCREENSHOT_UNREADABLE_MESSAGE: &str = "Failed to load captured screenshot.";

/// No QR code in the cropped selection.
pub const NO_QR_MESSAGE: &str = "No QR code detected in the selected area.\n\
    Try selecting a larger area around the code, make sure the page has focus, \
    and keep the whole code (including its quiet border) visible.";

/// Maps a scan failure to the text shown in the result modal.
#[must_use]
pub fn failure_text(error: &Error) -> String {
    match error {
        Error::CaptureFailed { reason } => reason.clone(),
        Error::NoCaptureResponse | Error::EmptyCapture => error.to_string(),
        Error::ImageDecode { .. } => SCREENSHOT_UNREADABLE_MESSAGE.to_string(),
        Error::NoQrFound => NO_QR_MESSAGE.to_string(),
        _ => REQUEST_FAILED_MESSAGE.to_string(),
    }
}

// ============================================================================
// ScanOutcome
// ============================================================================

/// How one scan ended.
#[derive(Debug)]
pub enum ScanOutcome {
    /// QR payload text.
    Decoded(String),
    /// Any failure, already shown to the user as a diagnostic.
    Failed(Error),
}

impl ScanOutcome {
    /// Text shown in the result modal.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Decoded(text) => text.clone(),
            Self::Failed(e) => failure_text(e),
        }
    }

    /// Returns the payload if decoding succeeded.
    #[inline]
    #[must_use]
    pub fn decoded(&self) -> Option<&str> {
        match self {
            Self::Decoded(text) => Some(text),
            Self::Failed(_) => None,
        }
    }
}

impl From<Result<String>> for ScanOutcome {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(text) => Self::Decoded(text),
            Err(e) => Self::Failed(e),
        }
    }
}

// ============================================================================
// ScanPipeline
// ============================================================================

/// Borrowed view over the agent's capabilities for one scan.
pub struct ScanPipeline<'a, B: ?Sized, P: ?Sized, D: ?Sized> {
    channel: &'a B,
    presenter: &'a P,
    decoder: &'a D,
    loading_timeout: Duration,
}

impl<'a, B, P, D> ScanPipeline<'a, B, P, D>
where
    B: BackgroundChannel + ?Sized,
    P: ResultPresenter + ?Sized,
    D: QrDecoder + ?Sized,
{
    #[must_use]
    pub fn new(channel: &'a B, presenter: &'a P, decoder: &'a D, loading_timeout: Duration) -> Self {
        Self {
            channel,
            presenter,
            decoder,
            loading_timeout,
        }
    }

    /// Scans `region` and presents the outcome.
    ///
    /// Issues exactly one capture request.
    pub async fn run(&self, scan_id: ScanId, region: Region, device_pixel_ratio: f64) -> ScanOutcome {
        self.presenter.show_loading(self.loading_timeout);

        let outcome = ScanOutcome::from(self.scan(scan_id, region, device_pixel_ratio).await);

        self.presenter.dismiss_loading();
        match &outcome {
            ScanOutcome::Decoded(text) => {
                info!(%scan_id, len = text.len(), "QR code decoded");
            }
            ScanOutcome::Failed(e) => {
                warn!(%scan_id, error = %e, "Scan failed");
            }
        }
        self.presenter.show_result(&outcome.text());

        outcome
    }

    async fn scan(&self, scan_id: ScanId, region: Region, device_pixel_ratio: f64) -> Result<String> {
        debug!(%scan_id, ?region, device_pixel_ratio, "Requesting capture");

        let data_url = self
            .channel
            .request_capture()
            .await?
            .ok_or(Error::NoCaptureResponse)?
            .into_result()?;

        let viewport = decode_data_url(&data_url)?;
        let crop = crop_scaled(&viewport, region, device_pixel_ratio);
        debug!(
            %scan_id,
            width = crop.width(),
            height = crop.height(),
            "Cropped selection"
        );

        self.decoder.decode(&crop).ok_or(Error::NoQrFound)
    }
}

// ============================================================================
// Tests
// ============================================================================
