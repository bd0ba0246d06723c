//! Visible-tab capture service.
//!
//! The only privileged operation exposed to content agents. Requests are
//! accepted from any frame of any tab; failures are reported back in the
//! response rather than raised.

use tracing::{debug, error};

use crate::error::Error;
use crate::platform::CaptureApi;
use crate::protocol::{CaptureResponse, MessageSender};

/// Lossless capture format.
pub const CAPTURE_FORMAT: &str = "png";

/// Answers `captureVisibleTab` requests.
pub struct CaptureService<C> {
    api: C,
}

impl<C: CaptureApi> CaptureService<C> {
    #[must_use]
    pub fn new(api: C) -> Self {
        Self { api }
    }

    /// Captures the visible viewport for `sender`.
    ///
    /// Never fails: host errors become `{ error }` with the reason verbatim.
    pub async fn handle(&self, sender: &MessageSender) -> CaptureResponse {
        debug!(
            tab_id = ?sender.tab_id,
            frame_id = %sender.frame_id,
            format = CAPTURE_FORMAT,
            "Capturing visible tab"
        );

        match self.api.capture_visible_tab(CAPTURE_FORMAT).await {
            Ok(data_url) => {
                debug!(len = data_url.len(), "Capture succeeded");
                CaptureResponse::success(data_url)
            }
            Err(Error::CaptureFailed { reason }) => {
                error!(reason = %reason, "Capture error");
                CaptureResponse::failure(reason)
            }
            Err(e) => {
                error!(error = %e, "Capture error");
                CaptureResponse::failure(e.to_string())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::error::Result;
    use crate::identifiers::TabId;

    struct FakeCapture {
        result: Result<String>,
        formats: Mutex<Vec<String>>,
    }

    impl FakeCapture {
        fn new(result: Result<String>) -> Self {
            Self {
                result,
                formats: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CaptureApi for FakeCapture {
        async fn capture_visible_tab(&self, format: &str) -> Result<String> {
            self.formats.lock().push(format.to_string());
            match &self.result {
                Ok(url) => Ok(url.clone()),
                Err(Error::CaptureFailed { reason }) => Err(Error::capture_failed(reason.clone())),
                Err(_) => Err(Error::ConnectionClosed),
            }
        }
    }

    fn sender() -> MessageSender {
        MessageSender::tab(TabId::new(1).expect("valid tab id"))
    }

    #[tokio::test]
    async fn test_success_uses_png() {
        let service = CaptureService::new(FakeCapture::new(Ok("data:image/png;base64,AA".into())));
        let response = service.handle(&sender()).await;

        assert_eq!(response, CaptureResponse::success("data:image/png;base64,AA"));
        assert_eq!(*service.api.formats.lock(), vec!["png".to_string()]);
    }

    #[tokio::test]
    async fn test_failure_reason_is_verbatim() {
        let reason = "This request exceeds the MAX_CAPTURE_VISIBLE_TAB_CALLS_PER_SECOND quota.";
        let service = CaptureService::new(FakeCapture::new(Err(Error::capture_failed(reason))));

        let response = service.handle(&sender()).await;
        assert_eq!(response, CaptureResponse::failure(reason));
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_error_response() {
        let service = CaptureService::new(FakeCapture::new(Err(Error::ConnectionClosed)));

        let response = service.handle(&MessageSender::default()).await;
        assert_eq!(response.error.as_deref(), Some("Connection closed"));
        assert!(response.data_url.is_none());
    }
}
