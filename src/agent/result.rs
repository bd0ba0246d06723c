//! Actions offered by the result modal.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::error::Result;
use crate::platform::{Clipboard, LinkOpener, OpenPolicy, ResultPresenter};

use super::link::{NOT_A_URL_MESSAGE, resolve_link};

// ============================================================================
// ResultActions
// ============================================================================

/// Copy, open-as-link and close for the text currently shown.
pub struct ResultActions<P, C, L> {
    presenter: Arc<P>,
    clipboard: C,
    opener: L,
    copy_dismiss: Duration,
}

impl<P, C, L> ResultActions<P, C, L>
where
    P: ResultPresenter + 'static,
    C: Clipboard,
    L: LinkOpener,
{
    #[must_use]
    pub fn new(presenter: Arc<P>, clipboard: C, opener: L, copy_dismiss: Duration) -> Self {
        Self {
            presenter,
            clipboard,
            opener,
            copy_dismiss,
        }
    }

    /// Writes `text` to the clipboard, confirms, and schedules the modal's
    /// dismissal.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Clipboard`](crate::Error::Clipboard) if the write
    /// fails; the modal stays open.
    pub async fn copy(&self, text: &str) -> Result<JoinHandle<()>> {
        if let Err(e) = self.clipboard.write_text(text).await {
            warn!(error = %e, "Clipboard write failed");
            return Err(e);
        }

        self.presenter.show_copied();
        debug!(len = text.len(), "Copied result");

        let presenter = Arc::clone(&self.presenter);
        let delay = self.copy_dismiss;
        Ok(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            presenter.dismiss();
        }))
    }

    /// Opens `text` as a link in an isolated browsing context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLinkTarget`](crate::Error::InvalidLinkTarget)
    /// after alerting the user if `text` is not URL-like, or the opener's
    /// error.
    pub fn open_link(&self, text: &str) -> Result<Url> {
        let url = match resolve_link(text) {
            Ok(url) => url,
            Err(e) => {
                self.presenter.alert(NOT_A_URL_MESSAGE);
                return Err(e);
            }
        };

        self.opener.open(&url, OpenPolicy::isolated())?;
        debug!(url = %url, "Opened result link");
        Ok(url)
    }

    /// Closes the modal.
    pub fn close(&self) {
        self.presenter.dismiss();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;
    use crate::agent::fakes::{FakeClipboard, FakeOpener, FakePresenter, Shown};

    type Actions = ResultActions<FakePresenter, FakeClipboard, FakeOpener>;

    fn actions(clipboard: FakeClipboard) -> (Arc<FakePresenter>, Actions) {
        let presenter = Arc::new(FakePresenter::default());
        let actions = ResultActions::new(
            Arc::clone(&presenter),
            clipboard,
            FakeOpener::default(),
            Duration::from_millis(10),
        );
        (presenter, actions)
    }

    #[tokio::test]
    async fn test_copy_confirms_then_dismisses() {
        let (presenter, actions) = actions(FakeClipboard::default());

        let dismissal = actions.copy("payload").await.expect("copy");
        assert_eq!(*actions.clipboard.written.lock(), vec!["payload".to_string()]);
        assert_eq!(presenter.shown(), vec![Shown::Copied]);

        dismissal.await.expect("dismiss task");
        assert_eq!(presenter.shown(), vec![Shown::Copied, Shown::Dismissed]);
    }

    #[tokio::test]
    async fn test_copy_failure_keeps_modal() {
        let (presenter, actions) = actions(FakeClipboard {
            fail: true,
            ..Default::default()
        });

        let err = actions.copy("payload").await.expect_err("clipboard fails");
        assert!(matches!(err, Error::Clipboard { .. }));
        assert!(presenter.shown().is_empty());
    }

    #[test]
    fn test_open_bare_domain() {
        let (presenter, actions) = actions(FakeClipboard::default());

        let url = actions.open_link("example.com/page").expect("open");
        assert_eq!(url.as_str(), "https://example.com/page");

        let opened = actions.opener.opened.lock();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].0.as_str(), "https://example.com/page");
        assert_eq!(opened[0].1, OpenPolicy::isolated());
        assert!(presenter.shown().is_empty());
    }

    #[test]
    fn test_open_plain_text_warns() {
        let (presenter, actions) = actions(FakeClipboard::default());

        let err = actions.open_link("hello world").expect_err("not a url");
        assert!(matches!(err, Error::InvalidLinkTarget { .. }));
        assert!(actions.opener.opened.lock().is_empty());
        assert_eq!(presenter.shown(), vec![Shown::Alert(NOT_A_URL_MESSAGE.to_string())]);
    }

    #[test]
    fn test_close_dismisses() {
        let (presenter, actions) = actions(FakeClipboard::default());
        actions.close();
        assert_eq!(presenter.shown(), vec![Shown::Dismissed]);
    }
}
