//! Background controller: activation protocol and runtime message dispatch.
//!
//! # Activation
//!
//! ```text
//! command ──► active tab? ──no──► (no-op)
//!                 │yes
//!                 ▼
//!          send activateScanner ──ok──► Delivered
//!                 │failed
//!                 ▼
//!          inject agent ──failed──► InjectionFailed (logged)
//!                 │ok
//!                 ▼
//!          wait (fixed delay | agentReady, bounded)
//!                 ▼
//!          send activateScanner ──ok──► DeliveredAfterInjection
//!                 │failed
//!                 ▼
//!          RetryFailed (logged)
//! ```
//!
//! There is never more than one injection and one retry per command.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::{ActivationConfig, Readiness, ScannerConfig};
use crate::identifiers::TabId;
use crate::platform::{CaptureApi, TabsApi};
use crate::protocol::{ActivationCommand, Message, MessageSender};

use super::capture::CaptureService;
use super::readiness::ReadinessTracker;

// ============================================================================
// ActivationOutcome
// ============================================================================

/// Result of one activation command. Commands are fire-and-forget, so
/// failures end here rather than propagating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The command id is not ours.
    Ignored,
    /// No active tab resolved; nothing was sent.
    NoActiveTab,
    /// The agent was already present and acknowledged.
    Delivered,
    /// The agent was injected and the single retry was acknowledged.
    DeliveredAfterInjection,
    /// Injection failed; no retry was attempted.
    InjectionFailed,
    /// Injection succeeded but the retry was not delivered.
    RetryFailed,
}

impl ActivationOutcome {
    /// Returns `true` if the agent received `activateScanner`.
    #[inline]
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered | Self::DeliveredAfterInjection)
    }
}

// ============================================================================
// BackgroundController
// ============================================================================

/// The privileged, page-independent side of the scanner.
pub struct BackgroundController<T, C> {
    tabs: T,
    capture: CaptureService<C>,
    readiness: ReadinessTracker,
    command: String,
    activation: ActivationConfig,
}

impl<T: TabsApi, C: CaptureApi> BackgroundController<T, C> {
    /// Creates a controller over the given host capabilities.
    #[must_use]
    pub fn new(tabs: T, capture: C, config: &ScannerConfig) -> Self {
        Self {
            tabs,
            capture: CaptureService::new(capture),
            readiness: ReadinessTracker::new(),
            command: config.command.clone(),
            activation: config.activation.clone(),
        }
    }

    /// Returns the readiness tracker.
    #[inline]
    #[must_use]
    pub fn readiness(&self) -> &ReadinessTracker {
        &self.readiness
    }

    /// Handles a global keyboard command.
    pub async fn handle_command(&self, name: &str) -> ActivationOutcome {
        match ActivationCommand::parse(name, &self.command) {
            Some(ActivationCommand::Scan) => self.activate_active_tab().await,
            None => {
                debug!(command = name, "Ignoring unrelated command");
                ActivationOutcome::Ignored
            }
        }
    }

    /// Activates the agent in the active tab of the current window.
    pub async fn activate_active_tab(&self) -> ActivationOutcome {
        match self.tabs.active_tab().await {
            Ok(Some(tab_id)) => self.activate_tab(tab_id).await,
            Ok(None) => {
                debug!("No active tab, nothing to activate");
                ActivationOutcome::NoActiveTab
            }
            Err(e) => {
                warn!(error = %e, "Active tab query failed");
                ActivationOutcome::NoActiveTab
            }
        }
    }

    /// Runs the deliver / inject / retry-once sequence against `tab_id`.
    pub async fn activate_tab(&self, tab_id: TabId) -> ActivationOutcome {
        match self.tabs.send_message(tab_id, Message::ActivateScanner).await {
            Ok(_) => {
                debug!(%tab_id, "Agent activated");
                return ActivationOutcome::Delivered;
            }
            Err(e) => {
                debug!(%tab_id, error = %e, "Agent not reachable, injecting");
            }
        }

        let waiter = match self.activation.readiness {
            Readiness::Handshake { .. } => Some(self.readiness.register(tab_id)),
            Readiness::FixedDelay { .. } => None,
        };

        if let Err(e) = self
            .tabs
            .inject_agent(tab_id, &self.activation.agent_files)
            .await
        {
            if let Some(waiter) = &waiter {
                self.readiness.cancel(waiter.token());
            }
            error!(%tab_id, error = %e, "Script injection failed");
            return ActivationOutcome::InjectionFailed;
        }

        let limit = self.activation.readiness.duration();
        match waiter {
            Some(waiter) => {
                let token = waiter.token();
                if !waiter.wait(limit).await {
                    self.readiness.cancel(token);
                    warn!(%tab_id, "No ready announcement, retrying anyway");
                }
            }
            None => tokio::time::sleep(limit).await,
        }

        match self.tabs.send_message(tab_id, Message::ActivateScanner).await {
            Ok(_) => {
                info!(%tab_id, "Agent injected and activated");
                ActivationOutcome::DeliveredAfterInjection
            }
            Err(e) => {
                error!(%tab_id, error = %e, "Second attempt failed");
                ActivationOutcome::RetryFailed
            }
        }
    }

    /// Handles a runtime message from a content agent.
    ///
    /// Returns the reply payload, if the message has one.
    pub async fn handle_message(&self, message: Message, sender: MessageSender) -> Option<Value> {
        match message {
            Message::CaptureVisibleTab => {
                let response = self.capture.handle(&sender).await;
                match serde_json::to_value(response) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        error!(error = %e, "Failed to serialize capture response");
                        None
                    }
                }
            }

            Message::AgentReady => {
                if let Some(tab_id) = sender.tab_id {
                    self.readiness.notify(tab_id);
                }
                None
            }

            Message::ActivateScanner => {
                debug!(tab_id = ?sender.tab_id, "activateScanner is not handled by the background");
                None
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

    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::sync::Notify;

    use crate::error::{Error, Result};

    #[derive(Default)]
    struct FakeHost {
        active: Option<TabId>,
        deliveries: Mutex<VecDeque<bool>>,
        inject_ok: bool,
        sent: Mutex<Vec<(TabId, Message)>>,
        injections: Mutex<Vec<(TabId, Vec<String>)>>,
        injected: Notify,
    }

    impl FakeHost {
        fn new(active: Option<u32>, deliveries: &[bool], inject_ok: bool) -> Arc<Self> {
            Arc::new(Self {
                active: active.and_then(TabId::new),
                deliveries: Mutex::new(deliveries.iter().copied().collect()),
                inject_ok,
                ..Default::default()
            })
        }

        fn sent_count(&self) -> usize {
            self.sent.lock().len()
        }

        fn injection_count(&self) -> usize {
            self.injections.lock().len()
        }
    }

    #[async_trait]
    impl TabsApi for FakeHost {
        async fn active_tab(&self) -> Result<Option<TabId>> {
            Ok(self.active)
        }

        async fn send_message(&self, tab_id: TabId, message: Message) -> Result<Value> {
            self.sent.lock().push((tab_id, message));
            if self.deliveries.lock().pop_front().unwrap_or(false) {
                Ok(json!({ "ok": true }))
            } else {
                Err(Error::delivery_failed(
                    tab_id,
                    "Could not establish connection. Receiving end does not exist.",
                ))
            }
        }

        async fn inject_agent(&self, tab_id: TabId, files: &[String]) -> Result<()> {
            self.injections.lock().push((tab_id, files.to_vec()));
            self.injected.notify_one();
            if self.inject_ok {
                Ok(())
            } else {
                Err(Error::injection_failed(tab_id, "Cannot access a chrome:// URL"))
            }
        }
    }

    #[async_trait]
    impl CaptureApi for FakeHost {
        async fn capture_visible_tab(&self, _format: &str) -> Result<String> {
            Err(Error::capture_failed("permission denied"))
        }
    }

    fn fast_config() -> ScannerConfig {
        ScannerConfig::new().with_readiness(Readiness::FixedDelay { delay_ms: 1 })
    }

    fn controller(
        host: &Arc<FakeHost>,
        config: &ScannerConfig,
    ) -> BackgroundController<Arc<FakeHost>, Arc<FakeHost>> {
        init_tracing();
        BackgroundController::new(Arc::clone(host), Arc::clone(host), config)
    }

    /// Set `RUST_LOG=qr_region_scanner=debug` to see the activation trace.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[tokio::test]
    async fn test_no_active_tab_sends_nothing() {
        let host = FakeHost::new(None, &[], true);
        let outcome = controller(&host, &fast_config()).handle_command("scan-qr").await;

        assert_eq!(outcome, ActivationOutcome::NoActiveTab);
        assert_eq!(host.sent_count(), 0);
        assert_eq!(host.injection_count(), 0);
    }

    #[tokio::test]
    async fn test_unrelated_command_ignored() {
        let host = FakeHost::new(Some(1), &[true], true);
        let outcome = controller(&host, &fast_config()).handle_command("other").await;

        assert_eq!(outcome, ActivationOutcome::Ignored);
        assert_eq!(host.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_present_agent_is_activated_directly() {
        let host = FakeHost::new(Some(1), &[true], true);
        let outcome = controller(&host, &fast_config()).handle_command("scan-qr").await;

        assert_eq!(outcome, ActivationOutcome::Delivered);
        assert_eq!(host.sent_count(), 1);
        assert_eq!(host.injection_count(), 0);
    }

    #[tokio::test]
    async fn test_inject_then_retry_once() {
        let host = FakeHost::new(Some(4), &[false, true], true);
        let outcome = controller(&host, &fast_config()).handle_command("scan-qr").await;

        assert_eq!(outcome, ActivationOutcome::DeliveredAfterInjection);
        assert_eq!(host.sent_count(), 2);
        assert_eq!(host.injection_count(), 1);

        let injections = host.injections.lock();
        assert_eq!(injections[0].0.as_u32(), 4);
        assert_eq!(injections[0].1, vec!["content.js".to_string()]);
        assert!(
            host.sent
                .lock()
                .iter()
                .all(|(_, m)| *m == Message::ActivateScanner)
        );
    }

    #[tokio::test]
    async fn test_retry_failure_gives_up() {
        let host = FakeHost::new(Some(4), &[false, false, true], true);
        let outcome = controller(&host, &fast_config()).handle_command("scan-qr").await;

        assert_eq!(outcome, ActivationOutcome::RetryFailed);
        assert_eq!(host.sent_count(), 2);
        assert_eq!(host.injection_count(), 1);
    }

    #[tokio::test]
    async fn test_injection_failure_skips_retry() {
        let host = FakeHost::new(Some(4), &[false, true], false);
        let outcome = controller(&host, &fast_config()).handle_command("scan-qr").await;

        assert_eq!(outcome, ActivationOutcome::InjectionFailed);
        assert_eq!(host.sent_count(), 1);
        assert_eq!(host.injection_count(), 1);
    }

    #[tokio::test]
    async fn test_handshake_waits_for_agent_ready() {
        let host = FakeHost::new(Some(8), &[false, true], true);
        let config = ScannerConfig::new().with_readiness(Readiness::Handshake { timeout_ms: 5_000 });
        let controller = Arc::new(controller(&host, &config));

        let task = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.handle_command("scan-qr").await })
        };

        host.injected.notified().await;
        let tab_id = TabId::new(8).expect("valid tab id");
        let reply = controller
            .handle_message(Message::AgentReady, MessageSender::tab(tab_id))
            .await;
        assert!(reply.is_none());

        let outcome = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("handshake should resolve before the timeout")
            .expect("task");
        assert_eq!(outcome, ActivationOutcome::DeliveredAfterInjection);
        assert_eq!(host.sent_count(), 2);
        assert_eq!(controller.readiness().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_activations_share_handshake() {
        let host = FakeHost::new(Some(8), &[false, false, true, true], true);
        let config = ScannerConfig::new().with_readiness(Readiness::Handshake { timeout_ms: 5_000 });
        let controller = Arc::new(controller(&host, &config));

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let controller = Arc::clone(&controller);
                tokio::spawn(async move { controller.handle_command("scan-qr").await })
            })
            .collect();

        while host.injection_count() < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(controller.readiness().pending_count(), 2);

        let tab_id = TabId::new(8).expect("valid tab id");
        controller
            .handle_message(Message::AgentReady, MessageSender::tab(tab_id))
            .await;

        for task in tasks {
            let outcome = tokio::time::timeout(Duration::from_secs(2), task)
                .await
                .expect("both activations should see the announcement")
                .expect("task");
            assert_eq!(outcome, ActivationOutcome::DeliveredAfterInjection);
        }
        assert_eq!(host.sent_count(), 4);
        assert_eq!(controller.readiness().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_handshake_timeout_still_retries_once() {
        let host = FakeHost::new(Some(8), &[false, true], true);
        let config = ScannerConfig::new().with_readiness(Readiness::Handshake { timeout_ms: 5 });
        let controller = controller(&host, &config);

        let outcome = controller.handle_command("scan-qr").await;

        assert_eq!(outcome, ActivationOutcome::DeliveredAfterInjection);
        assert_eq!(host.sent_count(), 2);
        assert_eq!(host.injection_count(), 1);
        assert_eq!(controller.readiness().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_capture_message_replies_with_error() {
        let host = FakeHost::new(Some(1), &[], true);
        let controller = controller(&host, &fast_config());

        let reply = controller
            .handle_message(Message::CaptureVisibleTab, MessageSender::default())
            .await;
        assert_eq!(reply, Some(json!({ "error": "permission denied" })));
    }

    #[test]
    fn test_outcome_is_delivered() {
        assert!(ActivationOutcome::Delivered.is_delivered());
        assert!(ActivationOutcome::DeliveredAfterInjection.is_delivered());
        assert!(!ActivationOutcome::RetryFailed.is_delivered());
        assert!(!ActivationOutcome::NoActiveTab.is_delivered());
    }
}
