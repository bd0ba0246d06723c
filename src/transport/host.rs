//! Browser capabilities backed by the extension shim.
//!
//! [`HostBridge`] turns [`TabsApi`] and [`CaptureApi`] calls into bridge
//! requests, and [`HostBridge::serve`] feeds shim events into a
//! [`BackgroundController`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::background::BackgroundController;
use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::platform::{CaptureApi, TabsApi};
use crate::protocol::{Event, EventReply, HostCommand, Message, ParsedEvent, Request, Response};

use super::connection::{Connection, EventStream};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for one bridge call.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// HostBridge
// ============================================================================

/// Tab and capture primitives executed by the shim.
#[derive(Clone)]
pub struct HostBridge {
    connection: Connection,
    call_timeout: Duration,
}

impl HostBridge {
    #[must_use]
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    async fn call(&self, command: HostCommand) -> Result<Response> {
        self.connection
            .send_with_timeout(Request::new(command), self.call_timeout)
            .await
    }

    /// Dispatches shim events to `controller` until the connection closes.
    ///
    /// Each event is handled on its own task, so a slow activation never
    /// delays a capture request from another tab.
    pub async fn serve<T, C>(
        controller: Arc<BackgroundController<T, C>>,
        connection: Connection,
        mut events: EventStream,
    ) where
        T: TabsApi + 'static,
        C: CaptureApi + 'static,
    {
        info!("Serving shim events");

        while let Some(event) = events.recv().await {
            let controller = Arc::clone(&controller);
            let connection = connection.clone();
            tokio::spawn(async move {
                dispatch_event(&controller, &connection, event).await;
            });
        }

        info!("Event stream closed");
    }
}

/// Handles one event and sends its reply, if any.
async fn dispatch_event<T, C>(
    controller: &BackgroundController<T, C>,
    connection: &Connection,
    event: Event,
) where
    T: TabsApi,
    C: CaptureApi,
{
    match event.parse() {
        ParsedEvent::Command { command } => {
            let outcome = controller.handle_command(&command).await;
            debug!(command = %command, ?outcome, "Command handled");
        }

        ParsedEvent::RuntimeMessage { message, sender } => {
            let Some(result) = controller.handle_message(message, sender).await else {
                return;
            };
            if let Err(e) = connection.reply(EventReply::new(event.id, event.method, result)) {
                warn!(error = %e, action = message.action(), "Could not reply to message");
            }
        }

        ParsedEvent::Unknown { method, .. } => {
            debug!(method = %method, "Ignoring unknown event");
        }
    }
}

// ============================================================================
// TabsApi
// ============================================================================

#[async_trait]
impl TabsApi for HostBridge {
    async fn active_tab(&self) -> Result<Option<TabId>> {
        let result = self.call(HostCommand::QueryActiveTab).await?.into_result()?;

        let tab_id = match result.get("tabId") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let raw = value
                    .as_u64()
                    .and_then(|id| u32::try_from(id).ok())
                    .ok_or_else(|| Error::protocol(format!("invalid tabId: {value}")))?;
                TabId::new(raw)
            }
        };

        Ok(tab_id)
    }

    async fn send_message(&self, tab_id: TabId, message: Message) -> Result<Value> {
        let response = self
            .call(HostCommand::SendMessage { tab_id, message })
            .await
            .map_err(|e| Error::delivery_failed(tab_id, e.to_string()))?;

        if !response.is_success() {
            return Err(Error::delivery_failed(tab_id, response.error_message()));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn inject_agent(&self, tab_id: TabId, files: &[String]) -> Result<()> {
        let response = self
            .call(HostCommand::ExecuteScript {
                tab_id,
                files: files.to_vec(),
            })
            .await
            .map_err(|e| Error::injection_failed(tab_id, e.to_string()))?;

        if !response.is_success() {
            return Err(Error::injection_failed(tab_id, response.error_message()));
        }
        Ok(())
    }
}

// ============================================================================
// CaptureApi
// ============================================================================

#[async_trait]
impl CaptureApi for HostBridge {
    async fn capture_visible_tab(&self, format: &str) -> Result<String> {
        let response = self
            .call(HostCommand::CaptureVisibleTab {
                format: format.to_string(),
            })
            .await?;

        if !response.is_success() {
            return Err(Error::capture_failed(response.error_message()));
        }

        response
            .get_str("dataUrl")
            .map(str::to_string)
            .ok_or_else(|| Error::protocol("capture result has no dataUrl"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};

    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

    use crate::config::ScannerConfig;
    use crate::identifiers::RequestId;
    use crate::transport::PendingServer;

    type ShimSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn connect() -> (HostBridge, EventStream, ShimSocket) {
        let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind");
        let url = server.ws_url();

        let shim = tokio::spawn(async move {
            let (mut socket, _) = connect_async(url).await.expect("connect");
            let ready = json!({ "id": RequestId::ready(), "type": "success" });
            socket
                .send(WsMessage::Text(ready.to_string().into()))
                .await
                .expect("ready");
            socket
        });

        let (connection, events, _) = server.accept().await.expect("accept");
        let bridge = HostBridge::new(connection).with_call_timeout(Duration::from_secs(2));
        (bridge, events, shim.await.expect("shim"))
    }

    async fn recv(socket: &mut ShimSocket) -> Value {
        loop {
            if let WsMessage::Text(text) = socket.next().await.expect("open").expect("frame") {
                return serde_json::from_str(&text).expect("json");
            }
        }
    }

    async fn send(socket: &mut ShimSocket, value: Value) {
        socket
            .send(WsMessage::Text(value.to_string().into()))
            .await
            .expect("send");
    }

    /// Answers the next request with `result` or `error`.
    async fn answer(socket: &mut ShimSocket, reply: std::result::Result<Value, &str>) -> Value {
        let request = recv(socket).await;
        let response = match reply {
            Ok(result) => json!({ "id": request["id"], "type": "success", "result": result }),
            Err(message) => json!({
                "id": request["id"],
                "type": "error",
                "error": "host error",
                "message": message
            }),
        };
        send(socket, response).await;
        request
    }

    fn tab(id: u32) -> TabId {
        TabId::new(id).expect("tab")
    }

    #[tokio::test]
    async fn test_active_tab() {
        let (bridge, _events, mut shim) = connect().await;

        let call = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.active_tab().await }
        });
        let request = answer(&mut shim, Ok(json!({ "tabId": 4 }))).await;
        assert_eq!(request["method"], "tabs.queryActive");
        assert_eq!(call.await.expect("join").expect("ok"), Some(tab(4)));

        let call = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.active_tab().await }
        });
        answer(&mut shim, Ok(json!({ "tabId": null }))).await;
        assert_eq!(call.await.expect("join").expect("ok"), None);
    }

    #[tokio::test]
    async fn test_delivery_failure_mapped() {
        let (bridge, _events, mut shim) = connect().await;

        let call = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.send_message(tab(3), Message::ActivateScanner).await }
        });
        let request = answer(
            &mut shim,
            Err("Could not establish connection. Receiving end does not exist."),
        )
        .await;

        assert_eq!(request["params"]["message"]["action"], "activateScanner");
        let err = call.await.expect("join").expect_err("not delivered");
        assert!(err.is_delivery_failure());
        assert!(err.to_string().contains("Receiving end does not exist"));
    }

    #[tokio::test]
    async fn test_injection_failure_mapped() {
        let (bridge, _events, mut shim) = connect().await;

        let call = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.inject_agent(tab(3), &["content.js".to_string()]).await }
        });
        let request = answer(&mut shim, Err("Missing host permission for the tab")).await;

        assert_eq!(request["method"], "scripting.executeScript");
        assert_eq!(request["params"]["files"], json!(["content.js"]));
        let err = call.await.expect("join").expect_err("not injected");
        assert!(matches!(err, Error::InjectionFailed { .. }));
    }

    #[tokio::test]
    async fn test_capture_reason_verbatim() {
        let (bridge, _events, mut shim) = connect().await;

        let call = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.capture_visible_tab("png").await }
        });
        let request = answer(&mut shim, Err("permission denied")).await;

        assert_eq!(request["params"]["format"], "png");
        let err = call.await.expect("join").expect_err("denied");
        assert_eq!(err.to_string(), "permission denied");
    }

    #[tokio::test]
    async fn test_serve_answers_capture_message() {
        let (bridge, events, mut shim) = connect().await;
        let bridge = Arc::new(bridge);
        let controller = Arc::new(BackgroundController::new(
            Arc::clone(&bridge),
            Arc::clone(&bridge),
            &ScannerConfig::default(),
        ));
        tokio::spawn(HostBridge::serve(
            controller,
            bridge.connection().clone(),
            events,
        ));

        send(
            &mut shim,
            json!({
                "id": "550e8400-e29b-41d4-a716-446655440000",
                "type": "event",
                "method": "runtime.onMessage",
                "params": {
                    "message": { "action": "captureVisibleTab" },
                    "sender": { "tabId": 9, "frameId": 0 }
                }
            }),
        )
        .await;

        answer(&mut shim, Ok(json!({ "dataUrl": "data:image/png;base64,AAAA" }))).await;

        let reply = recv(&mut shim).await;
        assert_eq!(reply["id"], "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(reply["replyTo"], "runtime.onMessage");
        assert_eq!(reply["result"]["dataUrl"], "data:image/png;base64,AAAA");
    }

    #[tokio::test]
    async fn test_serve_runs_activation_command() {
        let (bridge, events, mut shim) = connect().await;
        let bridge = Arc::new(bridge);
        let controller = Arc::new(BackgroundController::new(
            Arc::clone(&bridge),
            Arc::clone(&bridge),
            &ScannerConfig::default(),
        ));
        tokio::spawn(HostBridge::serve(
            controller,
            bridge.connection().clone(),
            events,
        ));

        send(
            &mut shim,
            json!({
                "id": "550e8400-e29b-41d4-a716-446655440001",
                "type": "event",
                "method": "commands.onCommand",
                "params": { "command": "scan-qr" }
            }),
        )
        .await;

        let query = answer(&mut shim, Ok(json!({ "tabId": 2 }))).await;
        assert_eq!(query["method"], "tabs.queryActive");

        let delivery = answer(&mut shim, Ok(json!({ "ok": true }))).await;
        assert_eq!(delivery["method"], "tabs.sendMessage");
        assert_eq!(delivery["params"]["tabId"], 2);
    }
}
