//! Listening side of the shim bridge.
//!
//! The shim's background script dials `ws://127.0.0.1:<port>` and opens with
//! READY. [`PendingServer`] holds the listener until that happens and then
//! hands over a live [`Connection`].

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::connection::{Connection, EventStream, ReadyData};

// ============================================================================
// Constants
// ============================================================================

/// How long [`PendingServer::accept`] waits for the shim to dial in.
pub const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// PendingServer
// ============================================================================

/// Bound listener waiting for the extension shim.
pub struct PendingServer {
    listener: TcpListener,
    addr: SocketAddr,
    accept_timeout: Duration,
}

impl PendingServer {
    /// Binds to `ip:port`. Port 0 picks a free port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the address cannot be bound.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let addr = listener.local_addr()?;
        debug!(%addr, "Shim listener bound");

        Ok(Self {
            listener,
            addr,
            accept_timeout: DEFAULT_ACCEPT_TIMEOUT,
        })
    }

    /// Binds to a free loopback port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if no port is available.
    pub async fn bind_loopback() -> Result<Self> {
        Self::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await
    }

    /// Sets how long [`Self::accept`] waits for the shim.
    #[must_use]
    pub fn with_accept_timeout(mut self, accept_timeout: Duration) -> Self {
        self.accept_timeout = accept_timeout;
        self
    }

    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL to configure the shim with.
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Waits for the shim, upgrades the socket and reads READY.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if nothing dials in before the accept timeout
    /// - [`Error::Connection`] if the WebSocket upgrade fails
    /// - [`Error::ConnectionClosed`] if the shim hangs up before READY
    pub async fn accept(self) -> Result<(Connection, EventStream, ReadyData)> {
        let limit_ms = self.accept_timeout.as_millis() as u64;
        let (stream, peer) = timeout(self.accept_timeout, self.listener.accept())
            .await
            .map_err(|_| Error::connection_timeout(limit_ms))??;

        let socket = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        let (connection, events) = Connection::new(socket);
        let ready = connection.wait_ready().await?;
        info!(%peer, shim_version = ?ready.shim_version, "Shim connected");

        Ok((connection, events, ready))
    }
}

// ============================================================================
// Tests
// ============================================================================
