//! WebSocket transport to the extension shim.
//!
//! The shim is a thin background script plus a thin content script. It
//! forwards host API calls, browser events and page DOM events; everything
//! else, content agents included, runs on the Rust side.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                         ┌─────────────────┐
//! │  Rust                │                         │  Extension shim │
//! │                      │        WebSocket        │  (background)   │
//! │  PendingServer       │◄───────────────────────►│                 │
//! │  → Connection        │     localhost:PORT      │  tabs, scripting│
//! │  → HostBridge        │                         │  commands,      │
//! │  → BackgroundCtrl    │                         │  runtime        │
//! │  → PageBridge        │                         ├─────────────────┤
//! │    → ContentAgent    │                         │  content script │
//! │      (per frame)     │                         │  (DOM relay)    │
//! └──────────────────────┘                         └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `PendingServer::bind` - Bind to localhost with random port
//! 2. `PendingServer::accept` - Wait for the shim, complete READY
//! 3. `split_events` - Separate page events from background events
//! 4. `HostBridge::serve` / `PageBridge::serve` - Dispatch into the
//!    controller and the per-frame agents
//! 5. `Connection::shutdown` - Close the socket
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `server` | WebSocket server binding and acceptance |
//! | `host` | [`HostBridge`]: background platform traits over the bridge |
//! | `page` | [`PageBridge`]: per-frame agents and agent platform traits |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Platform capabilities executed by the shim.
pub mod host;

/// Content agents driven by page events.
pub mod page;

/// WebSocket server for the shim.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, EventStream, ReadyData};
pub use host::HostBridge;
pub use page::{ControllerChannel, PageBridge, ShimFrame, ShimSurface, split_events};
pub use server::PendingServer;
