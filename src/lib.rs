//! QR Region Scanner - select a region of a browser tab and decode the QR code in it.
//!
//! # Architecture
//!
//! The scanner follows the extension model:
//!
//! - **Background Controller**: handles the global command, delivers
//!   `activateScanner` (injecting the agent on demand), serves captures
//! - **Content Agent**: one per frame, owns the selection overlay, crops the
//!   captured viewport and decodes it
//!
//! Key design principles:
//!
//! - Browser APIs are reached only through the [`platform`] traits
//! - At most one injection and one retry per activation
//! - At most one capture request in flight per gesture
//! - The QR decoder is bundled; nothing is fetched at runtime
//!
//! # Quick Start
//!
//! ```no_run
//! use std::net::{IpAddr, Ipv4Addr};
//! use std::sync::Arc;
//!
//! use qr_region_scanner::transport::{HostBridge, PageBridge, PendingServer, split_events};
//! use qr_region_scanner::{BackgroundController, Result, ScannerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ScannerConfig::from_file("scanner.json")?;
//!
//!     let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
//!     println!("shim url: {}", server.ws_url());
//!     let (connection, events, _ready) = server.accept().await?;
//!
//!     let bridge = Arc::new(HostBridge::new(connection.clone()));
//!     let controller = Arc::new(BackgroundController::new(
//!         Arc::clone(&bridge),
//!         Arc::clone(&bridge),
//!         &config,
//!     ));
//!
//!     let (background, page) = split_events(events);
//!     let pages = PageBridge::new(connection.clone(), Arc::clone(&controller), &config);
//!     tokio::spawn(pages.serve(page));
//!
//!     HostBridge::serve(controller, connection, background).await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`agent`] | Content agent: selection, scan pipeline, result actions |
//! | [`background`] | Activation protocol and capture service |
//! | [`config`] | [`ScannerConfig`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`geometry`] | Points and selection regions |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`imaging`] | Data URLs, DPR-aware crop, QR decoding |
//! | [`platform`] | Capability traits for the browser |
//! | [`protocol`] | Runtime messages and bridge message types |
//! | [`transport`] | WebSocket binding to the extension shim |

// ============================================================================
// Modules
// ============================================================================

/// Content agent: one instance per frame.
pub mod agent;

/// Background controller: activation and capture.
pub mod background;

/// Scanner configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Viewport geometry.
pub mod geometry;

/// Type-safe identifiers for browser entities.
pub mod identifiers;

/// Screenshot decoding, cropping and QR decoding.
pub mod imaging;

/// Capability traits for the host platform.
pub mod platform;

/// Message types.
///
/// Runtime messages between agent and background, plus the bridge
/// request/response/event structures.
pub mod protocol;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Agent types
pub use agent::{ContentAgent, KeyPress, PointerButton, ResultActions, ScanOutcome, SelectionMachine};

// Background types
pub use background::{ActivationOutcome, BackgroundController};

// Configuration
pub use config::{Readiness, ScannerConfig};

// Error types
pub use error::{Error, Result};

// Geometry
pub use geometry::{Point, Region};

// Identifier types
pub use identifiers::{FrameId, RequestId, ScanId, TabId};

// Imaging
pub use imaging::{InversionMode, QrDecoder, RqrrDecoder};
