//! Protocol message types.
//!
//! Two layers share this module:
//!
//! - **Runtime messages** between the background controller and content
//!   agents (`activateScanner`, `captureVisibleTab`, `agentReady`).
//! - **Bridge messages** between the Rust host and the extension shim,
//!   which carry runtime messages and host API calls over WebSocket.
//! - **Page events** relayed from each frame's content script.
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Host → Shim | Host API call |
//! | `Response` | Shim → Host | Host API result |
//! | `Event` | Shim → Host | Browser listener fired |
//! | `EventReply` | Host → Shim | Response for a runtime message |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Runtime messages and their replies |
//! | `command` | Activation command and bridge commands |
//! | `event` | Event and EventReply types |
//! | `page` | Page events and frame targets |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Activation command and bridge commands.
pub mod command;

/// Event message types.
pub mod event;

/// Runtime messages between extension processes.
pub mod message;

/// DOM events relayed from content scripts.
pub mod page;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{ActivationCommand, HostCommand};
pub use event::{Event, EventReply, ParsedEvent};
pub use message::{ActivateAck, CaptureResponse, Message, MessageSender};
pub use page::{FrameTarget, ModalAction, PageEvent, PointerPhase};
pub use request::{Request, Response, ResponseType};
