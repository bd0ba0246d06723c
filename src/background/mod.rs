//! Background controller.
//!
//! Listens for the activation command, makes sure the content agent is
//! running in the active tab, and serves visible-tab captures to agents.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `controller` | Activation protocol and message dispatch |
//! | `capture` | `captureVisibleTab` service |
//! | `readiness` | `agentReady` handshake waiters |

// ============================================================================
// Submodules
// ============================================================================

mod capture;
mod controller;
mod readiness;

// ============================================================================
// Re-exports
// ============================================================================

pub use capture::{CAPTURE_FORMAT, CaptureService};
pub use controller::{ActivationOutcome, BackgroundController};
pub use readiness::{ReadinessTracker, ReadyToken, ReadyWaiter};
