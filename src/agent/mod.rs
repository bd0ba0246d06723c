//! Content agent: selection overlay, scan pipeline and result actions.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `content` | [`ContentAgent`], one per frame |
//! | `selection` | [`SelectionMachine`] gesture states |
//! | `pipeline` | [`ScanPipeline`] capture, crop, decode |
//! | `result` | [`ResultActions`] copy / open / close |
//! | `link` | [`resolve_link`] for the open action |

// ============================================================================
// Submodules
// ============================================================================

mod content;
mod link;
mod pipeline;
mod result;
mod selection;

#[cfg(test)]
pub(crate) mod fakes;

// ============================================================================
// Re-exports
// ============================================================================

pub use content::{ContentAgent, KeyPress};
pub use link::{NOT_A_URL_MESSAGE, resolve_link};
pub use pipeline::{
    NO_QR_MESSAGE, REQUEST_FAILED_MESSAGE, SCREENSHOT_UNREADABLE_MESSAGE, ScanOutcome,
    ScanPipeline, failure_text,
};
pub use result::ResultActions;
pub use selection::{PointerButton, PointerUp, SelectionMachine, SelectionState};
