//! Page events relayed by the shim's content script.
//!
//! The content script owns no scanner state. It forwards DOM events for its
//! frame as `page.*` events and renders the overlay and modal commands it is
//! sent back.
//!
//! | Method | DOM source | Reply |
//! |--------|------------|-------|
//! | `page.onLoad` | script injected | none |
//! | `page.onUnload` | `pagehide` | none |
//! | `page.onMessage` | `runtime.onMessage` | `{ "ok": true }` for `activateScanner` |
//! | `page.onPointer` | `mousemove` / `mousedown` / `mouseup` | none |
//! | `page.onKeyDown` | `keydown` | `{ "handled": bool }` |
//! | `page.onContextMenu` | `contextmenu` | `{ "handled": bool }` |
//! | `page.onResultAction` | modal button | none |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::identifiers::{FrameId, TabId};

use super::{Event, Message, MessageSender};

// ============================================================================
// FrameTarget
// ============================================================================

/// One frame of one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameTarget {
    #[serde(rename = "tabId")]
    pub tab_id: TabId,
    #[serde(rename = "frameId", default)]
    pub frame_id: FrameId,
}

impl FrameTarget {
    #[inline]
    #[must_use]
    pub const fn new(tab_id: TabId, frame_id: FrameId) -> Self {
        Self { tab_id, frame_id }
    }

    /// The runtime message sender this frame appears as.
    #[inline]
    #[must_use]
    pub fn sender(&self) -> MessageSender {
        MessageSender {
            tab_id: Some(self.tab_id),
            frame_id: self.frame_id,
        }
    }
}

// ============================================================================
// PageEvent
// ============================================================================

/// Pointer event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    Move,
    Down,
    Up,
}

/// Result modal button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModalAction {
    Copy,
    OpenLink,
    Close,
}

/// A DOM event from one frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum PageEvent {
    #[serde(rename = "page.onLoad")]
    Loaded {
        target: FrameTarget,
        #[serde(rename = "devicePixelRatio", default = "unit_ratio")]
        device_pixel_ratio: f64,
    },

    #[serde(rename = "page.onUnload")]
    Unloaded { target: FrameTarget },

    #[serde(rename = "page.onMessage")]
    RuntimeMessage { target: FrameTarget, message: Message },

    #[serde(rename = "page.onPointer")]
    Pointer {
        target: FrameTarget,
        phase: PointerPhase,
        x: f64,
        y: f64,
        /// DOM `MouseEvent.button`.
        #[serde(default)]
        button: u16,
        #[serde(rename = "devicePixelRatio", default = "unit_ratio")]
        device_pixel_ratio: f64,
    },

    #[serde(rename = "page.onKeyDown")]
    KeyDown {
        target: FrameTarget,
        key: String,
        #[serde(rename = "ctrlKey", default)]
        ctrl: bool,
        #[serde(rename = "shiftKey", default)]
        shift: bool,
    },

    #[serde(rename = "page.onContextMenu")]
    ContextMenu { target: FrameTarget },

    #[serde(rename = "page.onResultAction")]
    ResultAction {
        target: FrameTarget,
        action: ModalAction,
        /// Text shown in the modal.
        #[serde(default)]
        text: String,
    },
}

fn unit_ratio() -> f64 {
    1.0
}

impl PageEvent {
    /// Parses a `page.*` event. `None` for other methods or bad params.
    #[must_use]
    pub fn from_event(event: &Event) -> Option<Self> {
        if !event.is_page_event() {
            return None;
        }
        serde_json::from_value(json!({
            "method": event.method,
            "params": event.params,
        }))
        .ok()
    }

    /// The frame the event came from.
    #[must_use]
    pub fn target(&self) -> FrameTarget {
        match self {
            Self::Loaded { target, .. }
            | Self::Unloaded { target }
            | Self::RuntimeMessage { target, .. }
            | Self::Pointer { target, .. }
            | Self::KeyDown { target, .. }
            | Self::ContextMenu { target }
            | Self::ResultAction { target, .. } => *target,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::Value;

    fn event(method: &str, params: Value) -> Event {
        serde_json::from_value(json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "event",
            "method": method,
            "params": params,
        }))
        .expect("parse")
    }

    fn target(tab: u32, frame: u64) -> FrameTarget {
        FrameTarget::new(TabId::new(tab).expect("valid tab id"), FrameId::new(frame))
    }

    #[test]
    fn test_pointer_event() {
        let parsed = PageEvent::from_event(&event(
            "page.onPointer",
            json!({
                "target": { "tabId": 3, "frameId": 7 },
                "phase": "up",
                "x": 12.5,
                "y": 40,
                "button": 0,
                "devicePixelRatio": 2
            }),
        ));

        assert_eq!(
            parsed,
            Some(PageEvent::Pointer {
                target: target(3, 7),
                phase: PointerPhase::Up,
                x: 12.5,
                y: 40.0,
                button: 0,
                device_pixel_ratio: 2.0,
            })
        );
    }

    #[test]
    fn test_missing_ratio_defaults_to_one() {
        let parsed = PageEvent::from_event(&event(
            "page.onLoad",
            json!({ "target": { "tabId": 3 } }),
        ));
        assert_eq!(
            parsed,
            Some(PageEvent::Loaded {
                target: target(3, 0),
                device_pixel_ratio: 1.0,
            })
        );
    }

    #[test]
    fn test_key_and_modal_events() {
        let key = PageEvent::from_event(&event(
            "page.onKeyDown",
            json!({ "target": { "tabId": 1 }, "key": "Q", "ctrlKey": true, "shiftKey": true }),
        ))
        .expect("key event");
        assert!(matches!(key, PageEvent::KeyDown { ctrl: true, shift: true, .. }));

        let action = PageEvent::from_event(&event(
            "page.onResultAction",
            json!({ "target": { "tabId": 1 }, "action": "openLink", "text": "example.com" }),
        ))
        .expect("modal event");
        assert!(matches!(
            action,
            PageEvent::ResultAction { action: ModalAction::OpenLink, .. }
        ));
        assert_eq!(action.target(), target(1, 0));
    }

    #[test]
    fn test_runtime_message_sender() {
        let parsed = PageEvent::from_event(&event(
            "page.onMessage",
            json!({ "target": { "tabId": 9, "frameId": 2 }, "message": { "action": "activateScanner" } }),
        ))
        .expect("message event");

        let sender = parsed.target().sender();
        assert_eq!(sender.tab_id.map(|t| t.as_u32()), Some(9));
        assert!(!sender.frame_id.is_main());
    }

    #[test]
    fn test_other_events_are_not_page_events() {
        assert_eq!(
            PageEvent::from_event(&event("commands.onCommand", json!({ "command": "scan-qr" }))),
            None
        );
        assert_eq!(
            PageEvent::from_event(&event("page.onPointer", json!({ "target": { "tabId": 1 } }))),
            None
        );
    }
}
