//! Selection gesture state machine.
//!
//! ```text
//! Idle ──activate──► Selecting(drag_start: None)
//!                        │ primary down
//!                        ▼
//!                    Selecting(drag_start: Some)
//!                        │ primary up
//!             ┌──────────┴───────────┐
//!        too small               large enough
//!             ▼                      ▼
//!           Idle                  Scanning ──finish──► Idle
//! ```
//!
//! Escape or right-click while `Selecting` returns to `Idle`. `Scanning`
//! cannot be cancelled: the capture is already in flight.
//!
//! The machine is pure; the agent applies its results to the page.

use crate::geometry::{Point, Region};

// ============================================================================
// Types
// ============================================================================

/// Mouse button, by DOM `MouseEvent.button` index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Button 0.
    Primary,
    /// Button 1.
    Auxiliary,
    /// Button 2.
    Secondary,
    /// Any other button.
    Other(u16),
}

impl PointerButton {
    /// Maps a DOM button index.
    #[must_use]
    pub fn from_index(index: u16) -> Self {
        match index {
            0 => Self::Primary,
            1 => Self::Auxiliary,
            2 => Self::Secondary,
            other => Self::Other(other),
        }
    }
}

/// Gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    /// Overlay shown. `drag_start` is set while the primary button is held.
    Selecting { drag_start: Option<Point> },
    /// Region confirmed, capture in flight.
    Scanning,
}

/// What a pointer-up did to the gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerUp {
    /// Not selecting, or not the primary button.
    Ignored,
    /// Region too small or no drag in progress; gesture ended.
    Cancelled,
    /// Region accepted; a capture must be requested for it.
    Confirmed(Region),
}

// ============================================================================
// SelectionMachine
// ============================================================================

/// One frame's selection gesture.
#[derive(Debug, Clone)]
pub struct SelectionMachine {
    state: SelectionState,
    min_size: f64,
}

impl SelectionMachine {
    #[must_use]
    pub fn new(min_size: f64) -> Self {
        Self {
            state: SelectionState::Idle,
            min_size,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> SelectionState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn is_selecting(&self) -> bool {
        matches!(self.state, SelectionState::Selecting { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(
            self.state,
            SelectionState::Selecting {
                drag_start: Some(_)
            }
        )
    }

    #[inline]
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == SelectionState::Idle
    }

    /// Starts a gesture. Returns `false` (and changes nothing) unless idle.
    pub fn activate(&mut self) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.state = SelectionState::Selecting { drag_start: None };
        true
    }

    /// Returns the selection box to show while dragging.
    #[must_use]
    pub fn pointer_move(&self, at: Point) -> Option<Region> {
        match self.state {
            SelectionState::Selecting {
                drag_start: Some(start),
            } => Some(Region::spanning(start, at)),
            _ => None,
        }
    }

    /// Records the drag start on a primary press.
    pub fn pointer_down(&mut self, button: PointerButton, at: Point) {
        if button == PointerButton::Primary && self.is_selecting() {
            self.state = SelectionState::Selecting {
                drag_start: Some(at),
            };
        }
    }

    /// Ends the drag on a primary release.
    pub fn pointer_up(&mut self, button: PointerButton, at: Point) -> PointerUp {
        if button != PointerButton::Primary {
            return PointerUp::Ignored;
        }

        let SelectionState::Selecting { drag_start } = self.state else {
            return PointerUp::Ignored;
        };

        match drag_start.map(|start| Region::spanning(start, at)) {
            Some(region) if region.exceeds(self.min_size) => {
                self.state = SelectionState::Scanning;
                PointerUp::Confirmed(region)
            }
            _ => {
                self.state = SelectionState::Idle;
                PointerUp::Cancelled
            }
        }
    }

    /// Cancels a gesture in progress. Returns `true` if one was cancelled.
    pub fn cancel(&mut self) -> bool {
        if !self.is_selecting() {
            return false;
        }
        self.state = SelectionState::Idle;
        true
    }

    /// Ends the scan phase.
    pub fn finish_scan(&mut self) {
        if self.state == SelectionState::Scanning {
            self.state = SelectionState::Idle;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
