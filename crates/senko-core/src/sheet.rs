//! Action sheet bound to one rendered turn.
//!
//! The sheet slides up when a turn is tapped and offers edit, delete, rewind and "show all
//! code". It closes on a backdrop tap, cancel, Escape, any action, or a downward drag past the
//! dismissal threshold.
//!
//! Phases: `Opening -> Open <-> Dragging`, and any of them to closed. The closing slide is
//! purely visual and collapses into an immediate close here. `Opening` accepts dismissals and
//! actions just like `Open`, so nothing depends on the slide-in timing.
//!
//! Event handlers return a [`SheetUpdate`]; the owner applies the transition and dispatches
//! the chosen action.

use crate::history::TurnId;

/// Downward drag distance (pixels) beyond which releasing dismisses the sheet.
pub const DEFAULT_DISMISS_THRESHOLD: f32 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SheetPhase {
    /// Sliding in.
    Opening,
    Open,
    /// Handle held. `offset` is always recomputed from `start_y`, never accumulated.
    Dragging { start_y: f32, offset: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetAction {
    Edit,
    Delete,
    Rewind,
    /// Expand or collapse every code block of the target turn.
    ToggleCode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SheetEvent {
    /// The slide-in finished.
    Settled,
    /// Pointer down on the drag handle.
    DragStart { y: f32 },
    DragMove { y: f32 },
    DragEnd { y: f32 },
    Backdrop,
    Cancel,
    Escape,
    Choose(SheetAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetTransition {
    Stay,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetUpdate {
    pub transition: SheetTransition,
    /// Action to dispatch once the sheet is closed.
    pub action: Option<SheetAction>,
}

impl SheetUpdate {
    pub fn stay() -> Self {
        Self {
            transition: SheetTransition::Stay,
            action: None,
        }
    }

    pub fn close() -> Self {
        Self {
            transition: SheetTransition::Close,
            action: None,
        }
    }

    pub fn close_with(action: SheetAction) -> Self {
        Self {
            transition: SheetTransition::Close,
            action: Some(action),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetSession {
    target: TurnId,
    phase: SheetPhase,
    dismiss_threshold: f32,
}

impl SheetSession {
    pub fn open(target: TurnId, dismiss_threshold: f32) -> Self {
        Self {
            target,
            phase: SheetPhase::Opening,
            dismiss_threshold,
        }
    }

    pub fn target(&self) -> TurnId {
        self.target
    }

    pub fn phase(&self) -> SheetPhase {
        self.phase
    }

    /// Current downward drag offset; zero unless dragging.
    pub fn offset(&self) -> f32 {
        match self.phase {
            SheetPhase::Dragging { offset, .. } => offset,
            SheetPhase::Opening | SheetPhase::Open => 0.0,
        }
    }

    pub fn handle_event(&mut self, event: SheetEvent) -> SheetUpdate {
        match (self.phase, event) {
            (SheetPhase::Opening, SheetEvent::Settled) => {
                self.phase = SheetPhase::Open;
                SheetUpdate::stay()
            }
            (SheetPhase::Open, SheetEvent::DragStart { y }) => {
                self.phase = SheetPhase::Dragging {
                    start_y: y,
                    offset: 0.0,
                };
                SheetUpdate::stay()
            }
            (SheetPhase::Dragging { start_y, .. }, SheetEvent::DragMove { y }) => {
                self.phase = SheetPhase::Dragging {
                    start_y,
                    offset: drag_offset(start_y, y),
                };
                SheetUpdate::stay()
            }
            (SheetPhase::Dragging { start_y, .. }, SheetEvent::DragEnd { y }) => {
                // Strictly greater: a release exactly on the threshold snaps back.
                if drag_offset(start_y, y) > self.dismiss_threshold {
                    SheetUpdate::close()
                } else {
                    self.phase = SheetPhase::Open;
                    SheetUpdate::stay()
                }
            }
            (_, SheetEvent::Backdrop | SheetEvent::Cancel | SheetEvent::Escape) => {
                SheetUpdate::close()
            }
            (SheetPhase::Opening | SheetPhase::Open, SheetEvent::Choose(action)) => {
                SheetUpdate::close_with(action)
            }
            _ => SheetUpdate::stay(),
        }
    }
}

/// Offset below the drag origin; upward drags clamp to zero.
fn drag_offset(start_y: f32, y: f32) -> f32 {
    (y - start_y).max(0.0)
}
