//! Render-surface contract.
//!
//! The engine never draws anything itself. Whatever displays the conversation (a terminal,
//! a retained widget tree, a web page bridge) implements [`RenderSurface`] and receives one
//! synchronous notification per history mutation.
//!
//! [`Transcript`] is the headless surface: it keeps the rendered markup of every visible turn
//! in conversation order and is what tests and the CLI build on.

use std::fmt;
use std::ops::Range;

use crate::history::{Sender, Turn, TurnId};
use crate::markup;

/// Status indicator shown next to the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Thinking,
    InvalidApiKey,
    RateLimited,
    ModelNotFound,
    ConnectionError,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Ready => "Ready",
            Status::Thinking => "Thinking...",
            Status::InvalidApiKey => "Invalid API Key",
            Status::RateLimited => "Rate Limited",
            Status::ModelNotFound => "Model not found",
            Status::ConnectionError => "Connection Error",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(
            self,
            Status::InvalidApiKey | Status::ModelNotFound | Status::ConnectionError
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Receives history changes. Every call happens before the mutating operation returns.
pub trait RenderSurface {
    /// A turn was appended at the end of the history.
    fn on_appended(&mut self, turn: &Turn);

    /// The turns at `positions` (history indexes before removal) were removed.
    fn on_removed(&mut self, positions: Range<usize>, turns: &[Turn]);

    /// A turn's content was replaced in place.
    fn on_replaced(&mut self, turn: &Turn);

    fn on_status(&mut self, _status: Status) {}

    fn on_generating(&mut self, _generating: bool) {}

    /// Code blocks of a turn were expanded or collapsed.
    fn on_code_expanded(&mut self, _id: TurnId, _expanded: bool) {}
}

/// One rendered (visible) turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTurn {
    pub id: TurnId,
    pub sender: Sender,
    pub markup: String,
    pub edited: bool,
    pub code_expanded: bool,
}

impl RenderedTurn {
    fn from_turn(turn: &Turn) -> Self {
        Self {
            id: turn.id(),
            sender: turn.sender(),
            markup: markup::render(turn.content()),
            edited: turn.is_edited(),
            code_expanded: false,
        }
    }
}

/// Headless render surface holding the markup of every visible turn.
#[derive(Debug, Default)]
pub struct Transcript {
    rows: Vec<RenderedTurn>,
    status: Option<Status>,
    generating: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[RenderedTurn] {
        &self.rows
    }

    pub fn row(&self, id: TurnId) -> Option<&RenderedTurn> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Text a reader currently sees for a turn (markup stripped).
    pub fn text_of(&self, id: TurnId) -> Option<String> {
        self.row(id).map(|row| markup::visible_text(&row.markup))
    }

    pub fn last(&self) -> Option<&RenderedTurn> {
        self.rows.last()
    }

    pub fn status(&self) -> Option<Status> {
        self.status
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }
}

impl RenderSurface for Transcript {
    fn on_appended(&mut self, turn: &Turn) {
        if !turn.is_hidden() {
            self.rows.push(RenderedTurn::from_turn(turn));
        }
    }

    fn on_removed(&mut self, _positions: Range<usize>, turns: &[Turn]) {
        self.rows
            .retain(|row| !turns.iter().any(|turn| turn.id() == row.id));
    }

    fn on_replaced(&mut self, turn: &Turn) {
        if let Some(row) = self.rows.iter_mut().find(|row| row.id == turn.id()) {
            let code_expanded = row.code_expanded;
            *row = RenderedTurn::from_turn(turn);
            row.code_expanded = code_expanded;
        }
    }

    fn on_status(&mut self, status: Status) {
        self.status = Some(status);
    }

    fn on_generating(&mut self, generating: bool) {
        self.generating = generating;
    }

    fn on_code_expanded(&mut self, id: TurnId, expanded: bool) {
        if let Some(row) = self.rows.iter_mut().find(|row| row.id == id) {
            row.code_expanded = expanded;
        }
    }
}

impl<S: RenderSurface + ?Sized> RenderSurface for &mut S {
    fn on_appended(&mut self, turn: &Turn) {
        (**self).on_appended(turn);
    }

    fn on_removed(&mut self, positions: Range<usize>, turns: &[Turn]) {
        (**self).on_removed(positions, turns);
    }

    fn on_replaced(&mut self, turn: &Turn) {
        (**self).on_replaced(turn);
    }

    fn on_status(&mut self, status: Status) {
        (**self).on_status(status);
    }

    fn on_generating(&mut self, generating: bool) {
        (**self).on_generating(generating);
    }

    fn on_code_expanded(&mut self, id: TurnId, expanded: bool) {
        (**self).on_code_expanded(id, expanded);
    }
}
