//! History paired with its render surface.
//!
//! `Conversation` is the only way the rest of the engine mutates history. Each operation
//! changes the in-memory collection in one step and then notifies the surface before
//! returning, so the visible subset of the history and the rendered rows never diverge.

use tracing::debug;

use crate::history::{History, Sender, Turn, TurnId};
use crate::view::{RenderSurface, Status};

pub struct Conversation<S> {
    history: History,
    surface: S,
}

impl<S: RenderSurface> Conversation<S> {
    pub fn new(surface: S) -> Self {
        Self {
            history: History::new(),
            surface,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn append(&mut self, content: impl Into<String>, sender: Sender, hidden: bool) -> TurnId {
        let turn = self.history.append(content, sender, hidden);
        debug!(id = %turn.id(), %sender, hidden, "turn appended");
        self.surface.on_appended(turn);
        turn.id()
    }

    /// Replaces the content at `index`. Returns `false` when the history refused the edit.
    pub fn edit(&mut self, index: usize, new_content: impl Into<String>) -> bool {
        match self.history.edit(index, new_content) {
            Some(turn) => {
                debug!(id = %turn.id(), index, "turn edited");
                self.surface.on_replaced(turn);
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, index: usize) -> Option<Turn> {
        let removed = self.history.delete(index)?;
        debug!(id = %removed.id(), index, "turn deleted");
        self.surface
            .on_removed(index..index + 1, std::slice::from_ref(&removed));
        Some(removed)
    }

    /// Keeps turns `0..=index`; returns how many turns were discarded.
    pub fn truncate_after(&mut self, index: usize) -> usize {
        let discarded = self.history.truncate_after(index);
        if !discarded.is_empty() {
            let start = index + 1;
            debug!(index, count = discarded.len(), "history truncated");
            self.surface
                .on_removed(start..start + discarded.len(), &discarded);
        }
        discarded.len()
    }

    /// Empties the history; returns how many turns were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.history.clear();
        if !removed.is_empty() {
            debug!(count = removed.len(), "history cleared");
            self.surface.on_removed(0..removed.len(), &removed);
        }
        removed.len()
    }

    /// Swaps in a whole history (import), replaying it onto the surface.
    pub fn replace_history(&mut self, history: History) {
        self.clear();
        self.history = history;
        for turn in &self.history {
            self.surface.on_appended(turn);
        }
    }

    pub fn set_status(&mut self, status: Status) {
        self.surface.on_status(status);
    }

    pub fn set_generating(&mut self, generating: bool) {
        self.surface.on_generating(generating);
    }

    pub fn set_code_expanded(&mut self, id: TurnId, expanded: bool) {
        self.surface.on_code_expanded(id, expanded);
    }
}

/// Asserts the rendered rows mirror the visible history, one for one and in order.
#[cfg(test)]
pub(crate) fn assert_in_sync(conversation: &Conversation<crate::view::Transcript>) {
    let visible: Vec<TurnId> = conversation.history().visible().map(Turn::id).collect();
    let rendered: Vec<TurnId> = conversation
        .surface()
        .rows()
        .iter()
        .map(|row| row.id)
        .collect();
    assert_eq!(visible, rendered);
}
