//! Mutation controller.
//!
//! Owns the interaction session (`Idle`, `Editing` or an open action `Sheet`) and turns user
//! choices into history mutations through [`Conversation`]. While an edit is open the
//! controller is busy: delete, rewind and opening a sheet are refused.
//!
//! Every operation returns an [`Outcome`]. Refusals are ordinary values, never errors; the
//! caller decides whether to show anything.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::conversation::Conversation;
use crate::history::TurnId;
use crate::markup;
use crate::sheet::{SheetAction, SheetEvent, SheetSession, SheetTransition};
use crate::view::RenderSurface;

/// How a target turn is located in the history when a mutation is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lookup {
    /// Stable turn identifier.
    #[default]
    Id,
    /// First turn whose normalized content matches the displayed text. Ambiguous when two
    /// turns read the same; kept for compatibility with older front-ends.
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmKind {
    Delete,
    Rewind,
    Clear,
}

impl ConfirmKind {
    pub fn prompt(self) -> &'static str {
        match self {
            ConfirmKind::Delete => "Are you sure you want to delete this message?",
            ConfirmKind::Rewind => {
                "This will delete all messages after this point and continue from here. Are you sure?"
            }
            ConfirmKind::Clear => "Are you sure you want to clear the conversation?",
        }
    }
}

/// Yes/no confirmation for destructive operations. Answering no leaves everything untouched.
pub trait Confirm {
    fn confirm(&mut self, kind: ConfirmKind) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(ConfirmKind) -> bool,
{
    fn confirm(&mut self, kind: ConfirmKind) -> bool {
        self(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    target: TurnId,
    original: String,
}

impl EditSession {
    pub fn target(&self) -> TurnId {
        self.target
    }

    /// Content before editing; what the editable surface is pre-filled with.
    pub fn original(&self) -> &str {
        &self.original
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    Idle,
    Editing(EditSession),
    Sheet(SheetSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// An edit is in progress.
    Busy,
    /// The user answered no.
    Declined,
    /// The target could not be located in the history.
    NotFound,
    /// The edited content was blank.
    EmptyContent,
    /// No matching session is open.
    NoSession,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Busy => write!(f, "an edit is in progress"),
            Rejection::Declined => write!(f, "cancelled"),
            Rejection::NotFound => write!(f, "message not found"),
            Rejection::EmptyContent => write!(f, "message cannot be empty"),
            Rejection::NoSession => write!(f, "nothing to act on"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    SheetOpened,
    SheetClosed,
    /// The sheet consumed the event and stays open.
    SheetUnchanged,
    EditStarted,
    Edited,
    EditCancelled,
    Deleted,
    Rewound { discarded: usize },
    CodeToggled { expanded: bool },
    /// The whole conversation was cleared.
    Cleared,
    Rejected(Rejection),
}

impl Outcome {
    pub fn is_rejected(self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }
}

#[derive(Debug)]
pub struct Controller {
    session: Session,
    lookup: Lookup,
    dismiss_threshold: f32,
    expanded_code: HashSet<TurnId>,
}

impl Controller {
    pub fn new(lookup: Lookup, dismiss_threshold: f32) -> Self {
        Self {
            session: Session::Idle,
            lookup,
            dismiss_threshold,
            expanded_code: HashSet::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn lookup(&self) -> Lookup {
        self.lookup
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.session, Session::Editing(_))
    }

    pub fn edit_session(&self) -> Option<&EditSession> {
        match &self.session {
            Session::Editing(edit) => Some(edit),
            _ => None,
        }
    }

    pub fn sheet(&self) -> Option<&SheetSession> {
        match &self.session {
            Session::Sheet(sheet) => Some(sheet),
            _ => None,
        }
    }

    /// Drops any open session and expansion state. Used when the whole history is replaced.
    pub fn reset(&mut self) {
        self.session = Session::Idle;
        self.expanded_code.clear();
    }

    /// Opens the action sheet on a visible turn, force-closing a sheet that is already open.
    pub fn open_sheet<S: RenderSurface>(
        &mut self,
        target: TurnId,
        conversation: &Conversation<S>,
    ) -> Outcome {
        if self.is_busy() {
            return Outcome::Rejected(Rejection::Busy);
        }
        if !conversation
            .history()
            .by_id(target)
            .is_some_and(|turn| !turn.is_hidden())
        {
            return Outcome::Rejected(Rejection::NotFound);
        }
        if let Some(previous) = self.sheet() {
            debug!(previous = %previous.target(), "force-closing open sheet");
        }
        self.session = Session::Sheet(SheetSession::open(target, self.dismiss_threshold));
        debug!(%target, "sheet opened");
        Outcome::SheetOpened
    }

    pub fn close_sheet(&mut self) -> Outcome {
        if self.sheet().is_none() {
            return Outcome::Rejected(Rejection::NoSession);
        }
        self.session = Session::Idle;
        Outcome::SheetClosed
    }

    /// Feeds a gesture to the open sheet and dispatches the chosen action once it closes.
    pub fn handle_sheet_event<S: RenderSurface>(
        &mut self,
        event: SheetEvent,
        conversation: &mut Conversation<S>,
        confirm: &mut dyn Confirm,
    ) -> Outcome {
        let Session::Sheet(sheet) = &mut self.session else {
            return Outcome::Rejected(Rejection::NoSession);
        };
        let target = sheet.target();
        let update = sheet.handle_event(event);
        match update.transition {
            SheetTransition::Stay => Outcome::SheetUnchanged,
            SheetTransition::Close => {
                self.session = Session::Idle;
                match update.action {
                    None => Outcome::SheetClosed,
                    Some(action) => self.dispatch(action, target, conversation, confirm),
                }
            }
        }
    }

    fn dispatch<S: RenderSurface>(
        &mut self,
        action: SheetAction,
        target: TurnId,
        conversation: &mut Conversation<S>,
        confirm: &mut dyn Confirm,
    ) -> Outcome {
        match action {
            SheetAction::Edit => self.begin_edit(target, conversation),
            SheetAction::Delete => self.delete(target, conversation, confirm),
            SheetAction::Rewind => self.rewind(target, conversation, confirm),
            SheetAction::ToggleCode => self.toggle_code(target, conversation),
        }
    }

    pub fn begin_edit<S: RenderSurface>(
        &mut self,
        target: TurnId,
        conversation: &Conversation<S>,
    ) -> Outcome {
        if self.is_busy() {
            return Outcome::Rejected(Rejection::Busy);
        }
        let Some(turn) = conversation.history().by_id(target) else {
            return Outcome::Rejected(Rejection::NotFound);
        };
        self.session = Session::Editing(EditSession {
            target,
            original: turn.content().to_string(),
        });
        debug!(%target, "edit started");
        Outcome::EditStarted
    }

    /// Applies the edited content. Blank content keeps the edit open.
    pub fn commit_edit<S: RenderSurface>(
        &mut self,
        new_content: &str,
        conversation: &mut Conversation<S>,
    ) -> Outcome {
        let Session::Editing(edit) = &self.session else {
            return Outcome::Rejected(Rejection::NoSession);
        };
        if new_content.trim().is_empty() {
            return Outcome::Rejected(Rejection::EmptyContent);
        }
        let index = match self.lookup {
            Lookup::Id => conversation.history().position(edit.target),
            Lookup::Content => conversation
                .history()
                .find_index_by_normalized_content(&edit.original),
        };
        let target = edit.target;
        self.session = Session::Idle;

        let Some(index) = index else {
            warn!(%target, lookup = ?self.lookup, "edit target not found in history");
            return Outcome::Rejected(Rejection::NotFound);
        };
        if conversation.edit(index, new_content) {
            Outcome::Edited
        } else {
            Outcome::Rejected(Rejection::NotFound)
        }
    }

    pub fn cancel_edit(&mut self) -> Outcome {
        if self.edit_session().is_none() {
            return Outcome::Rejected(Rejection::NoSession);
        }
        self.session = Session::Idle;
        Outcome::EditCancelled
    }

    pub fn delete<S: RenderSurface>(
        &mut self,
        target: TurnId,
        conversation: &mut Conversation<S>,
        confirm: &mut dyn Confirm,
    ) -> Outcome {
        if self.is_busy() {
            return Outcome::Rejected(Rejection::Busy);
        }
        if !confirm.confirm(ConfirmKind::Delete) {
            return Outcome::Rejected(Rejection::Declined);
        }
        self.session = Session::Idle;
        let Some(index) = self.resolve(target, conversation) else {
            warn!(%target, lookup = ?self.lookup, "delete target not found in history");
            return Outcome::Rejected(Rejection::NotFound);
        };
        match conversation.delete(index) {
            Some(removed) => {
                self.expanded_code.remove(&removed.id());
                Outcome::Deleted
            }
            None => Outcome::Rejected(Rejection::NotFound),
        }
    }

    /// Discards every turn after the target. The target itself stays.
    pub fn rewind<S: RenderSurface>(
        &mut self,
        target: TurnId,
        conversation: &mut Conversation<S>,
        confirm: &mut dyn Confirm,
    ) -> Outcome {
        if self.is_busy() {
            return Outcome::Rejected(Rejection::Busy);
        }
        if !confirm.confirm(ConfirmKind::Rewind) {
            return Outcome::Rejected(Rejection::Declined);
        }
        self.session = Session::Idle;
        let Some(index) = self.resolve(target, conversation) else {
            warn!(%target, lookup = ?self.lookup, "rewind target not found in history");
            return Outcome::Rejected(Rejection::NotFound);
        };
        let discarded = conversation.truncate_after(index);
        let history = conversation.history();
        self.expanded_code.retain(|id| history.position(*id).is_some());
        info!(index, discarded, "rewound conversation");
        Outcome::Rewound { discarded }
    }

    pub fn toggle_code<S: RenderSurface>(
        &mut self,
        target: TurnId,
        conversation: &mut Conversation<S>,
    ) -> Outcome {
        if conversation.history().by_id(target).is_none() {
            return Outcome::Rejected(Rejection::NotFound);
        }
        let expanded = if self.expanded_code.remove(&target) {
            false
        } else {
            self.expanded_code.insert(target);
            true
        };
        conversation.set_code_expanded(target, expanded);
        Outcome::CodeToggled { expanded }
    }

    fn resolve<S: RenderSurface>(
        &self,
        target: TurnId,
        conversation: &Conversation<S>,
    ) -> Option<usize> {
        let history = conversation.history();
        match self.lookup {
            Lookup::Id => history.position(target),
            Lookup::Content => {
                let rendered = markup::render(history.by_id(target)?.content());
                history.find_index_by_normalized_content(&markup::visible_text(&rendered))
            }
        }
    }
}
