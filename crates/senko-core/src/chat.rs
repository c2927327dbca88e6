//! Chat session: the conversation, its controller and the send flow.
//!
//! Sending is split in two synchronous halves around the backend call. `begin_send` appends
//! the user turn and builds the request; `finish_send` appends the reply (or a persona
//! apology) once the call settles. Only one request is in flight at a time, but edits,
//! deletes and rewinds stay available meanwhile. A reply whose conversation was cleared or
//! replaced, or whose user turn was removed, is dropped.

use tracing::{info, warn};

use crate::backend::{BackendError, ChatBackend, ChatMessage, ChatRequest, Role};
use crate::config::Config;
use crate::controller::{Confirm, ConfirmKind, Controller, Outcome, Rejection};
use crate::conversation::Conversation;
use crate::export::Snapshot;
use crate::history::{History, HistoryStats, Sender, Turn, TurnId};
use crate::keymap::Intent;
use crate::sheet::SheetEvent;
use crate::view::{RenderSurface, Status};

const APOLOGY_UNAUTHORIZED: &str =
    "*looks confused* My connection key isn't working. Could you check it for me?";
const APOLOGY_RATE_LIMITED: &str =
    "*stretches paws* I need to rest for a moment due to rate limits. Try again in a bit!";
const APOLOGY_MODEL_NOT_FOUND: &str =
    "*ears droop* The current model seems to be unavailable. Could you pick another one?";
const APOLOGY_CONNECTION: &str =
    "*tail flicks worriedly* I'm having trouble connecting right now. Please try again later.";
const APOLOGY_EMPTY_REPLY: &str = "*tilts head apologetically* I seem to have lost my words for a moment. Could you try asking again?";

/// Persona apology and status shown for a failed request.
pub fn apology_for(error: &BackendError) -> (&'static str, Status) {
    match error {
        BackendError::Unauthorized => (APOLOGY_UNAUTHORIZED, Status::InvalidApiKey),
        BackendError::RateLimited => (APOLOGY_RATE_LIMITED, Status::RateLimited),
        BackendError::ModelNotFound(_) => (APOLOGY_MODEL_NOT_FOUND, Status::ModelNotFound),
        BackendError::Status { .. } | BackendError::Transport(_) | BackendError::Malformed(_) => {
            (APOLOGY_CONNECTION, Status::ConnectionError)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    /// A request is already in flight.
    Generating,
}

impl std::fmt::Display for SendRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendRejected::Generating => write!(f, "still waiting for the previous reply"),
        }
    }
}

impl std::error::Error for SendRejected {}

/// A request started by [`ChatSession::begin_send`] and not yet finished.
#[derive(Debug)]
#[must_use = "a pending send must be finished to clear the generating flag"]
pub struct PendingSend {
    epoch: u64,
    anchor: TurnId,
    request: ChatRequest,
}

impl PendingSend {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }

    /// The user turn this request answers.
    pub fn anchor(&self) -> TurnId {
        self.anchor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Appended(TurnId),
    /// The request failed or came back empty; a persona apology was appended instead.
    Apology { id: TurnId, status: Status },
    /// The conversation moved on while the request was in flight; nothing was appended.
    Stale,
}

pub struct ChatSession<S> {
    conversation: Conversation<S>,
    controller: Controller,
    config: Config,
    model: String,
    generating: bool,
    epoch: u64,
}

impl<S: RenderSurface> ChatSession<S> {
    pub fn new(surface: S, config: Config) -> Self {
        Self {
            conversation: Conversation::new(surface),
            controller: Controller::new(config.lookup, config.sheet.dismiss_threshold),
            model: config.model.clone(),
            config,
            generating: false,
            epoch: 0,
        }
    }

    pub fn conversation(&self) -> &Conversation<S> {
        &self.conversation
    }

    pub fn history(&self) -> &History {
        self.conversation.history()
    }

    pub fn surface(&self) -> &S {
        self.conversation.surface()
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
        info!(model = %self.model, "model switched");
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn stats(&self) -> HistoryStats {
        self.history().stats()
    }

    /// Greets the user on a fresh session. Does nothing once the conversation has turns.
    pub fn start(&mut self) {
        if self.history().is_empty() {
            let welcome = self.config.persona.welcome.clone();
            self.conversation.append(welcome, Sender::Assistant, false);
        }
        self.conversation.set_status(Status::Ready);
    }

    /// Appends the user turn and prepares the request.
    ///
    /// Blank input sends the hidden continue message so the persona keeps talking.
    pub fn begin_send(&mut self, input: &str) -> Result<PendingSend, SendRejected> {
        if self.generating {
            return Err(SendRejected::Generating);
        }
        let trimmed = input.trim();
        let (content, hidden) = if trimmed.is_empty() {
            (self.config.persona.continue_message.clone(), true)
        } else {
            (trimmed.to_string(), false)
        };

        let anchor = self.conversation.append(content, Sender::User, hidden);
        let request = self.build_request();
        self.generating = true;
        self.conversation.set_generating(true);
        self.conversation.set_status(Status::Thinking);
        info!(%anchor, hidden, model = %self.model, "message sent");

        Ok(PendingSend {
            epoch: self.epoch,
            anchor,
            request,
        })
    }

    /// Applies the backend result of a pending send.
    pub fn finish_send(
        &mut self,
        pending: PendingSend,
        result: Result<String, BackendError>,
    ) -> Reply {
        self.generating = false;
        self.conversation.set_generating(false);

        if pending.epoch != self.epoch || self.history().position(pending.anchor).is_none() {
            info!(anchor = %pending.anchor, "dropping reply for a conversation that moved on");
            return Reply::Stale;
        }

        match result {
            Ok(text) if !text.trim().is_empty() => {
                let id = self
                    .conversation
                    .append(text.trim(), Sender::Assistant, false);
                self.conversation.set_status(Status::Ready);
                Reply::Appended(id)
            }
            Ok(_) => {
                let id = self
                    .conversation
                    .append(APOLOGY_EMPTY_REPLY, Sender::Assistant, false);
                self.conversation.set_status(Status::Ready);
                Reply::Apology {
                    id,
                    status: Status::Ready,
                }
            }
            Err(error) => {
                warn!(%error, "completion request failed");
                let (apology, status) = apology_for(&error);
                let id = self
                    .conversation
                    .append(apology, Sender::Assistant, false);
                self.conversation.set_status(status);
                Reply::Apology { id, status }
            }
        }
    }

    /// `begin_send`, the backend call and `finish_send` in one go.
    pub async fn send<B: ChatBackend>(
        &mut self,
        backend: &B,
        input: &str,
    ) -> Result<Reply, SendRejected> {
        let pending = self.begin_send(input)?;
        let result = backend.complete(pending.request()).await;
        Ok(self.finish_send(pending, result))
    }

    fn build_request(&self) -> ChatRequest {
        let mut messages = Vec::with_capacity(self.config.history_limit + 1);
        messages.push(ChatMessage::new(
            Role::System,
            self.config.persona.system_prompt.clone(),
        ));
        // a limit of 0 sends the whole history
        let context = match self.config.history_limit {
            0 => self.history().turns(),
            limit => self.history().recent(limit),
        };
        messages.extend(
            context
                .iter()
                .map(|turn| ChatMessage::new(turn.sender().into(), turn.content())),
        );
        ChatRequest {
            model: self.model.clone(),
            messages,
            params: self.config.request.clone(),
        }
    }

    /// Empties the conversation after confirmation and greets again.
    pub fn clear(&mut self, confirm: &mut dyn Confirm) -> Outcome {
        if !confirm.confirm(ConfirmKind::Clear) {
            return Outcome::Rejected(Rejection::Declined);
        }
        let removed = self.conversation.clear();
        self.controller.reset();
        self.epoch += 1;
        info!(removed, "conversation cleared");
        self.conversation.set_status(Status::Ready);
        let welcome = self.config.persona.welcome_after_clear.clone();
        self.conversation.append(welcome, Sender::Assistant, false);
        Outcome::Cleared
    }

    pub fn export(&self) -> Snapshot {
        Snapshot::capture(self.history(), &self.model)
    }

    /// Replaces the conversation with an imported snapshot.
    pub fn import(&mut self, snapshot: Snapshot) {
        let history = snapshot.into_history();
        info!(turns = history.len(), "history imported");
        self.conversation.replace_history(history);
        self.controller.reset();
        self.epoch += 1;
        self.conversation.set_status(Status::Ready);
    }

    pub fn open_sheet(&mut self, target: TurnId) -> Outcome {
        self.controller.open_sheet(target, &self.conversation)
    }

    pub fn sheet_event(&mut self, event: SheetEvent, confirm: &mut dyn Confirm) -> Outcome {
        self.controller
            .handle_sheet_event(event, &mut self.conversation, confirm)
    }

    pub fn begin_edit(&mut self, target: TurnId) -> Outcome {
        self.controller.begin_edit(target, &self.conversation)
    }

    pub fn commit_edit(&mut self, new_content: &str) -> Outcome {
        self.controller
            .commit_edit(new_content, &mut self.conversation)
    }

    pub fn cancel_edit(&mut self) -> Outcome {
        self.controller.cancel_edit()
    }

    pub fn delete(&mut self, target: TurnId, confirm: &mut dyn Confirm) -> Outcome {
        self.controller
            .delete(target, &mut self.conversation, confirm)
    }

    pub fn rewind(&mut self, target: TurnId, confirm: &mut dyn Confirm) -> Outcome {
        self.controller
            .rewind(target, &mut self.conversation, confirm)
    }

    pub fn toggle_code(&mut self, target: TurnId) -> Outcome {
        self.controller.toggle_code(target, &mut self.conversation)
    }

    /// Runs a keyboard intent. While an edit is open only `Dismiss` does anything: it
    /// cancels the edit.
    pub fn handle_intent(&mut self, intent: Intent, confirm: &mut dyn Confirm) -> Outcome {
        if self.controller.is_busy() {
            return match intent {
                Intent::Dismiss => self.controller.cancel_edit(),
                _ => Outcome::Rejected(Rejection::Busy),
            };
        }

        match intent {
            Intent::EditLast => match self.visible_from_end(0) {
                Some(target) => self.begin_edit(target),
                None => Outcome::Rejected(Rejection::NotFound),
            },
            Intent::DeleteLast => match self.visible_from_end(0) {
                Some(target) => self.delete(target, confirm),
                None => Outcome::Rejected(Rejection::NotFound),
            },
            Intent::RewindToLast => match self.visible_from_end(1) {
                Some(target) => self.rewind(target, confirm),
                None => Outcome::Rejected(Rejection::NotFound),
            },
            Intent::Dismiss => self.controller.close_sheet(),
            Intent::Clear => self.clear(confirm),
        }
    }

    /// Id of the visible turn `back` places from the end (0 is the last one).
    fn visible_from_end(&self, back: usize) -> Option<TurnId> {
        self.history().visible().map(Turn::id).rev().nth(back)
    }
}
