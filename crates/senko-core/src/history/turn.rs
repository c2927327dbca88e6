use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier assigned to a turn when it is created.
///
/// Identifiers increase monotonically within a session and are never reused, so a render
/// surface can carry them instead of matching turns by text.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TurnId(pub(crate) u64);

impl TurnId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who wrote a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    /// Older exports call the persona "bot".
    #[serde(alias = "bot")]
    Assistant,
}

impl Sender {
    /// Chat-completions role name.
    pub fn role(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.role())
    }
}

/// One conversation entry.
///
/// Content is only replaced through [`super::History::edit`], which also stamps `edited` and
/// `edited_at`; sender, creation time and id never change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    #[serde(default)]
    pub(crate) id: TurnId,
    pub(crate) sender: Sender,
    pub(crate) content: String,
    #[serde(alias = "timestamp")]
    pub(crate) created_at: DateTime<Utc>,
    #[serde(default)]
    pub(crate) hidden: bool,
    #[serde(default)]
    pub(crate) edited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) edited_at: Option<DateTime<Utc>>,
}

impl Turn {
    pub(crate) fn new(id: TurnId, sender: Sender, content: String, hidden: bool) -> Self {
        Self {
            id,
            sender,
            content,
            created_at: Utc::now(),
            hidden,
            edited: false,
            edited_at: None,
        }
    }

    pub fn id(&self) -> TurnId {
        self.id
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    /// Raw (pre-transform) content.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Hidden turns go to the model but are never rendered.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_edited(&self) -> bool {
        self.edited
    }

    pub fn edited_at(&self) -> Option<DateTime<Utc>> {
        self.edited_at
    }
}
