//! Model backends.
//!
//! A backend answers one chat request with one reply. There is no streaming, no retry and no
//! cancellation; the chat session decides what a failure means for the conversation.

mod echo;
mod openai;

use std::fmt;

use anyhow::{Result, bail};
pub use echo::Echo;
pub use openai::OpenAiCompatible;
use serde::Serialize;

use crate::config::{Config, RequestConfig};
use crate::history::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl From<Sender> for Role {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => Role::User,
            Sender::Assistant => Role::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    /// System prompt first, then the context window in conversation order.
    pub messages: Vec<ChatMessage>,
    pub params: RequestConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The endpoint rejected the API key (HTTP 401).
    Unauthorized,
    /// HTTP 429.
    RateLimited,
    /// The requested model does not exist or is no longer served.
    ModelNotFound(String),
    /// Any other non-success status.
    Status { code: u16, body: String },
    /// The request never produced a response.
    Transport(String),
    /// The response could not be understood.
    Malformed(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Unauthorized => write!(f, "API key was rejected"),
            BackendError::RateLimited => write!(f, "rate limited"),
            BackendError::ModelNotFound(model) => write!(f, "model not found: {model}"),
            BackendError::Status { code, body } if body.is_empty() => write!(f, "HTTP {code}"),
            BackendError::Status { code, body } => write!(f, "HTTP {code}: {body}"),
            BackendError::Transport(msg) => write!(f, "transport error: {msg}"),
            BackendError::Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Answers a chat request with the assistant's reply text.
pub trait ChatBackend {
    fn complete(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;
}

/// Backend picked at runtime.
#[derive(Debug)]
pub enum Backend {
    OpenAi(OpenAiCompatible),
    Echo(Echo),
}

impl Backend {
    /// Builds the configured HTTP backend, or the echo backend when `offline`.
    pub fn from_config(config: &Config, offline: bool) -> Result<Self> {
        if offline {
            return Ok(Backend::Echo(Echo));
        }
        let Some(api_key) = config.api_key() else {
            bail!(
                "No API key found. Set {} or run with --offline.",
                config.api_key_env
            );
        };
        Ok(Backend::OpenAi(OpenAiCompatible::new(
            config.base_url.clone(),
            api_key,
        )))
    }
}

impl ChatBackend for Backend {
    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError> {
        match self {
            Backend::OpenAi(backend) => backend.complete(request).await,
            Backend::Echo(backend) => backend.complete(request).await,
        }
    }
}
