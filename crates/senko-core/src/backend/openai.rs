//! OpenAI-compatible Chat Completions backend (non-streaming).

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BackendError, ChatBackend, ChatMessage, ChatRequest};

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

#[derive(Debug, Clone)]
pub struct OpenAiCompatible {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl OpenAiCompatible {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
    stream: bool,
}

impl<'a> CompletionBody<'a> {
    fn new(request: &'a ChatRequest) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
            top_p: request.params.top_p,
            frequency_penalty: request.params.frequency_penalty,
            presence_penalty: request.params.presence_penalty,
            stream: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatBackend for OpenAiCompatible {
    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let url = format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH);
        debug!(
            %url,
            model = %request.model,
            messages = request.messages.len(),
            "sending completion request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&CompletionBody::new(request))
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), body, &request.model));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Malformed("response has no choices".to_string()))?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Transport(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        BackendError::Transport(format!("Connection failed: {e}"))
    } else {
        BackendError::Transport(format!("Network error: {e}"))
    }
}

fn classify_status(code: u16, body: String, model: &str) -> BackendError {
    let lowered = body.to_lowercase();
    let mentions_missing_model = lowered.contains("model")
        && (lowered.contains("not found") || lowered.contains("does not exist"));
    match code {
        401 => BackendError::Unauthorized,
        429 => BackendError::RateLimited,
        _ if mentions_missing_model => BackendError::ModelNotFound(model.to_string()),
        _ => BackendError::Status { code, body },
    }
}
