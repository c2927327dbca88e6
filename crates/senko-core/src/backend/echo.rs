//! Offline backend that answers without any network access.

use super::{BackendError, ChatBackend, ChatRequest, Role};

/// Replies by quoting the latest user message back.
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

impl Echo {
    pub fn reply_to(request: &ChatRequest) -> String {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map_or("", |message| message.content.as_str());
        format!("*tilts head* You said: {last_user}")
    }
}

impl ChatBackend for Echo {
    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError> {
        Ok(Self::reply_to(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChatMessage;
    use crate::config::RequestConfig;

    #[tokio::test]
    async fn echoes_last_user_message() {
        let request = ChatRequest {
            model: "echo".to_string(),
            messages: vec![
                ChatMessage::new(Role::System, "persona"),
                ChatMessage::new(Role::User, "first"),
                ChatMessage::new(Role::Assistant, "reply"),
                ChatMessage::new(Role::User, "second"),
            ],
            params: RequestConfig::default(),
        };
        assert_eq!(
            Echo.complete(&request).await.unwrap(),
            "*tilts head* You said: second"
        );
    }
}
