//! Chat request types and OpenAI-compatible wire shapes

use serde::{Deserialize, Serialize};

/// One role/content pair in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Provider-independent chat call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    /// Sent between the system instruction and the user message, in order.
    pub extra: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            extra: Vec::new(),
        }
    }

    pub fn with_extra(mut self, message: ChatMessage) -> Self {
        self.extra.push(message);
        self
    }

    /// Full message list: system, extras, then the user message.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.extra.len() + 2);
        messages.push(ChatMessage::system(self.system.clone()));
        messages.extend(self.extra.iter().cloned());
        messages.push(ChatMessage::user(self.user.clone()));
        messages
    }
}

/// POST body for `/chat/completions`.
#[derive(Clone, Debug, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
}

/// The two reply shapes seen from OpenAI-compatible backends:
/// `choices[0].message.content` (OpenAI, DeepSeek) and `message.content`
/// (Ollama native).
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum CompletionResponse {
    Choices { choices: Vec<Choice> },
    Message { message: ReplyMessage },
}

#[derive(Clone, Debug, Deserialize)]
pub struct Choice {
    pub message: ReplyMessage,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReplyMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Trimmed reply text, if the body carried any.
    pub fn content(&self) -> Option<String> {
        let raw = match self {
            Self::Choices { choices } => choices.first()?.message.content.as_deref()?,
            Self::Message { message } => message.content.as_deref()?,
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}
