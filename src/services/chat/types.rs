//! Request and response types for the chat endpoint

use serde::{Deserialize, Serialize};

/// Role of a human turn
pub const ROLE_USER: &str = "user";
/// Role of a model turn
pub const ROLE_ASSISTANT: &str = "assistant";
/// Role of a system instruction
pub const ROLE_SYSTEM: &str = "system";

/// One conversation turn.
///
/// The role is kept as wire text; the console passes arbitrary arrays
/// through, and pre-flight validation is the guard that rejects unknown
/// roles (collecting every violation, not just the first).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// `user`, `assistant` or `system`
    pub role: String,
    /// Turn text; must be non-empty
    pub content: String,
}

impl ChatMessage {
    /// Create a message with the given role
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a user-role message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ROLE_USER, content)
    }

    /// Create an assistant-role message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ROLE_ASSISTANT, content)
    }

    /// Create a system-role message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ROLE_SYSTEM, content)
    }
}

/// Parameters of one chat completion call.
///
/// The target agent and the `stream` flag are supplied by the service,
/// not the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Conversation so far; must end with a user-role message
    pub messages: Vec<ChatMessage>,

    /// Completion budget, 1..=20000
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature, 0.0..=1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling cutoff, 0.0..=1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Presence penalty, 0.0..=1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    /// Frequency penalty, 0.0..=1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
}

impl ChatRequest {
    /// Create a request with only messages set
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: None,
            temperature: None,
            top_p: None,
            presence_penalty: None,
            frequency_penalty: None,
        }
    }

    /// Set the completion budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the nucleus sampling cutoff
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set the presence penalty
    pub fn with_presence_penalty(mut self, presence_penalty: f32) -> Self {
        self.presence_penalty = Some(presence_penalty);
        self
    }

    /// Set the frequency penalty
    pub fn with_frequency_penalty(mut self, frequency_penalty: f32) -> Self {
        self.frequency_penalty = Some(frequency_penalty);
        self
    }
}

/// Non-streaming chat response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletion {
    /// Completion candidates; the service returns one
    pub choices: Vec<ChatChoice>,
}

/// One completion candidate
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// The completed assistant message
    pub message: ChatCompletionMessage,
}

/// Message payload of a completion candidate
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionMessage {
    /// Completion text
    pub content: String,
}

impl ChatCompletion {
    /// Content of the first choice, if any
    pub fn content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}
