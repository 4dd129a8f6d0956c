//! Chat completions against the knowledge service

mod service;
mod stream;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use service::ChatService;
pub use stream::{ChatStream, StreamEvent};
pub use types::{
    ChatChoice, ChatCompletion, ChatCompletionMessage, ChatMessage, ChatRequest, ROLE_ASSISTANT,
    ROLE_SYSTEM, ROLE_USER,
};
pub use validation::validate_chat_request;
