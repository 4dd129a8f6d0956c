//! # Intranet Knowledge-Service Client
//!
//! Rust client for the administrative console's intranet knowledge
//! service.
//!
//! ## Features
//!
//! - Chat completions, streaming (`data:` / `info:` line protocol) and
//!   non-streaming
//! - Vector retrieval over knowledge-base slices
//! - Field-whitelisted SQL queries through the table-API endpoint
//! - Transparent appKey lifecycle: single-flight refresh, linear-backoff
//!   retry, cached validity window
//! - Timeout-bounded exchanges with redacted diagnostic logging
//! - Secure credential handling with `SecretString`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_knowledge::{create_client, ChatMessage, ChatRequest, KnowledgeConfig};
//! use secrecy::SecretString;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = KnowledgeConfig::builder()
//!         .base_url("https://kb.intranet.example")
//!         .app_id("console-admin")
//!         .app_secret(SecretString::new("...".to_string()))
//!         .agent_id("agent-42")
//!         .build()?;
//!
//!     let client = create_client(config)?;
//!
//!     let request = ChatRequest::new(vec![ChatMessage::user("How do I reset the VPN?")]);
//!     let completion = client.chat().complete(request).await?;
//!     println!("{}", completion.content().unwrap_or_default());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - `client` - Client interface and factory functions
//! - `registry` - Client sharing keyed by configuration identity
//! - `config` - Configuration types and builder
//! - `credential` - appKey acquisition and renewal
//! - `executor` - Timeout-bounded HTTP exchange primitive
//! - `transport` - HTTP transport layer and byte streaming
//! - `logging` - Level-gated, redaction-aware logging
//! - `error` - Error types and taxonomy
//! - `services` - Chat, vector, and SQL services

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod executor;
pub mod logging;
pub mod registry;
pub mod services;
pub mod transport;

#[cfg(test)]
pub mod mocks;

pub use client::{create_client, create_client_from_env, KnowledgeClient};
pub use config::{KnowledgeConfig, KnowledgeConfigBuilder};
pub use credential::CredentialManager;
pub use error::{KnowledgeError, KnowledgeResult, ValidationError};
pub use logging::{LogGate, LogLevel, LogSink, LogThreshold, TracingSink};
pub use registry::{ClientKey, ClientRegistry};
pub use services::chat::{
    ChatCompletion, ChatMessage, ChatRequest, ChatService, ChatStream, StreamEvent,
};
pub use services::sql::{Condition, SqlResultSet, SqlService, SqlValue};
pub use services::vector::{VectorQuery, VectorResult, VectorService, VectorSlice};
pub use transport::{ByteStream, HttpTransport, StreamingResponse, TransportResponse};
