//! Chat service implementation

use super::stream::ChatStream;
use super::types::{ChatCompletion, ChatRequest};
use super::validation::validate_chat_request;
use crate::credential::CredentialManager;
use crate::error::{KnowledgeError, KnowledgeResult};
use crate::executor::RequestExecutor;
use crate::logging::LogGate;
use http::{HeaderMap, Method};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Path of the chat completion endpoint
const CHAT_PATH: &str = "knowledgeService/extChatApi/v2/chat";

/// Chat completions, streaming and non-streaming
pub struct ChatService {
    executor: Arc<RequestExecutor>,
    credentials: Arc<CredentialManager>,
    gate: Arc<LogGate>,
    endpoint: Url,
    agent_id: String,
    app_id: String,
    extend_headers: HashMap<String, String>,
}

impl ChatService {
    /// Wire up the service against the given base URL
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        executor: Arc<RequestExecutor>,
        credentials: Arc<CredentialManager>,
        gate: Arc<LogGate>,
        base_url: &Url,
        agent_id: String,
        app_id: String,
        extend_headers: HashMap<String, String>,
    ) -> KnowledgeResult<Self> {
        Ok(Self {
            executor,
            credentials,
            gate,
            endpoint: base_url.join(CHAT_PATH)?,
            agent_id,
            app_id,
            extend_headers,
        })
    }

    /// Request a completion and wait for the full response.
    pub async fn complete(&self, request: ChatRequest) -> KnowledgeResult<ChatCompletion> {
        validate_chat_request(&request)?;

        let app_key = self.credentials.ensure_key().await?;
        let headers = self.build_headers(&app_key)?;
        let body = self.wire_body(&request, false)?;

        let value = self
            .executor
            .execute_json(Method::POST, self.endpoint.clone(), headers, Some(&body))
            .await?;

        serde_json::from_value::<ChatCompletion>(value.clone()).map_err(|_| {
            KnowledgeError::Serialization(format!("chat response missing content: {}", value))
        })
    }

    /// Request a streaming completion. The returned [`ChatStream`] owns
    /// the unconsumed byte stream.
    pub async fn complete_stream(&self, request: ChatRequest) -> KnowledgeResult<ChatStream> {
        validate_chat_request(&request)?;

        let app_key = self.credentials.ensure_key().await?;
        let headers = self.build_headers(&app_key)?;
        let body = self.wire_body(&request, true)?;

        let response = self
            .executor
            .execute_stream(Method::POST, self.endpoint.clone(), headers, Some(&body))
            .await?;

        Ok(ChatStream::new(response.stream, self.gate.clone()))
    }

    fn wire_body(&self, request: &ChatRequest, stream: bool) -> KnowledgeResult<Value> {
        let mut body = serde_json::to_value(request)?;
        if let Value::Object(map) = &mut body {
            map.insert("agentId".to_string(), json!(self.agent_id));
            map.insert("stream".to_string(), json!(stream));
        }
        Ok(body)
    }

    fn build_headers(&self, app_key: &str) -> KnowledgeResult<HeaderMap> {
        crate::services::credentialed_headers(&self.app_id, app_key, &self.extend_headers)
    }
}
