//! Vector retrieval service

use super::types::{VectorQuery, VectorResult};
use super::validation::validate_vector_query;
use crate::credential::CredentialManager;
use crate::error::{KnowledgeError, KnowledgeResult};
use crate::executor::RequestExecutor;
use crate::logging::LogGate;
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Path of the vector retrieval endpoint
const QUERY_VECTOR_PATH: &str = "knowledgeService/extChatApi/v2/queryVector";

/// Similarity search over indexed knowledge-base slices
pub struct VectorService {
    executor: Arc<RequestExecutor>,
    credentials: Arc<CredentialManager>,
    gate: Arc<LogGate>,
    endpoint: Url,
    app_id: String,
    extend_headers: HashMap<String, String>,
}

impl VectorService {
    /// Wire up the service against the given base URL
    pub(crate) fn new(
        executor: Arc<RequestExecutor>,
        credentials: Arc<CredentialManager>,
        gate: Arc<LogGate>,
        base_url: &Url,
        app_id: String,
        extend_headers: HashMap<String, String>,
    ) -> KnowledgeResult<Self> {
        Ok(Self {
            executor,
            credentials,
            gate,
            endpoint: base_url.join(QUERY_VECTOR_PATH)?,
            app_id,
            extend_headers,
        })
    }

    /// Run a similarity search and return the matching slices.
    pub async fn query(&self, query: VectorQuery) -> KnowledgeResult<VectorResult> {
        validate_vector_query(&query)?;

        let app_key = self.credentials.ensure_key().await?;
        let headers =
            crate::services::credentialed_headers(&self.app_id, &app_key, &self.extend_headers)?;
        let body = serde_json::to_value(&query)?;

        let payload = self
            .executor
            .execute_envelope(Method::POST, self.endpoint.clone(), headers, Some(&body))
            .await?;

        let result: VectorResult = serde_json::from_value(payload.clone()).map_err(|_| {
            KnowledgeError::Serialization(format!("unexpected vector payload: {}", payload))
        })?;
        self.gate.debug(&format!(
            "vector query matched {} slice(s)",
            result.slices.len()
        ));
        Ok(result)
    }
}
