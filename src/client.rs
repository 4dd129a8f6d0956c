//! Client interface wiring configuration, transport, and services.

use crate::config::KnowledgeConfig;
use crate::credential::CredentialManager;
use crate::error::{KnowledgeError, KnowledgeResult};
use crate::executor::RequestExecutor;
use crate::logging::{LogGate, LogThreshold};
use crate::services::chat::ChatService;
use crate::services::sql::SqlService;
use crate::services::vector::VectorService;
use crate::transport::{HttpTransport, ReqwestTransport};
use std::sync::Arc;

/// Client for the intranet knowledge service.
///
/// Owns one credential lifecycle and one field-whitelist cache; clones of
/// the inner services share both. Construct one per application identity
/// (or obtain one through [`ClientRegistry`](crate::registry::ClientRegistry))
/// and reuse it.
pub struct KnowledgeClient {
    config: Arc<KnowledgeConfig>,
    gate: Arc<LogGate>,
    chat: Arc<ChatService>,
    vector: Arc<VectorService>,
    sql: Option<Arc<SqlService>>,
}

impl KnowledgeClient {
    /// Create a client from configuration with the default HTTP transport.
    pub fn new(config: KnowledgeConfig) -> KnowledgeResult<Self> {
        let transport = Arc::new(ReqwestTransport::new()?) as Arc<dyn HttpTransport>;
        Self::with_transport(config, transport)
    }

    /// Create a client over a caller-supplied transport.
    ///
    /// This is the seam tests use to script exchanges without a network.
    pub fn with_transport(
        config: KnowledgeConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> KnowledgeResult<Self> {
        let config = Arc::new(config);
        let gate = Arc::new(LogGate::new(config.log_threshold, config.log_sink.clone()));
        let executor = Arc::new(RequestExecutor::new(
            transport,
            gate.clone(),
            config.timeout,
        ));

        let credentials = Arc::new(CredentialManager::new(
            executor.clone(),
            gate.clone(),
            &config.base_url,
            config.app_id.clone(),
            config.app_secret.clone(),
            config.max_retry,
        )?);

        let chat = Arc::new(ChatService::new(
            executor.clone(),
            credentials.clone(),
            gate.clone(),
            &config.base_url,
            config.agent_id.clone(),
            config.app_id.clone(),
            config.extend_headers.clone(),
        )?);

        let vector = Arc::new(VectorService::new(
            executor.clone(),
            credentials,
            gate.clone(),
            &config.base_url,
            config.app_id.clone(),
            config.extend_headers.clone(),
        )?);

        let sql = config
            .sql_endpoint
            .clone()
            .map(|endpoint| Arc::new(SqlService::new(executor, gate.clone(), endpoint)));

        Ok(Self {
            config,
            gate,
            chat,
            vector,
            sql,
        })
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    /// Chat completions.
    pub fn chat(&self) -> Arc<ChatService> {
        self.chat.clone()
    }

    /// Vector retrieval.
    pub fn vector(&self) -> Arc<VectorService> {
        self.vector.clone()
    }

    /// Table-API queries. Fails if no `sql_endpoint` was configured.
    pub fn sql(&self) -> KnowledgeResult<Arc<SqlService>> {
        self.sql.clone().ok_or_else(|| {
            KnowledgeError::Configuration("no sql_endpoint configured".to_string())
        })
    }

    /// Retune the log threshold at runtime.
    pub fn set_log_threshold(&self, threshold: impl Into<LogThreshold>) {
        self.gate.set_threshold(threshold.into());
    }

    /// Current log threshold.
    pub fn log_threshold(&self) -> LogThreshold {
        self.gate.threshold()
    }
}

/// Create a client from configuration.
pub fn create_client(config: KnowledgeConfig) -> KnowledgeResult<KnowledgeClient> {
    KnowledgeClient::new(config)
}

/// Create a client from `KNOWLEDGE_*` environment variables.
pub fn create_client_from_env() -> KnowledgeResult<KnowledgeClient> {
    KnowledgeClient::new(KnowledgeConfig::from_env()?)
}
