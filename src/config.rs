//! Configuration for the knowledge-service client

use crate::error::{KnowledgeError, KnowledgeResult};
use crate::logging::{LogSink, LogThreshold, TracingSink};
use secrecy::SecretString;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default request timeout in milliseconds (5 minutes)
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;

/// Default number of additional credential acquisition attempts
pub const DEFAULT_MAX_RETRY: u32 = 3;

/// Required prefix for custom pass-through headers
pub const EXTEND_HEADER_PREFIX: &str = "ext-";

/// Configuration for the knowledge-service client.
///
/// Every recognized option is an explicit field with an explicit default;
/// validation happens once, in [`KnowledgeConfigBuilder::build`].
#[derive(Clone)]
pub struct KnowledgeConfig {
    /// Base URL of the knowledge service; must use an encrypted scheme
    pub base_url: Url,

    /// Application identifier presented on every call
    pub app_id: String,

    /// Application secret exchanged for short-lived appKeys
    pub app_secret: SecretString,

    /// Target agent identifier for chat completions
    pub agent_id: String,

    /// Wall-clock bound on one HTTP exchange
    pub timeout: Duration,

    /// Custom pass-through headers; every key is `ext-` prefixed
    pub extend_headers: HashMap<String, String>,

    /// Fixed-host table-API endpoint for the SQL path, if enabled
    pub sql_endpoint: Option<Url>,

    /// Resolved logging threshold
    pub log_threshold: LogThreshold,

    /// Additional credential refresh attempts after the first failure
    pub max_retry: u32,

    /// Sink receiving filtered log lines
    pub log_sink: Arc<dyn LogSink>,
}

impl fmt::Debug for KnowledgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeConfig")
            .field("base_url", &self.base_url.as_str())
            .field("app_id", &self.app_id)
            .field("app_secret", &"SecretString([REDACTED])")
            .field("agent_id", &self.agent_id)
            .field("timeout", &self.timeout)
            .field("extend_headers", &self.extend_headers)
            .field("sql_endpoint", &self.sql_endpoint.as_ref().map(Url::as_str))
            .field("log_threshold", &self.log_threshold)
            .field("max_retry", &self.max_retry)
            .finish()
    }
}

impl KnowledgeConfig {
    /// Start building a configuration
    pub fn builder() -> KnowledgeConfigBuilder {
        KnowledgeConfigBuilder::default()
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `KNOWLEDGE_BASE_URL`, `KNOWLEDGE_APP_ID`,
    /// `KNOWLEDGE_APP_SECRET` and `KNOWLEDGE_AGENT_ID`; optional
    /// `KNOWLEDGE_TIMEOUT_MS`, `KNOWLEDGE_LOG_LEVEL`,
    /// `KNOWLEDGE_SQL_ENDPOINT`.
    pub fn from_env() -> KnowledgeResult<Self> {
        let required = |name: &str| {
            std::env::var(name).map_err(|_| {
                KnowledgeError::Configuration(format!("{} environment variable not set", name))
            })
        };

        let mut builder = Self::builder()
            .base_url(required("KNOWLEDGE_BASE_URL")?)
            .app_id(required("KNOWLEDGE_APP_ID")?)
            .app_secret(SecretString::new(required("KNOWLEDGE_APP_SECRET")?))
            .agent_id(required("KNOWLEDGE_AGENT_ID")?);

        if let Ok(timeout) = std::env::var("KNOWLEDGE_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse::<u64>() {
                builder = builder.timeout_ms(ms);
            }
        }
        if let Ok(level) = std::env::var("KNOWLEDGE_LOG_LEVEL") {
            builder = builder.log_threshold(LogThreshold::from_name(&level));
        }
        if let Ok(endpoint) = std::env::var("KNOWLEDGE_SQL_ENDPOINT") {
            builder = builder.sql_endpoint(endpoint);
        }

        builder.build()
    }
}

/// Builder for [`KnowledgeConfig`]
#[derive(Default)]
pub struct KnowledgeConfigBuilder {
    base_url: Option<String>,
    app_id: Option<String>,
    app_secret: Option<SecretString>,
    agent_id: Option<String>,
    timeout_ms: Option<u64>,
    extend_headers: HashMap<String, String>,
    sql_endpoint: Option<String>,
    log_threshold: Option<LogThreshold>,
    max_retry: Option<u32>,
    log_sink: Option<Arc<dyn LogSink>>,
}

impl KnowledgeConfigBuilder {
    /// Set the service base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the application identifier
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Set the application secret
    pub fn app_secret(mut self, app_secret: SecretString) -> Self {
        self.app_secret = Some(app_secret);
        self
    }

    /// Set the target agent identifier
    pub fn agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Set the request timeout in milliseconds
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Add a custom pass-through header (key must be `ext-` prefixed)
    pub fn extend_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extend_headers.insert(key.into(), value.into());
        self
    }

    /// Set the table-API endpoint for the SQL path
    pub fn sql_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.sql_endpoint = Some(endpoint.into());
        self
    }

    /// Set the logging threshold
    pub fn log_threshold(mut self, threshold: impl Into<LogThreshold>) -> Self {
        self.log_threshold = Some(threshold.into());
        self
    }

    /// Set the number of additional credential acquisition attempts
    pub fn max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = Some(max_retry);
        self
    }

    /// Inject a log sink (defaults to the tracing-backed sink)
    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Validate and produce the configuration.
    ///
    /// Fails on a missing required option, a non-encrypted base URL
    /// scheme, or a custom header key without the `ext-` prefix.
    pub fn build(self) -> KnowledgeResult<KnowledgeConfig> {
        let base_url = self
            .base_url
            .ok_or_else(|| KnowledgeError::Configuration("base_url is required".to_string()))?;
        let base_url = Url::parse(&base_url)?;
        if base_url.scheme() != "https" {
            return Err(KnowledgeError::Configuration(format!(
                "base_url must use an encrypted transport scheme, got '{}'",
                base_url.scheme()
            )));
        }

        for key in self.extend_headers.keys() {
            if !key.starts_with(EXTEND_HEADER_PREFIX) {
                return Err(KnowledgeError::Configuration(format!(
                    "custom header '{}' must be prefixed '{}'",
                    key, EXTEND_HEADER_PREFIX
                )));
            }
        }

        let sql_endpoint = match self.sql_endpoint {
            Some(endpoint) => Some(Url::parse(&endpoint)?),
            None => None,
        };

        Ok(KnowledgeConfig {
            base_url,
            app_id: self
                .app_id
                .ok_or_else(|| KnowledgeError::Configuration("app_id is required".to_string()))?,
            app_secret: self.app_secret.ok_or_else(|| {
                KnowledgeError::Configuration("app_secret is required".to_string())
            })?,
            agent_id: self
                .agent_id
                .ok_or_else(|| KnowledgeError::Configuration("agent_id is required".to_string()))?,
            timeout: Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
            extend_headers: self.extend_headers,
            sql_endpoint,
            log_threshold: self.log_threshold.unwrap_or_default(),
            max_retry: self.max_retry.unwrap_or(DEFAULT_MAX_RETRY),
            log_sink: self.log_sink.unwrap_or_else(|| Arc::new(TracingSink)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> KnowledgeConfigBuilder {
        KnowledgeConfig::builder()
            .base_url("https://kb.intranet.example")
            .app_id("console-admin")
            .app_secret(SecretString::new("s3cret".to_string()))
            .agent_id("agent-42")
    }

    #[test]
    fn builds_with_defaults() {
        let config = base_builder().build().unwrap();
        assert_eq!(config.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(config.max_retry, DEFAULT_MAX_RETRY);
        assert_eq!(config.log_threshold, LogThreshold::INFO);
        assert!(config.sql_endpoint.is_none());
    }

    #[test]
    fn rejects_plaintext_base_url() {
        let err = base_builder()
            .base_url("http://kb.intranet.example")
            .build()
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::Configuration(_)));
        assert!(err.to_string().contains("encrypted"));
    }

    #[test]
    fn rejects_unprefixed_extend_header() {
        let err = base_builder()
            .extend_header("x-trace", "abc")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ext-"));
    }

    #[test]
    fn accepts_prefixed_extend_header() {
        let config = base_builder()
            .extend_header("ext-tenant", "ops")
            .build()
            .unwrap();
        assert_eq!(config.extend_headers["ext-tenant"], "ops");
    }

    #[test]
    fn debug_output_redacts_secret() {
        let config = base_builder().build().unwrap();
        let text = format!("{:?}", config);
        assert!(!text.contains("s3cret"));
        assert!(text.contains("REDACTED"));
    }

    #[test]
    fn threshold_accepts_name_or_number() {
        let by_name = base_builder().log_threshold("debug").build().unwrap();
        assert_eq!(by_name.log_threshold, LogThreshold::from_numeric(4));
        let by_number = base_builder().log_threshold(5u8).build().unwrap();
        assert_eq!(by_number.log_threshold, LogThreshold::VERBOSE);
    }
}
