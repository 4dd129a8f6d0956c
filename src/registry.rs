//! Client registry keyed by configuration identity.
//!
//! Callers that would otherwise reach for a process-wide client share
//! instances through an explicit registry owned by the composition root.
//! A hit reuses the existing client (and so its credential lifecycle and
//! field cache), retuning only its log threshold.

use crate::client::KnowledgeClient;
use crate::config::KnowledgeConfig;
use crate::error::KnowledgeResult;
use crate::transport::HttpTransport;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Identity under which clients are shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    base_url: String,
    app_id: String,
    agent_id: String,
}

impl ClientKey {
    /// Derive the sharing key from a configuration.
    pub fn of(config: &KnowledgeConfig) -> Self {
        Self {
            base_url: config.base_url.to_string(),
            app_id: config.app_id.clone(),
            agent_id: config.agent_id.clone(),
        }
    }
}

/// Registry of clients, one per configuration identity.
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ClientKey, Arc<KnowledgeClient>>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the client for this configuration, constructing it on
    /// first use. A hit keeps the existing client's credential and
    /// field-cache state and applies the incoming log threshold.
    pub fn obtain(&self, config: KnowledgeConfig) -> KnowledgeResult<Arc<KnowledgeClient>> {
        self.obtain_via(config, KnowledgeClient::new)
    }

    /// Like [`obtain`](Self::obtain), but constructing misses over the
    /// given transport.
    pub fn obtain_with_transport(
        &self,
        config: KnowledgeConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> KnowledgeResult<Arc<KnowledgeClient>> {
        self.obtain_via(config, move |config| {
            KnowledgeClient::with_transport(config, transport)
        })
    }

    /// Number of distinct clients currently held.
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    /// Whether the registry holds no clients.
    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }

    fn obtain_via<F>(
        &self,
        config: KnowledgeConfig,
        construct: F,
    ) -> KnowledgeResult<Arc<KnowledgeClient>>
    where
        F: FnOnce(KnowledgeConfig) -> KnowledgeResult<KnowledgeClient>,
    {
        let key = ClientKey::of(&config);
        if let Some(existing) = self.clients.lock().get(&key) {
            existing.set_log_threshold(config.log_threshold);
            return Ok(existing.clone());
        }

        // Construction happens outside the lock; a racing duplicate is
        // resolved by keeping whichever client landed first.
        let client = Arc::new(construct(config)?);
        let mut clients = self.clients.lock();
        let entry = clients.entry(key).or_insert(client);
        Ok(entry.clone())
    }
}
