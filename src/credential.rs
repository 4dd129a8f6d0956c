//! Short-lived appKey acquisition and renewal.
//!
//! The manager owns the credential exclusively: a refresh either fully
//! replaces key and expiry or leaves the prior value untouched. Concurrent
//! callers of [`CredentialManager::ensure_key`] are coalesced onto one
//! in-flight refresh via a [`Shared`] future, so exactly one network
//! exchange happens per refresh cycle and every waiter observes the same
//! outcome.

use crate::error::{KnowledgeError, KnowledgeResult};
use crate::executor::RequestExecutor;
use crate::logging::{mask_app_id, mask_key, LogGate};
use futures::future::{BoxFuture, FutureExt, Shared};
use http::{HeaderMap, Method};
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// How long an issued appKey is trusted locally. A safety margin under
/// the nominal 600-second server-side TTL.
pub const KEY_VALIDITY: Duration = Duration::from_millis(570_000);

/// Linear backoff step between acquisition attempts
pub const RETRY_BACKOFF_STEP: Duration = Duration::from_millis(500);

/// Path of the appKey exchange endpoint
const GENERATE_APP_KEY_PATH: &str = "knowledgeService/extSecret/generateAppKey";

/// An issued credential. Never partially written.
#[derive(Debug, Clone)]
pub struct Credential {
    app_key: String,
    expires_at: Instant,
}

impl Credential {
    fn issue(app_key: String) -> Self {
        Self {
            app_key,
            expires_at: Instant::now() + KEY_VALIDITY,
        }
    }

    /// The appKey value
    pub fn key(&self) -> &str {
        &self.app_key
    }

    /// Whether the key is still inside its validity window
    pub fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

type RefreshFuture = Shared<BoxFuture<'static, KnowledgeResult<Credential>>>;

#[derive(Default)]
struct CredentialState {
    credential: Option<Credential>,
    inflight: Option<RefreshFuture>,
}

/// Acquires, caches and transparently renews the appKey.
pub struct CredentialManager {
    executor: Arc<RequestExecutor>,
    gate: Arc<LogGate>,
    endpoint: Url,
    app_id: String,
    app_secret: SecretString,
    max_retry: u32,
    state: Arc<Mutex<CredentialState>>,
}

impl CredentialManager {
    /// Create a manager for the given application identity
    pub fn new(
        executor: Arc<RequestExecutor>,
        gate: Arc<LogGate>,
        base_url: &Url,
        app_id: String,
        app_secret: SecretString,
        max_retry: u32,
    ) -> KnowledgeResult<Self> {
        Ok(Self {
            executor,
            gate,
            endpoint: base_url.join(GENERATE_APP_KEY_PATH)?,
            app_id,
            app_secret,
            max_retry,
            state: Arc::new(Mutex::new(CredentialState::default())),
        })
    }

    /// Return a valid appKey, refreshing if necessary.
    ///
    /// If a refresh is already in flight the caller awaits it instead of
    /// issuing a second exchange; a cached unexpired key returns with no
    /// network call.
    pub async fn ensure_key(&self) -> KnowledgeResult<String> {
        let refresh = {
            let mut state = self.state.lock();
            if let Some(inflight) = &state.inflight {
                inflight.clone()
            } else {
                if let Some(credential) = &state.credential {
                    if credential.is_valid() {
                        return Ok(credential.app_key.clone());
                    }
                }
                let refresh = self.start_refresh();
                state.inflight = Some(refresh.clone());
                refresh
            }
        };

        refresh.await.map(|credential| credential.app_key)
    }

    /// Build the shared refresh future. The in-flight slot is cleared
    /// inside the future, success or failure, before it settles, so the
    /// next caller starts fresh instead of replaying a resolved attempt.
    fn start_refresh(&self) -> RefreshFuture {
        let executor = self.executor.clone();
        let gate = self.gate.clone();
        let endpoint = self.endpoint.clone();
        let app_id = self.app_id.clone();
        let app_secret = self.app_secret.expose_secret().clone();
        let max_retry = self.max_retry;
        let state = self.state.clone();

        async move {
            let outcome =
                acquire_with_retry(&executor, &gate, endpoint, &app_id, &app_secret, max_retry)
                    .await;

            let mut state = state.lock();
            state.inflight = None;
            match outcome {
                Ok(app_key) => {
                    let credential = Credential::issue(app_key);
                    gate.info(&format!(
                        "appKey acquired for {}: {}",
                        mask_app_id(&app_id),
                        mask_key(credential.key())
                    ));
                    state.credential = Some(credential.clone());
                    Ok(credential)
                }
                Err(error) => Err(error),
            }
        }
        .boxed()
        .shared()
    }

    #[cfg(test)]
    fn inject_credential(&self, app_key: &str, expires_at: Instant) {
        self.state.lock().credential = Some(Credential {
            app_key: app_key.to_string(),
            expires_at,
        });
    }
}

/// One full acquisition cycle: an initial attempt plus up to `max_retry`
/// retries with linearly increasing backoff (500ms x attempt number).
async fn acquire_with_retry(
    executor: &RequestExecutor,
    gate: &LogGate,
    endpoint: Url,
    app_id: &str,
    app_secret: &str,
    max_retry: u32,
) -> KnowledgeResult<String> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match acquire_once(executor, endpoint.clone(), app_id, app_secret).await {
            Ok(app_key) => return Ok(app_key),
            Err(error) => {
                if attempt > max_retry {
                    return Err(KnowledgeError::Credential(error.to_string()));
                }
                let delay = RETRY_BACKOFF_STEP * attempt;
                gate.warn(&format!(
                    "appKey acquisition attempt {} failed ({}); retrying in {}ms",
                    attempt,
                    error,
                    delay.as_millis()
                ));
                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn acquire_once(
    executor: &RequestExecutor,
    endpoint: Url,
    app_id: &str,
    app_secret: &str,
) -> KnowledgeResult<String> {
    let mut headers = HeaderMap::new();
    headers.insert(
        "content-type",
        http::header::HeaderValue::from_static("application/json"),
    );

    let body = json!({ "appId": app_id, "appSecret": app_secret });
    let payload = executor
        .execute_envelope(Method::POST, endpoint, headers, Some(&body))
        .await?;

    payload
        .get("appKey")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            KnowledgeError::Serialization(format!("envelope payload missing appKey: {}", payload))
        })
}
