//! Timeout-bounded request execution with redacted diagnostic logging.
//!
//! One [`RequestExecutor`] instance serves every call path (credential
//! refresh, chat, vector retrieval, SQL). It owns correlation ids, the
//! wall-clock timeout race, status normalization and the business
//! envelope, and it logs every failure with id and elapsed time before
//! propagating it.

use crate::error::{KnowledgeError, KnowledgeResult};
use crate::logging::{mask_app_id, mask_key, redact_body, LogGate};
use crate::transport::{HttpTransport, StreamingResponse, TransportResponse};
use bytes::Bytes;
use http::{HeaderMap, Method};
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Header carrying the application identifier
pub const HEADER_APP_ID: &str = "appid";
/// Header carrying the short-lived credential
pub const HEADER_APP_KEY: &str = "appkey";

/// Per-call correlation state; exists only for one exchange
pub struct RequestContext {
    /// Random hex correlation identifier
    pub id: String,
    /// Target endpoint, for log lines
    pub endpoint: String,
    /// When the exchange started
    pub started: Instant,
}

impl RequestContext {
    fn new(endpoint: &Url) -> Self {
        let id: u64 = rand::thread_rng().gen();
        Self {
            id: format!("{:016x}", id),
            endpoint: endpoint.to_string(),
            started: Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}

/// Generic timeout-bounded HTTP exchange primitive
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    gate: Arc<LogGate>,
    timeout: Duration,
}

impl RequestExecutor {
    /// Create an executor over the given transport
    pub fn new(transport: Arc<dyn HttpTransport>, gate: Arc<LogGate>, timeout: Duration) -> Self {
        Self {
            transport,
            gate,
            timeout,
        }
    }

    /// The configured per-exchange timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute one exchange and return the response JSON verbatim.
    ///
    /// Used by the chat endpoint, whose payload is not envelope-wrapped.
    pub async fn execute_json(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> KnowledgeResult<Value> {
        let ctx = RequestContext::new(&url);
        let response = self.exchange_json(&ctx, method, url, headers, body).await?;
        self.parse_json(&ctx, &response.body)
    }

    /// Execute one exchange and unwrap the
    /// `{resultCode, resultMsg, resultObject|data}` envelope.
    pub async fn execute_envelope(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> KnowledgeResult<Value> {
        let ctx = RequestContext::new(&url);
        let response = self.exchange_json(&ctx, method, url, headers, body).await?;
        let value = self.parse_json(&ctx, &response.body)?;
        unwrap_envelope(value).map_err(|e| self.fail(&ctx, e))
    }

    /// Execute one exchange with a url-encoded form body and unwrap the
    /// envelope. Used by the table-API SQL endpoint.
    pub async fn execute_envelope_form(
        &self,
        method: Method,
        url: Url,
        mut headers: HeaderMap,
        form: String,
    ) -> KnowledgeResult<Value> {
        headers.insert(
            "content-type",
            http::header::HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let ctx = RequestContext::new(&url);
        let summary = format!("{} bytes (form)", form.len());
        let verbose = self.gate.verbose_enabled().then(|| form.clone());
        let response = self
            .exchange(
                &ctx,
                method,
                url,
                headers,
                Some(Bytes::from(form)),
                &summary,
                verbose.as_deref(),
            )
            .await?;
        let value = self.parse_json(&ctx, &response.body)?;
        unwrap_envelope(value).map_err(|e| self.fail(&ctx, e))
    }

    /// Execute one exchange and hand back the raw unconsumed byte stream
    /// plus response metadata. The body declared `stream: true`; ownership
    /// of stream consumption passes to the caller.
    pub async fn execute_stream(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> KnowledgeResult<StreamingResponse> {
        let ctx = RequestContext::new(&url);
        let (summary, verbose) = self.describe_json_body(body);
        self.log_outgoing(&ctx, &method, &headers, &summary, verbose.as_deref());

        let payload = self.serialize_body(&ctx, body)?;
        let response = match tokio::time::timeout(
            self.timeout,
            self.transport.send_streaming(method, url, headers, payload),
        )
        .await
        {
            Ok(result) => result.map_err(|e| self.fail(&ctx, e))?,
            Err(_) => return Err(self.fail(&ctx, self.timeout_error())),
        };

        self.gate.debug(&format!(
            "[{}] response status={} redirect={} headers=[{}] (streaming)",
            ctx.id,
            response.status,
            (300..400).contains(&response.status),
            header_names(&response.headers)
        ));

        if !(200..300).contains(&response.status) {
            return Err(self.fail(
                &ctx,
                KnowledgeError::Api {
                    status: response.status,
                },
            ));
        }

        Ok(response)
    }

    async fn exchange_json(
        &self,
        ctx: &RequestContext,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> KnowledgeResult<TransportResponse> {
        let (summary, verbose) = self.describe_json_body(body);
        let payload = self.serialize_body(ctx, body)?;
        self.exchange(ctx, method, url, headers, payload, &summary, verbose.as_deref())
            .await
    }

    /// Core exchange: logs, races the timeout, normalizes the status.
    #[allow(clippy::too_many_arguments)]
    async fn exchange(
        &self,
        ctx: &RequestContext,
        method: Method,
        url: Url,
        headers: HeaderMap,
        payload: Option<Bytes>,
        summary: &str,
        verbose_body: Option<&str>,
    ) -> KnowledgeResult<TransportResponse> {
        self.log_outgoing(ctx, &method, &headers, summary, verbose_body);

        let response = match tokio::time::timeout(
            self.timeout,
            self.transport.send(method, url, headers, payload),
        )
        .await
        {
            Ok(result) => result.map_err(|e| self.fail(ctx, e))?,
            Err(_) => {
                // The racing future is dropped, which aborts the exchange;
                // cancellation is best-effort once a response landed.
                return Err(self.fail(ctx, self.timeout_error()));
            }
        };

        self.gate.debug(&format!(
            "[{}] response status={} redirect={} headers=[{}] bytes={}",
            ctx.id,
            response.status,
            (300..400).contains(&response.status),
            header_names(&response.headers),
            response.body.len()
        ));
        if self.gate.verbose_enabled() {
            self.gate.debug(&format!(
                "[{}] response body: {}",
                ctx.id,
                String::from_utf8_lossy(&response.body)
            ));
        }

        if !(200..300).contains(&response.status) {
            return Err(self.fail(
                ctx,
                KnowledgeError::Api {
                    status: response.status,
                },
            ));
        }

        Ok(response)
    }

    fn timeout_error(&self) -> KnowledgeError {
        KnowledgeError::Timeout {
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }

    fn serialize_body(
        &self,
        ctx: &RequestContext,
        body: Option<&Value>,
    ) -> KnowledgeResult<Option<Bytes>> {
        body.map(|v| {
            serde_json::to_vec(v)
                .map(Bytes::from)
                .map_err(|e| self.fail(ctx, KnowledgeError::from(e)))
        })
        .transpose()
    }

    fn describe_json_body(&self, body: Option<&Value>) -> (String, Option<String>) {
        let summary = match body {
            Some(Value::Object(map)) => format!("{} fields", map.len()),
            Some(_) => "1 value".to_string(),
            None => "empty".to_string(),
        };
        let verbose = match (self.gate.verbose_enabled(), body) {
            (true, Some(body)) => Some(redact_body(body).to_string()),
            _ => None,
        };
        (summary, verbose)
    }

    fn log_outgoing(
        &self,
        ctx: &RequestContext,
        method: &Method,
        headers: &HeaderMap,
        summary: &str,
        verbose_body: Option<&str>,
    ) {
        self.gate.debug(&format!(
            "[{}] {} {} timeout={}ms headers={{{}}} body={}",
            ctx.id,
            method,
            ctx.endpoint,
            self.timeout.as_millis(),
            redact_headers(headers),
            summary
        ));
        if let Some(text) = verbose_body {
            self.gate
                .debug(&format!("[{}] request body: {}", ctx.id, text));
        }
    }

    fn parse_json(&self, ctx: &RequestContext, body: &[u8]) -> KnowledgeResult<Value> {
        serde_json::from_slice(body).map_err(|e| {
            self.fail(
                ctx,
                KnowledgeError::Serialization(format!(
                    "malformed response JSON: {} (body: {})",
                    e,
                    String::from_utf8_lossy(&body[..body.len().min(200)])
                )),
            )
        })
    }

    /// Log a failure with correlation id and elapsed time, then hand the
    /// error back for propagation.
    fn fail(&self, ctx: &RequestContext, error: KnowledgeError) -> KnowledgeError {
        self.gate.error(&format!(
            "[{}] {} failed: {} elapsed={}ms",
            ctx.id,
            ctx.endpoint,
            error,
            ctx.elapsed_ms()
        ));
        error
    }
}

/// Response header names only; values stay out of the logs.
fn header_names(headers: &HeaderMap) -> String {
    headers
        .keys()
        .map(|name| name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a header snapshot with credentials masked.
fn redact_headers(headers: &HeaderMap) -> String {
    let mut parts = Vec::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        let shown = match value.to_str() {
            Ok(text) => match name.as_str() {
                HEADER_APP_ID => mask_app_id(text),
                HEADER_APP_KEY => mask_key(text),
                _ => text.to_string(),
            },
            Err(_) => "<binary>".to_string(),
        };
        parts.push(format!("{}: {}", name, shown));
    }
    parts.join(", ")
}

/// Unwrap a `{resultCode, resultMsg, resultObject|data}` envelope.
///
/// `resultCode` may arrive as a JSON string or number; anything that does
/// not normalize to `"0"` is a service error carrying `resultMsg`.
pub fn unwrap_envelope(value: Value) -> KnowledgeResult<Value> {
    let code = match value.get("resultCode") {
        Some(Value::String(code)) => code.clone(),
        Some(Value::Number(code)) => code.to_string(),
        _ => {
            return Err(KnowledgeError::Serialization(format!(
                "envelope missing resultCode: {}",
                value
            )))
        }
    };

    if code != "0" {
        let message = value
            .get("resultMsg")
            .and_then(Value::as_str)
            .unwrap_or("no message")
            .to_string();
        return Err(KnowledgeError::Envelope { code, message });
    }

    let mut value = value;
    if let Value::Object(map) = &mut value {
        if let Some(payload) = map.remove("resultObject") {
            return Ok(payload);
        }
        if let Some(payload) = map.remove("data") {
            return Ok(payload);
        }
    }
    Ok(Value::Null)
}
