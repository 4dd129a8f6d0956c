//! Mock implementations shared by the unit tests.

use crate::error::{KnowledgeError, KnowledgeResult};
use crate::logging::{LogLevel, LogSink};
use crate::transport::{HttpTransport, StreamingResponse, TransportResponse};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Log sink capturing every delivered line for assertions
pub struct CaptureSink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl CaptureSink {
    /// Create an empty capture sink
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            lines: Mutex::new(Vec::new()),
        })
    }

    /// All captured (level, message) pairs
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().clone()
    }

    /// Messages captured at error level
    pub fn error_lines(&self) -> Vec<String> {
        self.lines_at(LogLevel::Error)
    }

    /// Messages captured at warn level
    pub fn warn_lines(&self) -> Vec<String> {
        self.lines_at(LogLevel::Warn)
    }

    /// Every captured message joined into one haystack
    pub fn all_text(&self) -> String {
        self.lines
            .lock()
            .iter()
            .map(|(_, m)| m.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn lines_at(&self, level: LogLevel) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl LogSink for CaptureSink {
    fn write(&self, level: LogLevel, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}

/// One scripted streaming response
pub struct StreamScript {
    /// HTTP status returned before the body
    pub status: u16,
    /// Body chunks, in order; an `Err` aborts the stream
    pub chunks: Vec<KnowledgeResult<Bytes>>,
}

/// Scripted HTTP transport.
///
/// Responses are consumed front-to-back; a request with nothing scripted
/// fails loudly so tests notice unexpected exchanges.
pub struct MockTransport {
    responses: Mutex<VecDeque<KnowledgeResult<TransportResponse>>>,
    stream_responses: Mutex<VecDeque<StreamScript>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    delay: Option<Duration>,
}

/// A request observed by the mock
#[derive(Clone)]
pub struct RecordedRequest {
    /// HTTP method
    pub method: Method,
    /// Full target URL
    pub url: Url,
    /// Headers as sent
    pub headers: HeaderMap,
    /// Serialized body, if any
    pub body: Option<Bytes>,
}

impl RecordedRequest {
    /// Parse the recorded body as JSON
    pub fn body_json(&self) -> Value {
        self.body
            .as_ref()
            .and_then(|b| serde_json::from_slice(b).ok())
            .unwrap_or(Value::Null)
    }
}

impl MockTransport {
    /// Create a transport with nothing scripted
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            stream_responses: Mutex::new(VecDeque::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Script a 200 response with the given JSON body
    pub fn with_json_response(self, body: Value) -> Self {
        self.with_status_response(200, body)
    }

    /// Script a response with an explicit status
    pub fn with_status_response(self, status: u16, body: Value) -> Self {
        self.responses.lock().push_back(Ok(TransportResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::from(body.to_string()),
        }));
        self
    }

    /// Script a fully-specified response, headers included
    pub fn with_response(self, response: TransportResponse) -> Self {
        self.responses.lock().push_back(Ok(response));
        self
    }

    /// Script a transport-level failure
    pub fn with_error(self, error: KnowledgeError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Sleep before answering any request (for timeout tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Script a 200 streaming response from text chunks
    pub fn with_stream(self, chunks: Vec<&str>) -> Self {
        let chunks = chunks
            .into_iter()
            .map(|c| Ok(Bytes::from(c.to_string())))
            .collect();
        self.with_stream_script(StreamScript { status: 200, chunks })
    }

    /// Script a streaming response in full
    pub fn with_stream_script(self, script: StreamScript) -> Self {
        self.stream_responses.lock().push_back(script);
        self
    }

    /// Requests observed so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Shared handle to the request log, usable after the transport has
    /// been moved into an `Arc<dyn HttpTransport>`
    pub fn request_log(&self) -> Arc<Mutex<Vec<RecordedRequest>>> {
        self.requests.clone()
    }

    fn record(&self, method: Method, url: Url, headers: HeaderMap, body: Option<Bytes>) {
        self.requests.lock().push(RecordedRequest {
            method,
            url,
            headers,
            body,
        });
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> KnowledgeResult<TransportResponse> {
        self.record(method, url, headers, body);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses.lock().pop_front().unwrap_or_else(|| {
            Err(KnowledgeError::Internal(
                "no mock response scripted".to_string(),
            ))
        })
    }

    async fn send_streaming(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> KnowledgeResult<StreamingResponse> {
        self.record(method, url, headers, body);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let script = self.stream_responses.lock().pop_front().ok_or_else(|| {
            KnowledgeError::Internal("no mock stream scripted".to_string())
        })?;

        Ok(StreamingResponse {
            status: script.status,
            headers: HeaderMap::new(),
            stream: Box::pin(futures::stream::iter(script.chunks)),
        })
    }
}
