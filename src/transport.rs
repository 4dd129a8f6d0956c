//! HTTP transport layer.
//!
//! The transport moves bytes and reports what the wire said; status
//! interpretation, timeout racing and envelope handling belong to the
//! request executor.

use crate::error::{KnowledgeError, KnowledgeResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use http::{HeaderMap, Method};
use reqwest::Client;
use std::pin::Pin;
use url::Url;

/// Raw byte stream handed to the streaming decoder
pub type ByteStream = Pin<Box<dyn Stream<Item = KnowledgeResult<Bytes>> + Send>>;

/// Fully-read response from a non-streaming exchange
#[derive(Debug)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Complete response body
    pub body: Bytes,
}

/// Response metadata plus the unconsumed body stream.
///
/// Ownership of stream consumption passes to the caller.
pub struct StreamingResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// The raw, unread body
    pub stream: ByteStream,
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("stream", &"<unread>")
            .finish()
    }
}

/// HTTP transport abstraction for testability
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute one exchange and read the body to completion
    async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> KnowledgeResult<TransportResponse>;

    /// Execute one exchange, returning the body unread
    async fn send_streaming(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> KnowledgeResult<StreamingResponse>;
}

/// Reqwest-based transport implementation
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build the underlying client. No client-level timeout: the
    /// executor races each exchange against its own timer.
    pub fn new() -> KnowledgeResult<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(20)
            .build()
            .map_err(|e| {
                KnowledgeError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    fn build_request(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> reqwest::RequestBuilder {
        let mut request = self.client.request(
            reqwest::Method::from_bytes(method.as_str().as_bytes())
                .unwrap_or(reqwest::Method::POST),
            url.as_str(),
        );
        for (name, value) in headers.iter() {
            request = request.header(name.as_str(), value.as_bytes());
        }
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }
        request
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> KnowledgeResult<TransportResponse> {
        let response = self.build_request(method, url, headers, body).send().await?;

        let status = response.status().as_u16();
        let mut response_headers = HeaderMap::new();
        for (name, value) in response.headers().iter() {
            if let (Ok(name), Ok(value)) = (
                http::header::HeaderName::from_bytes(name.as_str().as_bytes()),
                http::header::HeaderValue::from_bytes(value.as_bytes()),
            ) {
                response_headers.insert(name, value);
            }
        }
        let body = response.bytes().await?;

        Ok(TransportResponse {
            status,
            headers: response_headers,
            body,
        })
    }

    async fn send_streaming(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> KnowledgeResult<StreamingResponse> {
        let response = self.build_request(method, url, headers, body).send().await?;

        let status = response.status().as_u16();
        let mut response_headers = HeaderMap::new();
        for (name, value) in response.headers().iter() {
            if let (Ok(name), Ok(value)) = (
                http::header::HeaderName::from_bytes(name.as_str().as_bytes()),
                http::header::HeaderValue::from_bytes(value.as_bytes()),
            ) {
                response_headers.insert(name, value);
            }
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(KnowledgeError::from));

        Ok(StreamingResponse {
            status,
            headers: response_headers,
            stream: Box::pin(stream),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_builds() {
        assert!(ReqwestTransport::new().is_ok());
    }

    #[test]
    fn streaming_response_debug_elides_the_body() {
        let response = StreamingResponse {
            status: 200,
            headers: HeaderMap::new(),
            stream: Box::pin(futures::stream::empty()),
        };
        let text = format!("{:?}", response);
        assert!(text.contains("status: 200"));
        assert!(text.contains("<unread>"));
    }
}
