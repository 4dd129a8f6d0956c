//! Service implementations over the request executor
//!
//! - `chat` - chat completions (streaming and non-streaming)
//! - `vector` - vector retrieval against knowledge bases
//! - `sql` - field-whitelisted queries through the table-API endpoint

use crate::error::{KnowledgeError, KnowledgeResult};
use crate::executor::{HEADER_APP_ID, HEADER_APP_KEY};
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use std::collections::HashMap;

pub mod chat;
pub mod sql;
pub mod vector;

/// Build the header set every credentialed call carries: content type,
/// application identity, the short-lived appKey, and any configured
/// `ext-` pass-through headers.
pub(crate) fn credentialed_headers(
    app_id: &str,
    app_key: &str,
    extend_headers: &HashMap<String, String>,
) -> KnowledgeResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    headers.insert(
        HEADER_APP_ID,
        HeaderValue::from_str(app_id)
            .map_err(|e| KnowledgeError::Configuration(format!("invalid app_id: {}", e)))?,
    );
    headers.insert(
        HEADER_APP_KEY,
        HeaderValue::from_str(app_key)
            .map_err(|e| KnowledgeError::Internal(format!("invalid appKey value: {}", e)))?,
    );
    for (key, value) in extend_headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            KnowledgeError::Configuration(format!("invalid header name '{}': {}", key, e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            KnowledgeError::Configuration(format!("invalid header value for '{}': {}", key, e))
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}
