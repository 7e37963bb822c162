//! Transport layer for endpoint calls
//!
//! The runner only sees [`HttpTransport`]: one request in, one status and raw
//! body out. Implementations:
//! - `http` - real calls through `reqwest`
//! - `mock` - scripted replies for tests

pub mod http;
pub mod mock;

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reference::plain_string;
use crate::schema::{HttpMethod, DEFAULT_TIMEOUT_SECS};

pub use http::ReqwestTransport;
pub use mock::MockTransport;

/// Endpoint transport abstraction
#[async_trait]
pub trait HttpTransport: Send {
    /// Issue one request and return the raw reply
    ///
    /// An `Err` means the request never produced an HTTP response.
    async fn issue(&mut self, request: &HttpRequest) -> Result<HttpReply>;

    /// Transport name for logging
    fn transport_type(&self) -> &'static str;
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// A fully resolved request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: Value::Object(Default::default()),
        }
    }

    /// Headers from a resolved header object; null values are left out
    pub fn with_header_object(mut self, header: &Value) -> Self {
        if let Value::Object(map) = header {
            for (name, value) in map {
                if !value.is_null() {
                    self.headers.insert(name.clone(), plain_string(value));
                }
            }
        }
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Whether the body should go on the wire
    pub fn has_body(&self) -> bool {
        !(self.method == HttpMethod::Get && matches!(&self.body, Value::Object(m) if m.is_empty()))
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Status code and undecoded body of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Reply with a JSON body
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Decoded body, if it is JSON
    pub fn decode(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_object_skips_nulls_and_stringifies() {
        let request = HttpRequest::new(HttpMethod::Get, "http://x/y")
            .with_header_object(&json!({"X-Auth-Token": "abc", "X-Id": 7, "X-None": null}));
        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.headers["X-Auth-Token"], "abc");
        assert_eq!(request.headers["X-Id"], "7");
    }

    #[test]
    fn empty_get_has_no_body() {
        assert!(!HttpRequest::new(HttpMethod::Get, "http://x").has_body());
        assert!(HttpRequest::new(HttpMethod::Post, "http://x").has_body());
        assert!(HttpRequest::new(HttpMethod::Get, "http://x")
            .with_body(json!({"q": 1}))
            .has_body());
    }

    #[test]
    fn reply_classes() {
        assert!(HttpReply::new(204, "").is_success());
        assert!(!HttpReply::new(302, "").is_success());
        assert!(HttpReply::new(503, "").is_server_error());
        assert_eq!(HttpReply::new(200, "{\"a\":1}").decode(), Some(json!({"a": 1})));
        assert_eq!(HttpReply::new(200, "").decode(), None);
    }
}
