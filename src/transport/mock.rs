//! Mock transport for testing
//!
//! Replies come from a handler closure (or a queue of canned replies) and every
//! request is captured for assertions. Clones share state, so a test can keep
//! one handle while the runner owns another.

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{HttpReply, HttpRequest, HttpTransport};

type Handler = Arc<dyn Fn(&HttpRequest) -> Result<HttpReply> + Send + Sync>;

/// Scripted transport
#[derive(Clone)]
pub struct MockTransport {
    /// Replies used before the handler is consulted
    queued: Arc<Mutex<VecDeque<Result<HttpReply, String>>>>,
    handler: Handler,
    sent: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    /// Transport that answers every request with 200 and an empty object
    pub fn new() -> Self {
        Self::with_handler(|_| Ok(HttpReply::new(200, "{}")))
    }

    /// Transport answering each request with `handler`
    pub fn with_handler(
        handler: impl Fn(&HttpRequest) -> Result<HttpReply> + Send + Sync + 'static,
    ) -> Self {
        Self {
            queued: Arc::new(Mutex::new(VecDeque::new())),
            handler: Arc::new(handler),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a reply to be returned by the next request
    pub async fn queue_reply(&self, reply: HttpReply) {
        self.queued.lock().await.push_back(Ok(reply));
    }

    /// Queue a transport failure for the next request
    pub async fn queue_failure(&self, message: impl Into<String>) {
        self.queued.lock().await.push_back(Err(message.into()));
    }

    /// All requests issued so far
    pub async fn sent_requests(&self) -> Vec<HttpRequest> {
        self.sent.lock().await.clone()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn issue(&mut self, request: &HttpRequest) -> Result<HttpReply> {
        self.sent.lock().await.push(request.clone());

        match self.queued.lock().await.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => (self.handler)(request),
        }
    }

    fn transport_type(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::HttpMethod;
    use serde_json::json;

    #[tokio::test]
    async fn default_replies_ok() {
        let mut transport = MockTransport::new();
        let reply = transport
            .issue(&HttpRequest::new(HttpMethod::Get, "http://api/x"))
            .await
            .unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.decode(), Some(json!({})));
    }

    #[tokio::test]
    async fn handler_sees_request() {
        let mut transport = MockTransport::with_handler(|req| {
            let status = if req.body["age"].as_i64().unwrap_or(0) >= 18 {
                201
            } else {
                400
            };
            Ok(HttpReply::new(status, "{}"))
        });

        let adult = HttpRequest::new(HttpMethod::Post, "http://api/users").with_body(json!({"age": 30}));
        let minor = HttpRequest::new(HttpMethod::Post, "http://api/users").with_body(json!({"age": 3}));
        assert_eq!(transport.issue(&adult).await.unwrap().status, 201);
        assert_eq!(transport.issue(&minor).await.unwrap().status, 400);
    }

    #[tokio::test]
    async fn queued_replies_come_first() {
        let mut transport = MockTransport::new();
        transport.queue_reply(HttpReply::new(500, "")).await;
        transport.queue_failure("connection refused").await;

        let request = HttpRequest::new(HttpMethod::Delete, "http://api/users/1");
        assert_eq!(transport.issue(&request).await.unwrap().status, 500);
        let err = transport.issue(&request).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(transport.issue(&request).await.unwrap().status, 200);
    }

    #[tokio::test]
    async fn clones_share_captured_requests() {
        let handle = MockTransport::new();
        let mut owned = handle.clone();
        owned
            .issue(&HttpRequest::new(HttpMethod::Put, "http://api/a"))
            .await
            .unwrap();

        let sent = handle.sent_requests().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "http://api/a");

        handle.clear_sent().await;
        assert!(owned.sent_requests().await.is_empty());
        assert_eq!(owned.transport_type(), "mock");
    }
}
