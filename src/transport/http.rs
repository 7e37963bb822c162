//! HTTP transport backed by reqwest

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Method;

use super::{HttpReply, HttpRequest, HttpTransport, TransportConfig};
use crate::schema::HttpMethod;

/// Transport that sends requests over the network
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl ReqwestTransport {
    pub fn new(config: TransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .use_rustls_tls()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    /// Create with custom reqwest client (for custom TLS or proxies)
    pub fn with_client(client: reqwest::Client, config: TransportConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn header_map(request: &HttpRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid header name '{name}'"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header '{name}'"))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn issue(&mut self, request: &HttpRequest) -> Result<HttpReply> {
        let mut builder = self
            .client
            .request(method(request.method), &request.url)
            .headers(Self::header_map(request)?);
        if request.has_body() {
            builder = builder.json(&request.body);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to send {request}"))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body of {request}"))?;

        Ok(HttpReply { status, body })
    }

    fn transport_type(&self) -> &'static str {
        "http"
    }
}
