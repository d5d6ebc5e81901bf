//! Downstream forwarding.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode, header};
use thiserror::Error;

/// A request captured at the gateway edge, ready to be relayed.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyRequest {
    /// Creates a request with no query, headers, or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// True when relaying the request again cannot cause a second side
    /// effect downstream.
    pub fn is_idempotent_read(&self) -> bool {
        matches!(self.method, Method::GET | Method::HEAD)
    }
}

/// The downstream's answer, relayed unchanged to the caller.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Transport-level forwarding failures.
///
/// A downstream that answers with an error status is not a failure here;
/// its response is relayed as-is.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// No answer within the route's deadline.
    #[error("downstream timed out")]
    Timeout,

    /// TCP-level failure: refused, reset, unreachable.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other transport error.
    #[error("transport error: {0}")]
    Other(String),
}

impl ForwardError {
    /// Transient failures are safe to retry for idempotent reads.
    pub fn is_transient(&self) -> bool {
        matches!(self, ForwardError::Timeout | ForwardError::Connect(_))
    }
}

/// A hop to a downstream service.
#[async_trait]
pub trait Downstream: Send + Sync {
    /// Sends the request to `target` (scheme://host:port) with the given
    /// deadline and returns the raw response.
    async fn send(
        &self,
        target: &str,
        request: &ProxyRequest,
        timeout: Duration,
    ) -> Result<ProxyResponse, ForwardError>;
}

/// HTTP forwarding over a shared connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpDownstream {
    client: reqwest::Client,
}

impl HttpDownstream {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_err(err: reqwest::Error) -> ForwardError {
        if err.is_timeout() {
            ForwardError::Timeout
        } else if err.is_connect() {
            ForwardError::Connect(err.to_string())
        } else {
            ForwardError::Other(err.to_string())
        }
    }
}

/// Headers owned by each hop rather than relayed end-to-end.
fn is_hop_header(name: &header::HeaderName) -> bool {
    *name == header::HOST
        || *name == header::CONNECTION
        || *name == header::CONTENT_LENGTH
        || *name == header::TRANSFER_ENCODING
        || *name == header::UPGRADE
}

#[async_trait]
impl Downstream for HttpDownstream {
    async fn send(
        &self,
        target: &str,
        request: &ProxyRequest,
        timeout: Duration,
    ) -> Result<ProxyResponse, ForwardError> {
        let mut url = format!("{}{}", target, request.path);
        if let Some(query) = &request.query {
            url.push('?');
            url.push_str(query);
        }

        let mut headers = HeaderMap::new();
        for (name, value) in request.headers.iter() {
            if !is_hop_header(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        let response = self
            .client
            .request(request.method.clone(), &url)
            .timeout(timeout)
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await
            .map_err(Self::map_err)?;

        let status = response.status();
        let mut headers = response.headers().clone();
        for name in [header::CONTENT_LENGTH, header::TRANSFER_ENCODING] {
            headers.remove(name);
        }
        let body = response.bytes().await.map_err(Self::map_err)?;

        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_idempotent_writes_are_not() {
        assert!(ProxyRequest::new(Method::GET, "/api/orders").is_idempotent_read());
        assert!(ProxyRequest::new(Method::HEAD, "/api/orders").is_idempotent_read());
        assert!(!ProxyRequest::new(Method::POST, "/api/orders").is_idempotent_read());
        assert!(!ProxyRequest::new(Method::PUT, "/api/orders/1/status").is_idempotent_read());
        assert!(!ProxyRequest::new(Method::DELETE, "/api/orders/1").is_idempotent_read());
    }

    #[test]
    fn timeout_and_connect_failures_are_transient() {
        assert!(ForwardError::Timeout.is_transient());
        assert!(ForwardError::Connect("refused".into()).is_transient());
        assert!(!ForwardError::Other("bad body".into()).is_transient());
    }

    #[test]
    fn hop_headers_are_recognized() {
        assert!(is_hop_header(&header::HOST));
        assert!(is_hop_header(&header::CONTENT_LENGTH));
        assert!(!is_hop_header(&header::ACCEPT));
        assert!(!is_hop_header(&header::AUTHORIZATION));
    }
}
