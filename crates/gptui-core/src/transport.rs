//! Minimal HTTP transport shared by API clients.
//!
//! Holds the base URL and the request timeout. The timeout applies to
//! regular calls only; streaming calls are long-lived and never get one.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::Serialize;

/// Standard User-Agent header for gptui API requests.
pub const USER_AGENT: &str = concat!("gptui/", env!("CARGO_PKG_VERSION"));

/// Category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Request or read exceeded the configured timeout
    Timeout,
    /// Could not connect to the server
    Connect,
    /// The request could not be built or sent
    Request,
    /// Reading the response body failed
    Body,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::Connect => write!(f, "connect"),
            TransportErrorKind::Request => write!(f, "request"),
            TransportErrorKind::Body => write!(f, "body"),
        }
    }
}

/// Connection-level failure. No HTTP status was (fully) received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::new(TransportErrorKind::Timeout, format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::new(TransportErrorKind::Connect, format!("Connection failed: {e}"))
        } else if e.is_body() || e.is_decode() {
            Self::new(TransportErrorKind::Body, format!("Failed to read response: {e}"))
        } else if e.is_request() || e.is_builder() {
            Self::new(TransportErrorKind::Request, format!("Request error: {e}"))
        } else {
            Self::new(TransportErrorKind::Request, format!("Network error: {e}"))
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransportError {}

/// A single request, relative to the transport's base URL.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    path: String,
    headers: Vec<(&'static str, String)>,
    body: Option<Vec<u8>>,
    streaming: bool,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
            streaming: false,
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Serializes `value` as the JSON body.
    ///
    /// # Errors
    /// Returns an error if `value` cannot be serialized.
    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_vec(value)?);
        Ok(self)
    }

    /// Marks the request as long-lived so the transport timeout is skipped.
    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &[(&'static str, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }
}

/// Status, headers and an unread body.
pub struct HttpResponse {
    inner: reqwest::Response,
}

impl HttpResponse {
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Reads the whole body as text.
    ///
    /// # Errors
    /// Returns an error if the body cannot be read.
    pub async fn text(self) -> Result<String, TransportError> {
        self.inner
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))
    }

    /// Consumes the response as a stream of body chunks.
    pub fn bytes_stream(self) -> impl Stream<Item = Result<Bytes, TransportError>> + Unpin {
        self.inner
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::from_reqwest(&e)))
    }
}

/// HTTP transport with a base URL and an optional timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sends one request. Single attempt, no retries.
    ///
    /// # Errors
    /// Returns an error if the request cannot be sent or no response arrives.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = join_url(&self.base_url, &request.path);
        tracing::debug!(method = %request.method, %url, streaming = request.streaming, "sending request");

        let mut builder = self
            .http
            .request(request.method, &url)
            .header("User-Agent", USER_AGENT);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if !request.streaming
            && let Some(timeout) = self.timeout
        {
            builder = builder.timeout(timeout);
        }

        let inner = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;
        tracing::debug!(status = inner.status().as_u16(), "received response");
        Ok(HttpResponse { inner })
    }
}

/// Joins a base URL and a path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_single_slash() {
        assert_eq!(
            join_url("https://api.openai.com/v1", "/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            join_url("https://api.openai.com/v1/", "chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            join_url("http://localhost:8080//", "//models"),
            "http://localhost:8080/models"
        );
    }

    #[test]
    fn test_join_url_empty_path() {
        assert_eq!(join_url("http://localhost/v1/", ""), "http://localhost/v1");
    }

    #[test]
    fn test_request_builder_options() {
        let request = HttpRequest::post("/chat/completions")
            .header("Authorization", "Bearer sk-test")
            .json(&serde_json::json!({"model": "m"}))
            .unwrap()
            .streaming();

        assert_eq!(request.path(), "/chat/completions");
        assert_eq!(
            request.headers(),
            &[("Authorization", "Bearer sk-test".to_string())]
        );
        assert_eq!(request.body(), Some(br#"{"model":"m"}"#.as_slice()));
        assert!(request.is_streaming());
    }

    #[test]
    fn test_transport_keeps_configuration() {
        let transport = HttpTransport::new("http://localhost:8080/v1")
            .with_timeout(Some(Duration::from_secs(30)));
        assert_eq!(transport.base_url(), "http://localhost:8080/v1");
        assert_eq!(transport.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(HttpTransport::new("x").timeout(), None);
    }

    #[tokio::test]
    async fn test_send_connect_failure_is_classified() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let transport = HttpTransport::new("http://127.0.0.1:9")
            .with_timeout(Some(Duration::from_secs(5)));
        let Err(err) = transport.send(HttpRequest::post("/x")).await else {
            panic!("expected a transport error");
        };
        assert!(matches!(
            err.kind,
            TransportErrorKind::Connect | TransportErrorKind::Timeout | TransportErrorKind::Request
        ));
    }
}
