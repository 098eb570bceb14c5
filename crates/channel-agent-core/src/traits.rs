//! Transport traits and errors.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::{
    EventMessageRequest, EventMessageResult, MessageReceiveRequest, UdpEnvelope, codec::ReplyError,
};

/// Transport error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Request timed out")]
    Timeout,
    #[error("Transport closed")]
    Closed,
    #[error("Unexpected status code: {0}")]
    Status(u16),
    #[error("Could not resolve {0}")]
    Resolve(String),
    #[error("Missing response data")]
    MissingData,
    #[error("Rejected reply: {0}")]
    Reply(#[from] ReplyError),
}

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        })
    }
}

/// Status code and raw body of a completed request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResult {
    pub status_code: u16,
    pub data: String,
}

impl HttpResult {
    #[must_use]
    pub fn new(status_code: u16, data: impl Into<String>) -> Self {
        Self {
            status_code,
            data: data.into(),
        }
    }

    /// `200 <= status < 300`.
    #[must_use]
    pub const fn is_http_ok(&self) -> bool {
        self.status_code >= 200 && self.status_code < 300
    }

    /// Body as JSON; empty or malformed bodies yield `{}`.
    #[must_use]
    pub fn data_as_json(&self) -> Value {
        if self.data.trim().is_empty() {
            return Value::Object(serde_json::Map::new());
        }
        serde_json::from_str(&self.data).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
    }
}

/// Connection-oriented request/response transport.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    /// Issue a request.
    ///
    /// Any response that arrives is `Ok`, whatever its status. Only failures
    /// to obtain a response (refused, DNS, timeout, closed) are errors.
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        timeout: Duration,
    ) -> Result<HttpResult, TransportError>;

    /// Release underlying resources. Later requests fail with
    /// [`TransportError::Closed`].
    async fn close_all(&self);
}

/// Connectionless datagram transport.
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    /// Send one datagram.
    async fn send(&self, envelope: &UdpEnvelope) -> Result<(), TransportError>;

    /// Send one datagram and wait up to `timeout` for a single reply.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    async fn send_and_wait(
        &self,
        envelope: &UdpEnvelope,
        timeout: Duration,
    ) -> Result<Option<Value>, TransportError>;

    /// Release the socket. Idempotent.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Push/pull capability shared by the reliable and datagram paths.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Push one event payload.
    async fn push(&self, request: &EventMessageRequest) -> Result<(), TransportError>;

    /// Pull a batch of events.
    async fn pull(
        &self,
        request: &MessageReceiveRequest,
    ) -> Result<EventMessageResult, TransportError>;
}
