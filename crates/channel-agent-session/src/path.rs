//! Push/pull over the reliable and datagram transports.

use std::time::Duration;

use async_trait::async_trait;
use channel_agent_core::{
    DatagramTransport, EventMessageRequest, EventMessageResult, HttpMethod, MessageReceiveRequest,
    MessageTransport, RequestTransport, TransportError, UdpAction, UdpEnvelope,
    codec::{pull_reply_data, response_data},
};

pub const PUSH_PATH: &str = "/push";
pub const PULL_PATH: &str = "/pull";

/// Which transport an operation travels over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Request/response with delivery confirmation.
    Reliable,
    /// Datagrams; no delivery guarantee.
    Datagram,
}

/// Push and pull as HTTP requests.
pub struct HttpPath<'a, R: ?Sized> {
    requests: &'a R,
    request_timeout: Duration,
    polling_timeout: Duration,
}

impl<'a, R: RequestTransport + ?Sized> HttpPath<'a, R> {
    #[must_use]
    pub const fn new(
        requests: &'a R,
        request_timeout: Duration,
        polling_timeout: Duration,
    ) -> Self {
        Self {
            requests,
            request_timeout,
            polling_timeout,
        }
    }
}

#[async_trait]
impl<'a, R: RequestTransport + ?Sized> MessageTransport for HttpPath<'a, R> {
    async fn push(&self, request: &EventMessageRequest) -> Result<(), TransportError> {
        let body = serde_json::to_value(request)?;
        let result = self
            .requests
            .request(HttpMethod::Post, PUSH_PATH, Some(&body), self.request_timeout)
            .await?;
        if result.is_http_ok() {
            Ok(())
        } else {
            Err(TransportError::Status(result.status_code))
        }
    }

    async fn pull(
        &self,
        request: &MessageReceiveRequest,
    ) -> Result<EventMessageResult, TransportError> {
        let body = serde_json::to_value(request)?;
        let result = self
            .requests
            .request(HttpMethod::Post, PULL_PATH, Some(&body), self.polling_timeout)
            .await?;
        if !result.is_http_ok() {
            return Err(TransportError::Status(result.status_code));
        }
        let json = result.data_as_json();
        let data = response_data(&json).ok_or(TransportError::MissingData)?;
        Ok(EventMessageResult::from_value(data))
    }
}

/// Push and pull as datagrams.
pub struct UdpPath<'a, D: ?Sized> {
    datagrams: &'a D,
    reply_timeout: Duration,
}

impl<'a, D: DatagramTransport + ?Sized> UdpPath<'a, D> {
    #[must_use]
    pub const fn new(datagrams: &'a D, reply_timeout: Duration) -> Self {
        Self {
            datagrams,
            reply_timeout,
        }
    }
}

#[async_trait]
impl<'a, D: DatagramTransport + ?Sized> MessageTransport for UdpPath<'a, D> {
    /// Succeeds once the datagram left the socket. Delivery is unknown.
    async fn push(&self, request: &EventMessageRequest) -> Result<(), TransportError> {
        let envelope = UdpEnvelope::new(UdpAction::Push, request)?;
        self.datagrams.send(&envelope).await
    }

    async fn pull(
        &self,
        request: &MessageReceiveRequest,
    ) -> Result<EventMessageResult, TransportError> {
        let envelope = UdpEnvelope::new(UdpAction::Pull, request)?;
        let reply = self
            .datagrams
            .send_and_wait(&envelope, self.reply_timeout)
            .await?
            .ok_or(TransportError::Timeout)?;
        let data = pull_reply_data(&reply)?;
        Ok(EventMessageResult::from_value(data))
    }
}
