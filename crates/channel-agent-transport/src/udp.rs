//! Connectionless datagram transport.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use channel_agent_core::{DatagramTransport, TransportError, UdpEnvelope};
use serde_json::Value;
use tokio::{net::UdpSocket, sync::Mutex};

/// Largest reply accepted by [`UdpClient::send_and_wait`].
const MAX_DATAGRAM_SIZE: usize = 64 * 1024;

/// Datagram client for the service's UDP endpoint.
///
/// The socket is bound on first use and reused until [`close`] releases
/// it. After that every call fails with [`TransportError::Closed`].
///
/// Replies are not correlated with requests: a reply that arrives after
/// its wait timed out is read by the next wait on the same client.
///
/// [`close`]: DatagramTransport::close
pub struct UdpClient {
    host: String,
    port: u16,
    socket: Mutex<SocketState>,
}

enum SocketState {
    Unbound,
    Open(Arc<UdpSocket>),
    Closed,
}

impl UdpClient {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            socket: Mutex::new(SocketState::Unbound),
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Whether a socket is currently bound.
    pub async fn is_open(&self) -> bool {
        matches!(*self.socket.lock().await, SocketState::Open(_))
    }

    async fn ensure_socket_open(&self) -> Result<Arc<UdpSocket>, TransportError> {
        let mut guard = self.socket.lock().await;
        match *guard {
            SocketState::Open(ref socket) => return Ok(Arc::clone(socket)),
            SocketState::Closed => return Err(TransportError::Closed),
            SocketState::Unbound => {}
        }
        let socket = Arc::new(UdpSocket::bind(("0.0.0.0", 0)).await?);
        tracing::debug!("Bound UDP socket {}", socket.local_addr()?);
        *guard = SocketState::Open(Arc::clone(&socket));
        Ok(socket)
    }

    async fn resolve(&self) -> Result<SocketAddr, TransportError> {
        let target = format!("{}:{}", self.host, self.port);
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| TransportError::Resolve(format!("{target}: {e}")))?
            .find(SocketAddr::is_ipv4)
            .ok_or(TransportError::Resolve(target))
    }

    async fn send_datagram(
        &self,
        envelope: &UdpEnvelope,
    ) -> Result<Arc<UdpSocket>, TransportError> {
        let socket = self.ensure_socket_open().await?;
        let addr = self.resolve().await?;
        let bytes = envelope.to_bytes()?;
        socket.send_to(&bytes, addr).await?;
        tracing::debug!("Sent {} byte {:?} datagram to {addr}", bytes.len(), envelope.action);
        Ok(socket)
    }
}

#[async_trait]
impl DatagramTransport for UdpClient {
    async fn send(&self, envelope: &UdpEnvelope) -> Result<(), TransportError> {
        self.send_datagram(envelope).await.map(|_| ())
    }

    async fn send_and_wait(
        &self,
        envelope: &UdpEnvelope,
        timeout: Duration,
    ) -> Result<Option<Value>, TransportError> {
        let socket = self.send_datagram(envelope).await?;

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let Ok(received) = tokio::time::timeout(timeout, socket.recv_from(&mut buf)).await else {
            tracing::debug!("No datagram reply within {timeout:?}");
            return Ok(None);
        };
        let (len, from) = received?;
        tracing::debug!("Received {len} byte reply from {from}");

        Ok(Some(serde_json::from_slice(&buf[..len])?))
    }

    async fn close(&self) -> Result<(), TransportError> {
        let previous = std::mem::replace(&mut *self.socket.lock().await, SocketState::Closed);
        if matches!(previous, SocketState::Open(_)) {
            tracing::debug!("Closed UDP socket for {}:{}", self.host, self.port);
        }
        Ok(())
    }
}
