//! Transports for talking to the messaging service.
//!
//! Provides:
//! - `HttpClient` - Reliable JSON request/response over HTTP
//! - `UdpClient` - Fire-and-forget and single-reply datagrams
//! - `ClientConfig` - Service URL, API key and datagram endpoint resolution

pub mod config;
pub mod http;
pub mod udp;

pub use config::{
    API_KEY_HEADER, ClientConfig, ConfigError, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_UDP_PORT, POLLING_TIMEOUT, UDP_REPLY_TIMEOUT,
};
pub use http::HttpClient;
pub use udp::UdpClient;
