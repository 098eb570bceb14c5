//! Channel sessions for messaging agents.
//!
//! Provides:
//! - `ChannelSession` - Connect, send/receive, datagram push/pull, disconnect
//! - `ConnectOptions` - Channel reference and agent identity for a connect
//! - `HttpPath` / `UdpPath` - The two push/pull paths behind `MessageTransport`

pub mod manager;
pub mod options;
pub mod path;

pub use manager::{AGENT_DESCRIPTOR, ChannelSession, ConnectError};
pub use options::{ConnectOptions, DEFAULT_API_KEY_SCOPE};
pub use path::{HttpPath, TransportKind, UdpPath};
