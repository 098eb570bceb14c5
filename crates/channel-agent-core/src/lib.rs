//! Core abstractions for channel messaging agents.
//!
//! This crate provides the building blocks shared by the transports and the
//! session tracker:
//! - `security` - Channel secret, password hash and channel id derivation
//! - `models` / `requests` - Typed events, offsets and request bodies
//! - `codec` - Lenient decoding of service responses
//! - `UdpEnvelope` - Datagram action + payload wrapper
//! - Transport traits

pub mod codec;
pub mod context;
pub mod envelope;
pub mod models;
pub mod requests;
pub mod security;
pub mod traits;

pub use context::{AgentContext, RUST_AGENT_TYPE};
pub use envelope::{UdpAction, UdpEnvelope};
pub use models::{
    AgentInfo, BROADCAST, ConnectResponse, DEFAULT_RECEIVE_LIMIT, EventMessage,
    EventMessageResult, EventType, PollSource, ReceiveConfig, UNSET_OFFSET,
};
pub use requests::{
    ConnectRequest, CreateChannelRequest, EventMessageRequest, MessageReceiveRequest,
    SessionRequest,
};
pub use traits::{
    DatagramTransport, HttpMethod, HttpResult, MessageTransport, RequestTransport,
    TransportError,
};
