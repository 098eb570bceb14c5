//! Outbound request bodies.
//!
//! Field names follow the service's camelCase JSON. Optional identifiers are
//! omitted rather than sent empty.

use serde::Serialize;

use crate::{AgentContext, EventType, ReceiveConfig};

/// Body of `POST /connect`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    /// Hashed channel password, never the cleartext.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_password: Option<String>,
    pub agent_name: String,
    pub agent_context: AgentContext,
    /// Set when resuming an earlier session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub enable_webrtc_relay: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_scope: Option<String>,
}

/// Body of `POST /create-channel`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelRequest {
    pub channel_name: String,
    pub channel_password: String,
}

/// Body of session-scoped calls (`disconnect`, `list-agents`, ...).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_id: String,
}

impl SessionRequest {
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

/// Body of a push, over either transport.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessageRequest {
    pub session_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub to: String,
    pub content: String,
    pub encrypted: bool,
}

/// Body of a pull, over either transport.
///
/// The receive config must carry a resolved poll source by the time it is
/// serialized here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceiveRequest {
    pub session_id: String,
    pub receive_config: ReceiveConfig,
}
