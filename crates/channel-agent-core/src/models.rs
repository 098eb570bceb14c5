//! Domain types exchanged with the messaging service.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Deserializer, Serialize};

/// Offset sentinel meaning "not set" / "start from the beginning".
pub const UNSET_OFFSET: i64 = -1;

/// Default number of events requested per pull.
pub const DEFAULT_RECEIVE_LIMIT: u32 = 10;

/// Destination that addresses every agent in the channel.
pub const BROADCAST: &str = "*";

/// Event kind.
///
/// Transmitted as its symbolic name. Unknown names decode to
/// [`EventType::ChatText`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    #[default]
    ChatText,
    ChatFile,
    ChatWebrtcSignal,
    GameState,
    GameInput,
    GameSync,
    Custom,
}

impl EventType {
    /// Symbolic wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChatText => "CHAT_TEXT",
            Self::ChatFile => "CHAT_FILE",
            Self::ChatWebrtcSignal => "CHAT_WEBRTC_SIGNAL",
            Self::GameState => "GAME_STATE",
            Self::GameInput => "GAME_INPUT",
            Self::GameSync => "GAME_SYNC",
            Self::Custom => "CUSTOM",
        }
    }

    /// Parse a wire name, falling back to the default kind.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "CHAT_FILE" => Self::ChatFile,
            "CHAT_WEBRTC_SIGNAL" => Self::ChatWebrtcSignal,
            "GAME_STATE" => Self::GameState,
            "GAME_INPUT" => Self::GameInput,
            "GAME_SYNC" => Self::GameSync,
            "CUSTOM" => Self::Custom,
            "CHAT_TEXT" => Self::ChatText,
            other => {
                tracing::debug!("Unknown event type {other:?}, treating as CHAT_TEXT");
                Self::ChatText
            }
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// Backing store hint for pull requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollSource {
    #[default]
    Auto,
    Cache,
    Kafka,
    Database,
}

impl PollSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Cache => "CACHE",
            Self::Kafka => "KAFKA",
            Self::Database => "DATABASE",
        }
    }

    /// Parse a name case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "AUTO" => Some(Self::Auto),
            "CACHE" => Some(Self::Cache),
            "KAFKA" => Some(Self::Kafka),
            "DATABASE" => Some(Self::Database),
            _ => None,
        }
    }
}

impl fmt::Display for PollSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where to resume reading and how much to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveConfig {
    pub global_offset: i64,
    pub local_offset: i64,
    pub limit: u32,
    /// `None` defers to the session's default poll source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_source: Option<PollSource>,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            global_offset: UNSET_OFFSET,
            local_offset: UNSET_OFFSET,
            limit: DEFAULT_RECEIVE_LIMIT,
            poll_source: None,
        }
    }
}

impl ReceiveConfig {
    /// Resume from an explicit offset pair.
    #[must_use]
    pub const fn new(global_offset: i64, local_offset: i64, limit: u32) -> Self {
        Self {
            global_offset,
            local_offset,
            limit,
            poll_source: None,
        }
    }

    /// Pin the poll source for this request.
    #[must_use]
    pub const fn with_poll_source(mut self, poll_source: PollSource) -> Self {
        self.poll_source = Some(poll_source);
        self
    }

    /// Copy the resume offsets of a batch into this config.
    ///
    /// Sentinel offsets are ignored so a failed pull never rewinds the cursor.
    pub const fn advance(&mut self, batch: &EventMessageResult) {
        if batch.global_offset != UNSET_OFFSET {
            self.global_offset = batch.global_offset;
        }
        if batch.local_offset != UNSET_OFFSET {
            self.local_offset = batch.local_offset;
        }
    }
}

/// A single channel event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    pub timestamp: i64,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub content: String,
    pub encrypted: bool,
    /// Short-lived event outside the durable stream.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ephemeral: bool,
    pub global_offset: i64,
    pub local_offset: i64,
}

impl Default for EventMessage {
    fn default() -> Self {
        Self {
            timestamp: 0,
            from: String::new(),
            to: String::new(),
            event_type: EventType::default(),
            content: String::new(),
            encrypted: false,
            ephemeral: false,
            global_offset: UNSET_OFFSET,
            local_offset: UNSET_OFFSET,
        }
    }
}

impl EventMessage {
    /// Whether the event is addressed to every agent.
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.to == BROADCAST
    }
}

/// Result of a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMessageResult {
    /// Durable events in arrival order.
    pub events: Vec<EventMessage>,
    /// Ephemeral events; never affect offsets.
    pub ephemeral_events: Vec<EventMessage>,
    /// Global resume offset, [`UNSET_OFFSET`] when absent.
    pub global_offset: i64,
    /// Local resume offset, [`UNSET_OFFSET`] when absent.
    pub local_offset: i64,
}

impl Default for EventMessageResult {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            ephemeral_events: Vec::new(),
            global_offset: UNSET_OFFSET,
            local_offset: UNSET_OFFSET,
        }
    }
}

impl EventMessageResult {
    /// No durable and no ephemeral events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.ephemeral_events.is_empty()
    }

    /// Both resume offsets are set.
    #[must_use]
    pub const fn has_offsets(&self) -> bool {
        self.global_offset != UNSET_OFFSET && self.local_offset != UNSET_OFFSET
    }
}

/// Description of an agent present in a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    pub agent_name: String,
    pub agent_type: String,
    pub descriptor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// `None` for regular agents, e.g. `observer` or `system` otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Outcome of a connect call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectResponse {
    pub status: String,
    pub session_id: String,
    pub channel_id: String,
    pub global_offset: i64,
    pub local_offset: i64,
    pub message: String,
    /// `status == "success"` and a non-empty session id.
    pub success: bool,
}

impl Default for ConnectResponse {
    fn default() -> Self {
        Self {
            status: String::new(),
            session_id: String::new(),
            channel_id: String::new(),
            global_offset: UNSET_OFFSET,
            local_offset: UNSET_OFFSET,
            message: String::new(),
            success: false,
        }
    }
}

impl ConnectResponse {
    /// A receive config that resumes from the connect offsets.
    #[must_use]
    pub const fn receive_config(&self, limit: u32) -> ReceiveConfig {
        ReceiveConfig::new(self.global_offset, self.local_offset, limit)
    }
}
