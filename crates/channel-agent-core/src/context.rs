//! Agent context metadata sent with every connect.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Agent type tag reported by this client.
pub const RUST_AGENT_TYPE: &str = "RUST-AGENT";

/// Identifying metadata for the connecting client implementation.
///
/// Serializes as a flat string map: `agentType`, `descriptor`, then any
/// extra metadata the application adds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContext {
    /// Client implementation tag, e.g. `RUST-AGENT`.
    pub agent_type: String,

    /// Implementation descriptor string.
    pub descriptor: String,

    /// Arbitrary metadata for app-specific needs.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, String>,
}

impl AgentContext {
    /// Create a context with just the identifying fields.
    #[must_use]
    pub fn new(agent_type: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            descriptor: descriptor.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Get a metadata value by key.
    #[must_use]
    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Set a metadata value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }
}
