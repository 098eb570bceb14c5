//! Options for joining a channel.

use channel_agent_core::PollSource;

/// Scope sent with every connect unless overridden.
pub const DEFAULT_API_KEY_SCOPE: &str = "private";

/// What to connect to and as whom.
///
/// A channel is referenced by name and password, by a pre-derived channel
/// id, or both. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    pub channel_name: String,
    /// Cleartext password. Only its hash leaves the process.
    pub channel_password: String,
    pub channel_id: Option<String>,
    pub agent_name: String,
    /// Resume an existing session instead of opening a new one.
    pub session_id: Option<String>,
    pub enable_webrtc_relay: bool,
    /// Defaults to [`DEFAULT_API_KEY_SCOPE`].
    pub api_key_scope: Option<String>,
    /// Becomes the session's default poll source; `AUTO` when unset.
    pub poll_source: Option<PollSource>,
}

impl ConnectOptions {
    /// Options for an agent name with no channel reference yet.
    #[must_use]
    pub fn new<S: Into<String>>(agent_name: S) -> Self {
        Self {
            agent_name: agent_name.into(),
            ..Self::default()
        }
    }

    /// Reference the channel by name and password.
    #[must_use]
    pub fn channel<N: Into<String>, P: Into<String>>(mut self, name: N, password: P) -> Self {
        self.channel_name = name.into();
        self.channel_password = password.into();
        self
    }

    /// Reference the channel by id.
    #[must_use]
    pub fn channel_id<S: Into<String>>(mut self, channel_id: S) -> Self {
        self.channel_id = non_empty(channel_id.into());
        self
    }

    #[must_use]
    pub fn session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = non_empty(session_id.into());
        self
    }

    #[must_use]
    pub const fn webrtc_relay(mut self, enable: bool) -> Self {
        self.enable_webrtc_relay = enable;
        self
    }

    #[must_use]
    pub fn api_key_scope<S: Into<String>>(mut self, scope: S) -> Self {
        self.api_key_scope = non_empty(scope.into());
        self
    }

    #[must_use]
    pub const fn poll_source(mut self, poll_source: PollSource) -> Self {
        self.poll_source = Some(poll_source);
        self
    }

    /// Name and password are both present.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.channel_name.is_empty() && !self.channel_password.is_empty()
    }

    /// Non-empty channel id, if any.
    #[must_use]
    pub fn explicit_channel_id(&self) -> Option<&str> {
        self.channel_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Non-empty resume session id, if any.
    #[must_use]
    pub fn resume_session_id(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|id| !id.is_empty())
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let options = ConnectOptions::new("agent-1")
            .channel("test-room", "password123")
            .session_id("S0")
            .webrtc_relay(true)
            .poll_source(PollSource::Kafka);
        assert!(options.has_credentials());
        assert_eq!(options.explicit_channel_id(), None);
        assert_eq!(options.resume_session_id(), Some("S0"));
        assert!(options.enable_webrtc_relay);
        assert_eq!(options.poll_source, Some(PollSource::Kafka));
    }

    #[test]
    fn test_empty_values_are_absent() {
        let options = ConnectOptions::new("agent-1")
            .channel("test-room", "")
            .channel_id("")
            .session_id("")
            .api_key_scope("");
        assert!(!options.has_credentials());
        assert_eq!(options.channel_id, None);
        assert_eq!(options.session_id, None);
        assert_eq!(options.api_key_scope, None);

        let options = ConnectOptions {
            channel_id: Some(String::new()),
            ..ConnectOptions::new("agent-1")
        };
        assert_eq!(options.explicit_channel_id(), None);
    }
}
