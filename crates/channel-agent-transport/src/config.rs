//! Client configuration and endpoint resolution.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::{HttpClient, UdpClient};
use channel_agent_core::TransportError;

/// Production messaging service.
pub const DEFAULT_API_URL: &str =
    "https://hmdevonline.com/messaging-platform/api/v1/messaging-service";

/// Datagram port used when neither the URL nor an override names one.
pub const DEFAULT_UDP_PORT: u16 = 9999;

/// Header carrying the developer API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Timeout for ordinary requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for connect and pull, which the service may hold open.
pub const POLLING_TIMEOUT: Duration = Duration::from_secs(40);

/// How long a datagram pull waits for its reply.
pub const UDP_REPLY_TIMEOUT: Duration = Duration::from_millis(3000);

pub const ENV_API_URL: &str = "MESSAGING_API_URL";
pub const ENV_API_KEY: &str = "MESSAGING_API_KEY";
pub const ENV_LEGACY_API_KEY: &str = "DEFAULT_API_KEY";
pub const ENV_UDP_PORT: &str = "MESSAGING_UDP_PORT";

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Invalid UDP port: {0}")]
    InvalidPort(String),
}

/// Parse a UDP port override. Accepts `1..=65535`.
///
/// # Errors
/// Returns error if the value is not a port number or is zero.
pub fn parse_port(value: &str) -> Result<u16, ConfigError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort(value.to_string())),
    }
}

/// Messaging client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the messaging service.
    pub remote_url: String,
    /// Developer API key, sent as [`API_KEY_HEADER`].
    pub api_key: Option<String>,
    /// Datagram port override.
    pub udp_port: Option<u16>,
    pub request_timeout: Duration,
    pub polling_timeout: Duration,
    pub udp_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    /// Create a config for a service URL with default timeouts.
    #[must_use]
    pub fn new(remote_url: impl Into<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
            api_key: None,
            udp_port: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            polling_timeout: POLLING_TIMEOUT,
            udp_timeout: UDP_REPLY_TIMEOUT,
        }
    }

    /// Set the developer API key. Empty keys are ignored.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.is_empty()).then_some(api_key);
        self
    }

    /// Override the datagram port.
    #[must_use]
    pub const fn with_udp_port(mut self, port: u16) -> Self {
        self.udp_port = Some(port);
        self
    }

    /// Load from the process environment.
    ///
    /// Reads `MESSAGING_API_URL`, `MESSAGING_API_KEY` (falling back to
    /// `DEFAULT_API_KEY`) and `MESSAGING_UDP_PORT`. Empty values count as
    /// unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut config = Self::new(get(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string()));
        config.api_key = get(ENV_API_KEY).or_else(|| get(ENV_LEGACY_API_KEY));
        if let Some(raw) = get(ENV_UDP_PORT) {
            match parse_port(&raw) {
                Ok(port) => {
                    tracing::info!("Using UDP port override: {port}");
                    config.udp_port = Some(port);
                }
                Err(e) => tracing::warn!("Ignoring {ENV_UDP_PORT}: {e}"),
            }
        }
        config
    }

    /// Parse the service URL.
    ///
    /// # Errors
    /// Returns error if the URL is malformed.
    pub fn parsed_url(&self) -> Result<Url, ConfigError> {
        Ok(Url::parse(&self.remote_url)?)
    }

    /// Host and port for datagrams.
    ///
    /// Host comes from the service URL (default `localhost`), port from the
    /// URL if explicit, else [`DEFAULT_UDP_PORT`]. A non-zero
    /// [`Self::udp_port`] wins over both.
    #[must_use]
    pub fn udp_endpoint(&self) -> (String, u16) {
        let mut host = "localhost".to_string();
        let mut port = DEFAULT_UDP_PORT;

        match self.parsed_url() {
            Ok(url) => {
                if let Some(h) = url.host_str().filter(|h| !h.is_empty()) {
                    host = h.trim_start_matches('[').trim_end_matches(']').to_string();
                }
                if let Some(p) = url.port() {
                    port = p;
                }
            }
            Err(e) => tracing::warn!(
                "Unable to parse {} ({e}), defaulting UDP to {host}:{port}",
                self.remote_url
            ),
        }

        match self.udp_port {
            Some(0) => tracing::warn!("Ignoring invalid UDP port override: 0"),
            Some(p) => port = p,
            None => {}
        }

        (host, port)
    }

    /// Build the reliable transport, with the API key installed.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed.
    pub fn http_client(&self) -> Result<HttpClient, TransportError> {
        let client = HttpClient::new(&self.remote_url)?;
        if let Some(ref key) = self.api_key {
            client.set_default_header(API_KEY_HEADER, key);
        }
        Ok(client)
    }

    /// Build the datagram transport.
    #[must_use]
    pub fn udp_client(&self) -> UdpClient {
        let (host, port) = self.udp_endpoint();
        UdpClient::new(host, port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_udp_endpoint_from_url() {
        let config = ClientConfig::new("http://messaging.local:8080/api");
        assert_eq!(config.udp_endpoint(), ("messaging.local".to_string(), 8080));

        let config = ClientConfig::new("https://messaging.local/api");
        assert_eq!(config.udp_endpoint(), ("messaging.local".to_string(), DEFAULT_UDP_PORT));
    }

    #[test]
    fn test_udp_endpoint_override_and_fallback() {
        let config = ClientConfig::new("http://h:8080").with_udp_port(7000);
        assert_eq!(config.udp_endpoint(), ("h".to_string(), 7000));

        let config = ClientConfig::new("not a url");
        assert_eq!(config.udp_endpoint(), ("localhost".to_string(), DEFAULT_UDP_PORT));

        let config = ClientConfig::new("http://h:8080").with_udp_port(0);
        assert_eq!(config.udp_endpoint(), ("h".to_string(), 8080));
    }

    #[test]
    fn test_from_lookup() {
        let vars = env(&[
            (ENV_API_URL, "http://localhost:8082"),
            (ENV_API_KEY, ""),
            (ENV_LEGACY_API_KEY, "legacy"),
            (ENV_UDP_PORT, "9100"),
        ]);
        let config = ClientConfig::from_lookup(|key| vars.get(key).cloned());
        assert_eq!(config.remote_url, "http://localhost:8082");
        assert_eq!(config.api_key.as_deref(), Some("legacy"));
        assert_eq!(config.udp_port, Some(9100));
    }

    #[test]
    fn test_from_lookup_defaults_and_bad_port() {
        let vars = env(&[(ENV_UDP_PORT, "99999")]);
        let config = ClientConfig::from_lookup(|key| vars.get(key).cloned());
        assert_eq!(config.remote_url, DEFAULT_API_URL);
        assert_eq!(config.api_key, None);
        assert_eq!(config.udp_port, None);
        assert_eq!(config.polling_timeout, Duration::from_secs(40));
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port(" 9999 ").unwrap(), 9999);
        assert!(parse_port("0").is_err());
        assert!(parse_port("65536").is_err());
        assert!(parse_port("udp").is_err());
    }

    #[test]
    fn test_empty_api_key_ignored() {
        assert_eq!(ClientConfig::default().with_api_key("").api_key, None);
        assert_eq!(
            ClientConfig::default().with_api_key("k").api_key.as_deref(),
            Some("k")
        );
    }
}
