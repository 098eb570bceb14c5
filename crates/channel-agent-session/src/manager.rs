//! Channel session: connect, exchange events, disconnect.

use std::{
    sync::{PoisonError, RwLock},
    time::Duration,
};

use channel_agent_core::{
    AgentContext, AgentInfo, ConnectRequest, ConnectResponse, CreateChannelRequest,
    DatagramTransport, EventMessageRequest, EventMessageResult, EventType, HttpMethod,
    MessageReceiveRequest, MessageTransport, PollSource, RUST_AGENT_TYPE, ReceiveConfig,
    RequestTransport, SessionRequest, TransportError,
    codec::{created_channel_id, response_data},
    security,
};
use channel_agent_transport::{
    ClientConfig, DEFAULT_REQUEST_TIMEOUT, HttpClient, POLLING_TIMEOUT, UDP_REPLY_TIMEOUT,
    UdpClient,
};
use serde::Serialize;

use crate::{
    options::{ConnectOptions, DEFAULT_API_KEY_SCOPE},
    path::{HttpPath, TransportKind, UdpPath},
};

pub const CREATE_CHANNEL_PATH: &str = "/create-channel";
pub const CONNECT_PATH: &str = "/connect";
pub const DISCONNECT_PATH: &str = "/disconnect";
pub const LIST_AGENTS_PATH: &str = "/list-agents";
pub const LIST_SYSTEM_AGENTS_PATH: &str = "/list-system-agents";

/// Descriptor advertised in the agent context.
pub const AGENT_DESCRIPTOR: &str = "channel_agent_session::ChannelSession";

/// Connect error.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Either channel name and password or a channel id is required")]
    MissingChannelReference,
    #[error("Channel creation failed: {0}")]
    CreateChannel(String),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Connect returned status {0}")]
    Status(u16),
    #[error("Malformed connect response: {0}")]
    Protocol(String),
    #[error("Connect rejected with status {:?}: {}", .0.status, .0.message)]
    Rejected(Box<ConnectResponse>),
}

/// A client's membership in one channel.
///
/// Offsets are never stored: every receive takes a [`ReceiveConfig`] and
/// returns the offsets to resume from. The only mutable state is the
/// default poll source, recorded on connect.
///
/// After [`disconnect`](Self::disconnect) the reliable transport is
/// released and further reliable calls return their failure value.
pub struct ChannelSession<R = HttpClient, D = UdpClient> {
    requests: R,
    datagrams: D,
    default_poll_source: RwLock<PollSource>,
    request_timeout: Duration,
    polling_timeout: Duration,
    udp_timeout: Duration,
}

impl ChannelSession<HttpClient, UdpClient> {
    /// Build a session over HTTP and UDP from a client config.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let requests = config.http_client()?;
        let datagrams = config.udp_client();
        tracing::debug!(
            "Session for {} (UDP {}:{})",
            requests.base_url(),
            datagrams.host(),
            datagrams.port()
        );
        Ok(Self::new(requests, datagrams).with_timeouts(
            config.request_timeout,
            config.polling_timeout,
            config.udp_timeout,
        ))
    }
}

impl<R, D> ChannelSession<R, D>
where
    R: RequestTransport,
    D: DatagramTransport,
{
    /// Create a session over the given transports with default timeouts.
    #[must_use]
    pub const fn new(requests: R, datagrams: D) -> Self {
        Self {
            requests,
            datagrams,
            default_poll_source: RwLock::new(PollSource::Auto),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            polling_timeout: POLLING_TIMEOUT,
            udp_timeout: UDP_REPLY_TIMEOUT,
        }
    }

    /// Override the ordinary, polling and datagram reply timeouts.
    #[must_use]
    pub const fn with_timeouts(
        mut self,
        request: Duration,
        polling: Duration,
        udp: Duration,
    ) -> Self {
        self.request_timeout = request;
        self.polling_timeout = polling;
        self.udp_timeout = udp;
        self
    }

    #[must_use]
    pub const fn requests(&self) -> &R {
        &self.requests
    }

    #[must_use]
    pub const fn datagrams(&self) -> &D {
        &self.datagrams
    }

    /// Poll source used when a receive config leaves it unset.
    #[must_use]
    pub fn default_poll_source(&self) -> PollSource {
        *self
            .default_poll_source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_default_poll_source(&self, poll_source: PollSource) {
        *self
            .default_poll_source
            .write()
            .unwrap_or_else(PoisonError::into_inner) = poll_source;
    }

    /// Push/pull over the chosen transport.
    #[must_use]
    pub fn transport(&self, kind: TransportKind) -> Box<dyn MessageTransport + '_> {
        match kind {
            TransportKind::Reliable => Box::new(self.http_path()),
            TransportKind::Datagram => Box::new(self.udp_path()),
        }
    }

    const fn http_path(&self) -> HttpPath<'_, R> {
        HttpPath::new(&self.requests, self.request_timeout, self.polling_timeout)
    }

    const fn udp_path(&self) -> UdpPath<'_, D> {
        UdpPath::new(&self.datagrams, self.udp_timeout)
    }

    fn receive_request(&self, session_id: &str, config: &ReceiveConfig) -> MessageReceiveRequest {
        let mut receive_config = config.clone();
        if receive_config.poll_source.is_none() {
            receive_config.poll_source = Some(self.default_poll_source());
        }
        MessageReceiveRequest {
            session_id: session_id.to_string(),
            receive_config,
        }
    }

    async fn post<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<serde_json::Value, TransportError> {
        let body = serde_json::to_value(body)?;
        let result = self
            .requests
            .request(HttpMethod::Post, path, Some(&body), timeout)
            .await?;
        if !result.is_http_ok() {
            return Err(TransportError::Status(result.status_code));
        }
        Ok(result.data_as_json())
    }

    async fn create_channel(
        &self,
        channel_name: &str,
        password_hash: &str,
    ) -> Result<String, ConnectError> {
        let request = CreateChannelRequest {
            channel_name: channel_name.to_string(),
            channel_password: password_hash.to_string(),
        };
        let body = self
            .post(CREATE_CHANNEL_PATH, &request, self.request_timeout)
            .await
            .map_err(|e| ConnectError::CreateChannel(e.to_string()))?;
        created_channel_id(&body).ok_or_else(|| {
            ConnectError::CreateChannel(format!("no channel id for {channel_name:?}"))
        })
    }

    /// Join a channel.
    ///
    /// Records the default poll source, resolves the channel id (creating
    /// the channel by name when no id is given) and opens a session.
    ///
    /// # Errors
    /// Returns error if no channel reference was given, the channel could
    /// not be created, or the service did not accept the connect.
    pub async fn try_connect(
        &self,
        options: &ConnectOptions,
    ) -> Result<ConnectResponse, ConnectError> {
        self.set_default_poll_source(options.poll_source.unwrap_or_default());

        let password_hash = options.has_credentials().then(|| {
            security::channel_password_hash(&options.channel_name, &options.channel_password)
        });

        let channel_id = match (options.explicit_channel_id(), &password_hash) {
            (Some(id), _) => id.to_string(),
            (None, Some(hash)) => self.create_channel(&options.channel_name, hash).await?,
            (None, None) => return Err(ConnectError::MissingChannelReference),
        };

        let request = ConnectRequest {
            channel_id: Some(channel_id),
            channel_name: (!options.channel_name.is_empty()).then(|| options.channel_name.clone()),
            channel_password: password_hash,
            agent_name: options.agent_name.clone(),
            agent_context: AgentContext::new(RUST_AGENT_TYPE, AGENT_DESCRIPTOR),
            session_id: options.resume_session_id().map(str::to_owned),
            enable_webrtc_relay: options.enable_webrtc_relay,
            api_key_scope: Some(
                options
                    .api_key_scope
                    .clone()
                    .unwrap_or_else(|| DEFAULT_API_KEY_SCOPE.to_string()),
            ),
        };

        let body = serde_json::to_value(&request).map_err(TransportError::from)?;
        let result = self
            .requests
            .request(HttpMethod::Post, CONNECT_PATH, Some(&body), self.polling_timeout)
            .await?;
        if !result.is_http_ok() {
            return Err(ConnectError::Status(result.status_code));
        }

        let json = result.data_as_json();
        let data = response_data(&json)
            .filter(|data| data.is_object())
            .ok_or_else(|| ConnectError::Protocol("response has no data object".into()))?;
        let response = ConnectResponse::from_value(data);
        if !response.success {
            return Err(ConnectError::Rejected(Box::new(response)));
        }

        tracing::info!(
            "Connected {} to channel {} as session {} at offsets {}/{}",
            options.agent_name,
            response.channel_id,
            response.session_id,
            response.global_offset,
            response.local_offset
        );
        Ok(response)
    }

    /// Join a channel, reporting failure as an unsuccessful response.
    pub async fn connect(&self, options: &ConnectOptions) -> ConnectResponse {
        match self.try_connect(options).await {
            Ok(response) => response,
            Err(ConnectError::Rejected(response)) => {
                tracing::warn!("Connect rejected: {:?} {}", response.status, response.message);
                *response
            }
            Err(e) => {
                tracing::error!("Connect failed: {e}");
                ConnectResponse::default()
            }
        }
    }

    /// Join a channel by id, optionally resuming a session.
    pub async fn connect_with_channel_id(
        &self,
        agent_name: &str,
        channel_id: &str,
        session_id: Option<&str>,
        enable_webrtc_relay: bool,
    ) -> ConnectResponse {
        let mut options = ConnectOptions::new(agent_name)
            .channel_id(channel_id)
            .webrtc_relay(enable_webrtc_relay);
        if let Some(session_id) = session_id {
            options = options.session_id(session_id);
        }
        self.connect(&options).await
    }

    /// Push one event reliably. Returns whether the service accepted it.
    pub async fn send(
        &self,
        event_type: EventType,
        content: &str,
        destination: &str,
        session_id: &str,
        encrypted: bool,
    ) -> bool {
        let request = EventMessageRequest {
            session_id: session_id.to_string(),
            event_type,
            to: destination.to_string(),
            content: content.to_string(),
            encrypted,
        };
        match self.http_path().push(&request).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Send failed: {e}");
                false
            }
        }
    }

    /// Pull a batch of events reliably.
    ///
    /// A failed pull yields an empty batch with unset offsets.
    pub async fn receive(&self, session_id: &str, config: &ReceiveConfig) -> EventMessageResult {
        let request = self.receive_request(session_id, config);
        tracing::debug!(
            "Pulling from {}/{} via {:?}",
            config.global_offset,
            config.local_offset,
            request.receive_config.poll_source
        );
        self.http_path().pull(&request).await.unwrap_or_else(|e| {
            tracing::warn!("Receive failed: {e}");
            EventMessageResult::default()
        })
    }

    /// Agents currently in the channel.
    pub async fn get_active_agents(&self, session_id: &str) -> Vec<AgentInfo> {
        self.list_agents(LIST_AGENTS_PATH, session_id).await
    }

    /// Service-side agents attached to the channel.
    pub async fn get_system_agents(&self, session_id: &str) -> Vec<AgentInfo> {
        self.list_agents(LIST_SYSTEM_AGENTS_PATH, session_id).await
    }

    async fn list_agents(&self, path: &str, session_id: &str) -> Vec<AgentInfo> {
        match self
            .post(path, &SessionRequest::new(session_id), self.request_timeout)
            .await
        {
            Ok(body) => response_data(&body)
                .map(AgentInfo::list_from_value)
                .unwrap_or_default(),
            Err(e) => {
                tracing::warn!("{path} failed: {e}");
                Vec::new()
            }
        }
    }

    /// Push a text event as a datagram.
    ///
    /// Returns whether the datagram was sent, not whether it arrived.
    pub async fn udp_push(&self, content: &str, destination: &str, session_id: &str) -> bool {
        let request = EventMessageRequest {
            session_id: session_id.to_string(),
            event_type: EventType::ChatText,
            to: destination.to_string(),
            content: content.to_string(),
            encrypted: false,
        };
        match self.udp_path().push(&request).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("UDP push failed: {e}");
                false
            }
        }
    }

    /// Pull a batch of events over datagrams.
    ///
    /// No reply in time, or a reply that is not a successful result, yields
    /// an empty batch with unset offsets.
    pub async fn udp_pull(&self, session_id: &str, config: &ReceiveConfig) -> EventMessageResult {
        let request = self.receive_request(session_id, config);
        self.udp_path().pull(&request).await.unwrap_or_else(|e| {
            tracing::warn!("UDP pull failed: {e}");
            EventMessageResult::default()
        })
    }

    /// Leave the channel and release both transports.
    ///
    /// The reliable transport is released whether or not the service
    /// acknowledged the notice. Returns whether it did.
    pub async fn disconnect(&self, session_id: &str) -> bool {
        if let Err(e) = self.datagrams.close().await {
            tracing::warn!("Closing UDP socket failed: {e}");
        }

        let acknowledged = match self
            .post(DISCONNECT_PATH, &SessionRequest::new(session_id), self.request_timeout)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Disconnect notice failed: {e}");
                false
            }
        };

        self.requests.close_all().await;
        tracing::info!("Disconnected session {session_id}");
        acknowledged
    }
}
