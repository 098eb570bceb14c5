//! Joins a channel, chats for a few rounds, then leaves.
//!
//! Usage: `chat-agent-demo [channel] [password] [agent-name]`
//!
//! The service is configured through `MESSAGING_API_URL`,
//! `MESSAGING_API_KEY` and `MESSAGING_UDP_PORT`.

use std::time::Duration;

use anyhow::Context;
use channel_agent_core::{BROADCAST, EventMessage, EventType, ReceiveConfig};
use channel_agent_session::{ChannelSession, ConnectOptions};
use channel_agent_transport::ClientConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const POLL_ROUNDS: usize = 3;

fn log_event(event: &EventMessage) {
    match serde_json::to_string(event) {
        Ok(json) => tracing::info!("Event: {json}"),
        Err(e) => tracing::error!("Failed to serialize event: {e}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let channel = args.next().unwrap_or_else(|| "test-room".to_string());
    let password = args.next().unwrap_or_else(|| "password123".to_string());
    let agent_name = args.next().unwrap_or_else(|| "rust-chat-agent".to_string());

    let config = ClientConfig::from_env();
    tracing::info!("Using messaging service {}", config.remote_url);
    let session = ChannelSession::from_config(&config).context("building transports")?;

    let options = ConnectOptions::new(&agent_name).channel(&channel, &password);
    let connected = session
        .try_connect(&options)
        .await
        .with_context(|| format!("joining {channel}"))?;
    let session_id = connected.session_id.clone();

    for agent in session.get_active_agents(&session_id).await {
        tracing::info!("Agent present: {} ({})", agent.agent_name, agent.agent_type);
    }

    let greeting = format!("Hello from {agent_name}");
    if !session
        .send(EventType::ChatText, &greeting, BROADCAST, &session_id, false)
        .await
    {
        tracing::warn!("Greeting was not accepted");
    }

    let mut cursor = connected.receive_config(10);
    for _ in 0..POLL_ROUNDS {
        let batch = session.receive(&session_id, &cursor).await;
        batch.events.iter().for_each(log_event);
        batch.ephemeral_events.iter().for_each(log_event);
        cursor.advance(&batch);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    if session
        .udp_push(&format!("{agent_name} is here"), BROADCAST, &session_id)
        .await
    {
        let batch = session.udp_pull(&session_id, &cursor).await;
        tracing::info!("UDP pull returned {} events", batch.events.len());
        cursor.advance(&batch);
    }
    tracing::info!(
        "Resume offsets: {}/{}",
        cursor.global_offset,
        cursor.local_offset
    );

    if !session.disconnect(&session_id).await {
        tracing::warn!("Service did not acknowledge disconnect");
    }
    Ok(())
}
