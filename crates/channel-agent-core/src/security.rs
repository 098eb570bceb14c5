//! Channel identifier and password hash derivation.
//!
//! Agents that share a channel name, password and service secret compute the
//! same channel id without talking to each other first. The raw password
//! never leaves the client: only its HMAC under the derived channel secret is
//! sent to the service.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Derive the channel secret: `base64(SHA-256(name || password))`.
#[must_use]
pub fn derive_channel_secret(channel_name: &str, channel_password: &str) -> String {
    let digest = Sha256::new()
        .chain_update(channel_name.as_bytes())
        .chain_update(channel_password.as_bytes())
        .finalize();
    BASE64.encode(digest)
}

/// Hash a password under a secret: `base64(HMAC-SHA256(key = secret, password))`.
#[must_use]
pub fn hash(password: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(password.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Generate a channel id: `hex(SHA-256(name || password || service_secret))`.
#[must_use]
pub fn generate_channel_id(
    channel_name: &str,
    channel_password: &str,
    service_secret: &str,
) -> String {
    let digest = Sha256::new()
        .chain_update(channel_name.as_bytes())
        .chain_update(channel_password.as_bytes())
        .chain_update(service_secret.as_bytes())
        .finalize();
    hex::encode(digest)
}

/// Password hash sent on connect and create-channel.
#[must_use]
pub fn channel_password_hash(channel_name: &str, channel_password: &str) -> String {
    hash(
        channel_password,
        &derive_channel_secret(channel_name, channel_password),
    )
}
