//! Datagram envelope: an action tag plus an opaque payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Datagram action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UdpAction {
    /// Fire-and-forget event push.
    Push,
    /// Pull request expecting one correlated reply.
    Pull,
}

/// Envelope wrapping every datagram sent to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UdpEnvelope {
    pub action: UdpAction,
    #[serde(default)]
    pub payload: Value,
}

impl UdpEnvelope {
    /// Wrap a serializable payload.
    ///
    /// # Errors
    /// Returns error if the payload cannot be represented as JSON.
    pub fn new<T: Serialize>(action: UdpAction, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            action,
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Encode to datagram bytes.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode from datagram bytes.
    ///
    /// # Errors
    /// Returns error if the bytes are not a valid envelope.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionRequest;

    #[test]
    fn test_envelope_shape() {
        let envelope = UdpEnvelope::new(UdpAction::Pull, &SessionRequest::new("S1")).unwrap();
        let json: Value = serde_json::from_slice(&envelope.to_bytes().unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"action": "pull", "payload": {"sessionId": "S1"}}));
    }

    #[test]
    fn test_envelope_decode_without_payload() {
        let envelope = UdpEnvelope::from_bytes(br#"{"action":"push"}"#).unwrap();
        assert_eq!(envelope.action, UdpAction::Push);
        assert!(envelope.payload.is_null());
    }

    #[test]
    fn test_envelope_rejects_unknown_action() {
        assert!(UdpEnvelope::from_bytes(br#"{"action":"sync","payload":{}}"#).is_err());
    }
}
