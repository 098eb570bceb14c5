//! Lenient decoding of service responses.
//!
//! Every field is read independently: a missing field, or one of the wrong
//! JSON type, leaves the default in place instead of failing the whole
//! response.

use serde_json::Value;
use thiserror::Error;

use crate::{AgentInfo, ConnectResponse, EventMessage, EventMessageResult, EventType, UNSET_OFFSET};

/// Status literal marking a successful connect or datagram result.
pub const STATUS_SUCCESS: &str = "success";

/// Status literal of a datagram reply envelope that was processed.
pub const STATUS_OK: &str = "ok";

fn str_field<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

fn string_field(obj: &Value, key: &str) -> Option<String> {
    str_field(obj, key).map(str::to_owned)
}

fn i64_field(obj: &Value, key: &str) -> Option<i64> {
    obj.get(key).and_then(Value::as_i64)
}

fn bool_field(obj: &Value, key: &str) -> Option<bool> {
    obj.get(key).and_then(Value::as_bool)
}

fn events_field(obj: &Value, key: &str) -> Vec<EventMessage> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(EventMessage::from_value).collect())
        .unwrap_or_default()
}

/// The `data` member of a `{data: ...}` response container.
#[must_use]
pub fn response_data(body: &Value) -> Option<&Value> {
    body.get("data").filter(|data| !data.is_null())
}

impl EventMessage {
    /// Decode an event.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let mut event = Self::default();
        if let Some(timestamp) = i64_field(value, "timestamp") {
            event.timestamp = timestamp;
        }
        if let Some(from) = string_field(value, "from") {
            event.from = from;
        }
        if let Some(to) = string_field(value, "to") {
            event.to = to;
        }
        if let Some(name) = str_field(value, "type") {
            event.event_type = EventType::from_name(name);
        }
        if let Some(content) = string_field(value, "content") {
            event.content = content;
        }
        if let Some(encrypted) = bool_field(value, "encrypted") {
            event.encrypted = encrypted;
        }
        if let Some(ephemeral) = bool_field(value, "ephemeral") {
            event.ephemeral = ephemeral;
        }
        if let Some(offset) = i64_field(value, "globalOffset") {
            event.global_offset = offset;
        }
        if let Some(offset) = i64_field(value, "localOffset") {
            event.local_offset = offset;
        }
        event
    }
}

impl EventMessageResult {
    /// Decode the `data` member of a pull response.
    ///
    /// `messages` and `events` are both accepted and concatenated in that
    /// order. `next*` offsets take precedence over the current-name fields.
    #[must_use]
    pub fn from_value(data: &Value) -> Self {
        let mut events = events_field(data, "messages");
        events.extend(events_field(data, "events"));
        let ephemeral_events = events_field(data, "ephemeralEvents");

        let global_offset = i64_field(data, "nextGlobalOffset")
            .or_else(|| i64_field(data, "globalOffset"))
            .unwrap_or(UNSET_OFFSET);
        let local_offset = i64_field(data, "nextLocalOffset")
            .or_else(|| i64_field(data, "localOffset"))
            .unwrap_or(UNSET_OFFSET);

        Self {
            events,
            ephemeral_events,
            global_offset,
            local_offset,
        }
    }
}

impl ConnectResponse {
    /// Decode the `data` member of a connect response.
    #[must_use]
    pub fn from_value(data: &Value) -> Self {
        let mut response = Self::default();
        if let Some(status) = string_field(data, "status") {
            response.status = status;
        }
        if let Some(session_id) = string_field(data, "sessionId") {
            response.session_id = session_id;
        }
        if let Some(channel_id) = string_field(data, "channelId") {
            response.channel_id = channel_id;
        }
        if let Some(offset) = i64_field(data, "globalOffset") {
            response.global_offset = offset;
        }
        if let Some(offset) = i64_field(data, "localOffset") {
            response.local_offset = offset;
        }
        if let Some(message) = string_field(data, "message") {
            response.message = message;
        }
        response.success = response.status == STATUS_SUCCESS && !response.session_id.is_empty();
        response
    }
}

impl AgentInfo {
    /// Decode an agent descriptor.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let metadata = value
            .get("metadata")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_owned())))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            agent_name: string_field(value, "agentName").unwrap_or_default(),
            agent_type: string_field(value, "agentType").unwrap_or_default(),
            descriptor: string_field(value, "descriptor").unwrap_or_default(),
            ip_address: string_field(value, "ipAddress"),
            role: string_field(value, "role"),
            metadata,
        }
    }

    /// Decode a list response's `data` array. Anything else yields no agents.
    #[must_use]
    pub fn list_from_value(data: &Value) -> Vec<Self> {
        data.as_array()
            .map(|items| items.iter().map(Self::from_value).collect())
            .unwrap_or_default()
    }
}

/// Channel id from a create-channel response body.
///
/// Requires a top-level `status == "success"` and a non-empty
/// `data.channelId`.
#[must_use]
pub fn created_channel_id(body: &Value) -> Option<String> {
    if str_field(body, "status") != Some(STATUS_SUCCESS) {
        return None;
    }
    response_data(body)
        .and_then(|data| str_field(data, "channelId"))
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
}

/// Why a datagram pull reply was not accepted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplyError {
    #[error("reply envelope status is not \"ok\"")]
    EnvelopeStatus,
    #[error("reply result status is not \"success\"")]
    ResultStatus,
    #[error("reply carries no data")]
    MissingData,
}

/// Unwrap `{status: "ok", result: {status: "success", data}}` to `data`.
///
/// The three checks run in order and the first failing one is reported.
///
/// # Errors
/// Returns the first check the reply failed.
pub fn pull_reply_data(reply: &Value) -> Result<&Value, ReplyError> {
    if str_field(reply, "status") != Some(STATUS_OK) {
        return Err(ReplyError::EnvelopeStatus);
    }
    let result = reply.get("result").ok_or(ReplyError::ResultStatus)?;
    if str_field(result, "status") != Some(STATUS_SUCCESS) {
        return Err(ReplyError::ResultStatus);
    }
    response_data(result).ok_or(ReplyError::MissingData)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(from: &str, content: &str) -> Value {
        json!({"from": from, "to": "*", "type": "CHAT_TEXT", "content": content})
    }

    #[test]
    fn test_merges_messages_then_events() {
        let data = json!({
            "messages": [event("a", "1"), event("b", "2")],
            "events": [event("c", "3"), event("a", "1")],
        });
        let batch = EventMessageResult::from_value(&data);
        let contents: Vec<_> = batch.events.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, ["1", "2", "3", "1"]);
        assert!(batch.ephemeral_events.is_empty());
    }

    #[test]
    fn test_ephemeral_events_kept_separate() {
        let data = json!({
            "events": [event("a", "durable")],
            "ephemeralEvents": [{"from": "b", "content": "blink", "ephemeral": true}],
            "globalOffset": 3,
            "localOffset": 1,
        });
        let batch = EventMessageResult::from_value(&data);
        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.ephemeral_events.len(), 1);
        assert!(batch.ephemeral_events[0].ephemeral);
        assert_eq!((batch.global_offset, batch.local_offset), (3, 1));
    }

    #[test]
    fn test_next_offsets_take_precedence() {
        let data = json!({
            "events": [event("a", "1"), event("a", "2"), event("a", "3")],
            "globalOffset": 5,
            "nextGlobalOffset": 8,
            "localOffset": 5,
        });
        let batch = EventMessageResult::from_value(&data);
        assert_eq!(batch.events.len(), 3);
        assert_eq!((batch.global_offset, batch.local_offset), (8, 5));

        let data = json!({"nextLocalOffset": 9, "localOffset": 4});
        let batch = EventMessageResult::from_value(&data);
        assert_eq!((batch.global_offset, batch.local_offset), (UNSET_OFFSET, 9));
    }

    #[test]
    fn test_event_fields_default_independently() {
        let value = json!({
            "timestamp": "yesterday",
            "from": "alice",
            "type": "NOT_A_KIND",
            "content": 42,
            "encrypted": true,
            "globalOffset": 12,
        });
        let event = EventMessage::from_value(&value);
        assert_eq!(event.timestamp, 0);
        assert_eq!(event.from, "alice");
        assert_eq!(event.event_type, EventType::ChatText);
        assert_eq!(event.content, "");
        assert!(event.encrypted);
        assert_eq!(event.global_offset, 12);
        assert_eq!(event.local_offset, UNSET_OFFSET);
    }

    #[test]
    fn test_non_array_event_fields_ignored() {
        let batch = EventMessageResult::from_value(&json!({"messages": "nope", "events": null}));
        assert!(batch.is_empty());
        assert!(!batch.has_offsets());
    }

    #[test]
    fn test_connect_success_requires_session_id() {
        let ok = ConnectResponse::from_value(&json!({
            "status": "success",
            "sessionId": "S1",
            "channelId": "C1",
            "globalOffset": 0,
            "localOffset": 0,
        }));
        assert!(ok.success);
        assert_eq!(ok.session_id, "S1");
        assert_eq!((ok.global_offset, ok.local_offset), (0, 0));

        let missing = ConnectResponse::from_value(&json!({"status": "success", "channelId": "C1"}));
        assert!(!missing.success);

        let empty = ConnectResponse::from_value(&json!({"status": "success", "sessionId": ""}));
        assert!(!empty.success);

        let failed = ConnectResponse::from_value(&json!({"status": "error", "sessionId": "S1"}));
        assert!(!failed.success);
    }

    #[test]
    fn test_agent_decoding() {
        let agents = AgentInfo::list_from_value(&json!([
            {"agentName": "a", "agentType": "RUST-AGENT", "descriptor": "d"},
            {"agentName": "relay", "role": "system", "ipAddress": "10.0.0.2",
             "metadata": {"zone": "eu", "weight": 3}},
        ]));
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].role, None);
        assert_eq!(agents[1].role.as_deref(), Some("system"));
        assert_eq!(agents[1].ip_address.as_deref(), Some("10.0.0.2"));
        assert_eq!(agents[1].metadata.len(), 1);
        assert!(AgentInfo::list_from_value(&json!({"agentName": "x"})).is_empty());
    }

    #[test]
    fn test_created_channel_id() {
        let body = json!({"status": "success", "data": {"channelId": "C9"}});
        assert_eq!(created_channel_id(&body).as_deref(), Some("C9"));
        let rejected = json!({"status": "error", "data": {"channelId": "C9"}});
        assert_eq!(created_channel_id(&rejected), None);
        assert_eq!(created_channel_id(&json!({"status": "success", "data": {}})), None);
    }

    #[test]
    fn test_pull_reply_checks_in_order() {
        let data = json!({"events": []});
        let good = json!({"status": "ok", "result": {"status": "success", "data": data.clone()}});
        assert_eq!(pull_reply_data(&good), Ok(&data));

        let bad_envelope = json!({"status": "error", "result": {"status": "success", "data": {}}});
        assert_eq!(pull_reply_data(&bad_envelope), Err(ReplyError::EnvelopeStatus));

        let bad_result = json!({"status": "ok", "result": {"status": "failed", "data": {}}});
        assert_eq!(pull_reply_data(&bad_result), Err(ReplyError::ResultStatus));

        let no_result = json!({"status": "ok"});
        assert_eq!(pull_reply_data(&no_result), Err(ReplyError::ResultStatus));

        let no_data = json!({"status": "ok", "result": {"status": "success"}});
        assert_eq!(pull_reply_data(&no_data), Err(ReplyError::MissingData));
    }
}
