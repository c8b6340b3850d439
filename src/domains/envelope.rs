use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Identity of this client process, sent on every outbound request and used by
/// the gateway to route node-direct messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for NodeId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

pub fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

/// One message record as the gateway serializes it, both in poll responses and
/// inside push notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub message_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sender_node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_handle: Option<String>,
}

// The gateway writes `null` for unset string fields, e.g. the type of a
// node-direct message.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A delivered message, handed by value to the application handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    message: String,
    message_id: String,
    message_type: String,
    sender_node_id: String,
    receipt_handle: Option<String>,
}

impl Envelope {
    pub fn new(
        message: impl Into<String>,
        message_id: impl Into<String>,
        message_type: impl Into<String>,
        sender_node_id: impl Into<String>,
        receipt_handle: Option<String>,
    ) -> Self {
        Self {
            message: message.into(),
            message_id: message_id.into(),
            message_type: message_type.into(),
            sender_node_id: sender_node_id.into(),
            receipt_handle,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn sender_node_id(&self) -> &str {
        &self.sender_node_id
    }

    pub fn receipt_handle(&self) -> Option<&str> {
        self.receipt_handle.as_deref()
    }

    pub fn into_message(self) -> String {
        self.message
    }
}

impl From<WireMessage> for Envelope {
    fn from(wire: WireMessage) -> Self {
        Self {
            message: wire.message,
            message_id: wire.message_id,
            message_type: wire.message_type,
            sender_node_id: wire.sender_node_id,
            receipt_handle: wire.receipt_handle.filter(|handle| !handle.is_empty()),
        }
    }
}
