use serde::{Deserialize, Serialize};

/// Where a published message goes: every subscriber of a type, or one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Type(String),
    Node(String),
}

impl Destination {
    pub fn publish_path(&self, message_id: &str) -> String {
        let message_id = urlencoding::encode(message_id);
        match self {
            Self::Type(message_type) => format!(
                "message/publish/type/{}/{message_id}",
                urlencoding::encode(message_type)
            ),
            Self::Node(node_id) => format!(
                "message/publish/node/{}/{message_id}",
                urlencoding::encode(node_id)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionTarget {
    Type(String),
    /// Messages addressed directly to this client's node id.
    Node,
}

impl SubscriptionTarget {
    pub fn path(&self) -> String {
        match self {
            Self::Type(message_type) => format!(
                "message/subscribe/type/{}",
                urlencoding::encode(message_type)
            ),
            Self::Node => "message/subscribe/node".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    #[serde(
        rename = "pushEndpoint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub push_endpoint: Option<String>,
}

impl SubscribeRequest {
    pub fn new(push_endpoint: Option<&str>) -> Self {
        Self {
            push_endpoint: push_endpoint.map(str::to_string),
        }
    }
}

pub fn delete_path(receipt_handle: &str) -> String {
    format!("message/delete/{}", urlencoding::encode(receipt_handle))
}

pub const RECEIVE_PATH: &str = "message/receive";
