use serde::Deserialize;

use crate::domains::envelope::{Envelope, WireMessage};
use crate::error::{QimbError, Result};

const SUBSCRIPTION_CONFIRMATION: &str = "SubscriptionConfirmation";
const NOTIFICATION: &str = "Notification";

/// Raw push body as posted by the gateway's fan-out service.
#[derive(Debug, Clone, Deserialize)]
struct SnsMessage {
    #[serde(rename = "Type")]
    kind: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "SubscribeURL")]
    subscribe_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushNotification {
    Confirmation { confirmation_url: String },
    Notification { envelope_payload: String },
    Other(Option<String>),
}

impl PushNotification {
    pub fn parse(body: &[u8]) -> Result<Self> {
        let raw: SnsMessage =
            serde_json::from_slice(body).map_err(|e| QimbError::Serialization(e.to_string()))?;
        let notification = match raw.kind.as_deref() {
            Some(SUBSCRIPTION_CONFIRMATION) => match raw.subscribe_url {
                Some(url) if !url.trim().is_empty() => Self::Confirmation {
                    confirmation_url: url,
                },
                _ => Self::Other(raw.kind),
            },
            Some(NOTIFICATION) => match raw.message {
                Some(payload) => Self::Notification {
                    envelope_payload: payload,
                },
                None => Self::Other(raw.kind),
            },
            _ => Self::Other(raw.kind),
        };
        Ok(notification)
    }
}

/// Decodes the JSON-encoded wire record nested in a notification.
pub fn decode_envelope(payload: &str) -> Result<Envelope> {
    let wire: WireMessage =
        serde_json::from_str(payload).map_err(|e| QimbError::Serialization(e.to_string()))?;
    Ok(Envelope::from(wire))
}
