use std::sync::Arc;

use http::Method;
use tracing::{debug, info, warn};

use crate::domains::push::{decode_envelope, PushNotification};
use crate::error::{QimbError, Result};
use crate::interfaces::transport::{GatewayRequest, HttpTransport};
use crate::services::delivery::{DeliveryCore, DeliveryOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Confirmed,
    ConfirmationFailed,
    Delivered,
    Duplicate,
    CallbackFailed,
    Ignored,
}

/// Handles inbound push calls. Every call is independent; nothing here is
/// reported back to the transport as an error.
#[derive(Clone)]
pub struct PushIngester {
    core: DeliveryCore,
    fetcher: Arc<dyn HttpTransport>,
}

impl PushIngester {
    pub fn new(core: DeliveryCore, fetcher: Arc<dyn HttpTransport>) -> Self {
        Self { core, fetcher }
    }

    pub async fn ingest(&self, body: &[u8]) -> PushOutcome {
        let notification = match PushNotification::parse(body) {
            Ok(notification) => notification,
            Err(err) => {
                warn!(error = %err, "ignoring malformed push body");
                return PushOutcome::Ignored;
            }
        };

        match notification {
            PushNotification::Confirmation { confirmation_url } => {
                match self.confirm(&confirmation_url).await {
                    Ok(()) => {
                        info!(url = %confirmation_url, "confirmed push subscription");
                        PushOutcome::Confirmed
                    }
                    Err(err) => {
                        warn!(url = %confirmation_url, error = %err, "push subscription confirmation failed");
                        PushOutcome::ConfirmationFailed
                    }
                }
            }
            PushNotification::Notification { envelope_payload } => {
                let envelope = match decode_envelope(&envelope_payload) {
                    Ok(envelope) => envelope,
                    Err(err) => {
                        warn!(error = %err, "ignoring notification with malformed payload");
                        return PushOutcome::Ignored;
                    }
                };
                match self.core.deliver(envelope).await {
                    Ok(DeliveryOutcome::Delivered) => PushOutcome::Delivered,
                    Ok(DeliveryOutcome::Duplicate) => PushOutcome::Duplicate,
                    Err(_) => PushOutcome::CallbackFailed,
                }
            }
            PushNotification::Other(kind) => {
                debug!(kind = ?kind, "ignoring push notification");
                PushOutcome::Ignored
            }
        }
    }

    async fn confirm(&self, url: &str) -> Result<()> {
        let response = self
            .fetcher
            .send(GatewayRequest::new(Method::GET, url))
            .await?;
        if !response.status.is_success() {
            return Err(QimbError::Http(format!(
                "confirmation returned status {}",
                response.status.as_u16()
            )));
        }
        Ok(())
    }
}
