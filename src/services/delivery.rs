use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::domains::envelope::Envelope;
use crate::error::{QimbError, Result};
use crate::interfaces::handler::MessageHandler;
use crate::services::dedup::DedupCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Duplicate,
}

/// Dedup-then-callback step shared by the poll loop and the push ingester.
#[derive(Clone)]
pub struct DeliveryCore {
    dedup: Arc<DedupCache>,
    handler: Arc<dyn MessageHandler>,
}

impl DeliveryCore {
    pub fn new(dedup: Arc<DedupCache>, handler: Arc<dyn MessageHandler>) -> Self {
        Self { dedup, handler }
    }

    pub fn dedup(&self) -> &Arc<DedupCache> {
        &self.dedup
    }

    /// Invokes the handler if the message id has not been admitted before.
    /// A handler error or panic comes back as `QimbError::Callback`; the id
    /// stays admitted either way.
    pub async fn deliver(&self, envelope: Envelope) -> Result<DeliveryOutcome> {
        let message_id = envelope.message_id().to_string();
        if !self.dedup.admit(&message_id).await {
            debug!(message_id = %message_id, "suppressed duplicate message");
            return Ok(DeliveryOutcome::Duplicate);
        }
        let outcome = AssertUnwindSafe(self.handler.handle(envelope))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(())) => Ok(DeliveryOutcome::Delivered),
            Ok(Err(err)) => {
                warn!(message_id = %message_id, error = %err, "message handler failed");
                Err(QimbError::Callback(err.to_string()))
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                warn!(message_id = %message_id, panic = %reason, "message handler panicked");
                Err(QimbError::Callback(format!("handler panicked: {reason}")))
            }
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
