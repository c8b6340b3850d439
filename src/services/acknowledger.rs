use std::sync::Arc;

use tracing::debug;

use crate::error::{QimbError, Result};
use crate::services::gateway::GatewayClient;

/// Deletes poll-delivered messages from the gateway by receipt handle.
#[derive(Clone)]
pub struct Acknowledger {
    gateway: Arc<GatewayClient>,
}

impl Acknowledger {
    pub fn new(gateway: Arc<GatewayClient>) -> Self {
        Self { gateway }
    }

    pub async fn acknowledge(&self, receipt_handle: Option<&str>) -> Result<()> {
        let Some(handle) = receipt_handle else {
            return Err(QimbError::ack("missing receipt handle", None));
        };
        self.gateway.delete(handle).await?;
        debug!(receipt_handle = %handle, "acknowledged message");
        Ok(())
    }
}
