use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use tracing::debug;

use crate::domains::address::{
    delete_path, Destination, SubscribeRequest, SubscriptionTarget, RECEIVE_PATH,
};
use crate::domains::envelope::{new_message_id, Envelope, NodeId, WireMessage};
use crate::error::{QimbError, Result};
use crate::interfaces::transport::{GatewayRequest, GatewayResponse, HttpTransport};

pub const NODE_ID_HEADER: &str = "X-Qimb-NodeId";

/// Issues the gateway's HTTP operations on behalf of one node identity.
pub struct GatewayClient {
    endpoint: String,
    node_id: NodeId,
    transport: Arc<dyn HttpTransport>,
}

impl GatewayClient {
    pub fn new(endpoint: &str, node_id: NodeId, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let endpoint = normalize_endpoint(endpoint)?;
        Ok(Self {
            endpoint,
            node_id,
            transport,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        self.transport.clone()
    }

    /// Publishes under a freshly generated message id and returns that id.
    pub async fn publish(&self, destination: &Destination, message: &str) -> Result<String> {
        let message_id = new_message_id();
        let request = self
            .request(Method::PUT, &destination.publish_path(&message_id))
            .body(message.as_bytes().to_vec());
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| QimbError::publish("transport failure", Some(e)))?;
        if response.status != StatusCode::CREATED {
            return Err(QimbError::publish(
                unexpected_status(&response, StatusCode::CREATED),
                None,
            ));
        }
        debug!(message_id = %message_id, destination = ?destination, "published message");
        Ok(message_id)
    }

    pub async fn subscribe(
        &self,
        target: &SubscriptionTarget,
        push_endpoint: Option<&str>,
    ) -> Result<()> {
        let body = serde_json::to_vec(&SubscribeRequest::new(push_endpoint)).map_err(|e| {
            QimbError::subscribe(
                "unable to encode request",
                Some(QimbError::Serialization(e.to_string())),
            )
        })?;
        let request = self
            .request(Method::PUT, &target.path())
            .header(CONTENT_TYPE.as_str(), "application/json")
            .body(body);
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| QimbError::subscribe("transport failure", Some(e)))?;
        if response.status != StatusCode::OK {
            return Err(QimbError::subscribe(
                unexpected_status(&response, StatusCode::OK),
                None,
            ));
        }
        debug!(subscription = ?target, push_endpoint = ?push_endpoint, "subscribed");
        Ok(())
    }

    /// Fetches every message currently visible to this node.
    pub async fn receive(&self) -> Result<Vec<Envelope>> {
        let response = self
            .transport
            .send(self.request(Method::GET, RECEIVE_PATH))
            .await
            .map_err(|e| QimbError::receive("transport failure", Some(e)))?;
        if response.status != StatusCode::OK {
            return Err(QimbError::receive(
                unexpected_status(&response, StatusCode::OK),
                None,
            ));
        }
        let records: Vec<WireMessage> = serde_json::from_slice(&response.body).map_err(|e| {
            QimbError::receive(
                "malformed response body",
                Some(QimbError::Serialization(e.to_string())),
            )
        })?;
        Ok(records.into_iter().map(Envelope::from).collect())
    }

    pub async fn delete(&self, receipt_handle: &str) -> Result<()> {
        let response = self
            .transport
            .send(self.request(Method::DELETE, &delete_path(receipt_handle)))
            .await
            .map_err(|e| QimbError::ack("transport failure", Some(e)))?;
        if response.status != StatusCode::OK {
            return Err(QimbError::ack(
                unexpected_status(&response, StatusCode::OK),
                None,
            ));
        }
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> GatewayRequest {
        GatewayRequest::new(method, format!("{}{}", self.endpoint, path))
            .header(NODE_ID_HEADER, self.node_id.to_string())
    }
}

/// Trims the endpoint and guarantees exactly one trailing `/`.
pub fn normalize_endpoint(endpoint: &str) -> Result<String> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(QimbError::Config("endpoint must not be empty".to_string()));
    }
    Ok(format!("{trimmed}/"))
}

fn unexpected_status(response: &GatewayResponse, expected: StatusCode) -> String {
    format!(
        "unexpected status {} (expected {})",
        response.status.as_u16(),
        expected.as_u16()
    )
}
