use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::domains::address::{Destination, SubscriptionTarget};
use crate::domains::envelope::NodeId;
use crate::error::Result;
use crate::interfaces::handler::MessageHandler;
use crate::interfaces::transport::HttpTransport;
use crate::services::dedup::DedupCache;
use crate::services::delivery::DeliveryCore;
use crate::services::gateway::GatewayClient;
use crate::services::poller::{PollDispatcher, PollHandle};
use crate::services::push::PushIngester;
use crate::services::transport::ReqwestTransport;

pub struct QimbClient {
    gateway: Arc<GatewayClient>,
    dedup: Arc<DedupCache>,
    poll_interval: Duration,
}

impl QimbClient {
    pub fn setup(endpoint: &str) -> Result<Self> {
        Self::from_config(ClientConfig::new(endpoint))
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.connect_timeout(), config.request_timeout())?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn from_config_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = ClientConfig::from_file(path)?;
        Self::from_config(config)
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config.validate()?;
        let gateway = GatewayClient::new(&config.endpoint, NodeId::generate(), transport)?;
        Ok(Self {
            gateway: Arc::new(gateway),
            dedup: Arc::new(DedupCache::with_policy(config.eviction_policy())),
            poll_interval: config.poll_interval(),
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.gateway.node_id()
    }

    pub fn gateway(&self) -> &Arc<GatewayClient> {
        &self.gateway
    }

    pub fn dedup(&self) -> &Arc<DedupCache> {
        &self.dedup
    }

    /// Publishes to every subscriber of `message_type`; returns the message id.
    pub async fn publish(&self, message_type: &str, message: &str) -> Result<String> {
        self.gateway
            .publish(&Destination::Type(message_type.to_string()), message)
            .await
    }

    /// Publishes straight to one node, e.g. a reply to `Envelope::sender_node_id`.
    pub async fn publish_direct(&self, node_id: &str, message: &str) -> Result<String> {
        self.gateway
            .publish(&Destination::Node(node_id.to_string()), message)
            .await
    }

    pub async fn subscribe(&self, message_type: &str, push_endpoint: Option<&str>) -> Result<()> {
        self.gateway
            .subscribe(
                &SubscriptionTarget::Type(message_type.to_string()),
                push_endpoint,
            )
            .await
    }

    pub async fn subscribe_direct(&self, push_endpoint: Option<&str>) -> Result<()> {
        self.gateway
            .subscribe(&SubscriptionTarget::Node, push_endpoint)
            .await
    }

    pub async fn delete_message(&self, receipt_handle: &str) -> Result<()> {
        self.gateway.delete(receipt_handle).await
    }

    pub fn poll_dispatcher(&self, handler: Arc<dyn MessageHandler>) -> PollDispatcher {
        PollDispatcher::new(
            self.gateway.clone(),
            DeliveryCore::new(self.dedup.clone(), handler),
            self.poll_interval,
        )
    }

    /// Starts polling in the background. Keep the handle: dropping it stops
    /// the loop.
    pub fn begin_receive(&self, handler: Arc<dyn MessageHandler>) -> PollHandle {
        self.poll_dispatcher(handler).spawn()
    }

    /// Builds the push-side entry point, sharing this client's dedup cache
    /// with the poll loop.
    pub fn push_ingester(&self, handler: Arc<dyn MessageHandler>) -> PushIngester {
        PushIngester::new(
            DeliveryCore::new(self.dedup.clone(), handler),
            self.gateway.transport(),
        )
    }
}
