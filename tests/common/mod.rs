#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::{Method, StatusCode};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use qimb_client::config::ClientConfig;
use qimb_client::error::{QimbError, Result};
use qimb_client::interfaces::handler::MessageHandler;
use qimb_client::interfaces::transport::{GatewayRequest, GatewayResponse, HttpTransport};
use qimb_client::{Envelope, QimbClient};

pub const ENDPOINT: &str = "http://gateway.test/api";

pub enum Step {
    Respond(StatusCode, String),
    Fail(String),
}

/// In-process gateway: scripted poll responses, configurable delete results
/// (including panics), and a log of every request it saw.
pub struct ScriptedTransport {
    receive_script: Mutex<VecDeque<Step>>,
    failing_handles: Mutex<HashSet<String>>,
    panicking_handles: Mutex<HashSet<String>>,
    requests: Mutex<Vec<GatewayRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            receive_script: Mutex::new(VecDeque::new()),
            failing_handles: Mutex::new(HashSet::new()),
            panicking_handles: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn push_receive(&self, step: Step) {
        self.receive_script.lock().await.push_back(step);
    }

    pub async fn push_batch(&self, records: Value) {
        self.push_receive(Step::Respond(StatusCode::OK, records.to_string()))
            .await;
    }

    pub async fn fail_delete(&self, handle: &str) {
        self.failing_handles.lock().await.insert(handle.to_string());
    }

    pub async fn panic_on_delete(&self, handle: &str) {
        self.panicking_handles.lock().await.insert(handle.to_string());
    }

    pub async fn requests(&self) -> Vec<GatewayRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn count(&self, method: Method, path_fragment: &str) -> usize {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|req| req.method == method && req.url.contains(path_fragment))
            .count()
    }

    pub async fn receive_calls(&self) -> usize {
        self.count(Method::GET, "message/receive").await
    }

    pub async fn delete_calls(&self) -> usize {
        self.count(Method::DELETE, "message/delete/").await
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: GatewayRequest) -> Result<GatewayResponse> {
        self.requests.lock().await.push(request.clone());
        if request.method == Method::GET && request.url.ends_with("message/receive") {
            return match self.receive_script.lock().await.pop_front() {
                Some(Step::Respond(status, body)) => Ok(GatewayResponse::new(status, body)),
                Some(Step::Fail(reason)) => Err(QimbError::Http(reason)),
                None => Ok(GatewayResponse::new(StatusCode::OK, "[]")),
            };
        }
        if request.method == Method::DELETE {
            let handle = request.url.rsplit('/').next().unwrap_or_default().to_string();
            if self.panicking_handles.lock().await.contains(&handle) {
                panic!("transport exploded deleting {handle}");
            }
            if self.failing_handles.lock().await.contains(&handle) {
                return Ok(GatewayResponse::new(StatusCode::INTERNAL_SERVER_ERROR, ""));
            }
            return Ok(GatewayResponse::new(StatusCode::OK, ""));
        }
        if request.method == Method::PUT && request.url.contains("message/publish/") {
            return Ok(GatewayResponse::new(StatusCode::CREATED, ""));
        }
        Ok(GatewayResponse::new(StatusCode::OK, ""))
    }
}

/// Records every envelope it is handed; can be told to fail or panic on a
/// given message body.
pub struct RecordingHandler {
    envelopes: Mutex<Vec<Envelope>>,
    fail_on: Option<String>,
    panic_on: Option<String>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self {
            envelopes: Mutex::new(Vec::new()),
            fail_on: None,
            panic_on: None,
        }
    }

    pub fn failing_on(message: &str) -> Self {
        Self {
            fail_on: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn panicking_on(message: &str) -> Self {
        Self {
            panic_on: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub async fn envelopes(&self) -> Vec<Envelope> {
        self.envelopes.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.envelopes.lock().await.len()
    }

    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .envelopes
            .lock()
            .await
            .iter()
            .map(|envelope| envelope.message_id().to_string())
            .collect();
        ids.sort();
        ids
    }

    pub async fn wait_for(&self, expected: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.count().await >= expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.count().await >= expected
    }
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn handle(&self, envelope: Envelope) -> Result<()> {
        let message = envelope.message().to_string();
        self.envelopes.lock().await.push(envelope);
        if self.panic_on.as_deref() == Some(message.as_str()) {
            panic!("handler exploded on {message}");
        }
        if self.fail_on.as_deref() == Some(message.as_str()) {
            return Err(QimbError::Runtime(format!("rejected {message}")));
        }
        Ok(())
    }
}

pub fn record(id: &str, message: &str, handle: Option<&str>) -> Value {
    let mut value = json!({
        "messageId": id,
        "message": message,
        "messageType": "orders",
        "senderNodeId": "node-b",
    });
    if let Some(handle) = handle {
        value["receiptHandle"] = json!(handle);
    }
    value
}

pub fn notification(id: &str, message: &str) -> String {
    let inner = json!({"messageId": id, "message": message, "senderNodeId": "node-b"});
    json!({"Type": "Notification", "Message": inner.to_string()}).to_string()
}

pub fn client_with(transport: Arc<ScriptedTransport>, poll_interval_ms: u64) -> QimbClient {
    let mut config = ClientConfig::new(ENDPOINT);
    config.poll_interval_ms = Some(poll_interval_ms);
    QimbClient::with_transport(config, transport).unwrap()
}
