use std::time::Duration;

use async_trait::async_trait;

use crate::error::{QimbError, Result};
use crate::interfaces::transport::{GatewayRequest, GatewayResponse, HttpTransport};

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| QimbError::Runtime(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: GatewayRequest) -> Result<GatewayResponse> {
        let GatewayRequest {
            method,
            url,
            headers,
            body,
        } = request;
        let mut builder = self.client.request(method, url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        if !body.is_empty() {
            builder = builder.body(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|e: reqwest::Error| QimbError::Http(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e: reqwest::Error| QimbError::Http(e.to_string()))?;
        Ok(GatewayResponse { status, body })
    }
}
