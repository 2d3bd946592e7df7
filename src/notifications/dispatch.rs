//! Best-effort push delivery
//!
//! Delivery goes through the [`PushSender`] trait so the scheduler can be
//! exercised without a network. The production sender POSTs to a push
//! gateway; a failed endpoint never affects its siblings.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Push delivery error for a single endpoint.
#[derive(Debug, thiserror::Error)]
#[error("Push delivery failed: {0}")]
pub struct DispatchError(pub String);

/// Delivers one message to one push endpoint.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, endpoint: &str, title: &str, body: &str) -> Result<(), DispatchError>;
}

/// Push sender backed by an FCM-style HTTP gateway.
pub struct HttpPushSender {
    gateway_url: String,
    server_key: Option<String>,
    client: Client,
}

impl HttpPushSender {
    pub fn new(gateway_url: String, server_key: Option<String>) -> Self {
        Self {
            gateway_url,
            server_key,
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

#[async_trait]
impl PushSender for HttpPushSender {
    async fn send(&self, endpoint: &str, title: &str, body: &str) -> Result<(), DispatchError> {
        let payload = json!({
            "to": endpoint,
            "notification": {
                "title": title,
                "body": body,
            }
        });

        let mut request = self.client.post(&self.gateway_url).json(&payload);
        if let Some(key) = &self.server_key {
            request = request.header("Authorization", format!("key={}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| DispatchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DispatchError(format!(
                "Push gateway returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
