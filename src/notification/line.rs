//! A client for the LINE Messaging API broadcast endpoint.

use crate::config::BroadcastConfig;
use crate::core::BroadcastSink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::{info, instrument};

/// Sends a text message to every follower of a LINE official account.
pub struct LineBroadcastClient {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl LineBroadcastClient {
    /// Creates a new `LineBroadcastClient`.
    pub fn new(config: &BroadcastConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build broadcast HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            access_token: config.access_token.clone(),
        })
    }
}

#[async_trait]
impl BroadcastSink for LineBroadcastClient {
    fn name(&self) -> &str {
        "line"
    }

    #[instrument(skip_all, fields(len = text.len()))]
    async fn broadcast(&self, text: &str) -> Result<()> {
        let payload = json!({ "messages": [{ "type": "text", "text": text }] });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await
            .context("HTTP request to LINE failed")?;

        let status = response.status();
        if status.is_success() {
            info!("Broadcast sent to LINE.");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Failed to send LINE broadcast: status {}, body: {}", status, body)
    }
}
