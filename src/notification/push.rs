//! Web Push delivery (RFC 8030) with VAPID authentication (RFC 8292).
//!
//! The `web-push` crate encrypts the payload (RFC 8291, `aes128gcm`) and
//! signs the VAPID JWT; the request itself goes out through a shared
//! `reqwest::Client`.

use crate::config::PushConfig;
use crate::core::{PushSender, PushSubscription};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};
use web_push::{ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushMessageBuilder};

/// Sends encrypted push messages to browser subscriptions.
pub struct WebPushSender {
    client: reqwest::Client,
    vapid_private_key: String,
    subject: String,
    ttl: u32,
}

impl WebPushSender {
    /// Creates a sender from the push configuration.
    pub fn new(config: &PushConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build push HTTP client")?;
        Ok(Self {
            client,
            vapid_private_key: config.vapid_private_key.clone(),
            subject: config.vapid_subject.clone(),
            ttl: ttl_seconds(config.ttl),
        })
    }
}

fn ttl_seconds(ttl: Duration) -> u32 {
    u32::try_from(ttl.as_secs()).unwrap_or(u32::MAX)
}

#[async_trait]
impl PushSender for WebPushSender {
    #[instrument(skip_all, fields(endpoint = %subscription.endpoint))]
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<()> {
        let sub_info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        );

        let mut sig_builder = VapidSignatureBuilder::from_base64(&self.vapid_private_key, &sub_info)
            .context("Failed to build VAPID signature")?;
        sig_builder.add_claim("sub", self.subject.as_str());
        let signature = sig_builder.build().context("Failed to sign VAPID JWT")?;

        let mut builder = WebPushMessageBuilder::new(&sub_info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        builder.set_ttl(self.ttl);
        let message = builder.build().context("Failed to build web push message")?;

        let mut request = self
            .client
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string());

        if let Some(urgency) = message.urgency {
            request = request.header("Urgency", urgency.to_string());
        }
        if let Some(topic) = message.topic {
            request = request.header("Topic", topic);
        }
        if let Some(push_payload) = message.payload {
            request = request
                .header("Content-Encoding", push_payload.content_encoding.to_str())
                .header("Content-Type", "application/octet-stream");
            for (key, value) in &push_payload.crypto_headers {
                request = request.header(*key, value.as_str());
            }
            request = request.body(push_payload.content);
        }

        let response = request.send().await.context("Web push HTTP request failed")?;
        let status = response.status();

        if status.is_success() {
            debug!(%status, "Push message accepted");
            return Ok(());
        }
        if status == reqwest::StatusCode::GONE {
            anyhow::bail!("Subscription expired (HTTP {})", status);
        }
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Web push send failed (HTTP {}): {}", status, body)
    }
}
