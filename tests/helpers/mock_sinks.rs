//! Recording push and broadcast sinks.
use anyhow::Result;
use async_trait::async_trait;
use quakewatch::core::{BroadcastSink, PushSender, PushSubscription, SubscriptionKeys};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Mutex;

pub fn subscription(endpoint: &str) -> PushSubscription {
    PushSubscription {
        endpoint: endpoint.to_string(),
        expiration_time: None,
        keys: SubscriptionKeys {
            p256dh: "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA_0QTpQtUbVlUls0VJXg7A8u-Ts1XbjhazAkj7I99e8QcYP7DkM".to_string(),
            auth: "tBHItJI5svbpez7KI4CCXg".to_string(),
        },
    }
}

/// Records every payload; fails for the endpoints it was told to.
#[derive(Debug, Default)]
pub struct RecordingPushSender {
    failing: HashSet<String>,
    sent: Mutex<Vec<(String, Value)>>,
}

impl RecordingPushSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(endpoints: &[&str]) -> Self {
        Self {
            failing: endpoints.iter().map(|e| e.to_string()).collect(),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Successfully delivered `(endpoint, payload)` pairs.
    pub fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .map(|(_, payload)| payload["body"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

#[async_trait]
impl PushSender for RecordingPushSender {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<()> {
        if self.failing.contains(&subscription.endpoint) {
            anyhow::bail!("push service rejected {}", subscription.endpoint);
        }
        let payload: Value = serde_json::from_slice(payload)?;
        self.sent
            .lock()
            .unwrap()
            .push((subscription.endpoint.clone(), payload));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingBroadcast {
    fail: bool,
    attempts: Mutex<Vec<String>>,
}

impl RecordingBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Every text passed to `broadcast`, successful or not.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl BroadcastSink for RecordingBroadcast {
    fn name(&self) -> &str {
        "recording"
    }

    async fn broadcast(&self, text: &str) -> Result<()> {
        self.attempts.lock().unwrap().push(text.to_string());
        if self.fail {
            anyhow::bail!("broadcast channel unavailable");
        }
        Ok(())
    }
}
