//! The operator-controlled banner message shown to every client.

use arc_swap::ArcSwap;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Severity of the admin message, used by clients to pick a style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminMessageKind {
    #[default]
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminMessage {
    pub text: String,
    pub is_visible: bool,
    #[serde(rename = "type")]
    pub kind: AdminMessageKind,
    /// RFC 3339 time of the last update; `None` until first set.
    pub timestamp: Option<String>,
}

/// Holds the single admin message. One authenticated writer, many readers.
#[derive(Debug, Default)]
pub struct AdminBoard {
    current: ArcSwap<AdminMessage>,
}

impl AdminBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the message and stamps it with the current time.
    pub fn set(&self, text: String, is_visible: bool, kind: AdminMessageKind) -> AdminMessage {
        let message = AdminMessage {
            text,
            is_visible,
            kind,
            timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        };
        info!(?message, "Admin message updated");
        self.current.store(Arc::new(message.clone()));
        message
    }

    /// The message as shown to unauthenticated clients: only when it is
    /// visible and has text.
    pub fn public_view(&self) -> Option<AdminMessage> {
        let current = self.current.load();
        (current.is_visible && !current.text.is_empty()).then(|| AdminMessage::clone(&current))
    }

    /// The message regardless of visibility.
    pub fn full(&self) -> AdminMessage {
        AdminMessage::clone(&self.current.load())
    }
}
