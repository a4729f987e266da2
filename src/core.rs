//! Core domain types and service traits for quakewatch
//!
//! This module defines the events that flow through the relay pipeline and
//! the trait contracts for the sinks that receive them.

use crate::scales::{Depth, DomesticTsunami, Intensity, Magnitude, TsunamiGrade};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Title used for every push payload unless configured otherwise.
pub const DEFAULT_TITLE: &str = "地震情報";

/// Body of the notification sent by the test endpoint.
pub const TEST_NOTIFICATION_BODY: &str = "これはお試し通知のメッセージです。";

/// One of the two upstream event feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    /// General earthquake and tsunami information (P2PQuake, codes 551/552).
    Quake,
    /// Earthquake Early Warning (JMA EEW relayed by Wolfx).
    Eew,
}

impl Feed {
    pub fn name(&self) -> &'static str {
        match self {
            Feed::Quake => "quake",
            Feed::Eew => "eew",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Classified events
// =============================================================================

/// Result of classifying a single decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedEvent {
    EarthquakeReport(EarthquakeReport),
    TsunamiAdvisory(TsunamiAdvisory),
    EewAlert(EewAlert),
    Ignored(IgnoreReason),
}

impl ClassifiedEvent {
    /// The notification kind this event produces, or `None` for ignored frames.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            ClassifiedEvent::EarthquakeReport(_) => Some(EventKind::EarthquakeReport),
            ClassifiedEvent::TsunamiAdvisory(_) => Some(EventKind::TsunamiAdvisory),
            ClassifiedEvent::EewAlert(_) => Some(EventKind::Eew),
            ClassifiedEvent::Ignored(_) => None,
        }
    }
}

/// Why a frame produced no notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// A quake-feed frame whose `code` this relay does not handle.
    UnhandledCode(i64),
    /// A quake-feed frame without an integer `code`.
    MissingCode,
    /// An EEW-feed frame without both `Title` and `CodeType` (e.g. heartbeats).
    NotAnAlert,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::UnhandledCode(code) => write!(f, "unhandled code {}", code),
            IgnoreReason::MissingCode => f.write_str("missing code"),
            IgnoreReason::NotAnAlert => f.write_str("not an alert"),
        }
    }
}

/// Which earthquake report template applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Intensity-only bulletin (`ScalePrompt`): no hypocenter or magnitude yet.
    ScalePrompt,
    /// Any other issue type: full report with hypocenter details.
    Full,
}

/// An earthquake information report (quake feed, code 551).
#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeReport {
    pub kind: ReportKind,
    /// Origin time as sent upstream, `YYYY/MM/DD HH:MM:SS` (JST).
    pub time: String,
    pub hypocenter: String,
    pub magnitude: Magnitude,
    pub depth: Depth,
    pub max_intensity: Intensity,
    pub domestic_tsunami: DomesticTsunami,
    pub points: Vec<ObservationPoint>,
    pub free_form_comment: Option<String>,
}

/// Intensity observed at a single station.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationPoint {
    pub intensity: Intensity,
    /// Station address, e.g. `千代田区大手町`.
    pub addr: String,
    /// Prefecture the station belongs to.
    pub pref: String,
}

/// A tsunami forecast (quake feed, code 552).
#[derive(Debug, Clone, PartialEq)]
pub struct TsunamiAdvisory {
    pub cancelled: bool,
    pub areas: Vec<TsunamiArea>,
}

impl TsunamiAdvisory {
    /// The grade that selects the header: the first listed area's.
    pub fn headline_grade(&self) -> TsunamiGrade {
        self.areas
            .first()
            .map(|area| area.grade)
            .unwrap_or(TsunamiGrade::Unrecognized)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TsunamiArea {
    pub name: String,
    pub grade: TsunamiGrade,
    /// Human readable maximum height, e.g. `１ｍ`.
    pub max_height: String,
}

/// An Earthquake Early Warning bulletin. Template fields are kept as the
/// display text they will be rendered with.
#[derive(Debug, Clone, PartialEq)]
pub struct EewAlert {
    pub title: String,
    pub code_type: String,
    pub cancelled: bool,
    /// Set when the estimate is based on a low-quality assumption.
    pub assumption: bool,
    pub serial: String,
    pub hypocenter: String,
    pub origin_time: String,
    pub max_intensity: String,
    pub magnitude: String,
    pub depth: String,
}

// =============================================================================
// Notifications
// =============================================================================

/// The kind of event a notification was rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    EarthquakeReport,
    TsunamiAdvisory,
    Eew,
    Test,
}

impl EventKind {
    /// Only tsunami advisories are sent to the broadcast channel.
    pub fn broadcasts(&self) -> bool {
        matches!(self, EventKind::TsunamiAdvisory)
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::EarthquakeReport => "earthquake_report",
            EventKind::TsunamiAdvisory => "tsunami_advisory",
            EventKind::Eew => "eew",
            EventKind::Test => "test",
        }
    }
}

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub kind: EventKind,
    pub title: String,
    pub body: String,
}

impl NotificationMessage {
    pub fn new(kind: EventKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
        }
    }

    /// The fixed message sent by the test endpoint.
    pub fn test(title: impl Into<String>) -> Self {
        Self::new(EventKind::Test, title, TEST_NOTIFICATION_BODY)
    }

    /// The JSON payload delivered to push subscribers.
    pub fn push_payload(&self) -> PushPayload<'_> {
        PushPayload {
            title: &self.title,
            body: &self.body,
        }
    }
}

/// Wire format of a push notification, read by the service worker.
#[derive(Debug, Serialize)]
pub struct PushPayload<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

// =============================================================================
// Subscriptions
// =============================================================================

/// A browser push subscription as produced by `PushManager.subscribe()`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    /// Push service endpoint URL.
    pub endpoint: String,
    /// Expiry as a DOMHighResTimeStamp; kept as sent, since browsers may
    /// report fractional milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<serde_json::Value>,
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionKeys {
    /// Browser's P-256 ECDH public key (base64url).
    pub p256dh: String,
    /// Shared auth secret (base64url).
    pub auth: String,
}

// =============================================================================
// Service Traits
// =============================================================================

/// Delivers a payload to a single push subscriber.
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Sends `payload` to `subscription`.
    ///
    /// # Returns
    /// * `Ok(())` if the push service accepted the message
    /// * `Err` on any transport failure or non-success status
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<()>;
}

/// Sends text to every follower of an external messaging channel.
#[async_trait]
pub trait BroadcastSink: Send + Sync {
    /// A short name used in logs and metrics, e.g. `"line"`.
    fn name(&self) -> &str;

    async fn broadcast(&self, text: &str) -> Result<()>;
}

/// Consumes text frames read from a feed connection.
///
/// Called synchronously from the feed loop, once per frame and in arrival
/// order; implementations must not block on delivery.
pub trait FrameHandler: Send + Sync {
    fn handle_frame(&self, feed: Feed, text: &str);
}
