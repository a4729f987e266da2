//! # Internal Metrics Module
//!
//! Counters and gauges for the relay pipeline, recorded through the
//! `metrics` facade.
//!
//! ## Components:
//!
//! - **`Metrics`**: A cloneable handle holding pre-registered counters for
//!   each pipeline outcome, plus helpers for labeled per-feed series.
//!
//! - **`MetricsBuilder`**: Installs the Prometheus recorder when metrics are
//!   enabled and returns the handle used by the API server to render
//!   `/metrics`.

use crate::config::MetricsConfig;
use crate::core::Feed;
use log::error;
use metrics::{Counter, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// The public API for the metrics system.
#[derive(Clone)]
pub struct Metrics {
    pub frames_received_total: Counter,
    pub frames_dropped_total: Counter,
    pub events_ignored_total: Counter,
    pub notifications_dispatched_total: Counter,
    pub push_deliveries_total: Counter,
    pub push_failures_total: Counter,
    pub broadcast_failures_total: Counter,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Creates a new `Metrics` instance and registers descriptions for all
    /// supported metrics with the current recorder.
    pub fn new() -> Self {
        metrics::describe_counter!("frames_received_total", Unit::Count, "Total number of text frames read from either feed.");
        metrics::describe_counter!("frames_dropped_total", Unit::Count, "Frames dropped because they could not be decoded or classified.");
        metrics::describe_counter!("events_ignored_total", Unit::Count, "Frames that classified as an event this relay does not forward.");
        metrics::describe_counter!("notifications_dispatched_total", Unit::Count, "Notifications handed to the dispatcher.");
        metrics::describe_counter!("push_deliveries_total", Unit::Count, "Push messages accepted by a push service.");
        metrics::describe_counter!("push_failures_total", Unit::Count, "Push messages that failed to deliver.");
        metrics::describe_counter!("broadcast_failures_total", Unit::Count, "Broadcast sends that failed.");
        metrics::describe_gauge!("feed_connection_status", Unit::Count, "Connection status of each feed (1 for connected, 0 for disconnected).");
        metrics::describe_counter!("feed_disconnects_total", Unit::Count, "Total number of times a feed connection ended.");

        Self {
            frames_received_total: metrics::counter!("frames_received_total"),
            frames_dropped_total: metrics::counter!("frames_dropped_total"),
            events_ignored_total: metrics::counter!("events_ignored_total"),
            notifications_dispatched_total: metrics::counter!("notifications_dispatched_total"),
            push_deliveries_total: metrics::counter!("push_deliveries_total"),
            push_failures_total: metrics::counter!("push_failures_total"),
            broadcast_failures_total: metrics::counter!("broadcast_failures_total"),
        }
    }

    /// Creates a `Metrics` instance whose counters go nowhere.
    pub fn disabled() -> Self {
        Self {
            frames_received_total: Counter::noop(),
            frames_dropped_total: Counter::noop(),
            events_ignored_total: Counter::noop(),
            notifications_dispatched_total: Counter::noop(),
            push_deliveries_total: Counter::noop(),
            push_failures_total: Counter::noop(),
            broadcast_failures_total: Counter::noop(),
        }
    }

    /// Sets the gauge for a feed's connection status.
    pub fn set_feed_connection_status(&self, feed: Feed, connected: bool) {
        metrics::gauge!("feed_connection_status", "feed" => feed.name())
            .set(if connected { 1.0 } else { 0.0 });
    }

    /// Increments the counter for feed disconnects.
    pub fn increment_feed_disconnects(&self, feed: Feed) {
        metrics::counter!("feed_disconnects_total", "feed" => feed.name()).increment(1);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for the metrics system.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Installs the Prometheus recorder and returns the `Metrics` handle
    /// together with the handle used to render the exposition text.
    ///
    /// If metrics are disabled, or the recorder cannot be installed, this
    /// returns a disabled `Metrics` instance and `None`.
    pub fn build(self) -> (Metrics, Option<PrometheusHandle>) {
        if !self.config.enabled {
            return (Metrics::disabled(), None);
        }

        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        if let Err(e) = metrics::set_global_recorder(recorder) {
            error!("Failed to install Prometheus recorder: {}", e);
            return (Metrics::disabled(), None);
        }

        (Metrics::new(), Some(handle))
    }
}
