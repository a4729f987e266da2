//! Fans a rendered notification out to every push subscriber and, for
//! tsunami advisories, to the broadcast channel.

use crate::core::{BroadcastSink, NotificationMessage, PushSender};
use crate::internal_metrics::Metrics;
use crate::registry::SubscriberRegistry;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

/// Outcome of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Subscribers whose push service accepted the message.
    pub delivered: usize,
    /// Endpoints that failed, in completion order.
    pub failed: Vec<String>,
    /// `None` when the message was not broadcast; otherwise whether the
    /// broadcast succeeded.
    pub broadcast: Option<bool>,
}

/// Delivers notifications. Cheap to clone; every clone shares the registry,
/// the sinks and the concurrency limit.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<SubscriberRegistry>,
    push: Option<Arc<dyn PushSender>>,
    broadcast: Option<Arc<dyn BroadcastSink>>,
    limiter: Arc<Semaphore>,
    metrics: Metrics,
}

impl Dispatcher {
    /// Creates a dispatcher.
    ///
    /// # Arguments
    /// * `registry` - Source of push subscriptions, read once per dispatch
    /// * `push` - Push sink; `None` disables push delivery
    /// * `broadcast` - Broadcast sink; `None` disables broadcasting
    /// * `max_concurrent_deliveries` - In-flight push requests across all dispatches
    pub fn new(
        registry: Arc<SubscriberRegistry>,
        push: Option<Arc<dyn PushSender>>,
        broadcast: Option<Arc<dyn BroadcastSink>>,
        max_concurrent_deliveries: usize,
        metrics: Metrics,
    ) -> Self {
        Self {
            registry,
            push,
            broadcast,
            limiter: Arc::new(Semaphore::new(max_concurrent_deliveries.max(1))),
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Starts delivery in a detached task and returns immediately.
    ///
    /// Callers on the feed path drop the handle; tests await it for the
    /// [`DispatchReport`].
    pub fn dispatch(&self, message: NotificationMessage) -> JoinHandle<DispatchReport> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.deliver(message).await })
    }

    /// Delivers `message` to every sink and waits for all deliveries.
    #[instrument(skip_all, fields(kind = message.kind.name()))]
    pub async fn deliver(&self, message: NotificationMessage) -> DispatchReport {
        self.metrics.notifications_dispatched_total.increment(1);

        let broadcast = async {
            match &self.broadcast {
                Some(sink) if message.kind.broadcasts() => Some(self.broadcast_to(sink, &message.body).await),
                _ => None,
            }
        };
        let (mut report, broadcast) = tokio::join!(self.push_to_all(&message), broadcast);
        report.broadcast = broadcast;

        info!(
            delivered = report.delivered,
            failed = report.failed.len(),
            broadcast = ?report.broadcast,
            "Dispatch finished"
        );
        report
    }

    async fn push_to_all(&self, message: &NotificationMessage) -> DispatchReport {
        let mut report = DispatchReport::default();

        let Some(sender) = &self.push else {
            debug!("Push delivery disabled");
            return report;
        };

        let payload: Arc<[u8]> = match serde_json::to_vec(&message.push_payload()) {
            Ok(bytes) => bytes.into(),
            Err(e) => {
                error!(error = %e, "Failed to serialize push payload");
                return report;
            }
        };

        let subscriptions = self.registry.snapshot();
        debug!(subscribers = subscriptions.len(), "Pushing to subscribers");

        let mut deliveries = JoinSet::new();
        for subscription in subscriptions.iter().cloned() {
            let Ok(permit) = Arc::clone(&self.limiter).acquire_owned().await else {
                break;
            };
            let sender = Arc::clone(sender);
            let payload = Arc::clone(&payload);
            deliveries.spawn(async move {
                let result = sender.send(&subscription, &payload).await;
                drop(permit);
                (subscription.endpoint, result)
            });
        }

        while let Some(joined) = deliveries.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {
                    self.metrics.push_deliveries_total.increment(1);
                    report.delivered += 1;
                }
                Ok((endpoint, Err(e))) => {
                    warn!(%endpoint, error = %e, "Push delivery failed");
                    self.metrics.push_failures_total.increment(1);
                    report.failed.push(endpoint);
                }
                Err(e) => {
                    error!(error = %e, "Push delivery task panicked");
                    self.metrics.push_failures_total.increment(1);
                }
            }
        }

        report
    }

    async fn broadcast_to(&self, sink: &Arc<dyn BroadcastSink>, text: &str) -> bool {
        match sink.broadcast(text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(sink = sink.name(), error = %e, "Broadcast failed");
                self.metrics.broadcast_failures_total.increment(1);
                false
            }
        }
    }
}
