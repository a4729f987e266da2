//! The process-wide set of push subscribers.

use crate::core::PushSubscription;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::{info, warn};

/// Append-only store of push subscriptions.
///
/// Readers take an immutable snapshot, so a dispatch iterating subscribers
/// never observes a half-applied registration. Subscriptions are never
/// removed; registering the same endpoint twice keeps both entries.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscriptions: ArcSwap<Vec<PushSubscription>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a subscription.
    pub fn register(&self, subscription: PushSubscription) {
        let snapshot = self.subscriptions.load();
        if snapshot.iter().any(|s| s.endpoint == subscription.endpoint) {
            // Duplicates are kept and will receive every notification twice.
            warn!(
                endpoint = %subscription.endpoint,
                "Registering an endpoint that is already subscribed"
            );
        }
        drop(snapshot);

        self.subscriptions.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(subscription.clone());
            next
        });
        info!(total = self.len(), "Push subscription registered");
    }

    /// The subscriptions registered so far.
    pub fn snapshot(&self) -> Arc<Vec<PushSubscription>> {
        self.subscriptions.load_full()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
