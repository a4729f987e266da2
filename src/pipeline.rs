//! Per-frame processing: decode, classify, format, then hand off to the
//! dispatcher without waiting for delivery.

use crate::classifier::{classify, decode_frame};
use crate::core::{ClassifiedEvent, Feed, FrameHandler};
use crate::dispatcher::Dispatcher;
use crate::formatting::format_event;
use crate::internal_metrics::Metrics;
use tracing::{debug, error, info, warn};

pub struct Pipeline {
    dispatcher: Dispatcher,
    title: String,
    metrics: Metrics,
}

impl Pipeline {
    /// `title` is used for every notification this pipeline renders.
    pub fn new(dispatcher: Dispatcher, title: String, metrics: Metrics) -> Self {
        Self {
            dispatcher,
            title,
            metrics,
        }
    }
}

impl FrameHandler for Pipeline {
    fn handle_frame(&self, feed: Feed, text: &str) {
        let frame = match decode_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(%feed, error = %e, "Dropping undecodable frame");
                self.metrics.frames_dropped_total.increment(1);
                return;
            }
        };

        let event = match classify(feed, &frame) {
            Ok(event) => event,
            Err(e) => {
                error!(%feed, error = %e, "Failed to classify frame");
                self.metrics.frames_dropped_total.increment(1);
                return;
            }
        };

        if let ClassifiedEvent::Ignored(reason) = &event {
            debug!(%feed, %reason, "Ignoring frame");
            self.metrics.events_ignored_total.increment(1);
            return;
        }

        if let Some(message) = format_event(&event, &self.title) {
            info!(%feed, kind = message.kind.name(), "Dispatching notification");
            // Delivery runs detached; the feed loop moves on to the next frame.
            drop(self.dispatcher.dispatch(message));
        }
    }
}
