//! Live tests against the real upstream feeds.
//!
//! Run with `--features live-tests`; they need outbound network access.

use quakewatch::config::Config;
use quakewatch::core::{Feed, FrameHandler};
use quakewatch::internal_metrics::Metrics;
use quakewatch::network::{ConnectionState, FeedClient, ReconnectPolicy, TungsteniteConnector};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

struct PrintingHandler;

impl FrameHandler for PrintingHandler {
    fn handle_frame(&self, feed: Feed, text: &str) {
        println!("[{}] {}", feed, text);
    }
}

async fn assert_connects(feed: Feed, url: String) {
    let client = FeedClient::new(
        feed,
        url,
        ReconnectPolicy::default(),
        Arc::new(PrintingHandler),
        Metrics::disabled(),
    );
    let mut state = client.state();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(async move { client.run(Arc::new(TungsteniteConnector), shutdown_rx).await });

    tokio::time::timeout(
        Duration::from_secs(15),
        state.wait_for(|s| *s == ConnectionState::Connected),
    )
    .await
    .expect("timed out connecting")
    .expect("state channel closed");

    shutdown_tx.send(true).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_live_quake_feed_connects() {
    assert_connects(Feed::Quake, Config::default().feeds.quake_url).await;
}

#[tokio::test]
async fn test_live_eew_feed_connects() {
    assert_connects(Feed::Eew, Config::default().feeds.eew_url).await;
}
