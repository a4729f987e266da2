#![allow(dead_code)]
//! Shared fakes and fixtures for the integration tests.

pub mod mock_sinks;
pub mod mock_ws;
pub mod test_metrics;

use quakewatch::config::Config;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// A configuration suited to in-process tests: ephemeral API port, short
/// reconnect delay, no real sinks.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.server.port = 0;
    config.server.admin_key = "test-admin-key".to_string();
    config.feeds.quake_url = "ws://quake.test/ws".to_string();
    config.feeds.eew_url = "ws://eew.test/ws".to_string();
    config.feeds.reconnect_delay = Duration::from_millis(20);
    config.push.enabled = false;
    config.broadcast.enabled = false;
    config
}

/// Polls `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F)
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    while !condition() {
        if start.elapsed() > timeout {
            panic!("Timed out after {:?} waiting for condition", timeout);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
