//! Configuration management for quakewatch
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to layer defaults, a `quakewatch.toml` file, environment variables
//! and command-line arguments.

use crate::cli::Cli;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration file read when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "quakewatch.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Upstream feed endpoints and reconnection policy.
    pub feeds: FeedsConfig,
    /// Web push delivery.
    pub push: PushConfig,
    /// Broadcast channel delivery (tsunami advisories only).
    pub broadcast: BroadcastConfig,
    /// The HTTP surface for subscriptions and the admin message.
    pub server: ServerConfig,
    /// Prometheus metrics.
    pub metrics: MetricsConfig,
}

/// Upstream feed endpoints and reconnection policy.
#[serde_as]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FeedsConfig {
    /// WebSocket URL of the general earthquake/tsunami feed.
    pub quake_url: String,
    /// WebSocket URL of the Earthquake Early Warning feed.
    pub eew_url: String,
    /// Fixed delay between a disconnect and the next connection attempt.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "reconnect_delay_ms")]
    pub reconnect_delay: Duration,
    /// Give up after this many consecutive failed connection attempts.
    /// Unset means retry forever.
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,
}

/// Web push delivery.
#[serde_as]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PushConfig {
    pub enabled: bool,
    /// Raw 32-byte P-256 VAPID private key, base64url encoded.
    pub vapid_private_key: String,
    /// Contact URI sent in the VAPID `sub` claim.
    pub vapid_subject: String,
    /// Title shown on every notification.
    pub title: String,
    /// How long the push service should hold an undelivered message.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "ttl_seconds")]
    pub ttl: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "timeout_seconds")]
    pub timeout: Duration,
    /// Upper bound on in-flight deliveries across all dispatches.
    pub max_concurrent_deliveries: usize,
}

/// Broadcast channel delivery.
#[serde_as]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BroadcastConfig {
    pub enabled: bool,
    pub endpoint: String,
    /// Channel access token sent as a bearer credential.
    pub access_token: String,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "timeout_seconds")]
    pub timeout: Duration,
}

/// The HTTP surface for subscriptions and the admin message.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Shared secret required by the admin endpoints. Empty rejects all
    /// admin requests.
    pub admin_key: String,
}

impl ServerConfig {
    pub fn listen_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Prometheus metrics.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `/metrics`.
    pub enabled: bool,
}

impl Config {
    /// Loads the application configuration by layering, lowest priority
    /// first: built-in defaults, the TOML file, `QUAKEWATCH_*` environment
    /// variables (`__` separates sections), `PORT`, and CLI arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        Ok(Self::figment(cli).extract()?)
    }

    /// The layered provider chain behind [`Config::load`].
    pub fn figment(cli: &Cli) -> Figment {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // e.g. QUAKEWATCH_FEEDS__RECONNECT_DELAY_MS=5000
            .merge(Env::prefixed("QUAKEWATCH_").split("__"))
            // Hosting platforms hand the listen port over in PORT.
            .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
            .merge(cli.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            feeds: FeedsConfig {
                quake_url: "wss://api.p2pquake.net/v2/ws".to_string(),
                eew_url: "wss://ws-api.wolfx.jp/jma_eew".to_string(),
                reconnect_delay: Duration::from_millis(1000),
                max_reconnect_attempts: None,
            },
            push: PushConfig {
                enabled: true,
                vapid_private_key: String::new(),
                vapid_subject: "mailto:admin@example.org".to_string(),
                title: crate::core::DEFAULT_TITLE.to_string(),
                ttl: Duration::from_secs(86400),
                timeout: Duration::from_secs(10),
                max_concurrent_deliveries: 32,
            },
            broadcast: BroadcastConfig {
                enabled: false,
                endpoint: "https://api.line.me/v2/bot/message/broadcast".to_string(),
                access_token: String::new(),
                timeout: Duration::from_secs(10),
            },
            server: ServerConfig {
                host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                port: 3000,
                admin_key: String::new(),
            },
            metrics: MetricsConfig::default(),
        }
    }
}
