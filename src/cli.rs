//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged, with the
//! highest priority, over the configuration file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Relays real-time earthquake, tsunami and EEW alerts to push subscribers.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Port for the HTTP server.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// WebSocket URL of the earthquake/tsunami feed.
    #[arg(long, value_name = "URL")]
    pub quake_url: Option<String>,

    /// WebSocket URL of the Earthquake Early Warning feed.
    #[arg(long, value_name = "URL")]
    pub eew_url: Option<String>,

    /// Delay between reconnection attempts in milliseconds.
    #[arg(long, value_name = "MS")]
    pub reconnect_delay_ms: Option<u64>,

    /// Enable the Prometheus `/metrics` endpoint.
    #[arg(long)]
    pub metrics: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut feeds = Dict::new();
        if let Some(url) = &self.quake_url {
            feeds.insert("quake_url".into(), Value::from(url.clone()));
        }
        if let Some(url) = &self.eew_url {
            feeds.insert("eew_url".into(), Value::from(url.clone()));
        }
        if let Some(delay) = self.reconnect_delay_ms {
            feeds.insert("reconnect_delay_ms".into(), Value::from(delay));
        }
        if !feeds.is_empty() {
            dict.insert("feeds".into(), Value::from(feeds));
        }

        if let Some(port) = self.port {
            let mut server = Dict::new();
            server.insert("port".into(), Value::from(port));
            dict.insert("server".into(), Value::from(server));
        }

        // A bare flag can only turn metrics on; absence leaves the file's value.
        if self.metrics {
            let mut metrics = Dict::new();
            metrics.insert("enabled".into(), Value::from(true));
            dict.insert("metrics".into(), Value::from(metrics));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
