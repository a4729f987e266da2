//! quakewatch - real-time seismic alert relay.

use anyhow::Result;
use clap::Parser;
use quakewatch::{app::App, cli::Cli, config::Config};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing_subscriber::fmt().init();
            error!("Failed to load configuration: {:#}", err);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("quakewatch starting up...");

    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Quake Feed: {}", config.feeds.quake_url);
    info!("EEW Feed: {}", config.feeds.eew_url);
    info!("Reconnect Delay: {:?}", config.feeds.reconnect_delay);
    match config.feeds.max_reconnect_attempts {
        Some(max) => info!("Max Reconnect Attempts: {}", max),
        None => info!("Max Reconnect Attempts: unlimited"),
    }
    info!(
        "Push: {} (concurrency {})",
        enabled_label(config.push.enabled && !config.push.vapid_private_key.is_empty()),
        config.push.max_concurrent_deliveries
    );
    info!(
        "LINE Broadcast: {}",
        enabled_label(config.broadcast.enabled && !config.broadcast.access_token.is_empty())
    );
    info!("API Server: {}", config.server.listen_address());
    info!(
        "Admin API: {}",
        enabled_label(!config.server.admin_key.is_empty())
    );
    info!("Metrics: {}", enabled_label(config.metrics.enabled));
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config).build(shutdown_rx).await?;

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down..."),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        let _ = shutdown_tx.send(true);
    });

    app.run().await?;
    info!("All tasks shut down. Exiting.");
    Ok(())
}

fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        "Enabled"
    } else {
        "Disabled"
    }
}
