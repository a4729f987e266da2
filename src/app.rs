//! The main application logic, decoupled from the entry point.

use crate::{
    admin::AdminBoard,
    config::Config,
    core::{BroadcastSink, Feed, FrameHandler, PushSender},
    dispatcher::Dispatcher,
    internal_metrics::{Metrics, MetricsBuilder},
    network::{ConnectionState, Connector, FeedClient, ReconnectPolicy, TungsteniteConnector},
    notification::{line::LineBroadcastClient, push::WebPushSender},
    pipeline::Pipeline,
    registry::SubscriberRegistry,
    server::{ApiServer, ApiState},
    task_manager::TaskManager,
};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// A handle to the running application.
pub struct App {
    task_manager: TaskManager,
    api_addr: SocketAddr,
    dispatcher: Dispatcher,
    admin: Arc<AdminBoard>,
    quake_state: watch::Receiver<ConnectionState>,
    eew_state: watch::Receiver<ConnectionState>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the API server is listening on.
    pub fn api_addr(&self) -> SocketAddr {
        self.api_addr
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        self.dispatcher.registry()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn admin(&self) -> &Arc<AdminBoard> {
        &self.admin
    }

    /// Watches the connection state of one feed.
    pub fn feed_state(&self, feed: Feed) -> watch::Receiver<ConnectionState> {
        match feed {
            Feed::Quake => self.quake_state.clone(),
            Feed::Eew => self.eew_state.clone(),
        }
    }

    /// Waits for the shutdown signal and then gracefully shuts down all tasks.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.get_shutdown_rx();
        if !*shutdown_rx.borrow_and_update() {
            shutdown_rx.changed().await.ok();
        }
        info!("Shutdown signal received. Waiting for tasks to complete...");

        self.task_manager.shutdown().await;
        Ok(())
    }
}

/// Builder for the main application.
///
/// Separates constructing components from running them, and lets tests
/// swap the transport and the delivery sinks.
pub struct AppBuilder {
    config: Config,
    connector_override: Option<Arc<dyn Connector>>,
    push_sender_override: Option<Arc<dyn PushSender>>,
    broadcast_override: Option<Arc<dyn BroadcastSink>>,
    metrics_override: Option<Metrics>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            connector_override: None,
            push_sender_override: None,
            broadcast_override: None,
            metrics_override: None,
        }
    }

    /// Overrides how feed connections are opened.
    pub fn connector_override(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector_override = Some(connector);
        self
    }

    /// Overrides the push sink. The VAPID key is not required when set.
    pub fn push_sender_override(mut self, sender: Arc<dyn PushSender>) -> Self {
        self.push_sender_override = Some(sender);
        self
    }

    /// Overrides the broadcast sink. The access token is not required when set.
    pub fn broadcast_override(mut self, sink: Arc<dyn BroadcastSink>) -> Self {
        self.broadcast_override = Some(sink);
        self
    }

    /// Overrides the metrics system for testing.
    pub fn metrics_override(mut self, metrics: Metrics) -> Self {
        self.metrics_override = Some(metrics);
        self
    }

    /// Builds every component, spawns the feed loops and the API server,
    /// and returns a runnable `App`.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        let task_manager = TaskManager::new(shutdown_rx);

        // =========================================================================
        // 1. Metrics
        // =========================================================================
        let (metrics, prom_handle) = match self.metrics_override {
            Some(m) => (m, None),
            None => MetricsBuilder::new(config.metrics.clone()).build(),
        };

        // =========================================================================
        // 2. Delivery sinks
        // =========================================================================
        let push: Option<Arc<dyn PushSender>> = match self.push_sender_override {
            Some(sender) => Some(sender),
            None if !config.push.enabled => {
                info!("Push delivery disabled by configuration");
                None
            }
            None if config.push.vapid_private_key.is_empty() => {
                warn!("No VAPID private key configured; push delivery disabled");
                None
            }
            None => Some(Arc::new(WebPushSender::new(&config.push)?)),
        };

        let broadcast: Option<Arc<dyn BroadcastSink>> = match self.broadcast_override {
            Some(sink) => Some(sink),
            None if !config.broadcast.enabled => None,
            None if config.broadcast.access_token.is_empty() => {
                warn!("No broadcast access token configured; broadcast disabled");
                None
            }
            None => Some(Arc::new(LineBroadcastClient::new(&config.broadcast)?)),
        };

        // =========================================================================
        // 3. Pipeline
        // =========================================================================
        let registry = Arc::new(SubscriberRegistry::new());
        let dispatcher = Dispatcher::new(
            registry,
            push,
            broadcast,
            config.push.max_concurrent_deliveries,
            metrics.clone(),
        );
        let handler: Arc<dyn FrameHandler> = Arc::new(Pipeline::new(
            dispatcher.clone(),
            config.push.title.clone(),
            metrics.clone(),
        ));

        // =========================================================================
        // 4. Feed clients
        // =========================================================================
        let connector = self
            .connector_override
            .unwrap_or_else(|| Arc::new(TungsteniteConnector) as Arc<dyn Connector>);
        let policy = ReconnectPolicy {
            delay: config.feeds.reconnect_delay,
            max_attempts: config.feeds.max_reconnect_attempts,
        };

        let mut states = Vec::with_capacity(2);
        for (feed, url, task_name) in [
            (Feed::Quake, config.feeds.quake_url.clone(), "QuakeFeedClient"),
            (Feed::Eew, config.feeds.eew_url.clone(), "EewFeedClient"),
        ] {
            debug!(%feed, %url, "Initializing feed client");
            let client = FeedClient::new(feed, url, policy, handler.clone(), metrics.clone());
            states.push(client.state());

            let connector = connector.clone();
            let shutdown_rx = task_manager.get_shutdown_rx();
            task_manager.spawn(task_name, async move { client.run(connector, shutdown_rx).await });
        }
        let eew_state = states.pop().context("missing EEW feed state")?;
        let quake_state = states.pop().context("missing quake feed state")?;

        // =========================================================================
        // 5. API server
        // =========================================================================
        let admin = Arc::new(AdminBoard::new());
        let listen_address = config.server.listen_address();
        let listener = TcpListener::bind(listen_address)
            .await
            .with_context(|| format!("Failed to bind API server to {}", listen_address))?;
        let api_addr = listener.local_addr()?;
        info!("API server listening on http://{}", api_addr);

        let server = ApiServer::new(
            listener,
            ApiState {
                dispatcher: dispatcher.clone(),
                admin: admin.clone(),
                admin_key: config.server.admin_key.clone(),
                title: config.push.title.clone(),
                prom_handle,
            },
            task_manager.get_shutdown_rx(),
        );
        task_manager.spawn("ApiServer", async move {
            server.run().await;
            Ok(())
        });

        Ok(App {
            task_manager,
            api_addr,
            dispatcher,
            admin,
            quake_state,
            eew_state,
        })
    }
}
