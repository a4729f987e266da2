//! Network client for the upstream WebSocket feeds
//!
//! This module maintains one persistent connection per feed, hands every text
//! frame to a [`FrameHandler`] in arrival order, and reconnects after a fixed
//! delay whenever the connection drops.

use crate::core::{Feed, FrameHandler};
use crate::internal_metrics::Metrics;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Lifecycle of a feed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// When to try again after a connection ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Constant wait between a disconnect and the next attempt.
    pub delay: Duration,
    /// Stop after this many consecutive failed connection attempts.
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1000),
            max_attempts: None,
        }
    }
}

/// Trait for WebSocket connections to enable testing with fake implementations
#[async_trait]
pub trait WebSocketConnection: Send {
    /// Reads the next message from the WebSocket connection
    ///
    /// # Returns
    /// * `Some(Ok(Message))` if a message was successfully received
    /// * `Some(Err(error))` if there was an error reading the message
    /// * `None` if the connection has been closed
    async fn read_message(&mut self) -> Option<Result<Message, WsError>>;
}

/// Opens connections to a feed URL.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn WebSocketConnection>>;
}

/// Connects with `tokio-tungstenite`, using native TLS for `wss://` URLs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl WebSocketConnection for TungsteniteConnection {
    async fn read_message(&mut self) -> Option<Result<Message, WsError>> {
        self.stream.next().await
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn WebSocketConnection>> {
        let (stream, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;
        Ok(Box::new(TungsteniteConnection { stream }))
    }
}

/// Feed client that keeps one upstream connection alive and forwards its
/// frames to the pipeline.
pub struct FeedClient {
    feed: Feed,
    url: String,
    policy: ReconnectPolicy,
    handler: Arc<dyn FrameHandler>,
    metrics: Metrics,
    state_tx: watch::Sender<ConnectionState>,
}

impl FeedClient {
    /// Creates a new feed client
    ///
    /// # Arguments
    /// * `feed` - Which upstream feed this client reads
    /// * `url` - The WebSocket URL to connect to
    /// * `policy` - Reconnection delay and optional attempt cap
    /// * `handler` - Receives every text frame, in order
    pub fn new(
        feed: Feed,
        url: String,
        policy: ReconnectPolicy,
        handler: Arc<dyn FrameHandler>,
        metrics: Metrics,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            feed,
            url,
            policy,
            handler,
            metrics,
            state_tx,
        }
    }

    pub fn feed(&self) -> Feed {
        self.feed
    }

    /// Subscribes to connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
        self.metrics
            .set_feed_connection_status(self.feed, state == ConnectionState::Connected);
    }

    /// Processes messages from the provided connection until it closes.
    ///
    /// Returns `Ok(())` on a clean close and `Err` on a transport error. It
    /// does not implement reconnection logic.
    pub async fn run_with_connection(&self, mut connection: Box<dyn WebSocketConnection>) -> Result<()> {
        loop {
            match connection.read_message().await {
                Some(Ok(Message::Text(text))) => {
                    self.metrics.frames_received_total.increment(1);
                    self.handler.handle_frame(self.feed, text.as_str());
                }
                Some(Ok(Message::Binary(_))) => {
                    log::debug!("[{}] Received binary message, ignoring", self.feed);
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    log::trace!("[{}] Received ping/pong", self.feed);
                }
                Some(Ok(Message::Close(frame))) => {
                    log::info!("[{}] Received close message from server: {:?}", self.feed, frame);
                    break;
                }
                Some(Ok(Message::Frame(_))) => {
                    log::debug!("[{}] Received raw frame, ignoring", self.feed);
                }
                Some(Err(e)) => {
                    return Err(anyhow::anyhow!("WebSocket error: {}", e));
                }
                None => {
                    log::info!("[{}] WebSocket stream ended", self.feed);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Runs the client with automatic reconnection until shutdown.
    ///
    /// Every disconnect, clean or not, is followed by the fixed reconnect
    /// delay. Returns `Err` only when `max_attempts` consecutive connection
    /// attempts have failed.
    pub async fn run(
        &self,
        connector: Arc<dyn Connector>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut failed_attempts: u32 = 0;

        loop {
            self.set_state(ConnectionState::Connecting);
            log::info!("[{}] Connecting to {}", self.feed, self.url);

            let connected = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                result = connector.connect(&self.url) => result,
            };

            match connected {
                Ok(connection) => {
                    failed_attempts = 0;
                    self.set_state(ConnectionState::Connected);
                    log::info!("[{}] Connected to {}", self.feed, self.url);

                    let result = tokio::select! {
                        biased;
                        _ = shutdown_rx.changed() => break,
                        result = self.run_with_connection(connection) => result,
                    };
                    match result {
                        Ok(()) => log::info!("[{}] Connection closed", self.feed),
                        Err(e) => log::error!("[{}] Connection lost: {}", self.feed, e),
                    }
                    self.metrics.increment_feed_disconnects(self.feed);
                }
                Err(e) => {
                    failed_attempts += 1;
                    log::error!(
                        "[{}] Connection attempt {} failed: {:#}",
                        self.feed,
                        failed_attempts,
                        e
                    );
                    if let Some(max) = self.policy.max_attempts {
                        if failed_attempts >= max {
                            self.set_state(ConnectionState::Disconnected);
                            anyhow::bail!(
                                "[{}] giving up after {} consecutive failed connection attempts",
                                self.feed,
                                failed_attempts
                            );
                        }
                    }
                }
            }

            self.set_state(ConnectionState::Disconnected);
            log::info!("[{}] Reconnecting in {:?}", self.feed, self.policy.delay);
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                _ = tokio::time::sleep(self.policy.delay) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
        log::info!("[{}] Feed client received shutdown signal", self.feed);
        Ok(())
    }
}
