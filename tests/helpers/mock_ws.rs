//! Scripted feed connections for driving `FeedClient` without a network.
use anyhow::Result;
use async_trait::async_trait;
use quakewatch::network::{Connector, WebSocketConnection};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{Error, Message};

/// A connection that replays a fixed list of reads.
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    reads: VecDeque<Result<Message, Error>>,
    hold_open: bool,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.reads.push_back(Ok(Message::Text(text.into().into())));
        self
    }

    pub fn ping(mut self) -> Self {
        self.reads.push_back(Ok(Message::Ping(Default::default())));
        self
    }

    /// Ends the connection with a transport error.
    pub fn transport_error(mut self) -> Self {
        self.reads.push_back(Err(Error::ConnectionClosed));
        self
    }

    /// After the script runs out, block instead of reporting end of stream.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

#[async_trait]
impl WebSocketConnection for ScriptedConnection {
    async fn read_message(&mut self) -> Option<Result<Message, Error>> {
        if let Some(read) = self.reads.pop_front() {
            return Some(read);
        }
        if self.hold_open {
            std::future::pending::<()>().await;
        }
        None
    }
}

/// One scripted outcome of `Connector::connect`.
#[derive(Debug)]
pub enum Attempt {
    Refuse,
    Accept(ScriptedConnection),
}

/// Hands out scripted attempts in order. Once the script is exhausted,
/// `connect` never completes, which parks the feed loop.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    attempts: Mutex<VecDeque<Attempt>>,
    connects: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(attempts: Vec<Attempt>) -> Self {
        Self {
            attempts: Mutex::new(attempts.into()),
            connects: AtomicUsize::new(0),
        }
    }

    /// Number of `connect` calls made so far, including the parked one.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn WebSocketConnection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let next = self.attempts.lock().unwrap().pop_front();
        match next {
            Some(Attempt::Accept(connection)) => Ok(Box::new(connection)),
            Some(Attempt::Refuse) => anyhow::bail!("connection to {} refused", url),
            None => std::future::pending().await,
        }
    }
}

/// Routes connections by URL so one connector can serve both feeds.
pub struct RoutingConnector {
    routes: Vec<(String, ScriptedConnector)>,
}

impl RoutingConnector {
    pub fn new(routes: Vec<(&str, ScriptedConnector)>) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|(url, connector)| (url.to_string(), connector))
                .collect(),
        }
    }
}

#[async_trait]
impl Connector for RoutingConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn WebSocketConnection>> {
        match self.routes.iter().find(|(route, _)| route == url) {
            Some((_, connector)) => connector.connect(url).await,
            None => std::future::pending().await,
        }
    }
}

/// Holds every `connect` call until [`GatedConnector::open`] is called.
pub struct GatedConnector {
    inner: Arc<dyn Connector>,
    gate_tx: watch::Sender<bool>,
}

impl GatedConnector {
    pub fn new(inner: Arc<dyn Connector>) -> Self {
        let (gate_tx, _) = watch::channel(false);
        Self { inner, gate_tx }
    }

    pub fn open(&self) {
        self.gate_tx.send_replace(true);
    }
}

#[async_trait]
impl Connector for GatedConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn WebSocketConnection>> {
        let mut gate = self.gate_tx.subscribe();
        gate.wait_for(|open| *open).await?;
        self.inner.connect(url).await
    }
}
