//! quakewatch - relays Japanese earthquake, tsunami and Earthquake Early
//! Warning bulletins to browser push subscribers and a LINE channel.
//!
//! Two upstream WebSocket feeds are read by [`network::FeedClient`]s. Each
//! frame flows through [`pipeline::Pipeline`] (classify, then format) and
//! is fanned out by [`dispatcher::Dispatcher`].

pub mod admin;
pub mod app;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod formatting;
pub mod internal_metrics;
pub mod network;
pub mod notification;
pub mod pipeline;
pub mod registry;
pub mod scales;
pub mod server;
pub mod task_manager;

// Re-export core types for convenience
pub use core::*;
