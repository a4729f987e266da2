//! Outbound delivery channels.
//!
//! Each submodule implements one of the sink traits from [`crate::core`]:
//! [`push::WebPushSender`] for browser subscribers and
//! [`line::LineBroadcastClient`] for the LINE broadcast channel.
pub mod line;
pub mod push;
