//! # avrlink-client
//!
//! Async control adapter for the receiver.
//!
//! This crate provides:
//! - A connection manager task owning the TCP transport, connect/idle timer
//!   and metadata poll
//! - A [`Client`] handle for issuing commands (power, volume, transport)
//! - A broadcast stream of [`ClientEvent`]s (connect, close, error,
//!   timeout, parsed fields, unrecognized lines)
//!
//! Reconnection is left to the caller: after [`ClientEvent::Closed`], call
//! [`Client::connect`] again.

pub mod client;
pub mod connection;
pub mod error;
pub mod event;

pub use client::Client;
pub use connection::{ConnectionConfig, ConnectionState};
pub use error::ClientError;
pub use event::ClientEvent;
