//! # avrlink-bridge
//!
//! Mirrors receiver state into a key-value store and applies write requests
//! found there.
//!
//! This crate provides:
//! - [`Bridge`], the event loop tying an `avrlink-client` connection to a store
//! - [`StatusStore`] with in-memory and REST database implementations
//! - Layered configuration (defaults, YAML file, environment)

pub mod bridge;
pub mod config;
pub mod error;
pub mod store;
pub mod write;

pub use bridge::Bridge;
pub use config::{Config, ConfigError, ReceiverConfig, StoreConfig};
pub use error::BridgeError;
pub use store::{MemoryStore, RestStore, StatusStore};
pub use write::WriteRequest;
