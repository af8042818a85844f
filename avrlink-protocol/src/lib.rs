//! # avrlink-protocol
//!
//! Wire protocol implementation for the receiver's ASCII control protocol.
//!
//! This crate provides:
//! - CR-terminated line framing over a raw byte stream
//! - Prefix-matched field parsers and the ordered dispatch table
//! - Command encoding, including the receiver's integer volume scale
//! - Per-connection session state (device-reported maximum volume)
//!
//! Nothing in this crate performs I/O; see `avrlink-client` for the
//! connection manager.

pub mod codec;
pub mod command;
pub mod dispatch;
pub mod error;
pub mod field;
pub mod frame;
pub mod session;

pub use codec::Encoder;
pub use command::{Command, QUERY};
pub use dispatch::{Dispatch, Dispatcher};
pub use error::ProtocolError;
pub use field::{Field, FieldValue};
pub use frame::LineFramer;
pub use session::{SessionState, DEFAULT_MASTER_MAX_VOLUME};

/// Line terminator used in both directions.
pub const EOL: u8 = b'\r';

/// Default TCP port of the receiver's control interface.
pub const DEFAULT_PORT: u16 = 23;
