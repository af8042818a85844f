//! Adapter events.

use crate::error::ClientError;
use avrlink_protocol::{Field, FieldValue};
use std::fmt;
use std::sync::Arc;

/// An event raised by the adapter.
///
/// Events from one connection are delivered in the order their source lines
/// were read.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The transport connected and the baseline queries were sent.
    Connected,
    /// The transport closed. Always the last event of a connection.
    Closed,
    /// A connect or runtime failure. Followed by [`ClientEvent::Closed`].
    Errored(Arc<ClientError>),
    /// No traffic for the configured timeout. The connection stays open.
    TimedOut,
    /// A recognized status line.
    Parsed(Field, FieldValue),
    /// A line no field parser recognized.
    Unrecognized(String),
}

impl ClientEvent {
    /// Returns the event name used in logs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Connected => "connect",
            ClientEvent::Closed => "close",
            ClientEvent::Errored(_) => "error",
            ClientEvent::TimedOut => "timeout",
            ClientEvent::Parsed(..) => "parsed",
            ClientEvent::Unrecognized(_) => "unrecognized",
        }
    }
}

impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientEvent::Errored(err) => write!(f, "error: {}", err),
            ClientEvent::Parsed(field, value) => write!(f, "{} = {}", field, value),
            ClientEvent::Unrecognized(line) => write!(f, "unrecognized: {:?}", line),
            other => f.write_str(other.name()),
        }
    }
}
