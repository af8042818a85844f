//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
///
/// Line parsing never produces these: a line that matches no field is
/// reported as unrecognized, not as an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("invalid maximum volume: {0} (must be finite and > 0)")]
    InvalidMaxVolume(f64),

    #[error("invalid command line: {0:?} (must be non-empty without CR or LF)")]
    InvalidLine(String),
}
