//! Per-connection session state.

use crate::error::ProtocolError;

/// Maximum volume assumed until the receiver reports its own.
pub const DEFAULT_MASTER_MAX_VOLUME: f64 = 60.0;

/// Mutable state owned by one connection.
///
/// The maximum volume is the divisor for normalizing volume readings and the
/// multiplier for denormalizing volume commands, so it is always finite and
/// strictly positive.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    master_max_volume: f64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            master_max_volume: DEFAULT_MASTER_MAX_VOLUME,
        }
    }

    /// Returns the current maximum volume.
    pub fn master_max_volume(&self) -> f64 {
        self.master_max_volume
    }

    /// Updates the maximum volume.
    ///
    /// Zero, negative and non-finite values are rejected and the previous
    /// value is kept.
    pub fn set_master_max_volume(&mut self, value: f64) -> Result<(), ProtocolError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ProtocolError::InvalidMaxVolume(value));
        }
        self.master_max_volume = value;
        Ok(())
    }

    /// Restores the defaults (used when the connection closes).
    pub fn reset(&mut self) {
        self.master_max_volume = DEFAULT_MASTER_MAX_VOLUME;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
