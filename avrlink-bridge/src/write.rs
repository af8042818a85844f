//! Write requests read from the store.

use crate::error::BridgeError;
use avrlink_client::{Client, ClientError};
use serde_json::Value;

/// A write request, keyed by the store entry it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRequest {
    SetMasterPower(bool),
    SetMasterVolume(f64),
    /// `true` plays, `false` pauses.
    SetPlaying(bool),
    SkipNext,
    SkipPrevious,
}

impl WriteRequest {
    /// Store keys that carry write requests.
    pub const KEYS: [&'static str; 5] = [
        "setMasterPower",
        "setMasterVolume",
        "setPlaying",
        "skipNext",
        "skipPrevious",
    ];

    pub fn is_write_key(key: &str) -> bool {
        Self::KEYS.contains(&key)
    }

    /// Builds a request from a store entry.
    ///
    /// Returns `Ok(None)` for keys that are not write requests (mirrored
    /// fields) and an error for a write key holding the wrong value type.
    pub fn from_entry(key: &str, value: &Value) -> Result<Option<Self>, BridgeError> {
        let request = match key {
            "setMasterPower" => value.as_bool().map(WriteRequest::SetMasterPower),
            "setMasterVolume" => value.as_f64().map(WriteRequest::SetMasterVolume),
            "setPlaying" => value.as_bool().map(WriteRequest::SetPlaying),
            "skipNext" => Some(WriteRequest::SkipNext),
            "skipPrevious" => Some(WriteRequest::SkipPrevious),
            _ => return Ok(None),
        };

        request.map(Some).ok_or_else(|| BridgeError::InvalidWrite {
            key: key.to_string(),
            value: value.clone(),
        })
    }

    /// Issues the request through the client.
    pub async fn apply(&self, client: &Client) -> Result<(), ClientError> {
        match self {
            WriteRequest::SetMasterPower(active) => client.set_master_power(*active).await,
            WriteRequest::SetMasterVolume(fraction) => client.set_master_volume(*fraction).await,
            WriteRequest::SetPlaying(true) => client.play().await,
            WriteRequest::SetPlaying(false) => client.pause().await,
            WriteRequest::SkipNext => client.skip_next().await,
            WriteRequest::SkipPrevious => client.skip_previous().await,
        }
    }
}
