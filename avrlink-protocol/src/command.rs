//! Command codes and outbound commands.

use crate::error::ProtocolError;

/// Suffix turning a code into a status query.
pub const QUERY: &str = "?";

pub const ON: &str = "ON";
pub const OFF: &str = "OFF";

/// Main zone power.
pub const MASTER_POWER: &str = "PW";
/// Main zone volume.
pub const MASTER_VOLUME: &str = "MV";
/// Zone 2 power.
pub const SLAVE_POWER: &str = "Z2";
/// Channel volume.
pub const SLAVE_VOLUME: &str = "CV";

/// Suffix of the maximum volume report (`MVMAX`).
pub const MAX_VOLUME: &str = "MAX";
/// Suffix of the front-left channel volume report (`CVFL`).
pub const FRONT_LEFT: &str = "FL";

/// `MV` + `MAX`.
pub const MASTER_MAX_VOLUME: &str = "MVMAX";
/// `CV` + `FL`.
pub const SLAVE_FRONT_LEFT: &str = "CVFL";

/// Now-playing information list request.
pub const INFORMATION_LIST: &str = "NSE";
pub const ARTIST: &str = "NSE2";
pub const ALBUM: &str = "NSE4";
pub const TRACK: &str = "NSE1";

pub const PLAY: &str = "NS9A";
pub const PAUSE: &str = "NS9B";
pub const NEXT: &str = "NS9D";
pub const PREVIOUS: &str = "NS9E";

/// Status queries issued right after connecting, in order.
pub const BASELINE_QUERIES: [&str; 4] = [MASTER_POWER, MASTER_VOLUME, SLAVE_POWER, SLAVE_VOLUME];

/// An outbound command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Requests the current value of a code (`<code>?`).
    Query(String),
    /// Requests the now-playing information list.
    RequestInfo,
    SetMasterPower(bool),
    /// Sets the main zone volume from a normalized fraction.
    ///
    /// The fraction is not clamped: values outside `[0, 1]` are scaled and
    /// sent as-is.
    SetMasterVolume(f64),
    Play,
    Pause,
    SkipNext,
    SkipPrevious,
    /// Sends a raw code unchanged. Must be a single line; see
    /// [`Command::validate`].
    Raw(String),
}

impl Command {
    /// Returns the query command for a code.
    pub fn query(code: impl Into<String>) -> Self {
        Command::Query(code.into())
    }

    /// Returns a raw command, rejecting anything that is not a single line.
    pub fn raw(line: impl Into<String>) -> Result<Self, ProtocolError> {
        let command = Command::Raw(line.into());
        command.validate()?;
        Ok(command)
    }

    /// Checks that the command encodes to exactly one protocol line.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Command::Raw(line) if line.is_empty() || has_line_break(line) => {
                Err(ProtocolError::InvalidLine(line.clone()))
            }
            Command::Query(code) if has_line_break(code) => {
                Err(ProtocolError::InvalidLine(code.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Returns the commands sent when a connection is established.
    pub fn handshake() -> Vec<Command> {
        BASELINE_QUERIES
            .iter()
            .map(|code| Command::query(*code))
            .chain(std::iter::once(Command::RequestInfo))
            .collect()
    }

    /// Returns the operation name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Query(_) => "query",
            Command::RequestInfo => "request_info",
            Command::SetMasterPower(_) => "set_master_power",
            Command::SetMasterVolume(_) => "set_master_volume",
            Command::Play => "play",
            Command::Pause => "pause",
            Command::SkipNext => "skip_next",
            Command::SkipPrevious => "skip_previous",
            Command::Raw(_) => "raw",
        }
    }
}

fn has_line_break(text: &str) -> bool {
    text.contains(['\r', '\n'])
}
