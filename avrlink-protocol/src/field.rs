//! Status fields and their decoders.
//!
//! Each decoder takes one line and a literal prefix. A line that does not
//! start with the prefix, or whose payload does not fit the field, decodes
//! to `None` ("absent"). Decoders never fail.

use crate::command::{OFF, ON};
use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A status field reported by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    MasterMaxVolume,
    MasterPower,
    MasterVolume,
    SlavePower,
    SlaveVolume,
    Artist,
    Album,
    Track,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::MasterMaxVolume,
        Field::MasterPower,
        Field::MasterVolume,
        Field::SlavePower,
        Field::SlaveVolume,
        Field::Artist,
        Field::Album,
        Field::Track,
    ];

    /// Returns the field name used by consumers (and as the store key).
    pub fn name(&self) -> &'static str {
        match self {
            Field::MasterMaxVolume => "masterMaxVolume",
            Field::MasterPower => "masterPower",
            Field::MasterVolume => "masterVolume",
            Field::SlavePower => "slavePower",
            Field::SlaveVolume => "slaveVolume",
            Field::Artist => "artist",
            Field::Album => "album",
            Field::Track => "track",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| ProtocolError::UnknownField(s.to_string()))
    }
}

/// A decoded field value.
///
/// Serializes to the bare JSON value (`true`, `0.5`, `"Abbey Road"`, `null`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Power state.
    Bool(bool),
    /// Plain number (maximum volume).
    Number(f64),
    /// Volume normalized against the session's maximum volume.
    Volume(f64),
    /// Now-playing text. `None` means the field was reported empty.
    Text(Option<String>),
}

impl FieldValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) | FieldValue::Volume(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<Option<&str>> {
        match self {
            FieldValue::Text(text) => Some(text.as_deref()),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Volume(v) => write!(f, "{:.3}", v),
            FieldValue::Text(Some(s)) => write!(f, "{:?}", s),
            FieldValue::Text(None) => f.write_str("null"),
        }
    }
}

/// Strips `prefix` and trims the payload.
pub fn payload<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.strip_prefix(prefix).map(str::trim)
}

/// Decodes a plain decimal number.
pub fn decode_number(line: &str, prefix: &str) -> Option<f64> {
    let value = payload(line, prefix)?;
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Decodes `ON`/`OFF`.
pub fn decode_boolean(line: &str, prefix: &str) -> Option<bool> {
    match payload(line, prefix)? {
        ON => Some(true),
        OFF => Some(false),
        _ => None,
    }
}

/// Decodes the receiver's volume encoding and normalizes it.
///
/// The first two characters are the integer part and the rest is tenths:
/// `505` is 50.5. The result is divided by `max_volume`.
pub fn decode_volume(line: &str, prefix: &str, max_volume: f64) -> Option<f64> {
    let value = payload(line, prefix)?;
    if value.is_empty() {
        return None;
    }

    let split = value.char_indices().nth(2).map_or(value.len(), |(i, _)| i);
    let (int_part, tenths) = value.split_at(split);
    if !is_digits(int_part) || !(tenths.is_empty() || is_digits(tenths)) {
        return None;
    }

    let int: f64 = int_part.parse().ok()?;
    let fraction: f64 = if tenths.is_empty() {
        0.0
    } else {
        tenths.parse::<f64>().ok()? / 10.0
    };

    Some((int + fraction) / max_volume)
}

/// Decodes a now-playing information line.
///
/// The first payload character is a sub-type marker and is dropped. A
/// payload consisting of the marker alone is reported as `Some(None)`.
pub fn decode_info(line: &str, prefix: &str) -> Option<Option<String>> {
    let value = payload(line, prefix)?;
    let mut chars = value.chars();
    chars.next()?;
    let rest = chars.as_str();
    if rest.is_empty() {
        Some(None)
    } else {
        Some(Some(rest.to_string()))
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_roundtrip() {
        for field in Field::ALL {
            assert_eq!(field.name().parse::<Field>().unwrap(), field);
        }
        assert_eq!(
            "bass".parse::<Field>(),
            Err(ProtocolError::UnknownField("bass".into()))
        );
    }

    #[test]
    fn test_field_serde_name() {
        let json = serde_json::to_string(&Field::MasterMaxVolume).unwrap();
        assert_eq!(json, "\"masterMaxVolume\"");
    }

    #[test]
    fn test_value_serialization() {
        assert_eq!(serde_json::to_value(FieldValue::Bool(true)).unwrap(), serde_json::json!(true));
        assert_eq!(serde_json::to_value(FieldValue::Volume(0.5)).unwrap(), serde_json::json!(0.5));
        assert_eq!(
            serde_json::to_value(FieldValue::Text(Some("Help".into()))).unwrap(),
            serde_json::json!("Help")
        );
        assert_eq!(
            serde_json::to_value(FieldValue::Text(None)).unwrap(),
            serde_json::Value::Null
        );
    }

    #[test]
    fn test_decode_number() {
        assert_eq!(decode_number("MVMAX 80", "MVMAX"), Some(80.0));
        assert_eq!(decode_number("MVMAX 98.5", "MVMAX"), Some(98.5));
        assert_eq!(decode_number("MVMAX", "MVMAX"), None);
        assert_eq!(decode_number("MVMAX abc", "MVMAX"), None);
        assert_eq!(decode_number("MV80", "MVMAX"), None);
    }

    #[test]
    fn test_decode_boolean() {
        assert_eq!(decode_boolean("PWON", "PW"), Some(true));
        assert_eq!(decode_boolean("PWOFF", "PW"), Some(false));
        assert_eq!(decode_boolean("PW ON ", "PW"), Some(true));
        assert_eq!(decode_boolean("PWSTANDBY", "PW"), None);
        assert_eq!(decode_boolean("PWon", "PW"), None);
        assert_eq!(decode_boolean("Z2ON", "PW"), None);
    }

    #[test]
    fn test_decode_volume() {
        assert_eq!(decode_volume("MV505", "MV", 101.0), Some(0.5));
        assert_eq!(decode_volume("MV30", "MV", 60.0), Some(0.5));
        assert_eq!(decode_volume("MV5", "MV", 10.0), Some(0.5));
        assert_eq!(decode_volume("CVFL 50", "CVFL", 50.0), Some(1.0));
    }

    #[test]
    fn test_decode_volume_absent() {
        assert_eq!(decode_volume("MV", "MV", 60.0), None);
        assert_eq!(decode_volume("MV   ", "MV", 60.0), None);
        assert_eq!(decode_volume("MVMAX 80", "MV", 60.0), None);
        assert_eq!(decode_volume("MVUP", "MV", 60.0), None);
        assert_eq!(decode_volume("MV50x", "MV", 60.0), None);
        assert_eq!(decode_volume("PW50", "MV", 60.0), None);
    }

    #[test]
    fn test_decode_info() {
        assert_eq!(
            decode_info("NSE2Radiohead", "NSE2"),
            Some(Some("adiohead".to_string()))
        );
        assert_eq!(
            decode_info("NSE1 Paranoid Android", "NSE1"),
            Some(Some("aranoid Android".to_string()))
        );
        assert_eq!(decode_info("NSE4x", "NSE4"), Some(None));
        assert_eq!(decode_info("NSE2", "NSE2"), None);
        assert_eq!(decode_info("NSE2   ", "NSE2"), None);
        assert_eq!(decode_info("NSE1Track", "NSE2"), None);
    }

    #[test]
    fn test_decode_info_multibyte_marker() {
        assert_eq!(decode_info("NSE2\u{e9}t\u{e9}", "NSE2"), Some(Some("t\u{e9}".to_string())));
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(FieldValue::Bool(false).as_bool(), Some(false));
        assert_eq!(FieldValue::Number(80.0).as_f64(), Some(80.0));
        assert_eq!(FieldValue::Volume(0.5).as_f64(), Some(0.5));
        assert_eq!(FieldValue::Text(None).as_text(), Some(None));
        assert_eq!(FieldValue::Bool(true).as_text(), None);
    }
}
