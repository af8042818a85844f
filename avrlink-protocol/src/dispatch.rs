//! Parse dispatcher.
//!
//! Lines are matched against an ordered table of field parsers. Order
//! matters: `MV` is a prefix of `MVMAX`, so the maximum-volume parser must
//! come before the master-volume parser, and `CVFL` must come before any
//! looser `CV` parser added later.

use crate::command::*;
use crate::field::{self, Field, FieldValue};
use crate::session::SessionState;

/// How a matched payload is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoding {
    Number,
    Boolean,
    ScaledVolume,
    Info,
}

/// One entry in the dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct FieldParser {
    pub field: Field,
    pub prefix: &'static str,
    pub decoding: Decoding,
}

impl FieldParser {
    const fn new(field: Field, prefix: &'static str, decoding: Decoding) -> Self {
        Self {
            field,
            prefix,
            decoding,
        }
    }

    /// Attempts to decode `line` as this parser's field.
    pub fn parse(&self, line: &str, session: &SessionState) -> Option<FieldValue> {
        match self.decoding {
            Decoding::Number => field::decode_number(line, self.prefix).map(FieldValue::Number),
            Decoding::Boolean => field::decode_boolean(line, self.prefix).map(FieldValue::Bool),
            Decoding::ScaledVolume => {
                field::decode_volume(line, self.prefix, session.master_max_volume())
                    .map(FieldValue::Volume)
            }
            Decoding::Info => field::decode_info(line, self.prefix).map(FieldValue::Text),
        }
    }
}

/// The dispatch table, most specific prefix first.
pub const PARSERS: [FieldParser; 8] = [
    FieldParser::new(Field::MasterMaxVolume, MASTER_MAX_VOLUME, Decoding::Number),
    FieldParser::new(Field::MasterPower, MASTER_POWER, Decoding::Boolean),
    FieldParser::new(Field::MasterVolume, MASTER_VOLUME, Decoding::ScaledVolume),
    FieldParser::new(Field::SlavePower, SLAVE_POWER, Decoding::Boolean),
    FieldParser::new(Field::SlaveVolume, SLAVE_FRONT_LEFT, Decoding::ScaledVolume),
    FieldParser::new(Field::Artist, ARTIST, Decoding::Info),
    FieldParser::new(Field::Album, ALBUM, Decoding::Info),
    FieldParser::new(Field::Track, TRACK, Decoding::Info),
];

/// Result of dispatching one line.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Parsed(Field, FieldValue),
    Unrecognized(String),
}

/// Evaluates lines against [`PARSERS`] and keeps the session state current.
#[derive(Debug, Default)]
pub struct Dispatcher {
    session: SessionState,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Restores the session defaults.
    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Dispatches one line.
    ///
    /// A maximum-volume report updates the session before returning, so
    /// later lines are normalized against the new maximum.
    pub fn dispatch(&mut self, line: &str) -> Dispatch {
        match parse_line(line, &self.session) {
            Some((field, value)) => {
                if let (Field::MasterMaxVolume, FieldValue::Number(max)) = (field, &value) {
                    if let Err(e) = self.session.set_master_max_volume(*max) {
                        tracing::warn!("Ignoring reported maximum volume: {}", e);
                    }
                }
                Dispatch::Parsed(field, value)
            }
            None => Dispatch::Unrecognized(line.to_string()),
        }
    }
}

/// Returns the first field in [`PARSERS`] that decodes `line`.
pub fn parse_line(line: &str, session: &SessionState) -> Option<(Field, FieldValue)> {
    PARSERS
        .iter()
        .find_map(|parser| parser.parse(line, session).map(|value| (parser.field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(dispatch: Dispatch) -> (Field, FieldValue) {
        match dispatch {
            Dispatch::Parsed(field, value) => (field, value),
            other => panic!("expected parsed line, got {:?}", other),
        }
    }

    #[test]
    fn test_master_power() {
        let mut dispatcher = Dispatcher::new();
        assert_eq!(
            dispatcher.dispatch("PWON"),
            Dispatch::Parsed(Field::MasterPower, FieldValue::Bool(true))
        );
        assert_eq!(
            dispatcher.dispatch("PWOFF"),
            Dispatch::Parsed(Field::MasterPower, FieldValue::Bool(false))
        );
        assert_eq!(
            dispatcher.dispatch("PWxyz"),
            Dispatch::Unrecognized("PWxyz".to_string())
        );
    }

    #[test]
    fn test_slave_power() {
        let mut dispatcher = Dispatcher::new();
        assert_eq!(
            dispatcher.dispatch("Z2ON"),
            Dispatch::Parsed(Field::SlavePower, FieldValue::Bool(true))
        );
        assert!(matches!(dispatcher.dispatch("Z250"), Dispatch::Unrecognized(_)));
    }

    #[test]
    fn test_volume_with_default_max() {
        let mut dispatcher = Dispatcher::new();
        let (field, value) = parsed(dispatcher.dispatch("MV500"));
        assert_eq!(field, Field::MasterVolume);
        assert!((value.as_f64().unwrap() - 50.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_volume_updates_divisor() {
        let mut dispatcher = Dispatcher::new();

        assert_eq!(
            dispatcher.dispatch("MVMAX 80"),
            Dispatch::Parsed(Field::MasterMaxVolume, FieldValue::Number(80.0))
        );
        assert_eq!(dispatcher.session().master_max_volume(), 80.0);

        assert_eq!(
            dispatcher.dispatch("MV500"),
            Dispatch::Parsed(Field::MasterVolume, FieldValue::Volume(0.625))
        );
    }

    #[test]
    fn test_invalid_max_volume_keeps_divisor() {
        let mut dispatcher = Dispatcher::new();

        assert_eq!(
            dispatcher.dispatch("MVMAX 0"),
            Dispatch::Parsed(Field::MasterMaxVolume, FieldValue::Number(0.0))
        );
        assert_eq!(dispatcher.session().master_max_volume(), 60.0);

        let (_, value) = parsed(dispatcher.dispatch("MV30"));
        assert_eq!(value, FieldValue::Volume(0.5));
    }

    #[test]
    fn test_max_volume_not_read_as_volume() {
        let mut dispatcher = Dispatcher::new();
        let (field, _) = parsed(dispatcher.dispatch("MVMAX 805"));
        assert_eq!(field, Field::MasterMaxVolume);

        assert!(matches!(dispatcher.dispatch("MVMAX"), Dispatch::Unrecognized(_)));
    }

    #[test]
    fn test_slave_volume() {
        let mut dispatcher = Dispatcher::new();
        assert_eq!(
            dispatcher.dispatch("CVFL 45"),
            Dispatch::Parsed(Field::SlaveVolume, FieldValue::Volume(0.75))
        );
        assert!(matches!(dispatcher.dispatch("CVFR 45"), Dispatch::Unrecognized(_)));
    }

    #[test]
    fn test_info_fields() {
        let mut dispatcher = Dispatcher::new();
        assert_eq!(
            dispatcher.dispatch("NSE2Radiohead"),
            Dispatch::Parsed(Field::Artist, FieldValue::Text(Some("adiohead".into())))
        );
        assert_eq!(
            dispatcher.dispatch("NSE4 OK Computer"),
            Dispatch::Parsed(Field::Album, FieldValue::Text(Some("K Computer".into())))
        );
        assert_eq!(
            dispatcher.dispatch("NSE1\u{1}"),
            Dispatch::Parsed(Field::Track, FieldValue::Text(None))
        );
        assert_eq!(
            dispatcher.dispatch("NSE2"),
            Dispatch::Unrecognized("NSE2".to_string())
        );
        assert!(matches!(dispatcher.dispatch("NSE0Now Playing"), Dispatch::Unrecognized(_)));
    }

    #[test]
    fn test_reset_restores_default() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.dispatch("MVMAX 98");
        dispatcher.reset();
        assert_eq!(dispatcher.session().master_max_volume(), 60.0);
    }

    #[test]
    fn test_table_order() {
        // Any parser whose prefix extends another's must be tried first.
        for (i, later) in PARSERS.iter().enumerate() {
            for earlier in &PARSERS[..i] {
                assert!(
                    !later.prefix.starts_with(earlier.prefix) || later.prefix == earlier.prefix,
                    "{} shadowed by {}",
                    later.prefix,
                    earlier.prefix
                );
            }
        }
    }
}
