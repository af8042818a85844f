//! Command encoder.

use crate::command::*;
use crate::session::SessionState;
use crate::EOL;
use bytes::{BufMut, BytesMut};

/// Encodes commands into protocol lines.
pub struct Encoder;

impl Encoder {
    /// Builds the protocol text for a command, without the terminator.
    ///
    /// The session supplies the maximum volume used to denormalize
    /// [`Command::SetMasterVolume`].
    pub fn line(command: &Command, session: &SessionState) -> String {
        match command {
            Command::Query(code) => format!("{}{}", code, QUERY),
            Command::RequestInfo => INFORMATION_LIST.to_string(),
            // The receiver takes power on/off under the volume prefix.
            Command::SetMasterPower(active) => {
                format!("{}{}", MASTER_VOLUME, if *active { ON } else { OFF })
            }
            Command::SetMasterVolume(fraction) => {
                format!(
                    "{}{}",
                    MASTER_VOLUME,
                    denormalize_volume(*fraction, session.master_max_volume())
                )
            }
            Command::Play => PLAY.to_string(),
            Command::Pause => PAUSE.to_string(),
            Command::SkipNext => NEXT.to_string(),
            Command::SkipPrevious => PREVIOUS.to_string(),
            Command::Raw(raw) => raw.clone(),
        }
    }

    /// Encodes a command into a terminated line ready for the transport.
    pub fn encode(command: &Command, session: &SessionState) -> BytesMut {
        let line = Self::line(command, session);
        let mut buf = BytesMut::with_capacity(line.len() + 1);
        buf.put_slice(line.as_bytes());
        buf.put_u8(EOL);
        buf
    }

    /// Encodes several commands back to back.
    pub fn encode_all<'a>(
        commands: impl IntoIterator<Item = &'a Command>,
        session: &SessionState,
    ) -> BytesMut {
        let mut buf = BytesMut::new();
        for command in commands {
            buf.extend_from_slice(&Self::encode(command, session));
        }
        buf
    }
}

/// Scales a normalized fraction to the receiver's integer volume,
/// truncating toward zero.
pub fn denormalize_volume(fraction: f64, max_volume: f64) -> i64 {
    (fraction * max_volume).trunc() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(command: Command) -> String {
        Encoder::line(&command, &SessionState::new())
    }

    #[test]
    fn test_query() {
        assert_eq!(line(Command::query("PW")), "PW?");
        assert_eq!(line(Command::query(SLAVE_VOLUME)), "CV?");
    }

    #[test]
    fn test_request_info() {
        assert_eq!(line(Command::RequestInfo), "NSE");
    }

    #[test]
    fn test_master_power_uses_volume_prefix() {
        assert_eq!(line(Command::SetMasterPower(true)), "MVON");
        assert_eq!(line(Command::SetMasterPower(false)), "MVOFF");
    }

    #[test]
    fn test_master_volume_default_max() {
        assert_eq!(line(Command::SetMasterVolume(0.5)), "MV30");
        assert_eq!(line(Command::SetMasterVolume(1.0)), "MV60");
        assert_eq!(line(Command::SetMasterVolume(0.0)), "MV0");
        // 0.99 * 60 = 59.4
        assert_eq!(line(Command::SetMasterVolume(0.99)), "MV59");
    }

    #[test]
    fn test_master_volume_reported_max() {
        let mut session = SessionState::new();
        session.set_master_max_volume(80.0).unwrap();

        let line = Encoder::line(&Command::SetMasterVolume(0.625), &session);
        assert_eq!(line, "MV50");
    }

    #[test]
    fn test_master_volume_out_of_range_passes_through() {
        assert_eq!(line(Command::SetMasterVolume(1.5)), "MV90");
        assert_eq!(line(Command::SetMasterVolume(-0.5)), "MV-30");
    }

    #[test]
    fn test_transport_codes() {
        assert_eq!(line(Command::Play), "NS9A");
        assert_eq!(line(Command::Pause), "NS9B");
        assert_eq!(line(Command::SkipNext), "NS9D");
        assert_eq!(line(Command::SkipPrevious), "NS9E");
    }

    #[test]
    fn test_raw() {
        assert_eq!(line(Command::Raw("MVUP".into())), "MVUP");
    }

    #[test]
    fn test_encode_appends_terminator() {
        let encoded = Encoder::encode(&Command::Play, &SessionState::new());
        assert_eq!(&encoded[..], b"NS9A\r");
    }

    #[test]
    fn test_encode_handshake() {
        let commands = Command::handshake();
        let encoded = Encoder::encode_all(&commands, &SessionState::new());
        assert_eq!(&encoded[..], b"PW?\rMV?\rZ2?\rCV?\rNSE\r");
    }

    #[test]
    fn test_denormalize_truncates_toward_zero() {
        assert_eq!(denormalize_volume(0.51, 60.0), 30);
        assert_eq!(denormalize_volume(-0.51, 60.0), -30);
    }

    mod volume_props {
        use super::*;
        use crate::field::decode_volume;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decoded_volume_reencodes_within_a_step(
                int in 0u32..100,
                tenth in 0u32..10,
                max in 1.0f64..200.0,
            ) {
                let line = format!("MV{:02}{}", int, tenth);
                let raw = int as f64 + tenth as f64 / 10.0;

                let normalized = decode_volume(&line, MASTER_VOLUME, max).unwrap();
                prop_assert!((normalized * max - raw).abs() < 1e-9);

                let encoded = denormalize_volume(normalized, max);
                prop_assert!((raw - encoded as f64).abs() <= 1.0);
            }
        }
    }
}
