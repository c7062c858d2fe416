//! Gamepad input report encoding.
//!
//! # Wire Layout
//!
//! ```text
//! byte  0..2   buttons 1-14, bit 0 of byte 0 = button 1; bits 14-15 padding (0)
//! byte  2..4   left stick X   i16 LE
//! byte  4..6   left stick Y   i16 LE
//! byte  6..8   right stick X  i16 LE
//! byte  8..10  right stick Y  i16 LE
//! byte 10      left trigger   i8
//! byte 11      right trigger  i8
//! byte 12      hat 1 (bits 0-3), hat 2 (bits 4-7)
//! ```
//!
//! The report ID is not part of the payload; HID-over-GATT carries it in the
//! Report Reference descriptor.
//!
//! # Example
//!
//! ```
//! use blepad_proto::{encode_report, Buttons, GamepadState, GAMEPAD_REPORT_SIZE};
//!
//! let state = GamepadState {
//!     buttons: Buttons::A,
//!     ..GamepadState::neutral()
//! };
//! let report = encode_report(&state);
//! assert_eq!(report.len(), GAMEPAD_REPORT_SIZE);
//! assert_eq!(report[0], 0x01);
//! ```

use crate::types::{AnalogStick, Buttons, GamepadState, HatSwitch};

/// Report ID of the gamepad input report.
pub const GAMEPAD_REPORT_ID: u8 = 1;

/// Size of the encoded input report in bytes.
pub const GAMEPAD_REPORT_SIZE: usize = 13;

/// Error type for report buffer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportError {
    /// The output buffer is too small to hold the report.
    BufferTooSmall,
    /// The input does not have the report length.
    InvalidLength,
}

impl core::fmt::Display for ReportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::InvalidLength => write!(f, "invalid report length"),
        }
    }
}

/// Encode a gamepad state into the fixed 13-byte report.
#[must_use]
pub fn encode_report(state: &GamepadState) -> [u8; GAMEPAD_REPORT_SIZE] {
    let mut out = [0u8; GAMEPAD_REPORT_SIZE];

    let buttons = (state.buttons.raw() & Buttons::MASK).to_le_bytes();
    out[0] = buttons[0];
    out[1] = buttons[1];

    put_i16(&mut out, 2, state.left_stick.x);
    put_i16(&mut out, 4, state.left_stick.y);
    put_i16(&mut out, 6, state.right_stick.x);
    put_i16(&mut out, 8, state.right_stick.y);

    out[10] = state.left_trigger as u8;
    out[11] = state.right_trigger as u8;
    out[12] = (state.hat1.nibble() & 0x0F) | (state.hat2.nibble() << 4);

    out
}

/// Encode into a caller-provided buffer.
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// Returns [`ReportError::BufferTooSmall`] if `buf` is shorter than
/// [`GAMEPAD_REPORT_SIZE`].
pub fn encode_into(state: &GamepadState, buf: &mut [u8]) -> Result<usize, ReportError> {
    let out = buf
        .get_mut(..GAMEPAD_REPORT_SIZE)
        .ok_or(ReportError::BufferTooSmall)?;
    out.copy_from_slice(&encode_report(state));
    Ok(GAMEPAD_REPORT_SIZE)
}

/// Decode a report payload back into a gamepad state.
///
/// Padding bits are ignored and hat values outside 1..=8 read as centered.
///
/// # Errors
///
/// Returns [`ReportError::InvalidLength`] unless `bytes` is exactly
/// [`GAMEPAD_REPORT_SIZE`] long.
pub fn decode_report(bytes: &[u8]) -> Result<GamepadState, ReportError> {
    if bytes.len() != GAMEPAD_REPORT_SIZE {
        return Err(ReportError::InvalidLength);
    }

    Ok(GamepadState {
        buttons: Buttons::from_bits_truncate(u16::from_le_bytes([bytes[0], bytes[1]])),
        left_stick: AnalogStick::new(get_i16(bytes, 2), get_i16(bytes, 4)),
        right_stick: AnalogStick::new(get_i16(bytes, 6), get_i16(bytes, 8)),
        left_trigger: bytes[10] as i8,
        right_trigger: bytes[11] as i8,
        hat1: HatSwitch::from_nibble(bytes[12] & 0x0F),
        hat2: HatSwitch::from_nibble(bytes[12] >> 4),
    })
}

impl GamepadState {
    /// Encode this state as an input report.
    #[inline]
    #[must_use]
    pub fn to_report(&self) -> [u8; GAMEPAD_REPORT_SIZE] {
        encode_report(self)
    }
}

#[inline]
fn put_i16(out: &mut [u8; GAMEPAD_REPORT_SIZE], at: usize, value: i16) {
    let bytes = value.to_le_bytes();
    out[at] = bytes[0];
    out[at + 1] = bytes[1];
}

#[inline]
fn get_i16(bytes: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_report_is_zero() {
        assert_eq!(encode_report(&GamepadState::neutral()), [0u8; 13]);
    }

    #[test]
    fn test_button_bit_order() {
        let state = GamepadState {
            buttons: Buttons::A | Buttons::LS | Buttons::BUTTON_14,
            ..GamepadState::neutral()
        };
        let report = encode_report(&state);
        // Button 1 -> byte 0 bit 0, button 9 -> byte 1 bit 0, button 14 -> byte 1 bit 5
        assert_eq!(report[0], 0b0000_0001);
        assert_eq!(report[1], 0b0010_0001);
    }

    #[test]
    fn test_padding_bits_stay_clear() {
        let state = GamepadState {
            buttons: Buttons::from_bits_truncate(0xFFFF),
            ..GamepadState::neutral()
        };
        let report = encode_report(&state);
        assert_eq!(report[0], 0xFF);
        assert_eq!(report[1], 0x3F);
    }

    #[test]
    fn test_axes_little_endian() {
        let state = GamepadState {
            left_stick: AnalogStick::new(0x1234, -2),
            right_stick: AnalogStick::new(i16::MIN, i16::MAX),
            left_trigger: -127,
            right_trigger: 127,
            ..GamepadState::neutral()
        };
        let report = encode_report(&state);
        assert_eq!(&report[2..4], &[0x34, 0x12]);
        assert_eq!(&report[4..6], &[0xFE, 0xFF]);
        assert_eq!(&report[6..8], &[0x00, 0x80]);
        assert_eq!(&report[8..10], &[0xFF, 0x7F]);
        assert_eq!(report[10], 0x81);
        assert_eq!(report[11], 0x7F);
    }

    #[test]
    fn test_hat_nibbles() {
        let state = GamepadState {
            hat1: HatSwitch::Right,
            hat2: HatSwitch::UpLeft,
            ..GamepadState::neutral()
        };
        assert_eq!(encode_report(&state)[12], 0x83);
    }

    #[test]
    fn test_decode_matches_encode() {
        let state = GamepadState {
            buttons: Buttons::B | Buttons::START | Buttons::RS,
            left_stick: AnalogStick::new(-31232, 31488),
            right_stick: AnalogStick::new(5, -5),
            left_trigger: -3,
            right_trigger: 100,
            hat1: HatSwitch::Down,
            hat2: HatSwitch::Centered,
        };
        assert_eq!(decode_report(&state.to_report()), Ok(state));
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert_eq!(decode_report(&[0u8; 12]), Err(ReportError::InvalidLength));
        assert_eq!(decode_report(&[0u8; 14]), Err(ReportError::InvalidLength));
    }

    #[test]
    fn test_encode_into_buffer() {
        let mut buf = [0xAAu8; 16];
        assert_eq!(encode_into(&GamepadState::neutral(), &mut buf), Ok(13));
        assert_eq!(&buf[..13], &[0u8; 13]);
        assert_eq!(buf[13], 0xAA);

        let mut small = [0u8; 12];
        assert_eq!(
            encode_into(&GamepadState::neutral(), &mut small),
            Err(ReportError::BufferTooSmall)
        );
    }

    #[test]
    fn test_packing_sweep_keeps_fields_independent() {
        // Walk every button bit, hat pair and a spread of axis values; every
        // report must be 13 bytes and decode to the same state.
        let axes = [i16::MIN, -256, -1, 0, 1, 255, i16::MAX];
        let triggers = [-127i8, -1, 0, 1, 127];
        for bit in 0..Buttons::COUNT {
            let buttons = Buttons::from_index(bit).unwrap_or(Buttons::NONE);
            for (i, &axis) in axes.iter().enumerate() {
                let trigger = triggers[i % triggers.len()];
                let hat1 = HatSwitch::from_nibble(((bit + i) % 9) as u8);
                let hat2 = HatSwitch::from_nibble(((bit * 3 + i) % 9) as u8);
                let state = GamepadState {
                    buttons,
                    left_stick: AnalogStick::new(axis, axis.wrapping_neg()),
                    right_stick: AnalogStick::new(axis.wrapping_add(7), axis),
                    left_trigger: trigger,
                    right_trigger: -trigger,
                    hat1,
                    hat2,
                };
                let report = encode_report(&state);
                assert_eq!(report.len(), GAMEPAD_REPORT_SIZE);
                assert_eq!(report[1] & 0xC0, 0);
                assert_eq!(decode_report(&report), Ok(state));
            }
        }
    }
}
