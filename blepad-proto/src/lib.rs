//! Wire formats for the BLE gamepad.
//!
//! This crate holds every byte-level contract the firmware has with the
//! outside world:
//!
//! - **Types**: Core data structures for representing gamepad state
//!   - [`Buttons`] - 14-button bitfield
//!   - [`AnalogStick`] - Analog stick X/Y position
//!   - [`HatSwitch`] - Eight-way hat switch
//!   - [`GamepadState`] - Complete gamepad snapshot
//!
//! - **Report**: The 13-byte HID input report
//!   - [`encode_report()`] / [`decode_report()`]
//!   - [`REPORT_DESCRIPTOR`] - HID report map served to the host
//!   - [`verify_report_layout()`] - Descriptor/encoder size check
//!
//! - **Calibration record**: The 6-byte record kept in PMIC storage
//!   - [`CalibrationRecord`]
//!
//! - **AXP192**: PMIC register map and value decoding ([`axp192`])
//!
//! # Report Format
//!
//! ```text
//! | buttons u16 | LX i16 | LY i16 | RX i16 | RY i16 | LT i8 | RT i8 | hat2:hat1 |
//! ```
//!
//! All multi-byte fields are little-endian. Only the low 14 button bits are
//! used; the top two are padding.
//!
//! # Examples
//!
//! ## Encoding a Report
//!
//! ```
//! use blepad_proto::{encode_report, AnalogStick, Buttons, GamepadState, HatSwitch};
//!
//! let state = GamepadState {
//!     buttons: Buttons::A | Buttons::B,
//!     left_stick: AnalogStick::new(256, -256),
//!     hat1: HatSwitch::Up,
//!     ..GamepadState::neutral()
//! };
//!
//! let report = encode_report(&state);
//! assert_eq!(&report[..4], &[0x03, 0x00, 0x00, 0x01]);
//! assert_eq!(report[12], 0x01);
//! ```
//!
//! ## Checking a Calibration Record
//!
//! ```
//! use blepad_proto::{CalibrationRecord, RecordError, DEFAULT_STORAGE};
//!
//! let stored = CalibrationRecord::new(1200.0).encode();
//! assert_eq!(CalibrationRecord::decode(&stored).unwrap().max_charge_mah, 1200.0);
//!
//! // A factory-fresh PMIC does not carry the key
//! assert!(matches!(
//!     CalibrationRecord::decode(&DEFAULT_STORAGE),
//!     Err(RecordError::KeyMismatch { .. })
//! ));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod axp192;
pub mod descriptor;
pub mod record;
pub mod report;
pub mod types;

// Re-export types at crate root for convenience
pub use axp192::{ChargeStatus, InputPowerStatus};
pub use descriptor::{
    input_report_bits, input_report_len, verify_report_layout, DescriptorError, LayoutError,
    REPORT_DESCRIPTOR,
};
pub use record::{
    CalibrationRecord, RecordError, CALIBRATION_KEY, CALIBRATION_RECORD_LEN, DEFAULT_STORAGE,
    MAX_PLAUSIBLE_CHARGE_MAH,
};
pub use report::{
    decode_report, encode_into, encode_report, ReportError, GAMEPAD_REPORT_ID, GAMEPAD_REPORT_SIZE,
};
pub use types::{AnalogStick, Buttons, GamepadState, HatSwitch};
